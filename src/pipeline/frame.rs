use image::RgbImage;
use std::time::SystemTime;

/// Frame delivered by the frame source
///
#[derive(Debug, Clone)]
pub struct Frame {
    index: u64,
    captured_at: SystemTime,
    image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self::with_timestamp(index, image, SystemTime::now())
    }

    pub fn with_timestamp(index: u64, image: RgbImage, captured_at: SystemTime) -> Self {
        Self {
            index,
            captured_at,
            image,
        }
    }

    /// Position of the frame in the source, skipped frames included
    ///
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}
