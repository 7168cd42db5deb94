use crate::pipeline::frame::Frame;
use crate::utils::bbox::BoundingBox;
use image::GrayImage;

/// Running-average background subtraction
pub mod background;

/// Connected blobs of a binary mask
pub mod blobs;

/// Difference against an exponential moving average of frames
pub mod frame_difference;

/// Default maximum of boxes returned per frame
pub const DEFAULT_MAX_OBJECTS: usize = 5;

/// Default minimal blob area (pixels); smaller or equal blobs are discarded
pub const DEFAULT_MIN_AREA: i64 = 2000;

/// Mask value of foreground pixels
pub const FOREGROUND: u8 = 255;

/// Detection capability: turns a frame into candidate boxes of moving objects
///
pub trait Detector: Send {
    fn name(&self) -> &str;

    /// Detects candidate boxes in the frame.
    ///
    /// The result is deterministic for the detector state and the frame. It holds at most
    /// `max_objects` boxes, largest first.
    ///
    fn apply(&mut self, frame: &Frame) -> anyhow::Result<Vec<BoundingBox>>;

    /// Forgets the accumulated state
    ///
    fn reset(&mut self);

    /// Debug view of the last processed frame (typically the foreground mask)
    ///
    fn filtered_frame(&self) -> Option<&GrayImage> {
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DetectorOptions {
    pub max_objects: usize,
    pub min_area: i64,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            max_objects: DEFAULT_MAX_OBJECTS,
            min_area: DEFAULT_MIN_AREA,
        }
    }
}

/// Marks the pixels where `|a - b| > threshold`
///
fn difference_mask(current: &GrayImage, model: &[f32], threshold: f32) -> GrayImage {
    let mut mask = GrayImage::new(current.width(), current.height());
    for ((m, c), b) in mask.iter_mut().zip(current.iter()).zip(model.iter()) {
        if (*c as f32 - b).abs() > threshold {
            *m = FOREGROUND;
        }
    }
    mask
}

/// Grayscale and optional blur, shared by the reference detectors
///
fn preprocess(frame: &Frame, blur_sigma: Option<f32>) -> GrayImage {
    let gray = image::imageops::grayscale(frame.image());
    match blur_sigma {
        Some(sigma) => imageproc::filter::gaussian_blur_f32(&gray, sigma),
        None => gray,
    }
}

fn dilate(mask: GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        mask
    } else {
        imageproc::morphology::dilate(&mask, imageproc::distance_transform::Norm::LInf, radius)
    }
}

#[cfg(test)]
mod tests {
    use crate::detectors::{difference_mask, dilate, Detector, FOREGROUND};
    use crate::examples::ScriptedDetector;
    use crate::pipeline::frame::Frame;
    use crate::utils::bbox::BoundingBox;
    use image::{GrayImage, Luma, RgbImage};

    #[test]
    fn mask_thresholds() {
        let current = GrayImage::from_raw(3, 1, vec![10, 40, 200]).unwrap();
        let mask = difference_mask(&current, &[10.0, 10.0, 190.0], 25.0);
        assert_eq!(mask.as_raw(), &vec![0, FOREGROUND, 0]);
    }

    #[test]
    fn dilation_grows_blobs() {
        let mut mask = GrayImage::new(9, 9);
        mask.put_pixel(4, 4, Luma([FOREGROUND]));
        let grown = dilate(mask.clone(), 2);
        assert_eq!(grown.iter().filter(|p| **p == FOREGROUND).count(), 25);
        assert_eq!(dilate(mask, 0).iter().filter(|p| **p > 0).count(), 1);
    }

    #[test]
    fn detector_is_object_safe() {
        let mut detectors: Vec<Box<dyn Detector>> =
            vec![Box::new(ScriptedDetector::new(vec![Ok(vec![
                BoundingBox::new(1, 2, 3, 4),
            ])]))];
        let frame = Frame::new(0, RgbImage::new(4, 4));
        for d in detectors.iter_mut() {
            assert_eq!(d.apply(&frame).unwrap().len(), 1);
            assert!(d.filtered_frame().is_none());
        }
    }
}
