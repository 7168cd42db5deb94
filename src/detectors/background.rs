use crate::detectors::{blobs, difference_mask, dilate, preprocess, Detector, DetectorOptions};
use crate::pipeline::frame::Frame;
use crate::utils::bbox::BoundingBox;
use image::GrayImage;
use log::{debug, warn};

pub const DEFAULT_THRESHOLD: f32 = 25.0;
pub const DEFAULT_LEARNING_RATE: f32 = 0.01;
pub const DEFAULT_BLUR_SIGMA: f32 = 3.5;
pub const DEFAULT_DILATE_RADIUS: u8 = 2;

#[derive(Debug, Clone, Copy)]
pub struct BackgroundSubtractionOptions {
    pub detector: DetectorOptions,
    /// Minimal absolute difference from the background for a foreground pixel
    pub threshold: f32,
    /// Share of the current frame mixed into the background model, `[0.0, 1.0]`
    pub learning_rate: f32,
    pub blur_sigma: Option<f32>,
    pub dilate_radius: u8,
}

impl Default for BackgroundSubtractionOptions {
    fn default() -> Self {
        Self {
            detector: DetectorOptions::default(),
            threshold: DEFAULT_THRESHOLD,
            learning_rate: DEFAULT_LEARNING_RATE,
            blur_sigma: Some(DEFAULT_BLUR_SIGMA),
            dilate_radius: DEFAULT_DILATE_RADIUS,
        }
    }
}

/// Running average of the scene
///
#[derive(Debug, Clone)]
struct BackgroundModel {
    width: u32,
    height: u32,
    pixels: Vec<f32>,
}

impl BackgroundModel {
    fn seed(image: &GrayImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            pixels: image.iter().map(|p| *p as f32).collect(),
        }
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn learn(&mut self, image: &GrayImage, rate: f32) {
        for (b, p) in self.pixels.iter_mut().zip(image.iter()) {
            *b += rate * (*p as f32 - *b);
        }
    }
}

/// Detects moving objects by subtracting a running-average background model
///
pub struct BackgroundSubtractionDetector {
    opts: BackgroundSubtractionOptions,
    reference: Option<GrayImage>,
    model: Option<BackgroundModel>,
    mask: Option<GrayImage>,
}

impl Default for BackgroundSubtractionDetector {
    fn default() -> Self {
        Self::new(BackgroundSubtractionOptions::default())
    }
}

impl BackgroundSubtractionDetector {
    /// The model is seeded from the first processed frame
    ///
    pub fn new(opts: BackgroundSubtractionOptions) -> Self {
        assert!(
            (0.0..=1.0).contains(&opts.learning_rate),
            "Learning rate must lay within [0.0, 1.0]"
        );
        if let Some(sigma) = opts.blur_sigma {
            assert!(sigma > 0.0, "Blur sigma must be positive");
        }
        Self {
            opts,
            reference: None,
            model: None,
            mask: None,
        }
    }

    /// The model is seeded from the known empty scene, so objects are detected from the first frame
    ///
    /// # Parameters
    /// * `opts` - detector options
    /// * `background` - grayscale view of the empty scene, preprocessed like frames are
    ///
    pub fn with_reference(opts: BackgroundSubtractionOptions, background: &GrayImage) -> Self {
        let mut detector = Self::new(opts);
        detector.reference = Some(match opts.blur_sigma {
            Some(sigma) => imageproc::filter::gaussian_blur_f32(background, sigma),
            None => background.clone(),
        });
        detector
    }

    pub fn options(&self) -> &BackgroundSubtractionOptions {
        &self.opts
    }

    fn seed(&self, gray: &GrayImage) -> BackgroundModel {
        match &self.reference {
            Some(reference) if reference.dimensions() == gray.dimensions() => {
                debug!("Background model is seeded from the reference");
                BackgroundModel::seed(reference)
            }
            Some(reference) => {
                warn!(
                    "Reference background {:?} does not fit frames {:?}, seeding from the frame",
                    reference.dimensions(),
                    gray.dimensions()
                );
                BackgroundModel::seed(gray)
            }
            None => {
                debug!("Background model is seeded from the frame");
                BackgroundModel::seed(gray)
            }
        }
    }
}

impl Detector for BackgroundSubtractionDetector {
    fn name(&self) -> &str {
        "background-subtraction"
    }

    fn apply(&mut self, frame: &Frame) -> anyhow::Result<Vec<BoundingBox>> {
        anyhow::ensure!(
            frame.width() > 0 && frame.height() > 0,
            "Frame {} is empty",
            frame.index()
        );
        let gray = preprocess(frame, self.opts.blur_sigma);

        let mut model = match self.model.take() {
            Some(model) if model.dimensions() == gray.dimensions() => model,
            stale => {
                if let Some(stale) = stale {
                    warn!(
                        "Frame size changed from {:?} to {:?}, background model is reseeded",
                        stale.dimensions(),
                        gray.dimensions()
                    );
                }
                self.seed(&gray)
            }
        };

        let mask = difference_mask(&gray, &model.pixels, self.opts.threshold);
        model.learn(&gray, self.opts.learning_rate);
        self.model = Some(model);

        let mask = dilate(mask, self.opts.dilate_radius);
        let boxes = blobs::bounding_boxes(&mask, &self.opts.detector);
        self.mask = Some(mask);
        Ok(boxes)
    }

    fn reset(&mut self) {
        self.model = None;
        self.mask = None;
    }

    fn filtered_frame(&self) -> Option<&GrayImage> {
        self.mask.as_ref()
    }
}
