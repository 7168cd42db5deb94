use crate::detectors::{blobs, difference_mask, dilate, preprocess, Detector, DetectorOptions};
use crate::pipeline::frame::Frame;
use crate::utils::bbox::BoundingBox;
use image::GrayImage;
use log::warn;

pub const DEFAULT_AVERAGE_WEIGHT: f32 = 0.5;
pub const DEFAULT_THRESHOLD: f32 = 10.0;
pub const DEFAULT_BLUR_SIGMA: f32 = 6.5;
pub const DEFAULT_DILATE_RADIUS: u8 = 2;

#[derive(Debug, Clone, Copy)]
pub struct FrameDifferenceOptions {
    pub detector: DetectorOptions,
    /// Weight of the accumulated average, `[0.0, 1.0)`
    pub weight: f32,
    pub threshold: f32,
    pub blur_sigma: Option<f32>,
    pub dilate_radius: u8,
}

impl Default for FrameDifferenceOptions {
    fn default() -> Self {
        Self {
            detector: DetectorOptions::default(),
            weight: DEFAULT_AVERAGE_WEIGHT,
            threshold: DEFAULT_THRESHOLD,
            blur_sigma: Some(DEFAULT_BLUR_SIGMA),
            dilate_radius: DEFAULT_DILATE_RADIUS,
        }
    }
}

/// Detects motion as the difference between a frame and the moving average of the previous ones.
///
/// The average is updated with the frame before the difference is taken:
/// `avg = weight * avg + (1 - weight) * gray`.
///
pub struct FrameDifferenceDetector {
    opts: FrameDifferenceOptions,
    average: Option<(u32, u32, Vec<f32>)>,
    mask: Option<GrayImage>,
}

impl Default for FrameDifferenceDetector {
    fn default() -> Self {
        Self::new(FrameDifferenceOptions::default())
    }
}

impl FrameDifferenceDetector {
    pub fn new(opts: FrameDifferenceOptions) -> Self {
        assert!(
            (0.0..1.0).contains(&opts.weight),
            "Average weight must lay within [0.0, 1.0)"
        );
        if let Some(sigma) = opts.blur_sigma {
            assert!(sigma > 0.0, "Blur sigma must be positive");
        }
        Self {
            opts,
            average: None,
            mask: None,
        }
    }

    pub fn options(&self) -> &FrameDifferenceOptions {
        &self.opts
    }
}

impl Detector for FrameDifferenceDetector {
    fn name(&self) -> &str {
        "frame-difference"
    }

    fn apply(&mut self, frame: &Frame) -> anyhow::Result<Vec<BoundingBox>> {
        anyhow::ensure!(
            frame.width() > 0 && frame.height() > 0,
            "Frame {} is empty",
            frame.index()
        );
        let gray = preprocess(frame, self.opts.blur_sigma);
        let dims = gray.dimensions();
        let w = self.opts.weight;

        let average = match self.average.take() {
            Some((width, height, mut avg)) if (width, height) == dims => {
                for (a, p) in avg.iter_mut().zip(gray.iter()) {
                    *a = w * *a + (1.0 - w) * *p as f32;
                }
                avg
            }
            stale => {
                if let Some((width, height, _)) = stale {
                    warn!(
                        "Frame size changed from {:?} to {:?}, average is restarted",
                        (width, height),
                        dims
                    );
                }
                gray.iter().map(|p| *p as f32).collect()
            }
        };

        let mask = dilate(
            difference_mask(&gray, &average, self.opts.threshold),
            self.opts.dilate_radius,
        );
        self.average = Some((dims.0, dims.1, average));

        let boxes = blobs::bounding_boxes(&mask, &self.opts.detector);
        self.mask = Some(mask);
        Ok(boxes)
    }

    fn reset(&mut self) {
        self.average = None;
        self.mask = None;
    }

    fn filtered_frame(&self) -> Option<&GrayImage> {
        self.mask.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use crate::detectors::frame_difference::{FrameDifferenceDetector, FrameDifferenceOptions};
    use crate::detectors::Detector;
    use crate::pipeline::frame::Frame;
    use crate::utils::bbox::BoundingBox;
    use image::{Rgb, RgbImage};

    fn scene(x: u32, y: u32) -> Frame {
        let mut img = RgbImage::new(320, 240);
        for yy in y..y + 60 {
            for xx in x..x + 60 {
                img.put_pixel(xx, yy, Rgb([200, 200, 200]));
            }
        }
        Frame::new(0, img)
    }

    fn sharp() -> FrameDifferenceOptions {
        FrameDifferenceOptions {
            blur_sigma: None,
            dilate_radius: 0,
            ..Default::default()
        }
    }

    #[test]
    fn first_frame_has_no_motion() {
        let mut d = FrameDifferenceDetector::default();
        assert!(d.apply(&scene(10, 10)).unwrap().is_empty());
        assert!(d.apply(&scene(10, 10)).unwrap().is_empty());
    }

    #[test]
    fn moved_object_is_detected() {
        let mut d = FrameDifferenceDetector::new(sharp());
        d.apply(&scene(10, 10)).unwrap();
        let boxes = d.apply(&scene(200, 100)).unwrap();
        assert_eq!(
            boxes,
            vec![
                BoundingBox::new(10, 10, 60, 60),
                BoundingBox::new(200, 100, 60, 60),
            ]
        );
    }

    #[test]
    fn motion_fades_when_scene_settles() {
        let mut d = FrameDifferenceDetector::new(sharp());
        d.apply(&scene(10, 10)).unwrap();
        assert_eq!(d.apply(&scene(200, 100)).unwrap().len(), 2);
        // the difference halves with every static frame: 100, 50, 25, 12.5, 6.25
        for _ in 0..3 {
            assert_eq!(d.apply(&scene(200, 100)).unwrap().len(), 2);
        }
        assert!(d.apply(&scene(200, 100)).unwrap().is_empty());
    }

    #[test]
    fn reset_clears_average() {
        let mut d = FrameDifferenceDetector::new(sharp());
        d.apply(&scene(10, 10)).unwrap();
        d.reset();
        assert!(d.filtered_frame().is_none());
        assert!(d.apply(&scene(200, 100)).unwrap().is_empty());
        assert!(d.filtered_frame().is_some());
    }

    #[test]
    #[should_panic]
    fn invalid_weight() {
        FrameDifferenceDetector::new(FrameDifferenceOptions {
            weight: 1.0,
            ..Default::default()
        });
    }
}
