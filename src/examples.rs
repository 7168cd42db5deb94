use crate::detectors::Detector;
use crate::pipeline::frame::Frame;
use crate::utils::bbox::BoundingBox;
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use rand::distributions::Uniform;
use rand::prelude::ThreadRng;
use rand::Rng;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Ball centers of the 20-frame bouncing ball sequence
pub const BALL_CENTERS: [(i32, i32); 20] = [
    (222, 70),
    (222, 70),
    (222, 70),
    (222, 70),
    (222, 70),
    (222, 77),
    (222, 98),
    (222, 198),
    (222, 259),
    (222, 264),
    (222, 267),
    (222, 259),
    (222, 243),
    (222, 215),
    (222, 186),
    (221, 157),
    (222, 129),
    (222, 100),
    (222, 71),
    (222, 45),
];

pub const BALL_RADIUS: i32 = 30;
pub const BALL_FRAME_WIDTH: u32 = 320;
pub const BALL_FRAME_HEIGHT: u32 = 320;

/// Name pattern of the saved bouncing ball frames
pub const BALL_SEQUENCE_PATTERN: &str = "ball-%02d.png";

/// White ball on the black background
///
pub fn ball_frame(center: (i32, i32)) -> RgbImage {
    let mut img = RgbImage::new(BALL_FRAME_WIDTH, BALL_FRAME_HEIGHT);
    draw_filled_circle_mut(&mut img, center, BALL_RADIUS, Rgb([255, 255, 255]));
    img
}

pub fn ball_frames() -> Vec<RgbImage> {
    BALL_CENTERS.iter().map(|c| ball_frame(*c)).collect()
}

/// The empty scene of the bouncing ball sequence
///
pub fn ball_background() -> GrayImage {
    GrayImage::new(BALL_FRAME_WIDTH, BALL_FRAME_HEIGHT)
}

/// Saves the bouncing ball frames as numbered PNG files and returns the sequence pattern
///
pub fn save_ball_sequence(dir: &Path) -> anyhow::Result<PathBuf> {
    for (i, img) in ball_frames().iter().enumerate() {
        img.save(dir.join(format!("ball-{:02}.png", i)))?;
    }
    Ok(dir.join(BALL_SEQUENCE_PATTERN))
}

/// Random walk of a box in whole pixels
///
pub struct BoxGen {
    bbox: BoundingBox,
    gen: ThreadRng,
    shift: Uniform<i32>,
    resize: Uniform<i32>,
}

impl BoxGen {
    /// The box moves by up to `pos_drift` pixels in any direction and changes
    /// its dimensions by up to `size_drift` pixels every step
    ///
    pub fn new(start: BoundingBox, pos_drift: i32, size_drift: i32) -> Self {
        assert!(pos_drift >= 0, "Position drift must be non-negative");
        Self::with_shift(start, Uniform::new_inclusive(-pos_drift, pos_drift), size_drift)
    }

    /// The box only moves right and down
    ///
    pub fn new_monotonous(start: BoundingBox, pos_drift: i32, size_drift: i32) -> Self {
        assert!(pos_drift >= 0, "Position drift must be non-negative");
        Self::with_shift(start, Uniform::new_inclusive(0, pos_drift), size_drift)
    }

    fn with_shift(start: BoundingBox, shift: Uniform<i32>, size_drift: i32) -> Self {
        assert!(size_drift >= 0, "Size drift must be non-negative");
        Self {
            bbox: start,
            gen: rand::thread_rng(),
            shift,
            resize: Uniform::new_inclusive(-size_drift, size_drift),
        }
    }
}

impl Iterator for BoxGen {
    type Item = BoundingBox;

    fn next(&mut self) -> Option<Self::Item> {
        let b = self.bbox;
        let (dx, dy) = (self.gen.sample(self.shift), self.gen.sample(self.shift));
        let width = b.width().saturating_add(self.gen.sample(self.resize)).max(1);
        let height = b.height().saturating_add(self.gen.sample(self.resize)).max(1);

        self.bbox = BoundingBox::new(
            b.x().saturating_add(dx),
            b.y().saturating_add(dy),
            width,
            height,
        );
        Some(self.bbox)
    }
}

/// Detector replaying prepared results; an exhausted script yields no detections
///
#[derive(Default)]
pub struct ScriptedDetector {
    script: VecDeque<anyhow::Result<Vec<BoundingBox>>>,
    resets: Arc<AtomicUsize>,
}

impl ScriptedDetector {
    pub fn new(script: Vec<anyhow::Result<Vec<BoundingBox>>>) -> Self {
        Self {
            script: script.into(),
            ..Default::default()
        }
    }

    /// Counter of `reset` calls, readable after the detector is boxed
    ///
    pub fn resets(&self) -> Arc<AtomicUsize> {
        self.resets.clone()
    }
}

impl Detector for ScriptedDetector {
    fn name(&self) -> &str {
        "scripted"
    }

    fn apply(&mut self, _frame: &Frame) -> anyhow::Result<Vec<BoundingBox>> {
        self.script.pop_front().unwrap_or_else(|| Ok(vec![]))
    }

    fn reset(&mut self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}
