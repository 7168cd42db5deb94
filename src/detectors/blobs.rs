use crate::detectors::DetectorOptions;
use crate::utils::bbox::BoundingBox;
use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use itertools::Itertools;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
struct Blob {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    area: i64,
}

impl Blob {
    fn new(x: i32, y: i32) -> Self {
        Self {
            left: x,
            top: y,
            right: x,
            bottom: y,
            area: 0,
        }
    }

    fn add(&mut self, x: i32, y: i32) {
        self.left = self.left.min(x);
        self.top = self.top.min(y);
        self.right = self.right.max(x);
        self.bottom = self.bottom.max(y);
        self.area += 1;
    }
}

/// Bounding boxes of the 8-connected foreground blobs of the mask.
///
/// Blobs with `area <= min_area` are discarded, the rest are ordered by area (largest first,
/// then top-left position) and capped at `max_objects`.
///
/// # Parameters
/// * `mask` - binary mask, every non-zero pixel is foreground
/// * `opts` - area filter and cap
///
pub fn bounding_boxes(mask: &GrayImage, opts: &DetectorOptions) -> Vec<BoundingBox> {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    let mut blobs: BTreeMap<u32, Blob> = BTreeMap::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0];
        if label == 0 {
            continue;
        }
        let (x, y) = (x as i32, y as i32);
        blobs.entry(label).or_insert_with(|| Blob::new(x, y)).add(x, y);
    }

    blobs
        .into_values()
        .filter(|b| b.area > opts.min_area)
        .sorted_by_key(|b| (-b.area, b.top, b.left))
        .take(opts.max_objects)
        .map(|b| BoundingBox::from_corners(b.left, b.top, b.right, b.bottom))
        .collect()
}
