use crate::utils::bbox::BoundingBox;
use crate::utils::elapsed_since;
use std::time::{Duration, SystemTime};

/// Identity of a tracked object, stable for the object's lifetime
pub type ObjectId = u64;

/// Label assigned to objects found by class-agnostic motion detectors
pub const DEFAULT_LABEL: &str = "object";

/// Object followed by a tracker across frames
///
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedObject {
    id: ObjectId,
    label: String,
    bbox: BoundingBox,
    first_seen: SystemTime,
    last_seen: SystemTime,
}

impl TrackedObject {
    /// Creates the object for a detection observed at `now`
    ///
    pub fn new(id: ObjectId, bbox: BoundingBox, now: SystemTime) -> Self {
        Self {
            id,
            label: DEFAULT_LABEL.to_string(),
            bbox,
            first_seen: now,
            last_seen: now,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn first_seen(&self) -> SystemTime {
        self.first_seen
    }

    pub fn last_seen(&self) -> SystemTime {
        self.last_seen
    }

    /// How long the object stays without a matching detection
    ///
    pub fn idle(&self, now: SystemTime) -> Duration {
        elapsed_since(self.last_seen, now)
    }

    pub(crate) fn set_bbox(&mut self, bbox: BoundingBox) {
        self.bbox = bbox;
    }

    pub(crate) fn seen(&mut self, now: SystemTime) {
        if now > self.last_seen {
            self.last_seen = now;
        }
    }
}
