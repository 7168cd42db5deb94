use crate::track::{ObjectId, TrackedObject};
use std::time::SystemTime;

/// Frame-to-frame association with exponential smoothing of boxes
///
pub mod ema;

/// Trait every tracker variant implements
pub mod tracker_api;

/// Default amount of removed objects kept until they are fetched with `wasted()`
pub const DEFAULT_WASTED_HISTORY: usize = 256;

/// Why the object left the tracked collection
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WasteReason {
    /// Unmatched for at least the time-to-live window
    Expired,
    /// After blending, its center fell inside a higher-priority object
    Merged { into: ObjectId },
}

/// Object removed from the tracked collection
///
#[derive(Debug, Clone)]
pub struct WastedObject {
    /// the object as it was when removed
    ///
    pub object: TrackedObject,
    /// removal cause
    ///
    pub reason: WasteReason,
    /// the update time the object was removed at
    ///
    pub at: SystemTime,
}
