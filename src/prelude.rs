use crate::detectors;
use crate::pipeline;
use crate::trackers;

pub use crate::database::{ObjectDatabase, Snapshot};
pub use crate::track::TrackedObject;
pub use crate::utils::bbox::BoundingBox;
pub use crate::Errors;

pub use detectors::background::{BackgroundSubtractionDetector, BackgroundSubtractionOptions};
pub use detectors::frame_difference::{FrameDifferenceDetector, FrameDifferenceOptions};
pub use detectors::{Detector, DetectorOptions};

pub use pipeline::consumer::{Consumer, ConsumerOptions};
pub use pipeline::frame::Frame;
pub use pipeline::reader::FrameReader;
pub use pipeline::source::{FrameSource, FrameSourceOptions, RestartPolicy};
pub use pipeline::StopSignal;

pub use trackers::ema::{EmaTracker, EmaTrackerOptions, OcclusionPriority};
pub use trackers::tracker_api::TrackerAPI;
