//! Single-stream motion tracking for edge devices.
//!
//! Frames are captured by a [`FrameSource`](pipeline::source::FrameSource) producer thread,
//! passed to a swappable [`Detector`](detectors::Detector) and associated across frames by the
//! [`EmaTracker`](trackers::ema::EmaTracker). The [`ObjectDatabase`](database::ObjectDatabase)
//! owns the live collection of tracked objects and produces snapshots for publishing.
//!
use std::time::Duration;
use thiserror::Error;

/// Detector capability and reference detectors
pub mod detectors;

/// Orchestration of detector and tracker, snapshots
pub mod database;

/// Fixtures and generators used by tests, benches and demos
pub mod examples;

/// Bounded frame pipeline: readers, producer and consumer loop
pub mod pipeline;

/// Commonly used types
pub mod prelude;

/// Tracked object
pub mod track;

/// Association engines
pub mod trackers;

/// Geometry and time helpers
pub mod utils;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Errors {
    #[error("Frame source is exhausted.")]
    SourceExhausted,
    #[error("Unable to read frame {index}: {reason}")]
    FrameRead { index: u64, reason: String },
    #[error("No frame received within {0:?}, the source is stalled.")]
    SourceStalled(Duration),
    #[error("Frame source is closed.")]
    SourceClosed,
    #[error("Unsupported frame source: {0}")]
    UnsupportedSource(String),
    #[error("Invalid frame sequence pattern: {0}")]
    InvalidPattern(String),
}
