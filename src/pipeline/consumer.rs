use crate::database::{ObjectDatabase, Snapshot};
use crate::pipeline::source::FrameSource;
use crate::pipeline::StopSignal;
use anyhow::Result;
use log::{debug, error, info};
use std::time::{Duration, Instant};

pub const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PUBLISH_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct ConsumerOptions {
    /// Longest wait for a frame before the source is considered stalled
    pub frame_timeout: Duration,
    /// Minimal interval between two published snapshots
    pub publish_interval: Duration,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            frame_timeout: DEFAULT_FRAME_TIMEOUT,
            publish_interval: DEFAULT_PUBLISH_INTERVAL,
        }
    }
}

/// Pulls frames from the source into the database and publishes snapshots
///
pub struct Consumer {
    source: FrameSource,
    database: ObjectDatabase,
    opts: ConsumerOptions,
}

impl Consumer {
    pub fn new(source: FrameSource, database: ObjectDatabase, opts: ConsumerOptions) -> Self {
        Self {
            source,
            database,
            opts,
        }
    }

    /// Signal shared with the producer; raising it ends [`Consumer::run`]
    ///
    pub fn stop_signal(&self) -> StopSignal {
        self.source.stop_signal()
    }

    pub fn database(&self) -> &ObjectDatabase {
        &self.database
    }

    pub fn database_mut(&mut self) -> &mut ObjectDatabase {
        &mut self.database
    }

    /// Runs until the stop signal is raised.
    ///
    /// A non-empty snapshot is handed to `publish` at most once per publish interval.
    /// Returns the number of processed frames; a stalled, exhausted or failed source and
    /// detector failures are returned as errors.
    ///
    pub fn run<F>(&mut self, mut publish: F) -> Result<u64>
    where
        F: FnMut(&Snapshot),
    {
        let stop = self.source.stop_signal();
        let mut next_publish = Instant::now();
        let mut processed = 0u64;
        info!("Consuming frames from {}", self.source.describe());

        while !stop.is_stopped() {
            let frame = match self.source.get(self.opts.frame_timeout) {
                Ok(frame) => frame,
                Err(e) if stop.is_stopped() => {
                    debug!("Frame source stopped: {}", e);
                    break;
                }
                Err(e) => {
                    error!("Frame source failed after {} frames: {}", processed, e);
                    return Err(e.into());
                }
            };

            if let Err(e) = self.database.update(&frame) {
                error!("Frame {} processing failed: {}", frame.index(), e);
                return Err(e);
            }
            processed += 1;

            let now = Instant::now();
            if now >= next_publish {
                let snapshot = self.database.snapshot();
                if !snapshot.is_empty() {
                    publish(&snapshot);
                    next_publish = now + self.opts.publish_interval;
                }
            }
        }

        info!("Consumer stopped after {} frames", processed);
        Ok(processed)
    }
}
