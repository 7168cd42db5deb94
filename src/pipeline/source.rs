use crate::pipeline::frame::Frame;
use crate::pipeline::reader::{self, FrameReader};
use crate::pipeline::StopSignal;
use crate::Errors;
use crossbeam::channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use log::{debug, error, info, trace, warn};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default amount of frames buffered between the producer and the consumer
pub const DEFAULT_QUEUE_CAPACITY: usize = 30;

/// How often a blocked producer checks the stop signal
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

type FrameResult = Result<Frame, Errors>;

/// What the producer does when a frame cannot be read.
///
/// Source exhaustion is never retried.
///
#[derive(Debug, Clone)]
pub struct RestartPolicy {
    /// Consecutive failed reads tolerated before the failure becomes fatal
    pub max_restarts: usize,
    /// Delay before the first restart, doubled for every next attempt
    pub backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            max_restarts: 0,
            backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RestartPolicy {
    /// The first read failure stops the producer
    ///
    pub fn never() -> Self {
        Self::default()
    }

    pub fn with_backoff(max_restarts: usize, backoff: Duration) -> Self {
        Self {
            max_restarts,
            backoff,
            ..Default::default()
        }
    }

    /// Delay before the restart `attempt` (counted from 0)
    ///
    pub fn delay(&self, attempt: usize) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(31) as u32);
        self.backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

#[derive(Debug, Clone)]
pub struct FrameSourceOptions {
    /// Queue capacity, the producer blocks when the queue is full
    pub capacity: usize,
    /// Maximum rate of enqueued frames; frames read in between are skipped
    pub fps: Option<f64>,
    pub restart: RestartPolicy,
}

impl Default for FrameSourceOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            fps: None,
            restart: RestartPolicy::default(),
        }
    }
}

/// Capture source with a dedicated producer thread delivering frames through a bounded queue
///
pub struct FrameSource {
    receiver: Receiver<FrameResult>,
    stop: StopSignal,
    producer: Option<JoinHandle<()>>,
    description: String,
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

impl FrameSource {
    /// Opens the source identifier (see [`reader::open`]) and starts the producer
    ///
    pub fn open(source: &str, opts: FrameSourceOptions) -> Result<Self, Errors> {
        let reader = reader::open(source)?;
        Ok(Self::spawn(reader, opts))
    }

    pub fn spawn<R: FrameReader + 'static>(reader: R, opts: FrameSourceOptions) -> Self {
        Self::spawn_with_stop(reader, opts, StopSignal::new())
    }

    /// Starts the producer observing an externally owned stop signal
    ///
    pub fn spawn_with_stop<R: FrameReader + 'static>(
        reader: R,
        opts: FrameSourceOptions,
        stop: StopSignal,
    ) -> Self {
        assert!(opts.capacity > 0, "Queue capacity must be positive");
        if let Some(fps) = opts.fps {
            assert!(fps > 0.0 && fps.is_finite(), "Frame rate must be positive");
        }

        let description = reader.describe();
        info!("Opening frame source: {}", description);

        let (tx, rx) = crossbeam::channel::bounded(opts.capacity);
        let thread_stop = stop.clone();
        let producer = thread::Builder::new()
            .name("frame-source".to_string())
            .spawn(move || producer_loop(reader, tx, thread_stop, opts))
            .expect("Frame source thread must start");

        Self {
            receiver: rx,
            stop,
            producer: Some(producer),
            description,
        }
    }

    /// Waits for the next frame.
    ///
    /// # Errors
    /// * [`Errors::SourceStalled`] - no frame arrived within `timeout`;
    /// * the read failure or [`Errors::SourceExhausted`] reported by the producer;
    /// * [`Errors::SourceClosed`] - the producer is gone and the queue is drained.
    ///
    pub fn get(&self, timeout: Duration) -> Result<Frame, Errors> {
        match self.receiver.recv_timeout(timeout) {
            Ok(res) => res,
            Err(RecvTimeoutError::Timeout) => Err(Errors::SourceStalled(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(Errors::SourceClosed),
        }
    }

    /// Frames waiting in the queue
    ///
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    pub fn describe(&self) -> &str {
        &self.description
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Signals the producer to stop and waits for it
    ///
    pub fn stop(&mut self) {
        self.stop.stop();
        if let Some(producer) = self.producer.take() {
            if producer.join().is_err() {
                warn!("Frame source producer panicked: {}", self.description);
            } else {
                info!("Frame source closed: {}", self.description);
            }
        }
    }
}

fn producer_loop<R: FrameReader>(
    mut reader: R,
    tx: Sender<FrameResult>,
    stop: StopSignal,
    opts: FrameSourceOptions,
) {
    let interval = opts.fps.map(|fps| Duration::from_secs_f64(1.0 / fps));
    let mut next_enqueue: Option<Instant> = None;
    let mut index: u64 = 0;
    let mut attempt: usize = 0;

    while !stop.is_stopped() {
        let image = match reader.read() {
            Ok(image) => {
                attempt = 0;
                image
            }
            Err(Errors::SourceExhausted) => {
                info!(
                    "Frame source {} is exhausted after {} frames",
                    reader.describe(),
                    index
                );
                enqueue(&tx, Err(Errors::SourceExhausted), &stop);
                break;
            }
            Err(e) if attempt < opts.restart.max_restarts => {
                let delay = opts.restart.delay(attempt);
                attempt += 1;
                warn!(
                    "Frame read failed: {}. Restarting the source in {:?} (attempt {}/{})",
                    e, delay, attempt, opts.restart.max_restarts
                );
                if !sleep_unless_stopped(delay, &stop) {
                    break;
                }
                if let Err(e) = reader.reopen() {
                    warn!("Unable to reopen the frame source: {}", e);
                }
                continue;
            }
            Err(e) => {
                error!("Frame source {} failed: {}", reader.describe(), e);
                enqueue(&tx, Err(e), &stop);
                break;
            }
        };

        if matches!(next_enqueue, Some(next) if Instant::now() < next) {
            trace!("Frame {} is skipped by the rate limit", index);
            index += 1;
            continue;
        }

        let frame = Frame::new(index, image);
        index += 1;
        if !enqueue(&tx, Ok(frame), &stop) {
            break;
        }
        // the schedule starts when the frame is actually queued
        next_enqueue = interval.map(|interval| Instant::now() + interval);
    }
    debug!("Frame source producer finished after {} frames", index);
}

/// Blocks while the queue is full. Returns `false` when stopped or when the consumer is gone.
///
fn enqueue(tx: &Sender<FrameResult>, item: FrameResult, stop: &StopSignal) -> bool {
    let mut item = item;
    loop {
        match tx.send_timeout(item, STOP_POLL_INTERVAL) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(back)) => {
                if stop.is_stopped() {
                    return false;
                }
                item = back;
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                debug!("Frame queue consumer is gone");
                return false;
            }
        }
    }
}

/// Returns `false` if the stop signal was raised while sleeping
///
fn sleep_unless_stopped(delay: Duration, stop: &StopSignal) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        if stop.is_stopped() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(STOP_POLL_INTERVAL));
    }
}
