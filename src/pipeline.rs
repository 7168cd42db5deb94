use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Consumer loop: detect, track and publish snapshots
pub mod consumer;

/// Captured frame
pub mod frame;

/// Frame decoding backends the producer pulls from
pub mod reader;

/// Producer thread feeding the bounded frame queue
pub mod source;

/// Cooperative cancellation flag shared by the producer and the consumer
///
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use crate::pipeline::StopSignal;

    #[test]
    fn stop_signal_is_shared() {
        let s = StopSignal::new();
        let c = s.clone();
        assert!(!c.is_stopped());
        s.stop();
        assert!(c.is_stopped());
    }
}
