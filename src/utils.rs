/// Bounding boxes
pub mod bbox;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds since the unix epoch, the timestamp format used in published snapshots
///
#[inline]
pub fn epoch_seconds(t: SystemTime) -> f64 {
    t.duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs_f64()
}

/// Time passed from `earlier` to `now`; a clock that went backwards yields zero
///
#[inline]
pub fn elapsed_since(earlier: SystemTime, now: SystemTime) -> Duration {
    now.duration_since(earlier).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use crate::utils::{elapsed_since, epoch_seconds};
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn time_helpers() {
        let t = UNIX_EPOCH + Duration::from_millis(1500);
        assert_eq!(epoch_seconds(t), 1.5);
        assert_eq!(elapsed_since(t, t + Duration::from_secs(2)), Duration::from_secs(2));
        assert_eq!(elapsed_since(t + Duration::from_secs(2), t), Duration::ZERO);
    }
}
