use motion_tracker::examples::BoxGen;
use motion_tracker::trackers::ema::EmaTracker;
use motion_tracker::trackers::tracker_api::TrackerAPI;
use motion_tracker::utils::bbox::BoundingBox;
use std::time::{Duration, SystemTime};

fn main() {
    env_logger::init();

    let mut tracker = EmaTracker::new(0.5, Duration::from_millis(300));

    let pos_drift = 3;
    let size_drift = 1;
    let mut b1 = BoxGen::new_monotonous(BoundingBox::new(100, 100, 60, 60), pos_drift, size_drift);
    let mut b2 = BoxGen::new_monotonous(BoundingBox::new(400, 50, 80, 70), pos_drift, size_drift);

    let start = SystemTime::now();
    let mut objects = vec![];
    for i in 0..10 {
        let now = start + Duration::from_millis(100 * i);
        let detections = [b1.next().unwrap(), b2.next().unwrap()];
        objects = tracker.update(objects, &detections, now);
        for o in &objects {
            eprintln!("Frame {}: object {} at {}", i, o.id(), o.bbox());
        }
    }

    // no detections: both objects coast, then expire
    let last = start + Duration::from_millis(900);
    objects = tracker.update(objects, &[], last + Duration::from_millis(200));
    eprintln!("Coasting objects: {}", objects.len());
    objects = tracker.update(objects, &[], last + Duration::from_millis(300));
    assert!(objects.is_empty());

    for w in tracker.wasted() {
        eprintln!("Object {} removed: {:?}", w.object.id(), w.reason);
    }
}
