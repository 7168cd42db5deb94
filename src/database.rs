use crate::detectors::Detector;
use crate::pipeline::frame::Frame;
use crate::track::TrackedObject;
use crate::trackers::tracker_api::TrackerAPI;
use crate::trackers::WastedObject;
use crate::utils::epoch_seconds;
use log::trace;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::SystemTime;

/// Published view of a tracked object
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectInfo {
    pub label: String,
    /// `[x, y, width, height]`
    #[serde(rename = "box")]
    pub bbox: [i32; 4],
    /// Seconds since the UNIX epoch
    pub last_seen: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotMeta {
    pub detector: String,
    pub tracker: String,
    pub updated_at: Option<f64>,
    /// Frames processed since creation
    pub frames: u64,
}

/// Owned copy of the collection taken after the last update
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Keyed by the decimal object id
    pub objects: BTreeMap<String, ObjectInfo>,
    pub meta: SnapshotMeta,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Live collection of tracked objects kept up to date by the detector and the tracker
///
pub struct ObjectDatabase {
    detector: Box<dyn Detector>,
    tracker: Box<dyn TrackerAPI>,
    objects: Vec<TrackedObject>,
    updated_at: Option<SystemTime>,
    frames: u64,
}

impl ObjectDatabase {
    pub fn new(detector: Box<dyn Detector>, tracker: Box<dyn TrackerAPI>) -> Self {
        Self {
            detector,
            tracker,
            objects: Vec::new(),
            updated_at: None,
            frames: 0,
        }
    }

    /// Processes the frame at the current wall clock time
    ///
    pub fn update(&mut self, frame: &Frame) -> anyhow::Result<()> {
        self.update_at(frame, SystemTime::now())
    }

    /// Detects objects in the frame and passes the detections to the tracker.
    ///
    /// A detector error is returned as is and leaves the collection untouched.
    ///
    /// # Parameters
    /// * `frame` - the frame to process
    /// * `now` - the time the tracker treats as current
    ///
    pub fn update_at(&mut self, frame: &Frame, now: SystemTime) -> anyhow::Result<()> {
        let detections = self.detector.apply(frame)?;
        trace!(
            "Frame {}: {} detections by {}",
            frame.index(),
            detections.len(),
            self.detector.name()
        );
        let objects = std::mem::take(&mut self.objects);
        self.objects = self.tracker.update(objects, &detections, now);
        self.updated_at = Some(now);
        self.frames += 1;
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            objects: self
                .objects
                .iter()
                .map(|o| {
                    (
                        o.id().to_string(),
                        ObjectInfo {
                            label: o.label().to_string(),
                            bbox: o.bbox().as_xywh(),
                            last_seen: epoch_seconds(o.last_seen()),
                        },
                    )
                })
                .collect(),
            meta: SnapshotMeta {
                detector: self.detector.name().to_string(),
                tracker: self.tracker.name().to_string(),
                updated_at: self.updated_at.map(epoch_seconds),
                frames: self.frames,
            },
        }
    }

    pub fn objects(&self) -> &[TrackedObject] {
        &self.objects
    }

    /// Starts a new scene: the detector state and the tracked objects are dropped
    ///
    pub fn reset(&mut self) {
        self.detector.reset();
        self.objects.clear();
    }

    /// Objects removed by the tracker since the last call
    ///
    pub fn wasted(&mut self) -> Vec<WastedObject> {
        self.tracker.wasted()
    }

    pub fn detector(&self) -> &dyn Detector {
        self.detector.as_ref()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use crate::database::ObjectDatabase;
    use crate::detectors::background::{
        BackgroundSubtractionDetector, BackgroundSubtractionOptions,
    };
    use crate::examples::{
        ball_background, save_ball_sequence, ScriptedDetector, BALL_CENTERS,
    };
    use crate::pipeline::frame::Frame;
    use crate::pipeline::source::{FrameSource, FrameSourceOptions};
    use crate::trackers::ema::EmaTracker;
    use crate::trackers::WasteReason;
    use crate::utils::bbox::BoundingBox;
    use crate::Errors;
    use anyhow::anyhow;
    use image::RgbImage;
    use std::sync::atomic::Ordering;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn t0() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_000)
    }

    fn frame(index: u64) -> Frame {
        Frame::new(index, RgbImage::new(4, 4))
    }

    fn database(script: Vec<anyhow::Result<Vec<BoundingBox>>>) -> ObjectDatabase {
        ObjectDatabase::new(
            Box::new(ScriptedDetector::new(script)),
            Box::new(EmaTracker::new(0.5, Duration::from_secs(1))),
        )
    }

    #[test]
    fn empty_snapshot() {
        let db = database(vec![]);
        let s = db.snapshot();
        assert!(s.is_empty());
        assert_eq!(s.meta.detector, "scripted");
        assert_eq!(s.meta.tracker, "ema");
        assert_eq!(s.meta.updated_at, None);
        assert_eq!(s.meta.frames, 0);
    }

    #[test]
    fn detector_error_keeps_collection() {
        let mut db = database(vec![
            Ok(vec![BoundingBox::new(10, 10, 50, 50)]),
            Err(anyhow!("camera glitch")),
        ]);
        db.update_at(&frame(0), t0()).unwrap();
        let before = db.snapshot();

        let err = db.update_at(&frame(1), t0() + Duration::from_millis(100));
        assert_eq!(err.unwrap_err().to_string(), "camera glitch");
        assert_eq!(db.snapshot(), before);
        assert_eq!(db.frames(), 1);
    }

    #[test]
    fn typed_detector_error_is_preserved() {
        let mut db = database(vec![Err(Errors::FrameRead {
            index: 7,
            reason: "broken".to_string(),
        }
        .into())]);
        let err = db.update(&frame(0)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Errors>(),
            Some(Errors::FrameRead { index: 7, .. })
        ));
    }

    #[test]
    fn snapshot_shape() {
        let mut db = database(vec![Ok(vec![BoundingBox::new(10, 20, 30, 40)])]);
        db.update_at(&frame(0), t0()).unwrap();

        let s = db.snapshot();
        assert_eq!(s.len(), 1);
        let info = &s.objects["1"];
        assert_eq!(info.label, "object");
        assert_eq!(info.bbox, [10, 20, 30, 40]);
        assert_eq!(info.last_seen, 1000.0);

        let json: serde_json::Value = serde_json::from_str(&s.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "objects": {
                    "1": {"label": "object", "box": [10, 20, 30, 40], "last_seen": 1000.0}
                },
                "meta": {"detector": "scripted", "tracker": "ema", "updated_at": 1000.0, "frames": 1}
            })
        );
    }

    #[test]
    fn reset_drops_objects() {
        let detector = ScriptedDetector::new(vec![
            Ok(vec![BoundingBox::new(0, 0, 10, 10)]),
            Ok(vec![BoundingBox::new(100, 100, 10, 10)]),
        ]);
        let resets = detector.resets();
        let mut db = ObjectDatabase::new(
            Box::new(detector),
            Box::new(EmaTracker::new(0.5, Duration::from_secs(1))),
        );
        db.update_at(&frame(0), t0()).unwrap();
        assert_eq!(db.objects().len(), 1);
        assert_eq!(resets.load(Ordering::SeqCst), 0);
        db.reset();
        assert_eq!(resets.load(Ordering::SeqCst), 1);
        assert!(db.objects().is_empty());
        assert!(db.wasted().is_empty());

        db.update_at(&frame(1), t0() + Duration::from_millis(10)).unwrap();
        assert_eq!(db.objects().len(), 1);
        assert_eq!(db.objects()[0].id(), 2);
    }

    #[test]
    fn wasted_passthrough() {
        let mut db = database(vec![Ok(vec![BoundingBox::new(0, 0, 10, 10)])]);
        db.update_at(&frame(0), t0()).unwrap();
        db.update_at(&frame(1), t0() + Duration::from_secs(2))
            .unwrap();
        assert!(db.snapshot().is_empty());
        let wasted = db.wasted();
        assert_eq!(wasted.len(), 1);
        assert_eq!(wasted[0].reason, WasteReason::Expired);
    }

    #[test]
    fn bouncing_ball() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        let pattern = save_ball_sequence(dir.path()).unwrap();
        let source =
            FrameSource::open(pattern.to_str().unwrap(), FrameSourceOptions::default()).unwrap();

        let mut db = ObjectDatabase::new(
            Box::new(BackgroundSubtractionDetector::with_reference(
                BackgroundSubtractionOptions::default(),
                &ball_background(),
            )),
            Box::new(EmaTracker::new(1.0, Duration::from_millis(100))),
        );

        for (i, center) in BALL_CENTERS.iter().enumerate() {
            let frame = source.get(Duration::from_secs(5)).unwrap();
            assert_eq!(frame.index(), i as u64);
            db.update_at(&frame, t0() + Duration::from_millis(100 * i as u64))
                .unwrap();

            if i >= 2 {
                let objects = db.objects();
                assert_eq!(objects.len(), 1, "frame {}", i);
                assert!(
                    objects[0].bbox().contains_point_with_margin(*center, 50),
                    "frame {}: {} does not hold {:?}",
                    i,
                    objects[0].bbox(),
                    center
                );
            }
        }
        assert!(matches!(
            source.get(Duration::from_secs(5)),
            Err(Errors::SourceExhausted)
        ));
        assert_eq!(db.snapshot().meta.frames, BALL_CENTERS.len() as u64);
    }
}
