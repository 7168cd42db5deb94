use crate::track::{ObjectId, TrackedObject};
use crate::trackers::tracker_api::TrackerAPI;
use crate::trackers::{WasteReason, WastedObject, DEFAULT_WASTED_HISTORY};
use crate::utils::bbox::BoundingBox;
use log::{debug, trace};
use std::collections::VecDeque;
use std::time::{Duration, SystemTime};

/// Default weight of a new detection when blended into the tracked box
pub const DEFAULT_BLEND_WEIGHT: f32 = 0.5;

/// Default time an unmatched object survives
pub const DEFAULT_OBJECT_TTL: Duration = Duration::from_secs(1);

/// Decides which object wins when two matched objects end up on top of each other
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OcclusionPriority {
    /// Older objects (earlier `first_seen`) win; ties keep the collection order
    #[default]
    Age,
    /// The collection order is used as is
    InsertionOrder,
}

#[derive(Debug, Clone)]
pub struct EmaTrackerOptions {
    /// Weight of the matched detection in `[0.0, 1.0]`
    pub blend_weight: f32,
    /// How long an object survives without matching detections
    pub ttl: Duration,
    pub priority: OcclusionPriority,
    /// How many removed objects are kept until fetched
    pub wasted_history: usize,
}

impl Default for EmaTrackerOptions {
    fn default() -> Self {
        Self {
            blend_weight: DEFAULT_BLEND_WEIGHT,
            ttl: DEFAULT_OBJECT_TTL,
            priority: OcclusionPriority::default(),
            wasted_history: DEFAULT_WASTED_HISTORY,
        }
    }
}

/// Tracker that matches detections to objects by center containment and smooths boxes with EMA
///
pub struct EmaTracker {
    opts: EmaTrackerOptions,
    wasted: VecDeque<WastedObject>,
    track_id: ObjectId,
}

impl Default for EmaTracker {
    fn default() -> Self {
        Self::with_options(EmaTrackerOptions::default())
    }
}

impl EmaTracker {
    /// Creates new tracker
    ///
    /// # Parameters
    /// * `blend_weight` - `1.0` snaps the tracked box to the detection, `0.0` freezes it
    /// * `ttl` - how long an object survives without matching detections
    ///
    pub fn new(blend_weight: f32, ttl: Duration) -> Self {
        Self::with_options(EmaTrackerOptions {
            blend_weight,
            ttl,
            ..Default::default()
        })
    }

    pub fn with_options(opts: EmaTrackerOptions) -> Self {
        assert!(
            (0.0..=1.0).contains(&opts.blend_weight),
            "Blend weight must lay within [0.0, 1.0]"
        );
        Self {
            wasted: VecDeque::with_capacity(opts.wasted_history.min(DEFAULT_WASTED_HISTORY)),
            opts,
            track_id: 0,
        }
    }

    pub fn options(&self) -> &EmaTrackerOptions {
        &self.opts
    }

    fn gen_track_id(&mut self) -> ObjectId {
        self.track_id += 1;
        self.track_id
    }

    fn waste(&mut self, object: TrackedObject, reason: WasteReason, at: SystemTime) {
        if self.opts.wasted_history == 0 {
            return;
        }
        if self.wasted.len() == self.opts.wasted_history {
            self.wasted.pop_front();
        }
        self.wasted.push_back(WastedObject { object, reason, at });
    }

    /// Union of every detection whose center relation holds with the object box
    ///
    fn matched_detection(bbox: &BoundingBox, detections: &[BoundingBox]) -> Option<BoundingBox> {
        detections
            .iter()
            .filter(|d| BoundingBox::center_overlap(d, bbox))
            .copied()
            .reduce(|acc, d| acc.union(&d))
    }
}

impl TrackerAPI for EmaTracker {
    fn name(&self) -> &str {
        "ema"
    }

    fn update(
        &mut self,
        mut objects: Vec<TrackedObject>,
        detections: &[BoundingBox],
        now: SystemTime,
    ) -> Vec<TrackedObject> {
        if self.opts.priority == OcclusionPriority::Age {
            objects.sort_by_key(|o| o.first_seen());
        }

        let mut kept: Vec<TrackedObject> = Vec::with_capacity(objects.len() + detections.len());

        for mut obj in objects {
            match Self::matched_detection(obj.bbox(), detections) {
                Some(matched) => {
                    obj.set_bbox(obj.bbox().blend(&matched, self.opts.blend_weight));
                    let host = kept
                        .iter()
                        .find(|k| BoundingBox::center_overlap(obj.bbox(), k.bbox()))
                        .map(|k| k.id());
                    if let Some(into) = host {
                        debug!("Object {} is merged into {}", obj.id(), into);
                        self.waste(obj, WasteReason::Merged { into }, now);
                    } else {
                        obj.seen(now);
                        kept.push(obj);
                    }
                }
                None if obj.idle(now) < self.opts.ttl => kept.push(obj),
                None => {
                    debug!(
                        "Object {} expired after {:?} without detections",
                        obj.id(),
                        obj.idle(now)
                    );
                    self.waste(obj, WasteReason::Expired, now);
                }
            }
        }

        for d in detections {
            if !kept.iter().any(|k| BoundingBox::overlap(d, k.bbox())) {
                let id = self.gen_track_id();
                debug!("New object {} at {}", id, d);
                kept.push(TrackedObject::new(id, *d, now));
            }
        }

        trace!(
            "Tracked objects: {}, detections: {}",
            kept.len(),
            detections.len()
        );
        kept
    }

    fn wasted(&mut self) -> Vec<WastedObject> {
        self.wasted.drain(..).collect()
    }
}
