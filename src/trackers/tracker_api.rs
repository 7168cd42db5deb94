use crate::track::TrackedObject;
use crate::trackers::WastedObject;
use crate::utils::bbox::BoundingBox;
use std::time::SystemTime;

pub trait TrackerAPI: Send {
    /// Variant name reported in snapshot metadata
    ///
    fn name(&self) -> &str;

    /// Evolves the tracked collection with the detections of a new frame
    ///
    /// # Parameters
    /// * `objects` - current collection, the order defines occlusion priority when the tracker does not impose its own
    /// * `detections` - boxes found by the detector in the frame
    /// * `now` - time of the update
    ///
    fn update(
        &mut self,
        objects: Vec<TrackedObject>,
        detections: &[BoundingBox],
        now: SystemTime,
    ) -> Vec<TrackedObject>;

    /// Fetch and remove the objects dropped since the last call
    ///
    fn wasted(&mut self) -> Vec<WastedObject>;

    /// Clears dropped objects
    fn clear_wasted(&mut self) {
        self.wasted();
    }
}
