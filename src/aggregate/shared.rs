//! Mutex-serialized handle to an anchor set.
//!
//! Frame workers finish out of order and the announcement query can fire at
//! any time; every read and every merge scan goes through one lock so a
//! read-then-remove pass never interleaves with another writer.

use crate::aggregate::{
    AggregatorConfig, Announcement, AnchorSet, LabelAnchor, NearbyAnchor, PlaceOutcome,
};
use crate::geometry::Point3;
use crate::trace::{trace_event, trace_span};
use crate::util::ArLabelResult;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A detection resolved to a world point, ready to be placed.
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    pub class_name: String,
    pub score: f32,
    pub point: Point3,
}

/// Totals for one frame applied to the anchor set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameOutcome {
    pub created: usize,
    pub merged: usize,
    pub frozen: usize,
    /// The whole frame was ignored as older than an applied frame.
    pub stale: bool,
}

impl FrameOutcome {
    fn record(&mut self, outcome: PlaceOutcome) {
        match outcome {
            PlaceOutcome::Created { .. } => self.created += 1,
            PlaceOutcome::Merged { .. } => self.merged += 1,
            PlaceOutcome::Frozen => self.frozen += 1,
        }
    }
}

/// Cloneable, thread-safe handle to one anchor set.
#[derive(Clone, Debug)]
pub struct SharedAnchorSet {
    inner: Arc<Mutex<AnchorSet>>,
}

impl SharedAnchorSet {
    /// Creates an empty shared set.
    pub fn new(cfg: AggregatorConfig) -> ArLabelResult<Self> {
        Ok(Self::from_set(AnchorSet::new(cfg)?))
    }

    /// Wraps an existing set.
    pub fn from_set(set: AnchorSet) -> Self {
        Self {
            inner: Arc::new(Mutex::new(set)),
        }
    }

    // A panicking writer leaves the set structurally valid (placement only
    // swaps whole vectors), so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, AnchorSet> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Places one detection under the lock.
    pub fn place(&self, placement: &Placement, update_position: bool) -> PlaceOutcome {
        self.lock().place(
            &placement.class_name,
            placement.score,
            placement.point,
            update_position,
        )
    }

    /// Applies all placements of one frame in a single critical section.
    ///
    /// `sequence` is the frame's sequence number when the caller tracks one;
    /// stale frames are skipped only if the set is configured to discard them.
    pub fn apply_frame(
        &self,
        sequence: Option<u64>,
        placements: &[Placement],
        update_position: bool,
    ) -> FrameOutcome {
        let _span = trace_span!("apply_frame", placements = placements.len()).entered();
        let mut set = self.lock();
        let mut outcome = FrameOutcome::default();
        if let Some(seq) = sequence {
            if !set.accept_sequence(seq) {
                trace_event!("stale_frame", sequence = seq);
                outcome.stale = true;
                return outcome;
            }
        }
        for placement in placements {
            outcome.record(set.place(
                &placement.class_name,
                placement.score,
                placement.point,
                update_position,
            ));
        }
        outcome
    }

    /// Anchors within `range` of `origin`.
    pub fn query_nearby(&self, origin: Point3, range: f64) -> Vec<NearbyAnchor> {
        self.lock().query_nearby(origin, range)
    }

    /// Nearby anchors phrased for speech.
    pub fn announce(&self, origin: Point3, range: f64) -> Vec<Announcement> {
        self.query_nearby(origin, range)
            .into_iter()
            .map(Announcement::from)
            .collect()
    }

    /// Copy of the current anchors for rendering.
    pub fn snapshot(&self) -> Vec<LabelAnchor> {
        self.lock().anchors().to_vec()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Placement, SharedAnchorSet};
    use crate::aggregate::AggregatorConfig;
    use crate::geometry::Point3;

    fn placement(point: Point3) -> Placement {
        Placement {
            class_name: "bottle".into(),
            score: 0.5,
            point,
        }
    }

    #[test]
    fn apply_frame_counts_outcomes() {
        let shared = SharedAnchorSet::new(AggregatorConfig::default()).unwrap();
        let frame = [
            placement(Point3::new(0.0, 0.0, 0.0)),
            placement(Point3::new(0.1, 0.0, 0.0)),
            placement(Point3::new(3.0, 0.0, 0.0)),
        ];
        let outcome = shared.apply_frame(Some(0), &frame, true);
        assert_eq!(outcome.created, 2);
        assert_eq!(outcome.merged, 1);
        assert_eq!(shared.len(), 2);

        let frozen = shared.apply_frame(Some(1), &frame[..1], false);
        assert_eq!(frozen.frozen, 1);
        assert_eq!(shared.len(), 2);
    }

    #[test]
    fn stale_frames_are_skipped_when_configured() {
        let shared = SharedAnchorSet::new(AggregatorConfig {
            discard_stale_frames: true,
            ..AggregatorConfig::default()
        })
        .unwrap();
        shared.apply_frame(Some(4), &[placement(Point3::default())], true);
        let outcome = shared.apply_frame(Some(2), &[placement(Point3::new(5.0, 0.0, 0.0))], true);
        assert!(outcome.stale);
        assert_eq!(shared.len(), 1);
    }
}
