//! Per-frame pipeline from network output to placed anchors.
//!
//! One call handles one frame: decode, pick each detection's anchor point in
//! view space, hit test it into the world, and merge the results into the
//! shared anchor set. Detections without a ground hit or with a class index
//! outside the label list are skipped; neither is an error.

use crate::aggregate::{FrameOutcome, Placement, SharedAnchorSet};
use crate::candidate::detection::Detection;
use crate::decode::{Decoder, InferenceModel};
use crate::geometry::{Point3, ScreenPoint};
use crate::pool::FrameSlot;
use crate::projection::ViewProjection;
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{ArLabelError, ArLabelResult};
use std::sync::atomic::{AtomicBool, Ordering};

/// External 2D to 3D hit test against detected world geometry.
pub trait HitTest {
    /// World point under `point`, or `None` when nothing was hit.
    fn hit_test(&self, point: ScreenPoint) -> Option<Point3>;
}

impl<F> HitTest for F
where
    F: Fn(ScreenPoint) -> Option<Point3>,
{
    fn hit_test(&self, point: ScreenPoint) -> Option<Point3> {
        self(point)
    }
}

/// What happened to one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    /// Sequence number of the frame, if it came from a pool slot.
    pub sequence: Option<u64>,
    /// Decoded detections in descending score order, for overlay rendering.
    pub detections: Vec<Detection>,
    /// Placement totals.
    pub outcome: FrameOutcome,
    /// Detections whose hit test found no world point.
    pub missed_hits: usize,
    /// Detections whose class index has no label.
    pub unknown_classes: usize,
}

/// Decoder, view geometry and class labels for one camera session.
#[derive(Debug)]
pub struct FramePipeline {
    decoder: Decoder,
    projection: ViewProjection,
    labels: Vec<String>,
    update_position: AtomicBool,
}

impl FramePipeline {
    /// Creates a pipeline that updates anchor positions by default.
    pub fn new(
        decoder: Decoder,
        projection: ViewProjection,
        labels: Vec<String>,
    ) -> ArLabelResult<Self> {
        projection.validate()?;
        if labels.is_empty() {
            return Err(ArLabelError::InvalidParameter("label list is empty"));
        }
        Ok(Self {
            decoder,
            projection,
            labels,
            update_position: AtomicBool::new(true),
        })
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn projection(&self) -> &ViewProjection {
        &self.projection
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Class name for `class_index`.
    pub fn label_for(&self, class_index: usize) -> Option<&str> {
        self.labels.get(class_index).map(String::as_str)
    }

    /// Whether placements average into existing anchors (`true`) or leave
    /// existing anchors frozen (`false`).
    pub fn update_position(&self) -> bool {
        self.update_position.load(Ordering::Relaxed)
    }

    /// Toggles position updating; takes effect for the next frame.
    pub fn set_update_position(&self, enabled: bool) {
        self.update_position.store(enabled, Ordering::Relaxed);
    }

    /// Runs the model on a pooled input buffer and places the results.
    pub fn process<M, H>(
        &self,
        model: &M,
        slot: &FrameSlot<M::Input>,
        hit_test: &H,
        anchors: &SharedAnchorSet,
    ) -> FrameReport
    where
        M: InferenceModel,
        M::Input: Sized,
        H: HitTest + ?Sized,
    {
        let _span = trace_span!("process_frame", sequence = slot.sequence()).entered();
        let detections = self.decoder.predict(model, &**slot);
        self.place_detections(Some(slot.sequence()), detections, hit_test, anchors)
    }

    /// Hit tests decoded detections and merges them into `anchors`.
    pub fn place_detections<H>(
        &self,
        sequence: Option<u64>,
        detections: Vec<Detection>,
        hit_test: &H,
        anchors: &SharedAnchorSet,
    ) -> FrameReport
    where
        H: HitTest + ?Sized,
    {
        let mut report = FrameReport {
            sequence,
            ..FrameReport::default()
        };
        let mut placements = Vec::with_capacity(detections.len());
        for det in &detections {
            let Some(class_name) = self.label_for(det.class_index) else {
                trace_warn!("unknown_class", class_index = det.class_index);
                report.unknown_classes += 1;
                continue;
            };
            let screen = self.projection.anchor_point(&det.rect);
            let Some(point) = hit_test.hit_test(screen) else {
                report.missed_hits += 1;
                continue;
            };
            placements.push(Placement {
                class_name: class_name.to_owned(),
                score: det.score,
                point,
            });
        }

        report.outcome = anchors.apply_frame(sequence, &placements, self.update_position());
        trace_event!(
            "frame_placed",
            detections = detections.len(),
            placed = placements.len(),
            missed = report.missed_hits
        );
        report.detections = detections;
        report
    }
}
