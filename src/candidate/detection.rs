//! Per-frame detections and their ordering.

use crate::geometry::Rect;
use std::cmp::Ordering;

/// One decoded detection for a single frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    /// Arg-max class index into the label list.
    pub class_index: usize,
    /// Raw (unnormalized) confidence of that class.
    pub score: f32,
    /// Bounding box as emitted by the network.
    pub rect: Rect,
    /// Row of the raw tensor this detection came from.
    pub candidate: usize,
}

fn detection_cmp_desc(a: &Detection, b: &Detection) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.candidate.cmp(&b.candidate))
}

/// Sorts detections by descending score; equal scores keep tensor row order.
pub(crate) fn sort_detections_desc(detections: &mut [Detection]) {
    detections.sort_by(detection_cmp_desc);
}
