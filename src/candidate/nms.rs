//! Greedy non-maximum suppression over bounding boxes.

use crate::candidate::detection::{sort_detections_desc, Detection};
use crate::trace::trace_span;

/// Which candidates a selected box is allowed to suppress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SuppressionMode {
    /// Any overlapping box is suppressed regardless of class.
    #[default]
    CrossClass,
    /// Only boxes of the same class are suppressed.
    PerClass,
}

/// Applies greedy IoU non-maximum suppression.
///
/// Candidates are sorted by descending score and kept unless their IoU with an
/// already kept box exceeds `iou_threshold`. Selection stops once `max_boxes`
/// detections are kept.
pub fn nms_boxes(
    candidates: &mut [Detection],
    iou_threshold: f32,
    max_boxes: usize,
    mode: SuppressionMode,
) -> Vec<Detection> {
    let _span = trace_span!("nms", candidates = candidates.len()).entered();
    sort_detections_desc(candidates);
    let mut kept: Vec<Detection> = Vec::with_capacity(max_boxes.min(candidates.len()));
    if max_boxes == 0 {
        return kept;
    }

    'outer: for cand in candidates.iter().copied() {
        for kept_det in kept.iter() {
            if mode == SuppressionMode::PerClass && kept_det.class_index != cand.class_index {
                continue;
            }
            if kept_det.rect.iou(&cand.rect) > iou_threshold {
                continue 'outer;
            }
        }
        kept.push(cand);
        if kept.len() == max_boxes {
            break;
        }
    }

    kept
}
