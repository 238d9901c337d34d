//! Detection decoding from raw network output.
//!
//! The network is an opaque [`InferenceModel`] producing two tensors per
//! frame: `confidence[N][C]` (raw per-class scores) and `coordinates[N][4]`
//! (`x, y, width, height`). Decoding picks each row's best class, drops rows
//! under the confidence threshold, and prunes overlapping boxes with greedy
//! NMS. The decoder holds only its validated configuration and is safe to
//! share across threads.

use crate::candidate::argmax::best_class;
use crate::candidate::detection::Detection;
use crate::candidate::nms::{nms_boxes, SuppressionMode};
use crate::geometry::Rect;
use crate::tensor::{OwnedTensor, TensorView};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{ArLabelError, ArLabelResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Width in pixels of the image the network expects.
pub const INPUT_WIDTH: usize = 416;
/// Height in pixels of the image the network expects.
pub const INPUT_HEIGHT: usize = 416;
/// Default cap on detections returned per frame.
pub const MAX_BOUNDING_BOXES: usize = 10;

/// Decoder thresholds and options.
#[derive(Clone, Debug)]
pub struct DecoderConfig {
    /// Minimum arg-max confidence for a row to become a candidate.
    pub confidence_threshold: f32,
    /// Candidates whose IoU with a kept box exceeds this are suppressed.
    pub iou_threshold: f32,
    /// Maximum detections returned per frame.
    pub max_boxes: usize,
    /// Whether suppression crosses class boundaries.
    pub suppression: SuppressionMode,
    /// Scan rows in parallel (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.3,
            iou_threshold: 0.5,
            max_boxes: MAX_BOUNDING_BOXES,
            suppression: SuppressionMode::CrossClass,
            parallel: false,
        }
    }
}

impl DecoderConfig {
    /// Checks that thresholds lie in `[0, 1]` and the box cap is non-zero.
    pub fn validate(&self) -> ArLabelResult<()> {
        check_unit("confidence_threshold", self.confidence_threshold)?;
        check_unit("iou_threshold", self.iou_threshold)?;
        if self.max_boxes == 0 {
            return Err(ArLabelError::InvalidParameter("max_boxes must be at least 1"));
        }
        Ok(())
    }
}

pub(crate) fn check_unit(name: &'static str, value: f32) -> ArLabelResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ArLabelError::InvalidThreshold { name, value });
    }
    Ok(())
}

/// Raw output tensors of one inference call.
#[derive(Clone, Debug, PartialEq)]
pub struct RawPrediction {
    confidence: OwnedTensor,
    coordinates: OwnedTensor,
}

impl RawPrediction {
    /// Pairs the two output tensors, checking that their shapes agree.
    pub fn new(confidence: OwnedTensor, coordinates: OwnedTensor) -> ArLabelResult<Self> {
        check_shapes(confidence.view(), coordinates.view())?;
        Ok(Self {
            confidence,
            coordinates,
        })
    }

    pub fn confidence(&self) -> &OwnedTensor {
        &self.confidence
    }

    pub fn coordinates(&self) -> &OwnedTensor {
        &self.coordinates
    }
}

/// Opaque detection network mapping a preprocessed input to raw tensors.
pub trait InferenceModel {
    /// Preprocessed network input, e.g. a fixed-size pixel buffer.
    type Input: ?Sized;

    /// Runs the network. Failures are reported as
    /// [`ArLabelError::InferenceUnavailable`] or any other error; the decoder
    /// treats every failure as "no detections this frame".
    fn infer(&self, input: &Self::Input) -> ArLabelResult<RawPrediction>;
}

/// Stateless detection decoder with validated configuration.
#[derive(Clone, Debug)]
pub struct Decoder {
    cfg: DecoderConfig,
}

impl Decoder {
    /// Creates a decoder, failing fast on invalid thresholds.
    pub fn new(cfg: DecoderConfig) -> ArLabelResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    /// Returns the decoder configuration.
    pub fn config(&self) -> &DecoderConfig {
        &self.cfg
    }

    /// Runs `model` and decodes its output.
    ///
    /// Any inference or decoding failure yields an empty list; missing
    /// detections are never fatal for a frame.
    pub fn predict<M: InferenceModel>(&self, model: &M, input: &M::Input) -> Vec<Detection> {
        let raw = match model.infer(input) {
            Ok(raw) => raw,
            Err(err) => {
                let error = err.to_string();
                trace_warn!("inference_unavailable", error = error.as_str());
                return Vec::new();
            }
        };
        match self.decode(raw.confidence.view(), raw.coordinates.view()) {
            Ok(detections) => detections,
            Err(err) => {
                let error = err.to_string();
                trace_warn!("decode_failed", error = error.as_str());
                Vec::new()
            }
        }
    }

    /// Decodes raw tensors into a filtered, de-overlapped detection list.
    ///
    /// Output is ordered by descending score.
    pub fn decode(
        &self,
        confidence: TensorView<'_, f32>,
        coordinates: TensorView<'_, f32>,
    ) -> ArLabelResult<Vec<Detection>> {
        check_shapes(confidence, coordinates)?;
        let _span = trace_span!(
            "decode",
            rows = confidence.rows(),
            classes = confidence.cols()
        )
        .entered();

        let mut candidates = self.collect_candidates(confidence, coordinates);
        trace_event!("decode_candidates", count = candidates.len());

        let kept = nms_boxes(
            &mut candidates,
            self.cfg.iou_threshold,
            self.cfg.max_boxes,
            self.cfg.suppression,
        );
        trace_event!("decode_kept", count = kept.len());
        Ok(kept)
    }

    fn collect_candidates(
        &self,
        confidence: TensorView<'_, f32>,
        coordinates: TensorView<'_, f32>,
    ) -> Vec<Detection> {
        let rows = confidence.rows();
        let threshold = self.cfg.confidence_threshold;

        #[cfg(feature = "rayon")]
        if self.cfg.parallel {
            return (0..rows)
                .into_par_iter()
                .filter_map(|row| candidate_at(confidence, coordinates, row, threshold))
                .collect();
        }

        (0..rows)
            .filter_map(|row| candidate_at(confidence, coordinates, row, threshold))
            .collect()
    }
}

fn check_shapes(
    confidence: TensorView<'_, f32>,
    coordinates: TensorView<'_, f32>,
) -> ArLabelResult<()> {
    if coordinates.cols() != 4 {
        return Err(ArLabelError::InvalidCoordinateWidth {
            cols: coordinates.cols(),
        });
    }
    if confidence.rows() != coordinates.rows() {
        return Err(ArLabelError::ShapeMismatch {
            confidence_rows: confidence.rows(),
            coordinate_rows: coordinates.rows(),
        });
    }
    Ok(())
}

/// Builds the candidate for `row` if it clears the confidence threshold.
///
/// Rows with non-finite coordinates are dropped; negative extents are clamped
/// to zero so every rect keeps a non-negative size.
fn candidate_at(
    confidence: TensorView<'_, f32>,
    coordinates: TensorView<'_, f32>,
    row: usize,
    threshold: f32,
) -> Option<Detection> {
    let (class_index, score) = best_class(confidence.row(row)?);
    if score < threshold {
        return None;
    }
    let coords = coordinates.row(row)?;
    if !coords.iter().all(|v| v.is_finite()) {
        trace_warn!("non_finite_box", row = row);
        return None;
    }
    let rect = Rect {
        x: coords[0],
        y: coords[1],
        width: coords[2].max(0.0),
        height: coords[3].max(0.0),
    };
    Some(Detection {
        class_index,
        score,
        rect,
        candidate: row,
    })
}
