//! Low-level building blocks for custom decoding pipelines.
//!
//! Most users should prefer [`Decoder`](crate::Decoder) and
//! [`FramePipeline`](crate::FramePipeline); these are the pieces they are
//! built from.

pub use crate::candidate::argmax::best_class;
pub use crate::candidate::detection::Detection;
pub use crate::candidate::nms::{nms_boxes, SuppressionMode};
pub use crate::geometry::Rect;
pub use crate::tensor::TensorView;
