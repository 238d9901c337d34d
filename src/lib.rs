//! arlabel is the detection post-processing core of an AR object-labeling app.
//!
//! It turns raw object-detection output into clean per-frame boxes (arg-max
//! class selection, confidence filtering, greedy NMS) and merges repeated
//! sightings of the same object across frames into stable world-space label
//! anchors. Camera capture, inference, hit testing and rendering are
//! collaborators behind small traits. Optional features: `rayon` for a
//! parallel row scan, `tracing` for spans and events.

pub mod aggregate;
mod candidate;
pub mod decode;
pub mod geometry;
pub mod lowlevel;
pub mod pipeline;
pub mod pool;
pub mod projection;
pub mod tensor;
pub mod util;

mod trace;

pub use aggregate::{
    AggregatorConfig, Announcement, AnchorSet, FrameOutcome, LabelAnchor, LabelMatch,
    NearbyAnchor, PlaceOutcome, Placement, SharedAnchorSet,
};
pub use candidate::detection::Detection;
pub use candidate::nms::SuppressionMode;
pub use decode::{Decoder, DecoderConfig, InferenceModel, RawPrediction};
pub use geometry::{Point3, Rect, ScreenPoint};
pub use pipeline::{FramePipeline, FrameReport, HitTest};
pub use pool::{FramePool, FrameSlot};
pub use projection::{ProcessingMode, ViewProjection};
pub use tensor::{OwnedTensor, TensorView};
pub use util::{ArLabelError, ArLabelResult};
