//! Error types for arlabel.

use thiserror::Error;

/// Result alias for arlabel operations.
pub type ArLabelResult<T> = std::result::Result<T, ArLabelError>;

/// Errors that can occur when decoding detections or aggregating anchors.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ArLabelError {
    /// A threshold that must lie in `[0, 1]` does not.
    #[error("threshold {name} = {value} is outside [0, 1]")]
    InvalidThreshold { name: &'static str, value: f32 },
    /// Any other invalid parameter.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
    /// Tensor dimensions must be non-zero.
    #[error("invalid tensor dimensions {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },
    /// Stride must be at least the number of columns.
    #[error("invalid stride {stride} for {cols} columns")]
    InvalidStride { cols: usize, stride: usize },
    /// Backing buffer is shorter than the tensor shape requires.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Owned buffer length differs from the tensor shape.
    #[error("buffer length {got} does not match shape, expected {expected}")]
    LengthMismatch { expected: usize, got: usize },
    /// Confidence and coordinate tensors describe different candidate counts.
    #[error("confidence has {confidence_rows} rows but coordinates have {coordinate_rows}")]
    ShapeMismatch {
        confidence_rows: usize,
        coordinate_rows: usize,
    },
    /// Coordinate rows must carry exactly `x, y, width, height`.
    #[error("coordinate tensor must have 4 columns, got {cols}")]
    InvalidCoordinateWidth { cols: usize },
    /// Rectangle with a negative width or height.
    #[error("negative rectangle extent {width}x{height}")]
    NegativeExtent { width: f32, height: f32 },
    /// The opaque inference call failed.
    #[error("inference unavailable: {0}")]
    InferenceUnavailable(String),
}
