//! Candidate selection and pruning.
//!
//! Includes the per-row arg-max class scan, deterministic score ordering, and
//! greedy IoU-based non-maximum suppression.

pub(crate) mod argmax;
pub(crate) mod detection;
pub(crate) mod nms;
