//! LKTrack Core - Foundation types for keypoint tracking
//!
//! This crate provides the types shared by the flow estimators and the tracker:
//! - Grayscale frames with clamped sampling
//! - Keypoints and flow vectors in (row, column) order
//! - Call-level errors and per-keypoint failure markers
//! - Bounding boxes and intersection-over-union

pub mod error;
pub mod frame;
pub mod geometry;
pub mod keypoint;

pub use error::{FlowFailure, LkError, Result};
pub use frame::Frame;
pub use geometry::{iou, Rect};
pub use keypoint::{Flow, FlowOutcome, Keypoint};
