//! Error types for LKTrack.

use thiserror::Error;

/// Call-level error for LKTrack operations.
///
/// These abort a whole call. Numerical trouble at a single keypoint is
/// reported through [`FlowFailure`] instead.
#[derive(Error, Debug)]
pub enum LkError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// (rows, cols) of the reference operand.
        expected: (u32, u32),
        /// (rows, cols) of the offending operand.
        got: (u32, u32),
    },

    #[error("Frame too small: {width}x{height}, need at least 2x2")]
    FrameTooSmall { width: u32, height: u32 },
}

/// Result type alias for LKTrack operations.
pub type Result<T> = std::result::Result<T, LkError>;

/// Why a flow estimate could not be produced for one keypoint.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum FlowFailure {
    /// The 2x2 normal matrix of the window is singular or too close to it,
    /// typically because the window has no texture in one direction.
    #[error("singular normal matrix (det = {determinant})")]
    SingularMatrix { determinant: f32 },

    /// The estimate stopped being a finite number.
    #[error("flow estimate is not finite")]
    NonFinite,
}
