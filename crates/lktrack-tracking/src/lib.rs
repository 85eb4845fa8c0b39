//! LKTrack Tracking - Lucas-Kanade optical flow and keypoint tracking.
//!
//! Three flow estimators of increasing reach share one per-keypoint contract:
//! - [`lucas_kanade`]: one least-squares solve per keypoint
//! - [`iterative_lucas_kanade`]: repeated re-sampling around a running estimate
//! - [`pyramid_lucas_kanade`]: coarse-to-fine over Gaussian pyramids
//!
//! [`FeatureTracker`] and [`track_features`] follow keypoints across a
//! sequence of frames, dropping those that leave the frame or stop matching.

pub mod estimator;
pub mod gradient;
pub mod iterative;
pub mod lucas_kanade;
pub mod patch_error;
pub mod pyramid;
pub mod pyramidal;
pub mod tracker;

pub use estimator::{FlowEstimator, FlowMethod};
pub use gradient::compute_gradients;
pub use iterative::{iterative_lucas_kanade, IterativeLucasKanade};
pub use lucas_kanade::{lucas_kanade, LucasKanade};
pub use patch_error::compute_error;
pub use pyramid::{gaussian_blur, GaussianPyramid};
pub use pyramidal::{pyramid_lucas_kanade, PyramidLucasKanade};
pub use tracker::{
    track_features, track_features_with, FeatureTracker, LossReason, StepReport, TrackFrame,
    TrackerConfig, Trajectory,
};
