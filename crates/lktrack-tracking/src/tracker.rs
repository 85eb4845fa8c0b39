//! Multi-frame keypoint tracking.
//!
//! A [`FeatureTracker`] carries a live keypoint set from frame to frame. At
//! every transition the flow estimator proposes next positions, and each
//! keypoint survives only if its rounded next position stays clear of the
//! frame border and the patches around its old and new positions still look
//! alike. The live set therefore never grows.

use lktrack_core::{Frame, Keypoint, LkError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::estimator::{FlowEstimator, FlowMethod};
use crate::patch_error::compute_error;

/// Configuration for [`FeatureTracker`] and [`track_features`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Largest accepted normalized patch error (default: 1.5).
    pub error_thresh: f32,
    /// Keypoints whose rounded next position is closer than this many
    /// pixels to an edge are dropped (default: 5).
    pub exclude_border: u32,
    /// Odd side length of the patches compared across frames (default: 3).
    pub patch_size: u32,
    /// Flow estimator (default: pyramidal Lucas-Kanade).
    pub flow: FlowMethod,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            error_thresh: 1.5,
            exclude_border: 5,
            patch_size: 3,
            flow: FlowMethod::default(),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.patch_size == 0 || self.patch_size % 2 == 0 {
            return Err(LkError::InvalidParameter(format!(
                "patch_size must be odd, got {}",
                self.patch_size
            )));
        }
        if self.error_thresh.is_nan() {
            return Err(LkError::InvalidParameter(
                "error_thresh must not be NaN".into(),
            ));
        }
        Ok(())
    }
}

/// Why a keypoint left the live set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossReason {
    /// The next position fell inside the excluded border.
    OutsideFrame,
    /// The estimator produced no flow for it.
    FlowFailed,
    /// The patches before and after the move differ too much.
    PatchMismatch,
}

/// Surviving keypoints at one frame, with their index in the initial set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackFrame {
    pub keypoints: Vec<Keypoint>,
    pub ids: Vec<usize>,
}

impl TrackFrame {
    fn initial(keypoints: &[Keypoint]) -> Self {
        Self {
            keypoints: keypoints.to_vec(),
            ids: (0..keypoints.len()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Position of track `id` in this frame, if it is still alive.
    pub fn position_of(&self, id: usize) -> Option<Keypoint> {
        // ids are ascending
        self.ids
            .binary_search(&id)
            .ok()
            .map(|i| self.keypoints[i])
    }
}

/// Live keypoint sets, one per processed frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub frames: Vec<TrackFrame>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, frame: usize) -> Option<&TrackFrame> {
        self.frames.get(frame)
    }

    /// Per-frame positions of one track, `None` once it is lost.
    pub fn track_of(&self, id: usize) -> Vec<Option<Keypoint>> {
        self.frames.iter().map(|f| f.position_of(id)).collect()
    }
}

/// Outcome of one frame transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// Index of the frame just entered.
    pub frame_index: usize,
    pub kept: usize,
    pub lost_outside: usize,
    pub lost_flow: usize,
    pub lost_mismatch: usize,
}

impl StepReport {
    fn record(&mut self, reason: LossReason) {
        match reason {
            LossReason::OutsideFrame => self.lost_outside += 1,
            LossReason::FlowFailed => self.lost_flow += 1,
            LossReason::PatchMismatch => self.lost_mismatch += 1,
        }
    }

    pub fn lost(&self) -> usize {
        self.lost_outside + self.lost_flow + self.lost_mismatch
    }
}

/// Stateful tracker: current frame index, live set, and the last frame seen.
pub struct FeatureTracker<E = FlowMethod> {
    estimator: E,
    error_thresh: f32,
    exclude_border: u32,
    patch_size: u32,
    frame_index: usize,
    prev: Frame,
    trajectory: Trajectory,
}

impl FeatureTracker<FlowMethod> {
    /// Start tracking `keypoints` in `first`, estimating flow with `config.flow`.
    pub fn new(config: &TrackerConfig, first: Frame, keypoints: &[Keypoint]) -> Result<Self> {
        Self::with_estimator(config.flow, config, first, keypoints)
    }
}

impl<E: FlowEstimator> FeatureTracker<E> {
    /// Start tracking with a custom estimator. `config.flow` is ignored.
    pub fn with_estimator(
        estimator: E,
        config: &TrackerConfig,
        first: Frame,
        keypoints: &[Keypoint],
    ) -> Result<Self> {
        config.validate()?;
        first.ensure_window_fits(config.patch_size as usize)?;
        Ok(Self {
            estimator,
            error_thresh: config.error_thresh,
            exclude_border: config.exclude_border,
            patch_size: config.patch_size,
            frame_index: 0,
            prev: first,
            trajectory: Trajectory {
                frames: vec![TrackFrame::initial(keypoints)],
            },
        })
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Keypoints alive at the current frame.
    pub fn live(&self) -> &TrackFrame {
        // The trajectory always holds the initial entry.
        &self.trajectory.frames[self.frame_index]
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn into_trajectory(self) -> Trajectory {
        self.trajectory
    }

    /// Advance to `next`, appending the surviving keypoints to the trajectory.
    pub fn step(&mut self, next: &Frame) -> Result<StepReport> {
        self.prev.ensure_same_shape(next)?;
        let live = self.live();
        let mut report = StepReport {
            frame_index: self.frame_index + 1,
            ..StepReport::default()
        };

        let mut survivors = TrackFrame::default();
        if !live.is_empty() {
            let flows = self.estimator.estimate(&self.prev, next, &live.keypoints)?;
            if flows.len() != live.len() {
                return Err(LkError::InvalidParameter(format!(
                    "estimator returned {} flows for {} keypoints",
                    flows.len(),
                    live.len()
                )));
            }

            let verdicts: Vec<std::result::Result<Keypoint, LossReason>> = live
                .keypoints
                .par_iter()
                .zip(flows.par_iter())
                .map(|(&kp, flow)| match flow {
                    Ok(flow) => self.judge(kp, kp + *flow, next),
                    Err(failure) => {
                        trace!(?kp, %failure, "Flow estimation failed");
                        Ok(Err(LossReason::FlowFailed))
                    }
                })
                .collect::<Result<_>>()?;

            for (&id, verdict) in live.ids.iter().zip(verdicts) {
                match verdict {
                    Ok(kp) => {
                        survivors.keypoints.push(kp);
                        survivors.ids.push(id);
                    }
                    Err(reason) => report.record(reason),
                }
            }
        }
        report.kept = survivors.len();

        debug!(
            frame = report.frame_index,
            kept = report.kept,
            lost_outside = report.lost_outside,
            lost_flow = report.lost_flow,
            lost_mismatch = report.lost_mismatch,
            "Tracked frame"
        );

        self.trajectory.frames.push(survivors);
        self.prev = next.clone();
        self.frame_index += 1;
        Ok(report)
    }

    /// Keep or drop one keypoint moving from `curr` in the previous frame to
    /// `moved` in `next`. Survivors are returned at their rounded position.
    fn judge(
        &self,
        curr: Keypoint,
        moved: Keypoint,
        next: &Frame,
    ) -> Result<std::result::Result<Keypoint, LossReason>> {
        let (yj, xj) = moved.rounded();
        let eb = i64::from(self.exclude_border);
        let (row, col) = (i64::from(yj), i64::from(xj));
        if row < eb
            || row > i64::from(next.height) - 1 - eb
            || col < eb
            || col > i64::from(next.width) - 1 - eb
        {
            return Ok(Err(LossReason::OutsideFrame));
        }

        let (yi, xi) = curr.rounded();
        let before = self.prev.patch(yi, xi, self.patch_size);
        let after = next.patch(yj, xj, self.patch_size);
        let error = compute_error(&before, &after)?;
        if !error.is_finite() || error > self.error_thresh {
            trace!(?curr, error, "Patch mismatch");
            return Ok(Err(LossReason::PatchMismatch));
        }
        Ok(Ok(moved.snapped()))
    }
}

/// Track `keypoints` from `frames[0]` through the whole sequence using the
/// estimator selected in `config`.
pub fn track_features(
    frames: &[Frame],
    keypoints: &[Keypoint],
    config: &TrackerConfig,
) -> Result<Trajectory> {
    track_features_with(frames, keypoints, config.flow, config)
}

/// [`track_features`] with a caller-supplied estimator.
pub fn track_features_with<E: FlowEstimator>(
    frames: &[Frame],
    keypoints: &[Keypoint],
    estimator: E,
    config: &TrackerConfig,
) -> Result<Trajectory> {
    let Some((first, rest)) = frames.split_first() else {
        return Err(LkError::InvalidParameter(
            "at least one frame is required".into(),
        ));
    };
    for frame in rest {
        first.ensure_same_shape(frame)?;
    }

    let mut tracker = FeatureTracker::with_estimator(estimator, config, first.clone(), keypoints)?;
    for frame in rest {
        tracker.step(frame)?;
    }
    Ok(tracker.into_trajectory())
}
