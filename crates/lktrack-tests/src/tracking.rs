//! Integration tests for multi-frame tracking.
//!
//! Runs the tracker end to end on synthetic sequences with the default
//! pyramidal estimator and with configurations loaded from JSON.

use lktrack_core::{Flow, Frame, Keypoint};
use lktrack_tracking::{
    track_features, track_features_with, FeatureTracker, FlowMethod, LucasKanade, TrackFrame,
    TrackerConfig, Trajectory,
};

use crate::scenes::{blobs, bowl, flatten};

// ── Helpers ────────────────────────────────────────────────────

/// Blobs drifting two rows down and one column left per frame.
fn drifting_blobs(frames: usize) -> Vec<Frame> {
    (0..frames)
        .map(|t| blobs(80, 2.0 * t as f32, -(t as f32)))
        .collect()
}

fn counts(traj: &Trajectory) -> Vec<usize> {
    traj.frames.iter().map(TrackFrame::len).collect()
}

// ── Default pipeline ───────────────────────────────────────────

#[test]
fn default_config_follows_drifting_scene() {
    let frames = drifting_blobs(4);
    let kps = [
        Keypoint::new(34.0, 36.0),
        Keypoint::new(40.0, 44.0),
        Keypoint::new(46.0, 30.0),
        Keypoint::new(30.0, 32.0),
        Keypoint::new(46.0, 6.0),
    ];
    let traj = track_features(&frames, &kps, &TrackerConfig::default()).unwrap();

    assert_eq!(traj.len(), frames.len());
    assert_eq!(counts(&traj), vec![5, 5, 4, 4]);

    // The point drifting left reaches column 4 and is excluded.
    let edge = traj.track_of(4);
    assert_eq!(edge[1], Some(Keypoint::new(48.0, 5.0)));
    assert_eq!(edge[2], None);

    let last = traj.get(3).unwrap();
    assert_eq!(last.ids, vec![0, 1, 2, 3]);
    for (kp, &id) in last.keypoints.iter().zip(&last.ids) {
        assert_eq!(*kp, kps[id] + Flow::new(6.0, -3.0));
    }
}

#[test]
fn trajectory_never_grows() {
    let mut frames = drifting_blobs(5);
    // Wipe the texture under part of the tracks halfway through.
    flatten(&mut frames[3], 30..60, 20..40);
    let kps: Vec<Keypoint> = (0..6)
        .flat_map(|i| {
            (0..6).map(move |j| Keypoint::new(20.0 + 6.0 * i as f32, 20.0 + 6.0 * j as f32))
        })
        .collect();

    let traj = track_features(&frames, &kps, &TrackerConfig::default()).unwrap();
    let counts = counts(&traj);
    assert_eq!(counts[0], kps.len());
    assert!(counts.windows(2).all(|w| w[1] <= w[0]), "{counts:?}");
    assert!(counts[4] < counts[2], "{counts:?}");
    for frame in &traj.frames {
        assert!(frame.ids.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn static_scene_keeps_rounded_positions() {
    let frames = vec![blobs(80, 0.0, 0.0); 3];
    let kps = [Keypoint::new(34.4, 36.6), Keypoint::new(40.5, 43.5)];
    let traj = track_features(&frames, &kps, &TrackerConfig::default()).unwrap();

    assert_eq!(traj.frames[0].keypoints, kps.to_vec());
    let expected = vec![Keypoint::new(34.0, 37.0), Keypoint::new(40.0, 44.0)];
    assert_eq!(traj.frames[1].keypoints, expected);
    assert_eq!(traj.frames[2].keypoints, expected);
}

// ── Stepwise use ───────────────────────────────────────────────

#[test]
fn stepping_matches_whole_sequence() {
    let frames = drifting_blobs(3);
    let kps = [Keypoint::new(34.0, 36.0), Keypoint::new(40.0, 44.0)];
    let config = TrackerConfig::default();

    let mut tracker = FeatureTracker::new(&config, frames[0].clone(), &kps).unwrap();
    for (i, frame) in frames[1..].iter().enumerate() {
        let report = tracker.step(frame).unwrap();
        assert_eq!(report.frame_index, i + 1);
        assert_eq!(report.kept + report.lost(), tracker.trajectory().frames[i].len());
    }
    assert_eq!(tracker.frame_index(), 2);
    assert_eq!(
        tracker.into_trajectory(),
        track_features(&frames, &kps, &config).unwrap()
    );
}

#[test]
fn keypoint_far_off_frame_is_dropped_without_disturbing_others() {
    let frames = drifting_blobs(2);
    let kps = [Keypoint::new(34.0, 36.0), Keypoint::new(3e9, 3e9)];
    let mut tracker =
        FeatureTracker::new(&TrackerConfig::default(), frames[0].clone(), &kps).unwrap();
    let report = tracker.step(&frames[1]).unwrap();
    assert_eq!(report.kept, 1);
    assert_eq!(report.lost(), 1);
    assert_eq!(tracker.live().ids, vec![0]);
    assert_eq!(tracker.live().keypoints, vec![Keypoint::new(36.0, 35.0)]);
}

#[test]
fn custom_estimator_with_single_level_solver() {
    let frames: Vec<Frame> = (0..3).map(|t| bowl(64, t, 0)).collect();
    let kps = [Keypoint::new(24.0, 24.0), Keypoint::new(40.0, 40.0)];
    let estimator = LucasKanade { window_size: 9 };
    let traj = track_features_with(&frames, &kps, estimator, &TrackerConfig::default()).unwrap();
    assert_eq!(
        traj.track_of(1),
        vec![
            Some(Keypoint::new(40.0, 40.0)),
            Some(Keypoint::new(41.0, 40.0)),
            Some(Keypoint::new(42.0, 40.0)),
        ]
    );

    // Closures plug in the same way.
    let shift_right = |prev: &Frame, next: &Frame, kps: &[Keypoint]| {
        LucasKanade { window_size: 9 }.estimate(prev, next, kps)
    };
    let frames: Vec<Frame> = (0..2).map(|t| bowl(64, 0, t)).collect();
    let traj = track_features_with(&frames, &kps, shift_right, &TrackerConfig::default()).unwrap();
    assert_eq!(traj.frames[1].keypoints[0], Keypoint::new(24.0, 25.0));
}

// ── Configuration ──────────────────────────────────────────────

#[test]
fn config_and_trajectory_through_json() {
    let config: TrackerConfig = serde_json::from_str(
        r#"{
            "error_thresh": 0.5,
            "exclude_border": 8,
            "flow": {"method": "iterative", "num_iters": 5}
        }"#,
    )
    .unwrap();
    assert_eq!(config.patch_size, 3);
    assert!(matches!(
        config.flow,
        FlowMethod::Iterative(p) if p.num_iters == 5 && p.window_size == 9
    ));

    let frames: Vec<Frame> = (0..3).map(|t| bowl(64, t, t)).collect();
    let kps = [Keypoint::new(24.0, 24.0), Keypoint::new(8.0, 40.0)];
    let traj = track_features(&frames, &kps, &config).unwrap();
    // (8, 40) starts inside the wider border and moves one row per frame.
    assert_eq!(
        traj.track_of(1),
        vec![
            Some(kps[1]),
            Some(Keypoint::new(9.0, 41.0)),
            Some(Keypoint::new(10.0, 42.0)),
        ]
    );

    let json = serde_json::to_string(&traj).unwrap();
    let back: Trajectory = serde_json::from_str(&json).unwrap();
    assert_eq!(back, traj);
}
