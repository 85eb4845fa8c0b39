//! Integration tests for the flow estimators.
//!
//! Exercises lktrack-tracking estimators on lktrack-core frames through
//! both the free functions and the `FlowEstimator` trait.

use lktrack_core::{Flow, FlowFailure, Keypoint};
use lktrack_tracking::{
    iterative_lucas_kanade, lucas_kanade, pyramid_lucas_kanade, FlowEstimator, FlowMethod,
    IterativeLucasKanade, LucasKanade, PyramidLucasKanade,
};

use crate::scenes::{blobs, bowl, flatten};

// ── Helpers ────────────────────────────────────────────────────

const VERTICES: [Keypoint; 3] = [
    Keypoint::new(24.0, 24.0),
    Keypoint::new(40.0, 24.0),
    Keypoint::new(40.0, 40.0),
];

fn assert_close(flow: Flow, dy: f32, dx: f32, tol: f32) {
    assert!(
        (flow.dy - dy).abs() < tol && (flow.dx - dx).abs() < tol,
        "expected ({dy}, {dx}), got {flow:?}"
    );
}

// ── Integer translation ────────────────────────────────────────

#[test]
fn single_level_and_iterative_recover_shift() {
    let prev = bowl(64, 0, 0);
    for (ty, tx) in [(1, 2), (-2, 1), (3, 0)] {
        let next = bowl(64, ty, tx);
        let basic = lucas_kanade(&prev, &next, &VERTICES, 9).unwrap();
        let refined = iterative_lucas_kanade(&prev, &next, &VERTICES, 9, 7, None).unwrap();
        for outcome in basic.into_iter().chain(refined) {
            assert_close(outcome.unwrap(), ty as f32, tx as f32, 1e-2);
        }
    }
}

#[test]
fn estimators_behind_trait_objects() {
    let prev = bowl(64, 0, 0);
    let next = bowl(64, -1, 1);
    let estimators: Vec<Box<dyn FlowEstimator>> = vec![
        Box::new(LucasKanade { window_size: 9 }),
        Box::new(IterativeLucasKanade::default()),
        Box::new(FlowMethod::Iterative(IterativeLucasKanade {
            window_size: 7,
            num_iters: 4,
        })),
    ];
    for estimator in &estimators {
        let flows = estimator.estimate(&prev, &next, &VERTICES).unwrap();
        assert_eq!(flows.len(), VERTICES.len());
        for flow in flows {
            assert_close(flow.unwrap(), -1.0, 1.0, 1e-2);
        }
    }
}

// ── Order and failure isolation ────────────────────────────────

#[test]
fn output_order_matches_input_with_failures_in_between() {
    let mut prev = bowl(64, 0, 0);
    let mut next = bowl(64, 1, 0);
    flatten(&mut prev, 0..32, 0..32);
    flatten(&mut next, 0..32, 0..32);

    let kps = [
        Keypoint::new(40.0, 40.0),
        Keypoint::new(8.0, 8.0),
        Keypoint::new(24.0, 56.0),
        Keypoint::new(f32::NAN, 10.0),
        Keypoint::new(56.0, 8.0),
    ];
    let flows = IterativeLucasKanade::default()
        .estimate(&prev, &next, &kps)
        .unwrap();

    assert_eq!(flows.len(), kps.len());
    assert_close(flows[0].unwrap(), 1.0, 0.0, 1e-2);
    assert!(matches!(flows[1], Err(FlowFailure::SingularMatrix { .. })));
    assert_close(flows[2].unwrap(), 1.0, 0.0, 1e-2);
    assert_eq!(flows[3], Err(FlowFailure::NonFinite));
    assert_close(flows[4].unwrap(), 1.0, 0.0, 1e-2);
}

// ── Pyramid ────────────────────────────────────────────────────

#[test]
fn pyramid_without_levels_is_iterative() {
    let prev = blobs(80, 0.0, 0.0);
    let next = blobs(80, 1.0, -1.0);
    let kps = [Keypoint::new(34.0, 36.0), Keypoint::new(46.5, 30.2)];
    let pyramidal = pyramid_lucas_kanade(&prev, &next, &kps, 9, 7, 0, 2.0).unwrap();
    let iterative = iterative_lucas_kanade(&prev, &next, &kps, 9, 7, None).unwrap();
    assert_eq!(pyramidal, iterative);
}

#[test]
fn pyramid_from_json_config_follows_large_motion() {
    let method: FlowMethod = serde_json::from_str(r#"{"method": "pyramidal"}"#).unwrap();
    assert_eq!(method, FlowMethod::Pyramidal(PyramidLucasKanade::default()));

    let prev = blobs(80, 0.0, 0.0);
    let next = blobs(80, 8.0, -7.0);
    let kps = [
        Keypoint::new(34.0, 36.0),
        Keypoint::new(40.0, 44.0),
        Keypoint::new(46.0, 30.0),
    ];
    let first = method.estimate(&prev, &next, &kps).unwrap();
    let second = method.estimate(&prev, &next, &kps).unwrap();
    assert_eq!(first, second);
    for flow in first {
        assert_close(flow.unwrap(), 8.0, -7.0, 1.0);
    }
}
