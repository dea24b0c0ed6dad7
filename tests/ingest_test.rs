//! Integration tests for OdometerEngine ingestion, reset, and restore

use std::sync::Arc;
use std::thread;

use tripmeter::{
    EnginePhase, FixSample, IngestOutcome, OdometerConfig, OdometerEngine, OdometerError,
    OdometerState,
};

fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

/// Fixes heading east along the equator, ~11 m apart, one second apart.
fn eastbound(count: usize) -> Vec<FixSample> {
    (0..count)
        .map(|i| FixSample::new(0.0, i as f64 * 0.0001, 5.0, i as i64 * 1_000))
        .collect()
}

#[test]
fn test_equator_scenario() {
    let engine = OdometerEngine::new();
    assert_eq!(engine.phase(), EnginePhase::Idle);

    let a = FixSample::new(0.0, 0.0, 5.0, 0);
    assert_eq!(
        engine.ingest(a).unwrap(),
        IngestOutcome::Accepted {
            distance_added: 0.0
        }
    );
    assert_eq!(engine.snapshot().total_distance, 0.0);
    assert_eq!(engine.phase(), EnginePhase::Tracking);

    let b = FixSample::new(0.0, 0.001, 5.0, 10_000);
    let outcome = engine.ingest(b).unwrap();
    assert!(outcome.is_accepted());
    assert!(approx_eq(outcome.distance_added(), 111.19, 0.01));

    let state = engine.snapshot();
    assert!(approx_eq(state.total_distance, 111.19, 0.01));
    assert!(approx_eq(state.error_bound, 7.07, 0.01));
    assert_eq!(state.last_accepted_fix, Some(b));
    assert_eq!(state.sample_count, 2);
}

#[test]
fn test_first_fix_adds_no_error() {
    let engine = OdometerEngine::new();
    engine.ingest(FixSample::new(10.0, 10.0, 50.0, 0)).unwrap();

    let state = engine.snapshot();
    assert_eq!(state.error_bound, 0.0);
    assert_eq!(state.sample_count, 1);
}

#[test]
fn test_duplicate_rejected_as_stale() {
    let engine = OdometerEngine::new();
    let fixes = eastbound(3);
    engine.ingest(fixes[0]).unwrap();
    engine.ingest(fixes[1]).unwrap();
    let before = engine.snapshot();

    assert_eq!(engine.ingest(fixes[1]).unwrap(), IngestOutcome::RejectedStale);
    assert_eq!(engine.snapshot(), before);
}

#[test]
fn test_duplicate_first_fix_rejected() {
    let engine = OdometerEngine::new();
    let fix = FixSample::new(0.0, 0.0, 5.0, 0);

    assert!(engine.ingest(fix).unwrap().is_accepted());
    assert_eq!(engine.ingest(fix).unwrap(), IngestOutcome::RejectedStale);
    assert_eq!(engine.snapshot().sample_count, 1);
}

#[test]
fn test_out_of_order_rejected() {
    let engine = OdometerEngine::new();
    let fixes = eastbound(3);
    engine.ingest(fixes[0]).unwrap();
    engine.ingest(fixes[2]).unwrap();

    assert_eq!(engine.ingest(fixes[1]).unwrap(), IngestOutcome::RejectedStale);
    assert_eq!(engine.snapshot().last_accepted_fix, Some(fixes[2]));
}

#[test]
fn test_unknown_accuracy_rejected() {
    let engine = OdometerEngine::new();
    for accuracy in [0.0, -1.0, f64::NAN] {
        let fix = FixSample::new(0.0, 0.0, accuracy, 0);
        assert_eq!(
            engine.ingest(fix).unwrap(),
            IngestOutcome::RejectedUnknownAccuracy
        );
    }
    assert_eq!(engine.snapshot(), OdometerState::empty());
    assert_eq!(engine.phase(), EnginePhase::Idle);

    // Also while tracking
    engine.ingest(FixSample::new(0.0, 0.0, 5.0, 0)).unwrap();
    let before = engine.snapshot();
    let unknown = FixSample::new(0.0, 0.001, 0.0, 1_000);
    assert_eq!(
        engine.ingest(unknown).unwrap(),
        IngestOutcome::RejectedUnknownAccuracy
    );
    assert_eq!(engine.snapshot(), before);
}

#[test]
fn test_infinite_accuracy_rejected() {
    let engine = OdometerEngine::new();
    engine.ingest(FixSample::new(0.0, 0.0, 5.0, 0)).unwrap();
    engine.ingest(FixSample::new(0.0, 0.001, 5.0, 10_000)).unwrap();
    let before = engine.snapshot();

    let infinite = FixSample::new(0.0, 0.002, f64::INFINITY, 20_000);
    assert_eq!(
        engine.ingest(infinite).unwrap(),
        IngestOutcome::RejectedUnknownAccuracy
    );
    assert_eq!(engine.snapshot(), before);

    // Infinite accuracy is not accepted as a first fix either
    engine.reset();
    assert_eq!(
        engine.ingest(FixSample::new(0.0, 0.0, f64::INFINITY, 0)).unwrap(),
        IngestOutcome::RejectedUnknownAccuracy
    );
    assert_eq!(engine.phase(), EnginePhase::Idle);
}

#[test]
fn test_error_bound_never_overflows() {
    let engine = OdometerEngine::new();
    engine.ingest(FixSample::new(0.0, 0.0, 5.0, 0)).unwrap();

    // hypot(5, MAX) is still finite, so this one accumulates
    let huge = FixSample::new(0.0, 0.001, f64::MAX, 10_000);
    assert!(engine.ingest(huge).unwrap().is_accepted());
    assert!(engine.snapshot().error_bound.is_finite());

    // hypot(MAX, MAX) overflows and is refused
    let huger = FixSample::new(0.0, 0.002, f64::MAX, 20_000);
    assert_eq!(
        engine.ingest(huger).unwrap(),
        IngestOutcome::RejectedUnknownAccuracy
    );

    let state = engine.snapshot();
    assert!(state.error_bound.is_finite());
    assert!(state.total_distance.is_finite());
    assert_eq!(state.last_accepted_fix, Some(huge));
    assert!(state.validate().is_ok());
}

#[test]
fn test_unknown_accuracy_checked_before_coordinates() {
    let engine = OdometerEngine::new();
    let fix = FixSample::new(95.0, 0.0, 0.0, 0);
    assert_eq!(
        engine.ingest(fix).unwrap(),
        IngestOutcome::RejectedUnknownAccuracy
    );
}

#[test]
fn test_implausible_jump_rejected() {
    let engine = OdometerEngine::new();
    engine.ingest(FixSample::new(0.0, 0.0, 5.0, 0)).unwrap();

    // ~5000 m east in 10 s = ~500 m/s
    let far = FixSample::new(0.0, 5000.0 / 111_195.0, 5.0, 10_000);
    let outcome = engine.ingest(far).unwrap();
    match outcome {
        IngestOutcome::RejectedImplausibleJump { implied_speed } => {
            assert!(approx_eq(implied_speed, 500.0, 1.0));
        }
        other => panic!("expected implausible jump, got {:?}", other),
    }

    let state = engine.snapshot();
    assert_eq!(state.total_distance, 0.0);
    assert_eq!(state.sample_count, 1);
}

#[test]
fn test_jump_check_skipped_for_first_fix() {
    let engine = OdometerEngine::new();
    engine.ingest(FixSample::new(0.0, 0.0, 5.0, 0)).unwrap();
    engine.reset();

    // Far away from the forgotten fix, but there is no prior fix after reset
    let far = FixSample::new(45.0, 45.0, 5.0, 1);
    assert!(engine.ingest(far).unwrap().is_accepted());
}

#[test]
fn test_custom_speed_ceiling() {
    let engine = OdometerEngine::with_config(OdometerConfig::with_max_speed(5.0));
    engine.ingest(FixSample::new(0.0, 0.0, 5.0, 0)).unwrap();

    // ~11 m in 1 s exceeds 5 m/s
    let next = FixSample::new(0.0, 0.0001, 5.0, 1_000);
    assert!(matches!(
        engine.ingest(next).unwrap(),
        IngestOutcome::RejectedImplausibleJump { .. }
    ));

    // Same spot 3 s later is fine
    let slower = FixSample::new(0.0, 0.0001, 5.0, 3_000);
    assert!(engine.ingest(slower).unwrap().is_accepted());
}

#[test]
fn test_invalid_coordinate_is_error_and_leaves_state() {
    let engine = OdometerEngine::new();
    let bad = FixSample::new(0.0, 181.0, 5.0, 0);
    assert!(matches!(
        engine.ingest(bad),
        Err(OdometerError::InvalidCoordinate { .. })
    ));
    assert_eq!(engine.phase(), EnginePhase::Idle);

    engine.ingest(FixSample::new(0.0, 0.0, 5.0, 0)).unwrap();
    let before = engine.snapshot();
    let bad = FixSample::new(-91.0, 0.0, 5.0, 1_000);
    assert!(engine.ingest(bad).is_err());
    assert_eq!(engine.snapshot(), before);
    assert_eq!(engine.stats().invalid_coordinate, 2);
}

#[test]
fn test_monotonic_totals() {
    let engine = OdometerEngine::new();
    let mut fixes = eastbound(50);
    // Sprinkle in rejections
    fixes.insert(10, fixes[9]);
    fixes.insert(20, FixSample::new(0.0, 0.5, 5.0, 19_500));
    fixes.insert(30, FixSample::new(0.0, 0.0, 0.0, 28_500));

    let mut last_total = 0.0;
    let mut last_error = 0.0;
    for fix in fixes {
        let _ = engine.ingest(fix);
        let state = engine.snapshot();
        assert!(state.total_distance >= last_total);
        assert!(state.error_bound >= last_error);
        last_total = state.total_distance;
        last_error = state.error_bound;
    }

    let state = engine.snapshot();
    assert_eq!(state.sample_count, 50);
    // 49 steps of 0.0001 deg at the equator
    assert!(approx_eq(state.total_distance, 49.0 * 11.1195, 0.1));
}

#[test]
fn test_reset_zeroes_state() {
    let engine = OdometerEngine::new();
    for fix in eastbound(10) {
        engine.ingest(fix).unwrap();
    }
    assert!(engine.snapshot().total_distance > 0.0);

    engine.reset();
    let state = engine.snapshot();
    assert_eq!(state.total_distance, 0.0);
    assert_eq!(state.error_bound, 0.0);
    assert_eq!(state.last_accepted_fix, None);
    assert_eq!(state.sample_count, 0);
    assert_eq!(engine.phase(), EnginePhase::Idle);
    assert_eq!(engine.stats().resets, 1);
}

#[test]
fn test_restore_valid_state() {
    let engine = OdometerEngine::new();
    let last = FixSample::new(0.0, 0.0, 5.0, 1_000);
    let stored = OdometerState {
        total_distance: 1234.5,
        error_bound: 70.0,
        last_accepted_fix: Some(last),
        sample_count: 40,
    };

    engine.restore(stored).unwrap();
    assert_eq!(engine.snapshot(), stored);
    assert_eq!(engine.phase(), EnginePhase::Tracking);

    // Accumulation continues from the restored fix
    let next = FixSample::new(0.0, 0.001, 5.0, 11_000);
    engine.ingest(next).unwrap();
    assert!(approx_eq(engine.snapshot().total_distance, 1234.5 + 111.19, 0.01));
}

#[test]
fn test_restore_rejects_invalid_state() {
    let engine = OdometerEngine::new();
    for fix in eastbound(5) {
        engine.ingest(fix).unwrap();
    }

    let negative = OdometerState {
        total_distance: -1.0,
        ..OdometerState::empty()
    };
    assert!(matches!(
        engine.restore(negative),
        Err(OdometerError::InvalidState { .. })
    ));
    // Refused state leaves the engine Idle
    assert_eq!(engine.snapshot(), OdometerState::empty());

    let negative_error = OdometerState {
        error_bound: -0.5,
        ..OdometerState::empty()
    };
    assert!(engine.restore(negative_error).is_err());
    assert_eq!(engine.phase(), EnginePhase::Idle);
}

#[test]
fn test_concurrent_ingest_is_serialized() {
    let engine = Arc::new(OdometerEngine::new());
    let fixes = eastbound(400);

    let handles: Vec<_> = fixes
        .chunks(100)
        .map(|chunk| {
            let engine = Arc::clone(&engine);
            let chunk = chunk.to_vec();
            thread::spawn(move || {
                for fix in chunk {
                    let _ = engine.ingest(fix);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let state = engine.snapshot();
    let stats = engine.stats();
    // Every fix is accounted for exactly once
    assert_eq!(stats.offered(), 400);
    assert_eq!(state.sample_count, stats.accepted);
    assert!(state.total_distance >= 0.0);
    assert!(state.error_bound >= 0.0);
    // The error bound is exactly 7.07 m per accepted step after the first
    let expected_error = (stats.accepted - 1) as f64 * 50f64.sqrt();
    assert!(approx_eq(state.error_bound, expected_error, 1e-6));
}

#[test]
fn test_outcome_names() {
    assert_eq!(
        IngestOutcome::Accepted {
            distance_added: 1.0
        }
        .as_str(),
        "accepted"
    );
    assert_eq!(IngestOutcome::RejectedStale.as_str(), "rejected_stale");
    assert_eq!(IngestOutcome::RejectedStale.distance_added(), 0.0);
    assert!(!IngestOutcome::RejectedTrackingDisabled.is_accepted());
}

#[test]
fn test_snapshot_with_stats_is_consistent() {
    let engine = Arc::new(OdometerEngine::new());
    let fixes = eastbound(2_000);

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for fix in fixes {
                let _ = engine.ingest(fix);
            }
        })
    };

    while !writer.is_finished() {
        let (state, stats) = engine.snapshot_with_stats();
        assert_eq!(state.sample_count, stats.accepted);
    }
    writer.join().unwrap();

    let (state, stats) = engine.snapshot_with_stats();
    assert_eq!(state.sample_count, 2_000);
    assert_eq!(stats.accepted, 2_000);
}
