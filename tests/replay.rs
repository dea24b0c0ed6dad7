//! Tests for offline replay

use tripmeter::{FixSample, OdometerConfig, replay_fixes, replay_tracks};

fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

fn eastbound(count: usize, start_ts: i64) -> Vec<FixSample> {
    (0..count)
        .map(|i| FixSample::new(0.0, i as f64 * 0.0001, 5.0, start_ts + i as i64 * 1_000))
        .collect()
}

#[test]
fn test_replay_clean_track() {
    let fixes = eastbound(11, 0);
    let summary = replay_fixes("clean", &fixes, &OdometerConfig::default());

    assert_eq!(summary.track_id, "clean");
    assert_eq!(summary.state.sample_count, 11);
    assert_eq!(summary.stats.accepted, 11);
    assert_eq!(summary.rejected(), 0);
    assert!(approx_eq(summary.state.total_distance, 10.0 * 11.1195, 0.05));
    assert_eq!(summary.state.last_accepted_fix, fixes.last().copied());
}

#[test]
fn test_replay_counts_rejections_and_invalid_fixes() {
    let mut fixes = eastbound(5, 0);
    fixes.push(fixes[4]); // duplicate
    fixes.push(FixSample::new(0.0, 1.0, 5.0, 6_000)); // ~111 km jump
    fixes.push(FixSample::new(0.0, 0.0005, 0.0, 7_000)); // unknown accuracy
    fixes.push(FixSample::new(95.0, 0.0, 5.0, 8_000)); // invalid
    fixes.push(FixSample::new(0.0, 0.0005, 5.0, 9_000));

    let summary = replay_fixes("faulty", &fixes, &OdometerConfig::default());
    assert_eq!(summary.stats.accepted, 6);
    assert_eq!(summary.stats.rejected_stale, 1);
    assert_eq!(summary.stats.rejected_implausible_jump, 1);
    assert_eq!(summary.stats.rejected_unknown_accuracy, 1);
    assert_eq!(summary.stats.invalid_coordinate, 1);
    assert_eq!(summary.rejected(), 4);
}

#[test]
fn test_replay_empty_track() {
    let summary = replay_fixes("empty", &[], &OdometerConfig::default());
    assert_eq!(summary.state.total_distance, 0.0);
    assert!(summary.state.is_idle());
    assert_eq!(summary.stats.offered(), 0);
}

#[test]
fn test_replay_respects_config() {
    let fixes = eastbound(5, 0);
    let strict = OdometerConfig::with_max_speed(5.0);
    let summary = replay_fixes("strict", &fixes, &strict);
    // Only the first fix survives an ~11 m/s walk with a 5 m/s ceiling
    assert_eq!(summary.stats.accepted, 1);
    assert_eq!(summary.stats.rejected_implausible_jump, 4);
}

#[test]
fn test_replay_tracks_are_independent() {
    let tracks = vec![
        ("a".to_string(), eastbound(5, 0)),
        // Starts far from track "a" and earlier in time
        ("b".to_string(), eastbound(3, -100_000)),
    ];
    let summaries = replay_tracks(&tracks, &OdometerConfig::default());

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].track_id, "a");
    assert_eq!(summaries[0].stats.accepted, 5);
    assert_eq!(summaries[1].track_id, "b");
    assert_eq!(summaries[1].stats.accepted, 3);
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_replay_matches_sequential() {
    use tripmeter::replay_tracks_parallel;

    let tracks: Vec<_> = (0..8)
        .map(|i| (format!("track-{}", i), eastbound(20 + i, i as i64 * 1_000)))
        .collect();
    let config = OdometerConfig::default();

    let sequential = replay_tracks(&tracks, &config);
    let parallel = replay_tracks_parallel(&tracks, &config);
    assert_eq!(sequential.len(), parallel.len());
    for (s, p) in sequential.iter().zip(&parallel) {
        assert_eq!(s.track_id, p.track_id);
        assert_eq!(s.state, p.state);
        assert_eq!(s.stats, p.stats);
    }
}
