//! Offline replay of recorded fix streams through a fresh engine.
//!
//! Used by the CLI to re-run GPX recordings and by benchmarks. Invalid
//! coordinates are counted in the stats rather than aborting the replay.

use log::debug;
use serde::Serialize;

use crate::engine::{EngineStats, OdometerEngine, OdometerState};
use crate::{FixSample, OdometerConfig};

/// Final state of one replayed track.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySummary {
    pub track_id: String,
    pub state: OdometerState,
    pub stats: EngineStats,
}

impl ReplaySummary {
    /// Fixes that were offered but not accumulated.
    pub fn rejected(&self) -> u64 {
        self.stats.offered() - self.stats.accepted
    }
}

/// Replay fixes in order through a new engine.
pub fn replay_fixes(track_id: &str, fixes: &[FixSample], config: &OdometerConfig) -> ReplaySummary {
    let engine = OdometerEngine::with_config(config.clone());
    for fix in fixes {
        // InvalidCoordinate is already counted in the engine stats
        let _ = engine.ingest(*fix);
    }

    let summary = ReplaySummary {
        track_id: track_id.to_string(),
        state: engine.snapshot(),
        stats: engine.stats(),
    };
    debug!(
        "[Replay] {}: {} fixes -> {:.1}m ±{:.1}m ({} rejected)",
        track_id,
        fixes.len(),
        summary.state.total_distance,
        summary.state.error_bound,
        summary.rejected()
    );
    summary
}

/// Replay each track independently.
pub fn replay_tracks(
    tracks: &[(String, Vec<FixSample>)],
    config: &OdometerConfig,
) -> Vec<ReplaySummary> {
    tracks
        .iter()
        .map(|(id, fixes)| replay_fixes(id, fixes, config))
        .collect()
}

/// Replay each track independently, in parallel. Output order matches input.
#[cfg(feature = "parallel")]
pub fn replay_tracks_parallel(
    tracks: &[(String, Vec<FixSample>)],
    config: &OdometerConfig,
) -> Vec<ReplaySummary> {
    use rayon::prelude::*;

    tracks
        .par_iter()
        .map(|(id, fixes)| replay_fixes(id, fixes, config))
        .collect()
}
