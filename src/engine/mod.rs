//! # Odometer Engine
//!
//! Stateful accumulator over a push-based stream of position fixes.
//!
//! ## Architecture
//!
//! The engine is composed of focused modules:
//! - `state` - `OdometerState`, the persisted value object
//! - `store` - `OdometerStore` persistence collaborators
//!
//! The engine itself owns the only mutable `OdometerState`. All operations
//! take `&self` and are serialized by one mutex, so concurrent `ingest` calls
//! never interleave their read-modify-write and `snapshot` never observes a
//! half-applied update.

pub mod state;
pub mod store;

pub use state::{EnginePhase, OdometerReading, OdometerState};
pub use store::{JsonFileStore, MemoryStore, NullStore, OdometerStore};

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::estimator::{distance_between, implied_speed, propagated_error};
use crate::{FixSample, OdometerConfig, OdometerError, Result};

/// Result of offering one fix to the engine (or the session controller).
///
/// Every variant other than `Accepted` means the fix was intentionally not
/// accumulated; none of them are errors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum IngestOutcome {
    /// The fix was accumulated; `distance_added` is 0 for the first fix.
    Accepted { distance_added: f64 },
    /// Accuracy was zero, negative, non-finite, or too large to accumulate.
    RejectedUnknownAccuracy,
    /// Timestamp not strictly after the last accepted fix (duplicate or out of order).
    RejectedStale,
    /// Implied speed from the last accepted fix exceeded the configured ceiling.
    RejectedImplausibleJump { implied_speed: f64 },
    /// Dropped by the session controller because tracking is off.
    RejectedTrackingDisabled,
}

impl IngestOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, IngestOutcome::Accepted { .. })
    }

    /// Distance added to the total, 0 for every rejection.
    pub fn distance_added(&self) -> f64 {
        match self {
            IngestOutcome::Accepted { distance_added } => *distance_added,
            _ => 0.0,
        }
    }

    /// Short name for log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestOutcome::Accepted { .. } => "accepted",
            IngestOutcome::RejectedUnknownAccuracy => "rejected_unknown_accuracy",
            IngestOutcome::RejectedStale => "rejected_stale",
            IngestOutcome::RejectedImplausibleJump { .. } => "rejected_implausible_jump",
            IngestOutcome::RejectedTrackingDisabled => "rejected_tracking_disabled",
        }
    }
}

/// Per-outcome counters for monitoring. Not reset by [`OdometerEngine::reset`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct EngineStats {
    pub accepted: u64,
    pub rejected_unknown_accuracy: u64,
    pub rejected_stale: u64,
    pub rejected_implausible_jump: u64,
    pub invalid_coordinate: u64,
    pub resets: u64,
}

impl EngineStats {
    /// Total fixes offered to the engine, including invalid ones.
    pub fn offered(&self) -> u64 {
        self.accepted
            + self.rejected_unknown_accuracy
            + self.rejected_stale
            + self.rejected_implausible_jump
            + self.invalid_coordinate
    }

    fn record(&mut self, outcome: &IngestOutcome) {
        match outcome {
            IngestOutcome::Accepted { .. } => self.accepted += 1,
            IngestOutcome::RejectedUnknownAccuracy => self.rejected_unknown_accuracy += 1,
            IngestOutcome::RejectedStale => self.rejected_stale += 1,
            IngestOutcome::RejectedImplausibleJump { .. } => self.rejected_implausible_jump += 1,
            // Counted by the session controller, never produced here
            IngestOutcome::RejectedTrackingDisabled => {}
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: OdometerState,
    stats: EngineStats,
}

/// What `ingest` decided before touching any state.
enum Evaluation {
    Reject(IngestOutcome),
    Accept { distance: f64, error: f64 },
}

/// Odometer accumulator.
///
/// # Example
/// ```
/// use tripmeter::{FixSample, IngestOutcome, OdometerEngine};
///
/// let engine = OdometerEngine::new();
/// let fix = FixSample::new(47.37, 8.55, 5.0, 1_000);
///
/// assert!(engine.ingest(fix).unwrap().is_accepted());
/// // Redelivery of the same fix is ignored
/// assert_eq!(engine.ingest(fix).unwrap(), IngestOutcome::RejectedStale);
/// assert_eq!(engine.snapshot().sample_count, 1);
/// ```
#[derive(Debug)]
pub struct OdometerEngine {
    config: OdometerConfig,
    inner: Mutex<Inner>,
}

impl Default for OdometerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl OdometerEngine {
    /// Create an Idle engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(OdometerConfig::default())
    }

    /// Create an Idle engine with custom configuration.
    pub fn with_config(config: OdometerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &OdometerConfig {
        &self.config
    }

    // State is only assigned after every check passed, so a poisoned lock
    // still guards a consistent value.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // Ingestion
    // ========================================================================

    /// Offer one fix to the accumulator.
    ///
    /// Returns `Err(InvalidCoordinate)` for out-of-range coordinates; every
    /// other rejection is an `Ok` outcome. Rejections never modify state.
    pub fn ingest(&self, sample: FixSample) -> Result<IngestOutcome> {
        let mut inner = self.lock();

        let evaluation = match self.evaluate(&inner.state, &sample) {
            Ok(e) => e,
            Err(e) => {
                inner.stats.invalid_coordinate += 1;
                warn!("[OdometerEngine] Dropping fix at t={}: {}", sample.timestamp_ms, e);
                return Err(e);
            }
        };

        let outcome = match evaluation {
            Evaluation::Reject(outcome) => {
                debug!(
                    "[OdometerEngine] {} fix at t={} (accuracy {:.1}m)",
                    outcome.as_str(),
                    sample.timestamp_ms,
                    sample.horizontal_accuracy
                );
                outcome
            }
            Evaluation::Accept { distance, error } => {
                let state = &mut inner.state;
                state.total_distance += distance;
                state.error_bound += error;
                state.last_accepted_fix = Some(sample);
                state.sample_count += 1;
                debug!(
                    "[OdometerEngine] accepted fix at t={}: +{:.2}m (total {:.2}m ±{:.2}m)",
                    sample.timestamp_ms, distance, state.total_distance, state.error_bound
                );
                IngestOutcome::Accepted {
                    distance_added: distance,
                }
            }
        };

        inner.stats.record(&outcome);
        Ok(outcome)
    }

    /// Decide the fate of `sample` without mutating anything.
    fn evaluate(&self, state: &OdometerState, sample: &FixSample) -> Result<Evaluation> {
        if !sample.has_known_accuracy() {
            return Ok(Evaluation::Reject(IngestOutcome::RejectedUnknownAccuracy));
        }

        let Some(last) = state.last_accepted_fix.as_ref() else {
            if !sample.is_valid() {
                return Err(OdometerError::InvalidCoordinate {
                    latitude: sample.latitude,
                    longitude: sample.longitude,
                });
            }
            // First fix contributes no distance or error
            return Ok(Evaluation::Accept {
                distance: 0.0,
                error: 0.0,
            });
        };

        let distance = distance_between(last, sample)?;

        if sample.timestamp_ms <= last.timestamp_ms {
            return Ok(Evaluation::Reject(IngestOutcome::RejectedStale));
        }

        let speed = implied_speed(last, sample, distance);
        if speed > self.config.max_speed_mps {
            return Ok(Evaluation::Reject(IngestOutcome::RejectedImplausibleJump {
                implied_speed: speed,
            }));
        }

        // Totals must stay finite or the persisted state cannot be restored
        let error = propagated_error(last, sample);
        let error_bound = state.error_bound + error;
        let total_distance = state.total_distance + distance;
        if !error_bound.is_finite() || !total_distance.is_finite() {
            return Ok(Evaluation::Reject(IngestOutcome::RejectedUnknownAccuracy));
        }

        Ok(Evaluation::Accept { distance, error })
    }

    // ========================================================================
    // Snapshot / Reset / Restore
    // ========================================================================

    /// Copy of the current state. Never fails.
    pub fn snapshot(&self) -> OdometerState {
        self.lock().state
    }

    /// Idle or Tracking.
    pub fn phase(&self) -> EnginePhase {
        self.lock().state.phase()
    }

    /// Zero the odometer and forget the last fix. Irreversible: take a
    /// snapshot first if the previous trip is needed.
    pub fn reset(&self) {
        let mut inner = self.lock();
        let previous = std::mem::take(&mut inner.state);
        inner.stats.resets += 1;
        info!(
            "[OdometerEngine] reset (was {:.2}m ±{:.2}m over {} fixes)",
            previous.total_distance, previous.error_bound, previous.sample_count
        );
    }

    /// Replace the current state wholesale, e.g. with a state loaded at startup.
    ///
    /// An invalid state is refused: the engine is left Idle and
    /// `InvalidState` is returned for the caller to log.
    pub fn restore(&self, state: OdometerState) -> Result<()> {
        let mut inner = self.lock();
        if let Err(e) = state.validate() {
            inner.state = OdometerState::empty();
            warn!("[OdometerEngine] refusing to restore state: {}", e);
            return Err(e);
        }
        inner.state = state;
        info!(
            "[OdometerEngine] restored {:.2}m ±{:.2}m ({} fixes, {:?})",
            state.total_distance,
            state.error_bound,
            state.sample_count,
            state.phase()
        );
        Ok(())
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Per-outcome counters since construction.
    pub fn stats(&self) -> EngineStats {
        self.lock().stats
    }

    /// State and counters read under one lock, so `sample_count` and
    /// `accepted` always describe the same set of fixes.
    pub fn snapshot_with_stats(&self) -> (OdometerState, EngineStats) {
        let inner = self.lock();
        (inner.state, inner.stats)
    }
}
