//! # Tripmeter
//!
//! Trip odometer engine for noisy, irregularly-sampled GPS fix streams.
//!
//! This library provides:
//! - Haversine fix-to-fix distance with propagated accuracy bounds
//! - A single-writer odometer accumulator that rejects stale, duplicate,
//!   unknown-accuracy, and implausible-jump fixes
//! - A tracking session controller that gates the fix stream on tracking state
//!   and delegates start/stop/pace effects to an external location provider
//! - Pluggable persistence of odometer state across restarts
//! - Batch replay of recorded tracks
//!
//! ## Features
//!
//! - **`parallel`** - Parallel batch replay with rayon
//! - **`persistence`** - SQLite-backed odometer store
//! - **`ffi`** - UniFFI bindings for mobile platforms (iOS/Android)
//! - **`synthetic`** - Seeded synthetic fix streams for tests and benchmarks
//! - **`cli`** - `tripmeter-cli` for replaying GPX files
//!
//! ## Quick Start
//!
//! ```rust
//! use tripmeter::{FixSample, IngestOutcome, OdometerEngine};
//!
//! let engine = OdometerEngine::new();
//!
//! let a = FixSample::new(0.0, 0.0, 5.0, 0);
//! let b = FixSample::new(0.0, 0.001, 5.0, 10_000);
//!
//! assert_eq!(
//!     engine.ingest(a).unwrap(),
//!     IngestOutcome::Accepted { distance_added: 0.0 }
//! );
//! assert!(engine.ingest(b).unwrap().is_accepted());
//!
//! let state = engine.snapshot();
//! assert!((state.total_distance - 111.19).abs() < 0.01);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OdometerError, Result};

// Geographic utilities (haversine, coordinate validity, metric offsets)
pub mod geo_utils;

// Fix-to-fix distance and uncertainty
pub mod estimator;
pub use estimator::{distance_between, implied_speed, propagated_error};

// Odometer accumulator, state, and persistence collaborators
pub mod engine;
pub use engine::{
    EnginePhase, EngineStats, IngestOutcome, JsonFileStore, MemoryStore, NullStore,
    OdometerEngine, OdometerReading, OdometerState, OdometerStore,
};

// Location provider collaborator
pub mod provider;
pub use provider::{ActivityType, LocationProvider, NoopProvider};

// Tracking session orchestration
pub mod session;
pub use session::{SessionSnapshot, TrackingSession, TrackingSessionController};

// Offline replay of recorded tracks
pub mod replay;
#[cfg(feature = "parallel")]
pub use replay::replay_tracks_parallel;
pub use replay::{ReplaySummary, replay_fixes, replay_tracks};

// SQLite-backed odometer store
#[cfg(feature = "persistence")]
pub mod persistence;
#[cfg(feature = "persistence")]
pub use persistence::SqliteStore;

// Synthetic fix streams for tests and benchmarks
#[cfg(feature = "synthetic")]
pub mod synthetic;

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("TripmeterRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// One reported position fix.
///
/// Fixes are plain `Copy` values; once built they are never mutated.
///
/// # Example
/// ```
/// use tripmeter::FixSample;
/// let fix = FixSample::new(51.5074, -0.1278, 8.0, 1_700_000_000_000).with_speed(1.4);
/// assert!(fix.is_valid());
/// assert!(fix.has_known_accuracy());
/// assert_eq!(fix.reported_speed(), Some(1.4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct FixSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Radius of the reported uncertainty circle in meters. `<= 0` means unknown.
    pub horizontal_accuracy: f64,
    /// Ground speed in m/s as reported by the provider. Negative means not available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Unix epoch timestamp in milliseconds. The last accepted fix is
    /// persisted, so timestamps must stay comparable across restarts; a
    /// clock that restarts at boot makes every later fix stale.
    pub timestamp_ms: i64,
}

impl FixSample {
    /// Create a fix without a speed reading.
    pub fn new(latitude: f64, longitude: f64, horizontal_accuracy: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            horizontal_accuracy,
            speed: None,
            timestamp_ms,
        }
    }

    /// Return a copy carrying the provider's speed reading.
    pub fn with_speed(self, speed: f64) -> Self {
        Self {
            speed: Some(speed),
            ..self
        }
    }

    /// Check if the fix has valid coordinates.
    pub fn is_valid(&self) -> bool {
        geo_utils::is_valid_coordinate(self.latitude, self.longitude)
    }

    /// False when accuracy is zero, negative, NaN, or infinite.
    pub fn has_known_accuracy(&self) -> bool {
        self.horizontal_accuracy.is_finite() && self.horizontal_accuracy > 0.0
    }

    /// Speed in m/s, or `None` when the provider did not report one.
    pub fn reported_speed(&self) -> Option<f64> {
        self.speed.filter(|s| *s >= 0.0)
    }
}

/// Configuration for the odometer engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct OdometerConfig {
    /// Ceiling on the implied speed between consecutive accepted fixes.
    /// Fixes implying a faster jump are treated as multipath spikes.
    /// Default: 120.0 m/s (~432 km/h)
    pub max_speed_mps: f64,
}

impl Default for OdometerConfig {
    fn default() -> Self {
        Self {
            max_speed_mps: 120.0,
        }
    }
}

impl OdometerConfig {
    /// Create a configuration with a custom speed ceiling.
    pub fn with_max_speed(max_speed_mps: f64) -> Self {
        Self { max_speed_mps }
    }

    /// Reject ceilings that would make every jump (or none) implausible.
    pub fn validate(&self) -> Result<()> {
        if !self.max_speed_mps.is_finite() || self.max_speed_mps <= 0.0 {
            return Err(OdometerError::invalid_state(format!(
                "max_speed_mps must be a positive finite number, got {}",
                self.max_speed_mps
            )));
        }
        Ok(())
    }
}
