//! Accumulated odometer state.
//!
//! `OdometerState` is the persisted value object. The engine owns the only
//! mutable copy; everyone else sees snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{FixSample, OdometerError, Result};

/// Logical state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum EnginePhase {
    /// No fix accepted since construction or the last reset.
    Idle,
    /// At least one fix accepted; distances are measured from the last one.
    Tracking,
}

/// Accumulated distance, error bound, and the last accepted fix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct OdometerState {
    /// Running total in meters. Only decreases on reset.
    pub total_distance: f64,
    /// Running accumulated uncertainty in meters. Only decreases on reset.
    pub error_bound: f64,
    /// The fix the next distance will be measured from.
    #[serde(default)]
    pub last_accepted_fix: Option<FixSample>,
    /// Fixes that contributed to the total (diagnostic).
    #[serde(default)]
    pub sample_count: u64,
}

impl OdometerState {
    /// The empty (Idle) state.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> EnginePhase {
        if self.last_accepted_fix.is_some() {
            EnginePhase::Tracking
        } else {
            EnginePhase::Idle
        }
    }

    pub fn is_idle(&self) -> bool {
        self.phase() == EnginePhase::Idle
    }

    /// Check that a state is safe to adopt, e.g. after loading it from disk.
    pub fn validate(&self) -> Result<()> {
        if !self.total_distance.is_finite() || self.total_distance < 0.0 {
            return Err(OdometerError::invalid_state(format!(
                "total distance must be a non-negative number, got {}",
                self.total_distance
            )));
        }
        if !self.error_bound.is_finite() || self.error_bound < 0.0 {
            return Err(OdometerError::invalid_state(format!(
                "error bound must be a non-negative number, got {}",
                self.error_bound
            )));
        }
        if let Some(fix) = &self.last_accepted_fix {
            if !fix.is_valid() {
                return Err(OdometerError::invalid_state(format!(
                    "last accepted fix has invalid coordinate ({}, {})",
                    fix.latitude, fix.longitude
                )));
            }
            if !fix.has_known_accuracy() {
                return Err(OdometerError::invalid_state(
                    "last accepted fix has unknown accuracy",
                ));
            }
        }
        Ok(())
    }

    /// Kilometre view of the state for display.
    pub fn reading(&self) -> OdometerReading {
        OdometerReading {
            distance_km: self.total_distance / 1000.0,
            error_km: (self.error_bound > 0.0).then(|| self.error_bound / 1000.0),
        }
    }
}

impl fmt::Display for OdometerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.reading(), f)
    }
}

/// Odometer values in kilometres, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct OdometerReading {
    pub distance_km: f64,
    /// `None` until some uncertainty has accumulated.
    pub error_km: Option<f64>,
}

impl fmt::Display for OdometerReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} km", self.distance_km)?;
        if let Some(error) = self.error_km {
            write!(f, " ±{:.2} km", error)?;
        }
        Ok(())
    }
}
