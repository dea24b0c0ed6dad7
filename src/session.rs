//! Tracking session orchestration.
//!
//! The controller sits between the location provider and the odometer
//! engine. It owns the tracking/motion flags, gates incoming fixes on them,
//! mirrors what the provider reports (motion, activity, provider state), and
//! hands accepted state to the persistence collaborator.
//!
//! Lock order is always session → engine. Provider and store calls are made
//! with neither of those held. Commands are serialized by their own guard, so
//! a provider may deliver fixes and events from inside `start`/`stop`/
//! `change_pace` but must not issue commands. Saves are serialized by a
//! persist guard and always write the engine state read inside it, so a
//! slow save can never land after a newer one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::engine::{
    EngineStats, IngestOutcome, OdometerEngine, OdometerReading, OdometerState, OdometerStore,
};
use crate::provider::{ActivityType, LocationProvider};
use crate::{FixSample, OdometerError, Result};

/// Tracking flags plus the provider facts mirrored from its callbacks.
///
/// `is_moving` is only ever true while `is_tracking_enabled` is true.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct TrackingSession {
    pub is_tracking_enabled: bool,
    pub is_moving: bool,
    /// Last activity reported by the provider.
    pub activity: ActivityType,
    /// Whether the device location services are on.
    pub provider_enabled: bool,
    /// Last fix reported while tracking, accepted or not.
    pub last_location: Option<FixSample>,
    /// Fixes dropped because tracking was off.
    pub dropped_while_disabled: u64,
}

/// Everything a presentation layer shows, captured at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SessionSnapshot {
    pub session: TrackingSession,
    pub odometer: OdometerState,
    pub reading: OdometerReading,
    pub stats: EngineStats,
}

/// Orchestrates tracking state and forwards fixes to the odometer engine.
pub struct TrackingSessionController {
    engine: Arc<OdometerEngine>,
    provider: Arc<dyn LocationProvider>,
    store: Arc<dyn OdometerStore>,
    session: Mutex<TrackingSession>,
    commands: Mutex<()>,
    persisting: Mutex<()>,
}

impl TrackingSessionController {
    /// Create a controller with tracking disabled.
    pub fn new(
        engine: Arc<OdometerEngine>,
        provider: Arc<dyn LocationProvider>,
        store: Arc<dyn OdometerStore>,
    ) -> Self {
        Self {
            engine,
            provider,
            store,
            session: Mutex::new(TrackingSession::default()),
            commands: Mutex::new(()),
            persisting: Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackingSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The engine this controller feeds.
    pub fn engine(&self) -> &Arc<OdometerEngine> {
        &self.engine
    }

    // ========================================================================
    // Startup
    // ========================================================================

    /// Load the stored odometer state and restore it into the engine.
    ///
    /// Returns `Ok(false)` when nothing was stored. An invalid stored state
    /// leaves the engine Idle and returns `InvalidState`.
    pub fn rehydrate(&self) -> Result<bool> {
        match self.store.load() {
            Ok(None) => {
                debug!("[TrackingSession] no stored odometer state");
                Ok(false)
            }
            Ok(Some(state)) => {
                self.engine.restore(state)?;
                Ok(true)
            }
            Err(e) => {
                warn!("[TrackingSession] failed to load odometer state: {}", e);
                Err(e)
            }
        }
    }

    /// Adopt the provider's own view of the session, e.g. after the provider
    /// resumed tracking across an app restart. Issues no provider commands.
    pub fn sync_from_provider(&self, is_tracking_enabled: bool, is_moving: bool) {
        let mut session = self.lock();
        session.is_tracking_enabled = is_tracking_enabled;
        session.is_moving = is_tracking_enabled && is_moving;
        info!(
            "[TrackingSession] synced from provider - tracking: {}, moving: {}",
            session.is_tracking_enabled, session.is_moving
        );
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Turn tracking on or off.
    ///
    /// Turning on starts the provider; if that fails tracking stays off.
    /// Turning off stops forwarding fixes and forces `is_moving = false` even
    /// if the provider fails to stop. Repeating the current value is a no-op.
    pub fn set_tracking_enabled(&self, on: bool) -> Result<()> {
        let _command = self.commands.lock().unwrap_or_else(PoisonError::into_inner);
        if self.lock().is_tracking_enabled == on {
            return Ok(());
        }

        if on {
            self.provider.start()?;
            self.lock().is_tracking_enabled = true;
            info!("[TrackingSession] tracking started");
            Ok(())
        } else {
            let stopped = self.provider.stop();
            {
                let mut session = self.lock();
                session.is_tracking_enabled = false;
                session.is_moving = false;
            }
            info!("[TrackingSession] tracking stopped");
            stopped
        }
    }

    /// Force the motion state. Fails with `TrackingNotEnabled` while tracking is off.
    ///
    /// Motion does not gate accumulation: fixes reported while stationary are
    /// still forwarded to the engine.
    pub fn set_moving(&self, on: bool) -> Result<()> {
        let _command = self.commands.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.lock().is_tracking_enabled {
            return Err(OdometerError::TrackingNotEnabled);
        }

        self.provider.change_pace(on)?;

        let mut session = self.lock();
        if !session.is_tracking_enabled {
            // The provider reported tracking off while changing pace
            return Err(OdometerError::TrackingNotEnabled);
        }
        session.is_moving = on;
        debug!("[TrackingSession] pace changed - moving: {}", on);
        Ok(())
    }

    /// Flip the motion state and return the new value.
    pub fn toggle_moving(&self) -> Result<bool> {
        let target = !self.lock().is_moving;
        self.set_moving(target)?;
        Ok(target)
    }

    /// Zero the odometer and persist the empty state.
    pub fn reset_odometer(&self) {
        self.engine.reset();
        self.persist_latest();
    }

    // ========================================================================
    // Provider events
    // ========================================================================

    /// Handle a fix pushed by the provider (location, motion-change, or
    /// activity-change event).
    ///
    /// While tracking is off the fix is dropped with `RejectedTrackingDisabled`
    /// and the engine is not called. After an accepted fix the new state is
    /// saved to the store; storage failures are logged, not returned.
    pub fn on_fix_received(&self, sample: FixSample) -> Result<IngestOutcome> {
        let outcome = {
            let mut session = self.lock();
            if !session.is_tracking_enabled {
                session.dropped_while_disabled += 1;
                debug!(
                    "[TrackingSession] tracking disabled, dropping fix at t={}",
                    sample.timestamp_ms
                );
                return Ok(IngestOutcome::RejectedTrackingDisabled);
            }
            if sample.is_valid() {
                session.last_location = Some(sample);
            }
            self.engine.ingest(sample)?
        };

        if outcome.is_accepted() {
            self.persist_latest();
        }
        Ok(outcome)
    }

    /// Mirror a provider-reported motion change.
    ///
    /// Ignored while tracking is off. Returns whether it was applied.
    pub fn on_motion_change(&self, is_moving: bool) -> bool {
        let mut session = self.lock();
        if !session.is_tracking_enabled {
            debug!("[TrackingSession] ignoring motion change while tracking is off");
            return false;
        }
        session.is_moving = is_moving;
        true
    }

    /// Mirror a provider-reported activity change.
    pub fn on_activity_change(&self, activity: ActivityType) {
        let mut session = self.lock();
        if session.activity != activity {
            debug!(
                "[TrackingSession] activity {} -> {}",
                session.activity.as_str(),
                activity.as_str()
            );
        }
        session.activity = activity;
    }

    /// Mirror the provider's enabled/disabled state.
    pub fn on_provider_change(&self, enabled: bool) {
        self.lock().provider_enabled = enabled;
        info!("[TrackingSession] location provider enabled: {}", enabled);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn is_tracking_enabled(&self) -> bool {
        self.lock().is_tracking_enabled
    }

    pub fn is_moving(&self) -> bool {
        self.lock().is_moving
    }

    /// Copy of the session flags.
    pub fn session(&self) -> TrackingSession {
        *self.lock()
    }

    /// Session flags and odometer state captured together.
    pub fn snapshot(&self) -> SessionSnapshot {
        let session = self.lock();
        let (odometer, stats) = self.engine.snapshot_with_stats();
        SessionSnapshot {
            session: *session,
            odometer,
            reading: odometer.reading(),
            stats,
        }
    }

    /// Pretty-printed JSON of [`snapshot`](Self::snapshot).
    pub fn state_json(&self) -> String {
        serde_json::to_string_pretty(&self.snapshot()).unwrap_or_else(|e| {
            warn!("Failed to serialize session state: {}", e);
            "{}".to_string()
        })
    }

    /// Save the engine state as of now. The state is read under the persist
    /// guard, so the last save to finish always carries the newest state.
    fn persist_latest(&self) {
        let _persisting = self.persisting.lock().unwrap_or_else(PoisonError::into_inner);
        let state = self.engine.snapshot();
        if let Err(e) = self.store.save(&state) {
            warn!("[TrackingSession] failed to persist odometer state: {}", e);
        }
    }
}
