//! FFI bindings for mobile platforms (iOS/Android).
//!
//! This module provides the UniFFI bindings that expose the odometer to
//! Kotlin and Swift. The native app keeps driving the background-geolocation
//! plugin itself, so the controller is wired to a [`NoopProvider`]; the app
//! forwards plugin callbacks into the `on_*` methods.

use std::sync::Arc;

use log::info;

use crate::engine::{IngestOutcome, JsonFileStore, NullStore, OdometerEngine, OdometerStore};
use crate::session::{SessionSnapshot, TrackingSessionController};
use crate::{
    ActivityType, FixSample, NoopProvider, OdometerConfig, OdometerError, OdometerState,
    init_logging,
};

/// Odometer plus tracking session, owned by the native app.
#[derive(uniffi::Object)]
pub struct FfiOdometer {
    controller: TrackingSessionController,
}

#[uniffi::export]
impl FfiOdometer {
    /// Create an odometer. With a `state_path` the state is persisted as JSON
    /// there and restored immediately; an unreadable or invalid file is logged
    /// and the odometer starts at zero.
    #[uniffi::constructor]
    pub fn new(
        state_path: Option<String>,
        config: OdometerConfig,
    ) -> Result<Arc<Self>, OdometerError> {
        init_logging();
        config.validate()?;

        let store: Arc<dyn OdometerStore> = match &state_path {
            Some(path) => Arc::new(JsonFileStore::new(path)),
            None => Arc::new(NullStore),
        };
        let controller = TrackingSessionController::new(
            Arc::new(OdometerEngine::with_config(config)),
            Arc::new(NoopProvider),
            store,
        );

        match controller.rehydrate() {
            Ok(restored) => info!(
                "[TripmeterRust] odometer created (state_path: {:?}, restored: {})",
                state_path, restored
            ),
            Err(e) => info!("[TripmeterRust] starting from zero: {}", e),
        }

        Ok(Arc::new(Self { controller }))
    }

    /// Forward a location, motion-change, or activity-change fix.
    pub fn on_fix(&self, sample: FixSample) -> Result<IngestOutcome, OdometerError> {
        self.controller.on_fix_received(sample)
    }

    pub fn on_motion_change(&self, is_moving: bool) -> bool {
        self.controller.on_motion_change(is_moving)
    }

    /// Forward the plugin's activity string (e.g. "on_foot").
    pub fn on_activity_change(&self, activity: String) {
        self.controller
            .on_activity_change(ActivityType::parse(&activity));
    }

    pub fn on_provider_change(&self, enabled: bool) {
        self.controller.on_provider_change(enabled);
    }

    /// Adopt the plugin's tracking/moving state at startup.
    pub fn sync_from_provider(&self, is_tracking_enabled: bool, is_moving: bool) {
        self.controller
            .sync_from_provider(is_tracking_enabled, is_moving);
    }

    pub fn set_tracking_enabled(&self, on: bool) -> Result<(), OdometerError> {
        self.controller.set_tracking_enabled(on)
    }

    pub fn set_moving(&self, on: bool) -> Result<(), OdometerError> {
        self.controller.set_moving(on)
    }

    pub fn reset_odometer(&self) {
        self.controller.reset_odometer();
    }

    pub fn odometer(&self) -> OdometerState {
        self.controller.engine().snapshot()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.controller.snapshot()
    }

    /// Pretty JSON of the full session state.
    pub fn state_json(&self) -> String {
        self.controller.state_json()
    }
}

/// Get default configuration.
#[uniffi::export]
pub fn default_odometer_config() -> OdometerConfig {
    init_logging();
    info!("[TripmeterRust] default_odometer_config called - Rust is active!");
    OdometerConfig::default()
}
