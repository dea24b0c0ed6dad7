//! Location provider collaborator.
//!
//! The provider is the native background-geolocation service that produces
//! fixes and reacts to start/stop/pace commands. It lives outside this crate;
//! the session controller only talks to it through [`LocationProvider`].

use serde::{Deserialize, Serialize};

use crate::Result;

/// Commands the session controller sends to the location provider.
///
/// The controller never holds a lock while calling these, so an
/// implementation may synchronously deliver fixes back into the controller.
pub trait LocationProvider: Send + Sync {
    /// Begin producing fixes.
    fn start(&self) -> Result<()>;
    /// Stop producing fixes.
    fn stop(&self) -> Result<()>;
    /// Force the provider into the moving (`true`) or stationary state.
    fn change_pace(&self, is_moving: bool) -> Result<()>;
}

/// Provider for hosts that drive the native service themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProvider;

impl LocationProvider for NoopProvider {
    fn start(&self) -> Result<()> {
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        Ok(())
    }

    fn change_pace(&self, _is_moving: bool) -> Result<()> {
        Ok(())
    }
}

/// Activity reported by the provider's motion classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum ActivityType {
    InVehicle,
    OnBicycle,
    OnFoot,
    Running,
    Walking,
    Still,
    Tilting,
    #[default]
    Unknown,
}

impl ActivityType {
    /// Parse the provider's activity string. Unrecognised names map to `Unknown`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "in_vehicle" => ActivityType::InVehicle,
            "on_bicycle" => ActivityType::OnBicycle,
            "on_foot" => ActivityType::OnFoot,
            "running" => ActivityType::Running,
            "walking" => ActivityType::Walking,
            "still" => ActivityType::Still,
            "tilting" => ActivityType::Tilting,
            _ => ActivityType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::InVehicle => "in_vehicle",
            ActivityType::OnBicycle => "on_bicycle",
            ActivityType::OnFoot => "on_foot",
            ActivityType::Running => "running",
            ActivityType::Walking => "walking",
            ActivityType::Still => "still",
            ActivityType::Tilting => "tilting",
            ActivityType::Unknown => "unknown",
        }
    }

    /// True for activities that involve moving under the subject's own power or a vehicle.
    pub fn is_moving(&self) -> bool {
        !matches!(
            self,
            ActivityType::Still | ActivityType::Tilting | ActivityType::Unknown
        )
    }
}
