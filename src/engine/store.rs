//! Persistence collaborators for odometer state.
//!
//! The in-memory engine state is the source of truth for a running process;
//! stores only need to be eventually consistent with it. Provides:
//! - `OdometerStore` - the load/save/clear contract
//! - `MemoryStore` - in-process slot, useful for tests and previews
//! - `JsonFileStore` - one JSON document on disk
//! - `NullStore` - discards everything

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use log::debug;

use super::state::OdometerState;
use crate::Result;

/// Durable storage for [`OdometerState`] snapshots.
///
/// Called from whichever thread delivered the fix, so implementations must be
/// `Send + Sync`.
pub trait OdometerStore: Send + Sync {
    /// Load the stored state, or `None` if nothing was stored yet.
    fn load(&self) -> Result<Option<OdometerState>>;
    /// Replace the stored state.
    fn save(&self, state: &OdometerState) -> Result<()>;
    /// Remove the stored state.
    fn clear(&self) -> Result<()>;
}

/// Store that keeps the last saved state in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<Option<OdometerState>>,
    saves: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with a state, as if saved by an earlier run.
    pub fn with_state(state: OdometerState) -> Self {
        Self {
            slot: Mutex::new(Some(state)),
            saves: AtomicU64::new(0),
        }
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    /// The currently stored state.
    pub fn stored(&self) -> Option<OdometerState> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OdometerStore for MemoryStore {
    fn load(&self) -> Result<Option<OdometerState>> {
        Ok(self.stored())
    }

    fn save(&self, state: &OdometerState) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(*state);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Store that writes the state as a JSON document.
///
/// Writes go to a sibling `.tmp` file first and are renamed into place, so a
/// crash mid-write leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl OdometerStore for JsonFileStore {
    fn load(&self) -> Result<Option<OdometerState>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state: OdometerState = serde_json::from_str(&content)?;
        debug!(
            "[JsonFileStore] loaded {:.1}m from {}",
            state.total_distance,
            self.path.display()
        );
        Ok(Some(state))
    }

    fn save(&self, state: &OdometerState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            serde_json::to_writer_pretty(&mut file, state)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Store that never persists anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl OdometerStore for NullStore {
    fn load(&self) -> Result<Option<OdometerState>> {
        Ok(None)
    }

    fn save(&self, _state: &OdometerState) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }
}
