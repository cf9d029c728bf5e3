//! Usage-hint counter and its persistence
//!
//! The first few times a trigger session opens, the editor shows a short hint
//! next to the caret. The counter is process-wide, loaded at startup and saved
//! on shutdown; once it reaches the threshold the hint is never shown again.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Default number of times the hint is shown
pub const DEFAULT_HINT_THRESHOLD: u32 = 5;

/// Text of the usage hint
pub const HINT_TEXT: &str = "type to filter commands";

#[derive(Debug, Error)]
pub enum HintStoreError {
    #[error("failed to access hint store: {0}")]
    Io(#[from] io::Error),

    #[error("malformed hint store: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Persistence collaborator for the counter
pub trait HintStore: Send + Sync {
    fn load(&self) -> Result<u32, HintStoreError>;
    fn save(&self, shown: u32) -> Result<(), HintStoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HintRecord {
    shown: u32,
}

/// Stores the counter as `{"shown": n}`
#[derive(Debug, Clone)]
pub struct JsonHintStore {
    path: PathBuf,
}

impl JsonHintStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/command-completion/usage-hints.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("command-completion").join("usage-hints.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HintStore for JsonHintStore {
    fn load(&self) -> Result<u32, HintStoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str::<HintRecord>(&raw)?.shown),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, shown: u32) -> Result<(), HintStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string(&HintRecord { shown })?;
        fs::write(&self.path, raw)?;
        debug!("Saved usage-hint counter ({}) to {:?}", shown, self.path);
        Ok(())
    }
}

/// Process-wide count of displayed hints
#[derive(Debug)]
pub struct UsageHintCounter {
    shown: AtomicU32,
    threshold: u32,
}

impl UsageHintCounter {
    pub fn new(threshold: u32, shown: u32) -> Self {
        Self {
            shown: AtomicU32::new(shown),
            threshold,
        }
    }

    /// Loads the counter, starting from zero if the store is unreadable
    pub fn load(store: &dyn HintStore, threshold: u32) -> Self {
        let shown = store.load().unwrap_or_else(|e| {
            warn!("Could not load usage-hint counter, starting from zero: {}", e);
            0
        });
        Self::new(threshold, shown)
    }

    pub fn persist(&self, store: &dyn HintStore) -> Result<(), HintStoreError> {
        store.save(self.shown())
    }

    pub fn shown(&self) -> u32 {
        self.shown.load(Ordering::Relaxed)
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn should_show(&self) -> bool {
        self.shown() < self.threshold
    }

    /// Records one display and returns the new count
    pub fn record_shown(&self) -> u32 {
        self.shown.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Default for UsageHintCounter {
    fn default() -> Self {
        Self::new(DEFAULT_HINT_THRESHOLD, 0)
    }
}
