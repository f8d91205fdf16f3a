//! Leveled progress counters with write-through persistence.
//!
//! Each activity keeps one non-negative counter. Difficulty levels are
//! derived, never stored: `level = progress / step`, clamped to the
//! activity's maximum. A wrong answer sends the counter back to the start
//! of the current level, never below it, and leaves it untouched when it
//! already sits exactly on a boundary.
//!
//! Every mutation writes through immediately; a crash or reload must not
//! silently rewind what a child has earned. Persistence failures stay
//! soft: reads fall back to an empty store, failed writes leave the
//! in-memory value authoritative for the session.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::EarplayError;

/// Version tag carried by the persisted blob for export/import tooling.
pub const PROGRESS_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProgressBlob {
    version: u32,
    activities: HashMap<String, u32>,
}

impl Default for ProgressBlob {
    fn default() -> Self {
        ProgressBlob { version: PROGRESS_FORMAT_VERSION, activities: HashMap::new() }
    }
}

/// Key-value persistence seam, analogous to the host platform's local
/// storage.
pub trait ProgressBackend: Send {
    fn read(&self) -> Result<Option<String>, EarplayError>;
    fn write(&self, blob: &str) -> Result<(), EarplayError>;
}

/// Stores the blob as a JSON file on disk.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> JsonFileBackend {
        JsonFileBackend { path: path.into() }
    }
}

impl ProgressBackend for JsonFileBackend {
    fn read(&self) -> Result<Option<String>, EarplayError> {
        if !self.path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&self.path)
            .map(Some)
            .map_err(|e| EarplayError::Persistence(e.to_string()))
    }

    fn write(&self, blob: &str) -> Result<(), EarplayError> {
        fs::write(&self.path, blob).map_err(|e| EarplayError::Persistence(e.to_string()))
    }
}

/// In-memory backend for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryBackend {
    cell: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> MemoryBackend {
        MemoryBackend::default()
    }

    /// Last written blob, for assertions.
    pub fn snapshot(&self) -> Option<String> {
        self.cell.lock().clone()
    }
}

impl ProgressBackend for MemoryBackend {
    fn read(&self) -> Result<Option<String>, EarplayError> {
        Ok(self.cell.lock().clone())
    }

    fn write(&self, blob: &str) -> Result<(), EarplayError> {
        *self.cell.lock() = Some(blob.to_string());
        Ok(())
    }
}

/// Per-activity progress counters backed by a [`ProgressBackend`].
pub struct ProgressStore {
    blob: ProgressBlob,
    backend: Box<dyn ProgressBackend>,
}

impl ProgressStore {
    /// Load existing progress through the backend. Unreadable or corrupt
    /// data falls back to an empty store rather than failing the activity.
    pub fn open(backend: Box<dyn ProgressBackend>) -> ProgressStore {
        let blob = match backend.read() {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_default(),
            _ => ProgressBlob::default(),
        };
        ProgressStore { blob, backend }
    }

    /// Convenience constructor for the common JSON-file case.
    pub fn open_file(path: impl Into<PathBuf>) -> ProgressStore {
        ProgressStore::open(Box::new(JsonFileBackend::new(path)))
    }

    pub fn get(&self, activity: &str) -> u32 {
        self.blob.activities.get(activity).copied().unwrap_or(0)
    }

    /// Record a correct answer: increment by one and persist. Returns the
    /// new counter value.
    pub fn on_correct(&mut self, activity: &str) -> u32 {
        let value = self.get(activity) + 1;
        self.blob.activities.insert(activity.to_string(), value);
        self.persist();
        value
    }

    /// Record a wrong answer: reset to the start of the current level.
    /// A counter already exactly on a level boundary stays unchanged.
    /// Returns the new counter value.
    pub fn on_wrong(&mut self, activity: &str, step: u32) -> u32 {
        let step = step.max(1);
        let current = self.get(activity);
        let value = (current / step) * step;
        if value != current {
            self.blob.activities.insert(activity.to_string(), value);
            self.persist();
        }
        value
    }

    /// Derived difficulty level, clamped to `max_level`.
    pub fn level_of(&self, activity: &str, step: u32, max_level: u32) -> u32 {
        (self.get(activity) / step.max(1)).min(max_level)
    }

    /// Reset one activity to zero and persist.
    pub fn reset(&mut self, activity: &str) {
        self.blob.activities.insert(activity.to_string(), 0);
        self.persist();
    }

    fn persist(&self) {
        if let Ok(raw) = serde_json::to_string(&self.blob) {
            // Best effort: on failure the in-memory value stays
            // authoritative for the rest of the session.
            let _ = self.backend.write(&raw);
        }
    }
}
