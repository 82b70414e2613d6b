// ── Local draft storage ──
//
// A small string key/value store standing in for browser local storage.
// The settings form writes its in-progress state here on every change so
// an interrupted session can pick it up again.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::CoreError;

/// Key the settings draft is stored under.
pub const DRAFT_KEY: &str = "ipmonitor_config_draft";

/// String key/value storage for drafts.
pub trait DraftStore: Send + Sync + Debug {
    fn load(&self, key: &str) -> Result<Option<String>, CoreError>;
    fn store(&self, key: &str, value: &str) -> Result<(), CoreError>;
    fn remove(&self, key: &str) -> Result<(), CoreError>;
}

fn poisoned() -> CoreError {
    CoreError::Draft {
        message: "draft store lock poisoned".into(),
    }
}

// ── File-backed store ───────────────────────────────────────────────

/// Drafts persisted as one JSON object in a file.
#[derive(Debug)]
pub struct FileDraftStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileDraftStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, CoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(CoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&text).map_err(|e| CoreError::Draft {
            message: format!("{} is corrupt: {e}", self.path.display()),
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), CoreError> {
        let io_err = |source| CoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(entries).map_err(|e| CoreError::Draft {
            message: e.to_string(),
        })?;
        std::fs::write(&self.path, text).map_err(io_err)
    }
}

impl DraftStore for FileDraftStore {
    fn load(&self, key: &str) -> Result<Option<String>, CoreError> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        Ok(self.read_all()?.remove(key))
    }

    fn store(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let mut entries = self.read_all().unwrap_or_default();
        entries.insert(key.to_owned(), value.to_owned());
        debug!(path = %self.path.display(), key, "draft stored");
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            debug!(path = %self.path.display(), key, "draft removed");
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

// ── In-memory store ─────────────────────────────────────────────────

/// Process-local drafts. Used when no draft file is configured.
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStore for MemoryDraftStore {
    fn load(&self, key: &str) -> Result<Option<String>, CoreError> {
        let entries = self.entries.lock().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn store(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        entries.remove(key);
        Ok(())
    }
}
