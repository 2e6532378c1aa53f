//! Durable key-value storage for the last reported title.
//!
//! The store exists so outside tools can inspect what was last detected. It
//! is independent of the change gate, which never reads it back.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::types::{WatchError, WatchResult};

/// Key under which the last canonical title is written.
pub const LAST_TITLE_KEY: &str = "lastProductTitle";

/// Minimal durable key-value store.
pub trait TitleStore {
    fn get(&self, key: &str) -> WatchResult<Option<String>>;
    fn put(&mut self, key: &str, value: &str) -> WatchResult<()>;
}

/// In-memory store, for tests and ephemeral runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryTitleStore {
    entries: BTreeMap<String, String>,
}

impl MemoryTitleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TitleStore for MemoryTitleStore {
    fn get(&self, key: &str) -> WatchResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> WatchResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object on disk. Every write replaces the file atomically.
///
/// Inside a tokio runtime the write runs on the blocking pool, so `put`
/// returns without touching the disk; failures there are logged. Writes are
/// versioned and an older snapshot never overwrites a newer one. Outside a
/// runtime the write happens inline and its error is returned.
#[derive(Debug)]
pub struct FileTitleStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    version: u64,
    written: Arc<Mutex<u64>>,
}

impl FileTitleStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> WatchResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw).map_err(|e| {
                    WatchError::Storage(format!("Failed to read {}: {e}", path.display()))
                })?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries,
            version: 0,
            written: Arc::new(Mutex::new(0)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&mut self) -> WatchResult<()> {
        self.version += 1;
        let payload = serde_json::to_vec_pretty(&self.entries)?;
        let version = self.version;

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let path = self.path.clone();
                let written = Arc::clone(&self.written);
                handle.spawn_blocking(move || {
                    if let Err(e) = write_versioned(&path, &payload, version, &written) {
                        tracing::warn!("Failed to persist {}: {e}", path.display());
                    }
                });
                Ok(())
            }
            Err(_) => write_versioned(&self.path, &payload, version, &self.written),
        }
    }
}

fn write_versioned(
    path: &Path,
    payload: &[u8],
    version: u64,
    written: &Mutex<u64>,
) -> WatchResult<()> {
    let mut latest = written.lock().unwrap_or_else(|e| e.into_inner());
    if *latest >= version {
        tracing::trace!("Skipping stale write of {}", path.display());
        return Ok(());
    }
    write_atomic(path, payload)?;
    *latest = version;
    Ok(())
}

fn write_atomic(path: &Path, payload: &[u8]) -> WatchResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp = path.with_extension("tmp");
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(payload)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

impl TitleStore for FileTitleStore {
    fn get(&self, key: &str) -> WatchResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> WatchResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }
}
