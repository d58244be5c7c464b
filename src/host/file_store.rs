//! JSON-file settings store with in-memory caching.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use super::memory::MemoryStore;
use super::store::{SettingsStore, StorageChanges};
use crate::error::{ReloadError, Result};

/// Settings persisted as a single JSON object.
///
/// The whole object is cached on open. A write rewrites the file first and
/// only touches the cache once the file is on disk; writes run one at a time.
pub struct FileStore {
    path: PathBuf,
    cache: MemoryStore,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let values = read_object(&path)?;

        log::debug!("Opened settings store {} ({} keys)", path.display(), values.len());
        Ok(Self {
            path,
            cache: MemoryStore::from_map(values),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pick up edits made to the file by another process.
    ///
    /// Changed and removed keys are notified like local writes. Returns the
    /// number of changed keys.
    pub fn sync_from_disk(&self) -> Result<usize> {
        let _writing = self.lock_writes()?;
        let changes = self.cache.replace(read_object(&self.path)?)?;
        let count = changes.len();
        if count > 0 {
            log::info!("Settings file changed on disk ({} keys)", count);
        }
        self.cache.notify(changes);
        Ok(count)
    }

    fn lock_writes(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock.lock().map_err(|e| ReloadError::Storage(e.to_string()))
    }

    /// Replace the file with `values`, through a temp file and a rename.
    fn write_file(&self, values: &Map<String, Value>) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp)?;
            let body = serde_json::to_string_pretty(values)?;
            writeln!(file, "{}", body)?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Read the file as a JSON object; a missing or blank file is empty
fn read_object(path: &Path) -> Result<Map<String, Value>> {
    if !path.exists() {
        return Ok(Map::new());
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(&content)? {
        Value::Object(map) => Ok(map),
        other => Err(ReloadError::Storage(format!(
            "{} does not hold a JSON object (found {})",
            path.display(),
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl SettingsStore for FileStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>> {
        self.cache.get(keys).await
    }

    async fn set(&self, values: Map<String, Value>) -> Result<()> {
        let changes = {
            let _writing = self.lock_writes()?;
            let current = self.cache.snapshot();
            let mut next = current.clone();
            next.extend(values.clone());
            if next == current {
                return Ok(());
            }

            self.write_file(&next)?;
            self.cache.apply(values)?
        };
        self.cache.notify(changes);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChanges> {
        self.cache.subscribe()
    }
}
