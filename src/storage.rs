//! Durable key-value storage used to keep the selection across sessions.
//!
//! Values are JSON documents. [`FileKeyValueStore`] keeps one file per key and
//! replaces it atomically (temp file + rename) under an advisory lock, so two
//! hosts sharing a state directory never observe a half-written value.

use anyhow::{Context, Result};
use fs2::FileExt;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Get/set capability over JSON values.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: &Value) -> Result<()>;
}

/// Rejects keys that could escape the store directory.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        anyhow::bail!("Storage key must not be empty");
    }
    if key.starts_with('.') {
        anyhow::bail!("Storage key must not start with '.': {}", key);
    }
    if let Some(c) = key
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        anyhow::bail!("Storage key '{}' contains invalid character '{}'", key, c);
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Creates the store directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create storage directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn lock(&self, key: &str) -> Result<File> {
        let lock_path = self.dir.join(format!("{}.lock", key));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("Failed to lock: {}", lock_path.display()))?;
        Ok(file)
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        validate_key(key)?;
        let path = self.value_path(key);
        let lock = self.lock(key)?;

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read: {}", path.display()))
            }
        };
        drop(lock);

        let value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse stored value: {}", path.display()))?;
        Ok(Some(value))
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        validate_key(key)?;
        let path = self.value_path(key);
        let temp_path = path.with_extension("json.tmp");
        let _lock = self.lock(key)?;

        let content = serde_json::to_string_pretty(value).context("Failed to serialize value")?;
        fs::write(&temp_path, content)
            .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;
        fs::rename(&temp_path, &path)
            .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

        tracing::debug!(key, path = %path.display(), "stored value");
        Ok(())
    }
}

/// Process-local store; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        validate_key(key)?;
        let values = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        validate_key(key)?;
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        values.insert(key.to_string(), value.clone());
        Ok(())
    }
}
