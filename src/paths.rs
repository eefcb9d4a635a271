//! Home-based storage paths for workbox state.
//!
//! Layout under `~/.workbox/` (or `$WORKBOX_HOME`):
//! - `workbox.yaml` - user configuration
//! - `state/<instance-hash>/` - persisted selection, one directory per instance
//! - `logs/<instance-hash>/` - JSONL event logs

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

const WORKBOX_DIR: &str = ".workbox";

/// Overrides the home-based workbox directory.
pub const WORKBOX_HOME_ENV: &str = "WORKBOX_HOME";

/// Returns the workbox directory, creating it if needed.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined or the
/// directory cannot be created.
pub fn workbox_home_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os(WORKBOX_HOME_ENV) {
        Some(custom) if !custom.is_empty() => PathBuf::from(custom),
        _ => dirs::home_dir()
            .context("Could not determine home directory for workbox storage")?
            .join(WORKBOX_DIR),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create workbox directory: {}", dir.display()))?;
    Ok(dir)
}

/// `~/.workbox/workbox.yaml`
pub fn config_path() -> Result<PathBuf> {
    Ok(workbox_home_dir()?.join("workbox.yaml"))
}

/// `~/.workbox/state/<instance-hash>/`
pub fn state_dir(endpoint: &str) -> Result<PathBuf> {
    instance_dir(&workbox_home_dir()?, "state", endpoint)
}

/// `~/.workbox/logs/<instance-hash>/`
pub fn logs_dir(endpoint: &str) -> Result<PathBuf> {
    instance_dir(&workbox_home_dir()?, "logs", endpoint)
}

/// Creates `<home>/<kind>/<instance-hash>/`.
pub fn instance_dir(home: &Path, kind: &str, endpoint: &str) -> Result<PathBuf> {
    let dir = home.join(kind).join(instance_hash(endpoint));
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {} directory: {}", kind, dir.display()))?;
    Ok(dir)
}

/// SHA256 of the normalized endpoint URL, truncated to 12 hex characters.
///
/// Case and a trailing slash do not change the hash.
pub fn instance_hash(endpoint: &str) -> String {
    let normalized = endpoint.trim().trim_end_matches('/').to_ascii_lowercase();

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    let result = hasher.finalize();

    hex_encode(&result[..6])
}

/// Encodes bytes as lowercase hex string.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
