//! Data directory resolution.

use std::path::PathBuf;

/// Resolve the Murmur data directory.
///
/// Honors `MURMUR_DATA_DIR`, falling back to `~/.murmur`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MURMUR_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".murmur")
}
