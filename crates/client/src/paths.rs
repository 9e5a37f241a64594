//! Central path resolution for fogsync's local files.
//!
//! Resolved once at startup from: CLI `--data-dir` > `FOGSYNC_DATA_DIR` env > `~/.fogsync`.

use std::io;
use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "FOGSYNC_DATA_DIR";

/// Resolve the data directory.
///
/// Falls back to the system temp dir when no home directory is known.
pub fn resolve_data_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    if let Some(env_val) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(env_val);
    }
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".fogsync")
}

pub fn log_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

pub fn log_file_name() -> &'static str {
    "fogsync.log"
}

/// Create all required subdirectories under the data dir.
pub fn ensure_dirs(data_dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(data_dir)?;
    std::fs::create_dir_all(log_dir(data_dir))?;
    Ok(())
}
