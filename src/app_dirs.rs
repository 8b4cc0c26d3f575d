//! Centralized application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | App data | `~/Library/Application Support/medremind/` | `~/.local/share/medremind/` |
//! | Config | `~/Library/Application Support/medremind/` | `~/.config/medremind/` |
//!
//! # Environment Overrides
//!
//! - `MEDREMIND_DATA_DIR` overrides [`data_dir`]
//! - `MEDREMIND_CONFIG_DIR` overrides [`config_dir`]

use std::ffi::OsString;
use std::path::PathBuf;

/// An override wins; otherwise `<base>/medremind`, or `fallback` when the
/// platform has no base directory.
fn resolve_dir(override_dir: Option<OsString>, base: Option<PathBuf>, fallback: &str) -> PathBuf {
    match override_dir {
        Some(dir) => PathBuf::from(dir),
        None => base.map_or_else(|| PathBuf::from(fallback), |d| d.join("medremind")),
    }
}

/// Application data root directory.
///
/// Holds the medicine store, generated reminder audio and logs.
#[must_use]
pub fn data_dir() -> PathBuf {
    resolve_dir(
        std::env::var_os("MEDREMIND_DATA_DIR"),
        dirs::data_dir(),
        "/tmp/medremind-data",
    )
}

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    resolve_dir(
        std::env::var_os("MEDREMIND_CONFIG_DIR"),
        dirs::config_dir(),
        "/tmp/medremind-config",
    )
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Medicine store path (`data_dir()/med_data.json`).
#[must_use]
pub fn store_file() -> PathBuf {
    data_dir().join("med_data.json")
}

/// Reminder audio directory (`data_dir()/reminder_audio/`).
#[must_use]
pub fn audio_dir() -> PathBuf {
    data_dir().join("reminder_audio")
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}
