//! Configuration types for the reminder scheduler.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Medicine store settings.
    pub store: StoreConfig,
    /// Job scheduler and reconciliation settings.
    pub scheduler: SchedulerConfig,
    /// Text-to-speech settings.
    pub tts: TtsConfig,
}

/// Medicine store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the JSON data file.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: crate::app_dirs::store_file(),
        }
    }
}

/// Job scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How often the timing loop checks for due triggers (seconds).
    pub tick_interval_secs: u64,
    /// How often the periodic reconciliation sweep runs (seconds).
    pub reconcile_interval_secs: u64,
    /// How late an occurrence may be evaluated and still fire (seconds).
    ///
    /// Occurrences older than this (e.g. after the machine slept) are skipped.
    pub misfire_grace_secs: u64,
    /// Skip scheduled firings outside a medicine's start/end date window.
    ///
    /// Off by default: triggers fire daily regardless of the date range.
    pub respect_date_range: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 5,
            reconcile_interval_secs: 60,
            misfire_grace_secs: 60,
            respect_date_range: false,
        }
    }
}

impl SchedulerConfig {
    /// Timing loop period. Never zero.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }

    /// Periodic reconciliation period. Never zero.
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs.max(1))
    }

    /// Maximum lateness at which an occurrence still fires.
    pub fn misfire_grace(&self) -> Duration {
        Duration::from_secs(self.misfire_grace_secs)
    }
}

/// Which speech backend to use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsBackend {
    /// Google Translate text-to-speech (MP3 over HTTPS).
    #[default]
    Gtts,
    /// No synthesis; every reminder records a synthesis error.
    Disabled,
}

/// Text-to-speech configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Primary speech backend.
    pub backend: TtsBackend,
    /// Backends tried in order when the primary fails.
    pub fallbacks: Vec<TtsBackend>,
    /// Upper bound on one synthesis request (seconds).
    pub timeout_secs: u64,
    /// Directory where reminder audio files are written.
    pub audio_dir: PathBuf,
    /// Google TTS settings.
    pub gtts: GttsConfig,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            backend: TtsBackend::Gtts,
            fallbacks: Vec::new(),
            timeout_secs: 20,
            audio_dir: crate::app_dirs::audio_dir(),
            gtts: GttsConfig::default(),
        }
    }
}

impl TtsConfig {
    /// Synthesis timeout. Never zero.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Google Translate TTS settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GttsConfig {
    /// Language code (`tl` query parameter).
    pub lang: String,
    /// Top-level domain of the endpoint, e.g. `com` or `co.uk` (accent).
    pub tld: String,
    /// Explicit base URL; overrides `tld` when set.
    pub base_url: Option<String>,
}

impl Default for GttsConfig {
    fn default() -> Self {
        Self {
            lang: "en".to_owned(),
            tld: "com".to_owned(),
            base_url: None,
        }
    }
}

impl GttsConfig {
    /// Resolved base URL without trailing slash.
    pub fn effective_base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_owned(),
            None => format!("https://translate.google.{}", self.tld),
        }
    }
}

impl ReminderConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::ReminderError::Config(e.to_string()))
    }

    /// Load from `path` when it exists, otherwise fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> crate::error::Result<Self> {
        if path.is_file() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ReminderError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> PathBuf {
        crate::app_dirs::config_file()
    }
}
