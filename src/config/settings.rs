//! Configuration settings for Referat.

use crate::error::{ReferatError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub gemini: GeminiSettings,
    pub slicing: SlicingSettings,
    pub pipeline: PipelineSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data (downloads and workspaces).
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.referat".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Gemini API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    /// API key. Usually supplied via the GEMINI_API_KEY environment variable
    /// at invocation; a value here takes effect when the variable is unset.
    pub api_key: Option<String>,
    /// Model used for transcription and summarization.
    pub model: String,
    /// Request cap per trailing 60-second window, shared by all workers.
    pub max_requests_per_minute: usize,
    /// Retry budget for one throttled call.
    pub max_retries: u32,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            max_requests_per_minute: 10,
            max_retries: 5,
        }
    }
}

/// Audio windowing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlicingSettings {
    /// Window length in seconds.
    pub window_seconds: u64,
    /// Overlap between consecutive windows in seconds.
    pub overlap_seconds: u64,
}

impl Default for SlicingSettings {
    fn default() -> Self {
        Self {
            window_seconds: 5 * 60,
            overlap_seconds: 20,
        }
    }
}

/// Map-stage execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Upper bound on concurrently processed slices. The effective pool size
    /// is further clamped by available parallelism and the slice count.
    pub max_parallel_slices: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_parallel_slices: 2,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            settings.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ReferatError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("referat")
            .join("config.toml")
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.slicing.window_seconds == 0 {
            return Err(ReferatError::Config(
                "slicing.window_seconds must be greater than zero".into(),
            ));
        }
        if self.gemini.max_requests_per_minute == 0 {
            return Err(ReferatError::Config(
                "gemini.max_requests_per_minute must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Directory holding downloaded/ingested source audio.
    pub fn audio_dir(&self) -> PathBuf {
        self.data_dir().join("audio")
    }

    /// Root directory for per-run workspaces.
    pub fn workspace_dir(&self) -> PathBuf {
        self.data_dir().join("workspace")
    }
}
