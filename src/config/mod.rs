//! Configuration module for vispipe
//!
//! A `PipelineConfig` selects the executive strategy that newly added
//! algorithms receive, the worker pool size of the parallel executive, and
//! the logging setup.
//!
//! # Files
//!
//! JSON is the primary format; a path ending in `.toml` is read and written
//! as TOML instead. The per-user default lives in the platform config
//! directory:
//! - **Linux**: `~/.config/dev.hxyulin.vispipe/pipeline.json`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.vispipe/pipeline.json`
//! - **Windows**: `%APPDATA%\dev.hxyulin.vispipe\pipeline.json`
//!
//! # Example
//!
//! ```ignore
//! use vispipe::config::{init_logging, PipelineConfig};
//! use vispipe::pipeline::Pipeline;
//!
//! let config = PipelineConfig::load_or_default("pipeline.toml");
//! let _guard = init_logging(&config.logging)?;
//! let pipeline = Pipeline::from_config(&config)?;
//! ```

pub mod logging;

pub use logging::init_logging;

use crate::error::{Result, VisPipeError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dev.hxyulin.vispipe";

/// Default config filename
pub const CONFIG_FILE: &str = "pipeline.json";

/// Per-user config directory
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Default config file location
pub fn default_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Execution strategy names as they appear in config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutiveKindConfig {
    DemandDriven,
    #[default]
    SequentialComposite,
    ParallelComposite,
}

/// Executive selection for newly added algorithms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutiveConfig {
    pub default_kind: ExecutiveKindConfig,
    /// Worker threads of the parallel executive. 0 uses available parallelism.
    pub worker_threads: usize,
}

impl Default for ExecutiveConfig {
    fn default() -> Self {
        Self {
            default_kind: ExecutiveKindConfig::SequentialComposite,
            worker_threads: 0,
        }
    }
}

/// Logging setup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    pub filter: String,
    /// Also write logs to this file
    pub log_file: Option<PathBuf>,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,vispipe=debug".to_string(),
            log_file: None,
            ansi: true,
        }
    }
}

fn default_config_version() -> u32 {
    1
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub executive: ExecutiveConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version: default_config_version(),
            executive: ExecutiveConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "toml")
}

impl PipelineConfig {
    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VisPipeError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::parse(&content, is_toml(path)).map_err(|e| e.with_context(format!("{:?}", path)))
    }

    fn parse(content: &str, toml: bool) -> Result<Self> {
        if toml {
            Ok(toml::from_str(content)?)
        } else {
            Ok(serde_json::from_str(content)?)
        }
    }

    /// Load a config file, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load pipeline config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Load from the per-user location, or defaults if there is none
    pub fn load_user() -> Self {
        match default_path() {
            Some(path) if path.exists() => Self::load_or_default(path),
            _ => Self::default(),
        }
    }

    /// Save config to disk
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                VisPipeError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = if is_toml(path) {
            toml::to_string_pretty(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };

        std::fs::write(path, content).map_err(|e| {
            VisPipeError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }
}
