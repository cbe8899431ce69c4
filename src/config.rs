//! TOML configuration with environment-variable overrides.

use crate::defaults;
use crate::error::{Result, ScribedError};
use crate::stabilize::DedupConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub dedup: DedupSection,
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Recognition engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub model: String,
    pub language: String,
    /// Clients should stream raw PCM (reported in the capability reply).
    pub pcm_input: bool,
}

/// Token deduplication configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DedupSection {
    pub history_size: usize,
    pub similarity_threshold: f32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::DEFAULT_HOST.to_string(),
            port: defaults::DEFAULT_PORT,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: "base".to_string(),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            pcm_input: false,
        }
    }
}

impl Default for DedupSection {
    fn default() -> Self {
        Self {
            history_size: defaults::DEDUP_HISTORY_SIZE,
            similarity_threshold: defaults::SIMILARITY_THRESHOLD,
        }
    }
}

impl From<DedupSection> for DedupConfig {
    fn from(section: DedupSection) -> Self {
        Self {
            history_size: section.history_size,
            similarity_threshold: section.similarity_threshold,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScribedError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                ScribedError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only falls back to defaults when the file is missing; invalid TOML is
    /// still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(ScribedError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - SCRIBED_HOST → server.host
    /// - SCRIBED_PORT → server.port
    /// - SCRIBED_MODEL → engine.model
    /// - SCRIBED_LANGUAGE → engine.language
    ///
    /// A set but unparsable SCRIBED_PORT is an error, not a silent skip.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(host) = std::env::var("SCRIBED_HOST") {
            if !host.is_empty() {
                self.server.host = host;
            }
        }

        if let Ok(port) = std::env::var("SCRIBED_PORT") {
            if !port.is_empty() {
                self.server.port =
                    port.parse()
                        .map_err(|_| ScribedError::ConfigInvalidValue {
                            key: "SCRIBED_PORT".to_string(),
                            message: format!("not a valid port number: {}", port),
                        })?;
            }
        }

        if let Ok(model) = std::env::var("SCRIBED_MODEL") {
            if !model.is_empty() {
                self.engine.model = model;
            }
        }

        if let Ok(language) = std::env::var("SCRIBED_LANGUAGE") {
            if !language.is_empty() {
                self.engine.language = language;
            }
        }

        Ok(self)
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/scribed/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scribed")
            .join("config.toml")
    }
}
