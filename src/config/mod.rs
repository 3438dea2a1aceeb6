use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

use crate::transcoders::TranscoderKind;

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file '{path}': {source}")]
  Read {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config file '{path}': {source}")]
  Parse {
    path: String,
    #[source]
    source: toml::de::Error,
  },
}

/// Filter directive used when neither `RUST_LOG` nor `log.level` is set.
/// The CLI prints results on stdout, so only problems are logged by default.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// `[log]` section
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LogConfig {
  /// `tracing_subscriber::EnvFilter` directive, e.g. `"storekit=debug"`
  pub level: String,
  /// Append logs to this file instead of stderr
  pub file: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: DEFAULT_LOG_LEVEL.to_string(),
      file: None,
    }
  }
}

/// Storage configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct StorageConfig {
  /// JSON file backing the persistent store; volatile storage if not set
  pub file: Option<PathBuf>,
  /// Transcoder used when none is given on the command line
  #[serde(default)]
  pub transcoder: TranscoderKind,
}

/// StoreKit configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
  /// Storage configuration
  #[serde(default)]
  pub storage: StorageConfig,

  /// Log configuration
  #[serde(default)]
  pub log: LogConfig,
}

impl Config {
  /// Load configuration from TOML file
  pub fn from_file(path: &str) -> Result<Self, ConfigError> {
    let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_string(),
      source,
    })?;

    Self::from_toml(&config_str).map_err(|source| ConfigError::Parse {
      path: path.to_string(),
      source,
    })
  }

  /// Parse configuration from a TOML string
  pub fn from_toml(config_str: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(config_str)
  }
}
