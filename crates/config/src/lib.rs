//! Configuration loading, validation, and management for Roundtable.
//!
//! Loads configuration from `~/.roundtable/config.toml` with environment
//! variable overrides. Validates all settings at load time.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The root configuration structure.
///
/// Maps directly to `~/.roundtable/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Model identifier forwarded to the analysis provider.
    #[serde(default = "default_model")]
    pub model: String,

    /// Default turn budget (supervisor invocations per turn).
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Memory log and snapshot store configuration.
    #[serde(default)]
    pub memory: MemoryConfig,
}

fn default_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_max_steps() -> u32 {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_steps: default_max_steps(),
            memory: MemoryConfig::default(),
        }
    }
}

/// Configuration for the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Storage backend: "file" (persistent) or "memory" (in-process).
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Directory for the file backend's documents.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Global cap on memory-log entries; oldest are evicted first.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// How many recent entries the dedup check scans.
    #[serde(default = "default_dedup_window")]
    pub dedup_window: usize,

    /// Jaccard similarity at or above which a response is a duplicate.
    #[serde(default = "default_dedup_threshold")]
    pub dedup_threshold: f64,
}

fn default_backend() -> String {
    "file".into()
}
fn default_dir() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".roundtable").join("memory")
}
fn default_max_entries() -> usize {
    1000
}
fn default_dedup_window() -> usize {
    10
}
fn default_dedup_threshold() -> f64 {
    0.8
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            dir: default_dir(),
            max_entries: default_max_entries(),
            dedup_window: default_dedup_window(),
            dedup_threshold: default_dedup_threshold(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default path (`~/.roundtable/config.toml`).
    ///
    /// Environment variable overrides (highest priority):
    /// - `ROUNDTABLE_MODEL`
    /// - `ROUNDTABLE_MAX_STEPS`
    /// - `ROUNDTABLE_MEMORY_BACKEND`
    /// - `ROUNDTABLE_MEMORY_DIR`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(model) = std::env::var("ROUNDTABLE_MODEL") {
            config.model = model;
        }
        if let Ok(steps) = std::env::var("ROUNDTABLE_MAX_STEPS") {
            config.max_steps = steps.parse().map_err(|_| {
                ConfigError::ValidationError(format!("ROUNDTABLE_MAX_STEPS is not a number: {steps}"))
            })?;
        }
        if let Ok(backend) = std::env::var("ROUNDTABLE_MEMORY_BACKEND") {
            config.memory.backend = backend;
        }
        if let Ok(dir) = std::env::var("ROUNDTABLE_MEMORY_DIR") {
            config.memory.dir = PathBuf::from(dir);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".roundtable")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("model must not be empty".into()));
        }
        if self.max_steps < 1 {
            return Err(ConfigError::ValidationError("max_steps must be at least 1".into()));
        }
        match self.memory.backend.as_str() {
            "file" | "memory" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "unknown memory backend: {other} (expected \"file\" or \"memory\")"
                )));
            }
        }
        if self.memory.max_entries < 1 {
            return Err(ConfigError::ValidationError(
                "memory.max_entries must be at least 1".into(),
            ));
        }
        if self.memory.dedup_window < 1 {
            return Err(ConfigError::ValidationError(
                "memory.dedup_window must be at least 1".into(),
            ));
        }
        if !(self.memory.dedup_threshold > 0.0 && self.memory.dedup_threshold <= 1.0) {
            return Err(ConfigError::ValidationError(
                "memory.dedup_threshold must be in (0.0, 1.0]".into(),
            ));
        }
        Ok(())
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
