//! Configuration system for Hive.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $HIVE_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/hive/config.toml
//!   3. ~/.config/hive/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HiveConfig {
    pub network: NetworkConfig,
    pub liveness: LivenessConfig,
    pub job: JobConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Bind address for the master's HTTP surface.
    pub host: String,
    /// Port for the master's HTTP surface.
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    /// A worker with no liveness signal for this long is expired and its
    /// in-flight tasks are reclaimed.
    pub timeout_secs: u64,
    /// Interval between liveness sweeps.
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Path to the JSON jobfile.
    pub jobfile: PathBuf,
    /// How many times a task may be reclaimed before it is marked
    /// permanently failed.
    pub max_task_retries: u32,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

impl Default for HiveConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            liveness: LivenessConfig::default(),
            job: JobConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5678,
        }
    }
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            sweep_interval_secs: 2,
        }
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            jobfile: PathBuf::from("jobfile.json"),
            max_task_retries: 3,
        }
    }
}

// ── Path helpers ─────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("hive")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ──────────────────────────────────────────────────────────────────

impl HiveConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            HiveConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("HIVE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&HiveConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text)
                .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply HIVE_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("HIVE_NETWORK__HOST") {
            self.network.host = v;
        }
        if let Ok(v) = std::env::var("HIVE_NETWORK__PORT") {
            if let Ok(p) = v.parse() {
                self.network.port = p;
            }
        }
        if let Ok(v) = std::env::var("HIVE_LIVENESS__TIMEOUT_SECS") {
            if let Ok(t) = v.parse() {
                self.liveness.timeout_secs = t;
            }
        }
        if let Ok(v) = std::env::var("HIVE_LIVENESS__SWEEP_INTERVAL_SECS") {
            if let Ok(t) = v.parse() {
                self.liveness.sweep_interval_secs = t;
            }
        }
        if let Ok(v) = std::env::var("HIVE_JOB__JOBFILE") {
            self.job.jobfile = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("HIVE_JOB__MAX_TASK_RETRIES") {
            if let Ok(n) = v.parse() {
                self.job.max_task_retries = n;
            }
        }
    }
}
