//! TOML configuration for the IR box client.
//!
//! The file is looked up in this order:
//! 1. an explicit path (`--config` or the `IRBOX_CONFIG` environment variable),
//! 2. the platform config directory:
//!    - Windows:  `%APPDATA%\IRBox\config.toml`
//!    - Linux:    `$XDG_CONFIG_HOME/irbox/config.toml` (or `~/.config/irbox/`)
//!    - macOS:    `~/Library/Application Support/IRBox/config.toml`
//!
//! A missing file is not an error: every field has a default, so the client
//! works on first run.
//!
//! ```toml
//! [device]
//! host = "192.168.1.50"
//! port = 333
//! response_timeout_ms = 5000
//! soft_connect = true
//!
//! [logging]
//! log_level = "debug"
//!
//! [remotes]
//! demo = "Demo Remote"
//! tv = "Living Room TV"
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` take the value of
//! `some_fn()` when absent, so a file may set only the keys it cares about.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::network::DeviceConfig;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "IRBOX_CONFIG";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IrboxConfig {
    #[serde(default)]
    pub device: DeviceSection,
    #[serde(default)]
    pub logging: LoggingSection,
    /// Remote-control catalogue: identifier → display name.
    #[serde(default = "default_remotes")]
    pub remotes: BTreeMap<String, String>,
}

/// Where the IR box is and how patiently to talk to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
    /// Retry a failed lazy connect once.
    #[serde(default)]
    pub retry_connect: bool,
    /// Defer opening the socket until the first command.
    #[serde(default = "default_true")]
    pub soft_connect: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSection {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    333
}
fn default_connect_timeout_ms() -> u64 {
    1_000
}
fn default_write_timeout_ms() -> u64 {
    1_000
}
fn default_response_timeout_ms() -> u64 {
    5_000
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_remotes() -> BTreeMap<String, String> {
    BTreeMap::from([("demo".to_string(), "Demo Remote".to_string())])
}

impl Default for IrboxConfig {
    fn default() -> Self {
        Self {
            device: DeviceSection::default(),
            logging: LoggingSection::default(),
            remotes: default_remotes(),
        }
    }
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            response_timeout_ms: default_response_timeout_ms(),
            retry_connect: false,
            soft_connect: default_true(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl DeviceSection {
    /// Runtime timeouts and retry policy for the client.
    pub fn device_config(&self) -> DeviceConfig {
        DeviceConfig {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            write_timeout: Duration::from_millis(self.write_timeout_ms),
            response_timeout: Duration::from_millis(self.response_timeout_ms),
            retry_connect: self.retry_connect,
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads the config from `explicit` when given, otherwise from the default
/// location.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config(explicit: Option<&Path>) -> Result<IrboxConfig, ConfigError> {
    match explicit {
        Some(path) => load_config_from(path),
        None => load_config_from(&config_file_path()?),
    }
}

/// Loads the config at `path`, returning `IrboxConfig::default()` if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<IrboxConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(IrboxConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Writes `config` to `path` as pretty TOML, creating parent directories.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &IrboxConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("IRBox"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("irbox"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("IRBox")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
