//! TOML configuration for the mirroring client.
//!
//! The file lives in the platform config directory unless the
//! `SCRMIRROR_CONFIG` environment variable points somewhere else:
//! - Windows:  `%APPDATA%\ScrMirror\config.toml`
//! - Linux:    `~/.config/scrmirror/config.toml`
//! - macOS:    `~/Library/Application Support/ScrMirror/config.toml`
//!
//! Every field has a serde default, so a missing file, an empty file, or a
//! file written by an older version all load:
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! video_port = 6587
//!
//! [recording]
//! path = "capture.h264"
//! ```

use std::path::{Path, PathBuf};

use scrmirror_core::FramePolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::record::RecordFormat;
use crate::infrastructure::network::DEFAULT_CONTROL_QUEUE_CAPACITY;
use crate::infrastructure::recording::DEFAULT_RECORD_QUEUE_CAPACITY;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "SCRMIRROR_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Where the device-side server listens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// Port of the video socket, opened first.
    #[serde(default = "default_video_port")]
    pub video_port: u16,
    /// Port of the control socket.
    #[serde(default = "default_control_port")]
    pub control_port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VideoConfig {
    /// What the decoder does when the renderer has not consumed the last frame.
    #[serde(default)]
    pub frame_policy: FramePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlConfig {
    #[serde(default = "default_control_queue_capacity")]
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordingConfig {
    /// Output file; recording is off when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Container format; inferred from the file extension when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<RecordFormat>,
    #[serde(default = "default_record_queue_capacity")]
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_video_port() -> u16 {
    6587
}
fn default_control_port() -> u16 {
    6588
}
fn default_control_queue_capacity() -> usize {
    DEFAULT_CONTROL_QUEUE_CAPACITY
}
fn default_record_queue_capacity() -> usize {
    DEFAULT_RECORD_QUEUE_CAPACITY
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            video_port: default_video_port(),
            control_port: default_control_port(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_control_queue_capacity(),
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            path: None,
            format: None,
            queue_capacity: default_record_queue_capacity(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl RecordingConfig {
    /// Output path and format, or `None` when recording is disabled or the
    /// format cannot be determined.
    pub fn target(&self) -> Option<(&Path, RecordFormat)> {
        let path = self.path.as_deref()?;
        let format = self.format.or_else(|| RecordFormat::from_path(path))?;
        Some((path, format))
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the config file path, honouring [`CONFIG_PATH_ENV`].
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when neither the override
/// nor the platform base directory is available.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }
    let dir = platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)?;
    Ok(dir.join("config.toml"))
}

/// Loads the config at `path`, returning defaults if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ClientConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(path: &Path, config: &ClientConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
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
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("ScrMirror"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("scrmirror"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("ScrMirror")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
