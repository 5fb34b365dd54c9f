//! Configuration file handling for fvc-actor.
//!
//! Loads configuration from `~/.config/fvc-actor/config.toml` or a custom path.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::command::CameraDefaults;

/// Listen address used when none is configured.
pub const DEFAULT_LISTEN: &str = "127.0.0.1:9990";

/// Data root used when none is configured.
pub const DEFAULT_DATA_ROOT: &str = "$ICS_MHS_DATA_ROOT";

/// Commented configuration written by `config init`.
pub const DEFAULT_CONFIG: &str = r#"# fvc-actor configuration

[server]
# Address the command server listens on
listen = "127.0.0.1:9990"

[camera]
# SDK device index
device = 0
# Exposure time (us) and gain (db) programmed on every connect.
# Leave unset, or set to 0, to keep the camera's own values.
# exposure_time_us = 500
# gain_db = 10.0

[storage]
# Images are written to <data_root>/fvc/. `~`, $VAR and ${VAR} are expanded.
data_root = "$ICS_MHS_DATA_ROOT"
"#;

/// Configuration file structure for fvc-actor.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct CameraConfig {
    #[serde(default)]
    pub device: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposure_time_us: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gain_db: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_root")]
    pub data_root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
        }
    }
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

fn default_data_root() -> String {
    DEFAULT_DATA_ROOT.to_string()
}

impl Config {
    /// Load configuration from a file path, or the default location.
    ///
    /// A missing default file yields the defaults; an explicitly given path
    /// must exist. A file that exists but cannot be parsed is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path.is_some();
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if !explicit && !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            source: e,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Data root with `~` and environment variables expanded.
    pub fn data_root(&self) -> Result<PathBuf, ConfigError> {
        expand_path(&self.storage.data_root)
    }

    /// Camera defaults applied after each connect.
    pub fn camera_defaults(&self) -> CameraDefaults {
        CameraDefaults {
            exposure_time_us: self.camera.exposure_time_us,
            gain_db: self.camera.gain_db,
        }
    }

    /// Render as TOML, for `config show`.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to render configuration: {0}")]
    Serialize(#[source] toml::ser::Error),

    #[error("Environment variable '{0}' is not set")]
    UnresolvedVariable(String),

    #[error("Config file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Failed to write config file '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("fvc-actor").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/fvc-actor/config.toml")
        })
}

/// Expand a leading `~` and `$NAME` / `${NAME}` references.
pub fn expand_path(input: &str) -> Result<PathBuf, ConfigError> {
    let mut expanded = String::new();
    let rest = if input == "~" || input.starts_with("~/") {
        let home = dirs::home_dir().ok_or_else(|| ConfigError::UnresolvedVariable("HOME".to_string()))?;
        expanded.push_str(&home.to_string_lossy());
        &input[1..]
    } else {
        input
    };

    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            expanded.push(c);
            continue;
        }

        let mut name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                name.push(c);
            }
            if !closed {
                return Err(ConfigError::UnresolvedVariable(format!("{{{}", name)));
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    name.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            if name.is_empty() {
                expanded.push('$');
                continue;
            }
        }

        let value =
            std::env::var(&name).map_err(|_| ConfigError::UnresolvedVariable(name.clone()))?;
        expanded.push_str(&value);
    }

    Ok(PathBuf::from(expanded))
}

/// Write the commented default configuration to `path`, refusing to overwrite.
pub fn write_default(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(path, DEFAULT_CONFIG).map_err(|e| ConfigError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}
