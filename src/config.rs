//! Runtime settings for the sentinel.
//!
//! Settings live in an optional TOML file; every field has a documented
//! default so a missing or partial file is fine.
//!
//! ```toml
//! db_path = "data/events.db"
//! listen_addr = "0.0.0.0:3000"
//!
//! [rules]
//! illegal_push_start_hour = 14
//! illegal_push_end_hour = 16
//! forbidden_team_prefix = "hacker"
//! forbidden_team_suffix = "-admin"
//! min_repo_lifetime_minutes = 10
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for settings loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The settings file is not valid TOML.
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Top-level runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path of the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Address the HTTP server binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Thresholds for the policy rules.
    #[serde(default)]
    pub rules: RuleSettings,
}

/// Thresholds consulted by the rule checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSettings {
    /// Start of the illegal push window (UTC hour, inclusive).
    #[serde(default = "default_push_start_hour")]
    pub illegal_push_start_hour: u32,

    /// End of the illegal push window (UTC hour, exclusive).
    #[serde(default = "default_push_end_hour")]
    pub illegal_push_end_hour: u32,

    /// New teams whose name starts with this prefix are flagged.
    #[serde(default = "default_team_prefix")]
    pub forbidden_team_prefix: String,

    /// New teams whose name ends with this suffix are flagged.
    /// Disabled when absent.
    #[serde(default)]
    pub forbidden_team_suffix: Option<String>,

    /// Repositories deleted sooner than this many minutes after creation
    /// are flagged.
    #[serde(default = "default_min_repo_lifetime")]
    pub min_repo_lifetime_minutes: i64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/events.db")
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_push_start_hour() -> u32 {
    14
}

fn default_push_end_hour() -> u32 {
    16
}

fn default_team_prefix() -> String {
    "hacker".to_string()
}

fn default_min_repo_lifetime() -> i64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            db_path: default_db_path(),
            listen_addr: default_listen_addr(),
            rules: RuleSettings::default(),
        }
    }
}

impl Default for RuleSettings {
    fn default() -> Self {
        RuleSettings {
            illegal_push_start_hour: default_push_start_hour(),
            illegal_push_end_hour: default_push_end_hour(),
            forbidden_team_prefix: default_team_prefix(),
            forbidden_team_suffix: None,
            min_repo_lifetime_minutes: default_min_repo_lifetime(),
        }
    }
}

impl Settings {
    /// Loads settings from a TOML file.
    ///
    /// Missing keys fall back to their defaults; a missing file is an error
    /// (callers that want "optional file" semantics check existence first,
    /// see [`Settings::load_optional`]).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads settings from a TOML file if one is given, otherwise defaults.
    pub fn load_optional(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Settings::default()),
        }
    }
}
