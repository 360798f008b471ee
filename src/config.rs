//! Runtime configuration.
//!
//! Three layers, weakest first: built-in defaults, an optional project-local
//! `.sonarcheck.toml`, and command-line flags. Resolution happens once at
//! startup; the rest of the program sees only the final [`Config`].

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use serde::Deserialize;

pub const DEFAULT_URL: &str = "http://localhost:9000";
pub const DEFAULT_ATTEMPTS: u32 = 20;
pub const DEFAULT_SLEEP_MILLISECONDS: u64 = 5000;
pub const DEFAULT_REPORT_PATH: &str = "sonarqube-issues.html";
pub const DEFAULT_ENCODING: &str = "UTF-8";
pub const DEFAULT_CREDENTIALS: &str = "admin:admin";
pub const DEFAULT_CONFIG_FILE: &str = ".sonarcheck.toml";

/// Errors detected before any network activity.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid config at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown encoding '{0}'")]
    UnknownEncoding(String),

    #[error("invalid credentials, expected user:password")]
    InvalidCredentials,
}

/// Optional file-provided overrides, all individually omittable.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub url: Option<String>,
    pub count: Option<u32>,
    pub sleep: Option<u64>,
    pub report: Option<bool>,
    pub path: Option<PathBuf>,
    pub encoding: Option<String>,
    pub auth: Option<String>,
    #[serde(default)]
    pub projects: HashMap<String, PathBuf>,
}

impl FileConfig {
    /// Loads `path` if it exists; a missing file just means no overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Fully resolved configuration the app runs with.
#[derive(Debug, Clone)]
pub struct Config {
    pub url: String,
    pub attempts: u32,
    pub sleep_milliseconds: u64,
    pub check: bool,
    pub report: bool,
    pub report_path: PathBuf,
    /// Project name to source-root mapping used to locate preview files.
    pub projects: HashMap<String, PathBuf>,
    pub encoding: &'static Encoding,
    pub credentials: String,
}

/// Resolves an encoding label (`UTF-8`, `windows-1252`, ...) to an encoding.
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding, ConfigError> {
    Encoding::for_label(label.as_bytes())
        .ok_or_else(|| ConfigError::UnknownEncoding(label.to_string()))
}

/// Validates a `user:password` credential pair.
pub fn resolve_credentials(credentials: String) -> Result<String, ConfigError> {
    if credentials.contains(':') {
        Ok(credentials)
    } else {
        Err(ConfigError::InvalidCredentials)
    }
}
