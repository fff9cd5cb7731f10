use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::api::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECONDS};
use crate::catalog;
use crate::records::ExamLevel;

pub const API_URL_ENV: &str = "COUNSEL_API_URL";
pub const DEFAULT_ASSETS: &str = "~/.counsel/data";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file not found '{path}'")]
    NotFound { path: PathBuf },

    #[error("failed to parse config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to write config '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config path '{path}'")]
    InvalidPath { path: PathBuf },

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

/// On-disk configuration. Every field is optional; CLI flags win over the
/// file and the file wins over built-in defaults.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct ConfigFile {
    pub api_url: Option<String>,
    pub assets: Option<String>,
    pub timeout: Option<u64>,
    pub token_path: Option<String>,
    pub counselling: Option<String>,
    pub exam_level: Option<String>,
    pub no_color: Option<bool>,
    pub output_format: Option<String>,
}

/// Fully resolved settings used to build the client stack.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    pub assets: String,
    pub timeout: Duration,
    pub token_path: PathBuf,
    pub counselling: String,
    pub exam_level: ExamLevel,
    pub no_color: bool,
    pub output_format: Option<String>,
}

impl Settings {
    /// Resolves `file` against defaults. `api_url_env` is the value of
    /// `COUNSEL_API_URL`, which overrides the file.
    pub fn resolve(file: &ConfigFile, api_url_env: Option<String>) -> Result<Self, ConfigError> {
        let api_url = api_url_env
            .filter(|v| !v.trim().is_empty())
            .or_else(|| file.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let timeout = file.timeout.unwrap_or(DEFAULT_TIMEOUT_SECONDS);
        if timeout == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timeout",
                message: "must be greater than 0".into(),
            });
        }

        let exam_level = match file.exam_level.as_deref() {
            None => catalog::DEFAULT_EXAM_LEVEL,
            Some(raw) => ExamLevel::parse(raw).ok_or_else(|| ConfigError::InvalidValue {
                key: "exam_level",
                message: format!("expected UG or PG, got '{raw}'"),
            })?,
        };

        let counselling = match file.counselling.as_deref() {
            None => catalog::DEFAULT_COUNSELLING.to_string(),
            Some(raw) => catalog::find(raw)
                .map(|c| c.label.to_string())
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "counselling",
                    message: format!("unknown counselling authority '{raw}'"),
                })?,
        };

        let token_path = match file.token_path.as_deref() {
            Some(p) => expand_tilde(p),
            None => default_token_path().ok_or_else(|| ConfigError::InvalidValue {
                key: "token_path",
                message: "no home directory; set token_path explicitly".into(),
            })?,
        };

        Ok(Self {
            api_url,
            assets: file
                .assets
                .clone()
                .unwrap_or_else(|| DEFAULT_ASSETS.to_string()),
            timeout: Duration::from_secs(timeout),
            token_path,
            counselling,
            exam_level,
            no_color: file.no_color.unwrap_or(false),
            output_format: file.output_format.clone(),
        })
    }
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .or_else(|| {
            let drive = env::var_os("HOMEDRIVE")?;
            let path = env::var_os("HOMEPATH")?;
            Some(PathBuf::from(drive).join(path))
        })
}

pub fn config_dir() -> Option<PathBuf> {
    Some(home_dir()?.join(".counsel"))
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(config_dir()?.join("config.yml"))
}

pub fn default_token_path() -> Option<PathBuf> {
    Some(config_dir()?.join("token"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn load_config(path: &Path, allow_missing: bool) -> Result<ConfigFile, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) if contents.trim().is_empty() => Ok(ConfigFile::default()),
        Ok(contents) => serde_yaml::from_str::<ConfigFile>(&contents).map_err(|source| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn default_config_yaml() -> String {
    format!(
        r#"# counsel config
#
# Location (default):
#   ~/.counsel/config.yml

# Remote API. The {API_URL_ENV} environment variable overrides this.
api_url: {DEFAULT_API_URL}
timeout: {DEFAULT_TIMEOUT_SECONDS}

# Fallback CSV files: a directory or an http(s) base URL.
assets: {DEFAULT_ASSETS}

# Where the bearer token is kept between runs.
# token_path: ~/.counsel/token

# Initial selection for dataset views
counselling: "{}"
exam_level: {}

# Output
# output_format: text
no_color: false
"#,
        catalog::DEFAULT_COUNSELLING,
        catalog::DEFAULT_EXAM_LEVEL,
    )
}

pub fn ensure_default_config_file(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Ok(());
    }
    let parent = path.parent().ok_or_else(|| ConfigError::InvalidPath {
        path: path.to_path_buf(),
    })?;
    std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
        path: parent.to_path_buf(),
        source,
    })?;
    std::fs::write(path, default_config_yaml()).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}
