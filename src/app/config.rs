//! Settings resolution: built-in defaults, then the config file, then CLI flags.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use picasa_dl_core::download::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use picasa_dl_core::mirror::{DEFAULT_FEED_BASE_URL, DEFAULT_USER_ID, default_stylesheet_url};
use picasa_dl_core::schedule::DEFAULT_IN_FLIGHT_CEILING;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::cli::Args;

/// Invalid configuration values, from either the file or the command line.
#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("invalid value for `{field}`: {value}. Expected range: {expected}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        expected: &'static str,
    },

    #[error("invalid URL for `{field}`: {value:?}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("`user_id` must not be empty")]
    EmptyUserId,
}

/// TOML-backed file configuration. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FileConfig {
    pub(crate) user_id: Option<String>,
    pub(crate) dest: Option<PathBuf>,
    pub(crate) interval_secs: Option<u64>,
    pub(crate) feed_base_url: Option<String>,
    /// An empty string disables the stylesheet download.
    pub(crate) stylesheet_url: Option<String>,
    pub(crate) validate_images: Option<bool>,
    pub(crate) max_in_flight: Option<u64>,
    pub(crate) connect_timeout_secs: Option<u64>,
    pub(crate) read_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Validates config values against the same constraints as the CLI.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.user_id.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::EmptyUserId);
        }
        validate_range("max_in_flight", self.max_in_flight, 1, 100_000, "1..=100000")?;
        validate_range("connect_timeout_secs", self.connect_timeout_secs, 1, 3600, "1..=3600")?;
        validate_range("read_timeout_secs", self.read_timeout_secs, 1, 3600, "1..=3600")?;
        if let Some(url) = &self.feed_base_url {
            validate_http_url("feed_base_url", url)?;
        }
        if let Some(url) = self.stylesheet_url.as_deref().filter(|u| !u.is_empty()) {
            validate_http_url("stylesheet_url", url)?;
        }
        Ok(())
    }
}

fn validate_range(
    field: &'static str,
    value: Option<u64>,
    min: u64,
    max: u64,
    expected: &'static str,
) -> Result<(), ConfigError> {
    match value {
        Some(value) if !(min..=max).contains(&value) => Err(ConfigError::OutOfRange {
            field,
            value,
            expected,
        }),
        _ => Ok(()),
    }
}

fn validate_http_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let valid = Url::parse(value).is_ok_and(|u| matches!(u.scheme(), "http" | "https"));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidUrl {
            field,
            value: value.to_string(),
        })
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/picasa-dl/config.toml`
/// 2. `$HOME/.config/picasa-dl/config.toml`
pub(crate) fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("picasa-dl")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("picasa-dl")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file.
///
/// An explicit path must exist; the default path is optional.
pub(crate) fn load_file_config(explicit: Option<&Path>) -> Result<Option<FileConfig>> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match resolve_default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(None),
        },
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    let config = parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(Some(config))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(raw)?;
    config.validate()?;
    Ok(config)
}

/// Fully resolved settings for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    pub(crate) user_id: String,
    pub(crate) dest: PathBuf,
    pub(crate) interval: Option<Duration>,
    pub(crate) feed_base_url: String,
    pub(crate) stylesheet_url: Option<String>,
    pub(crate) validate_images: bool,
    pub(crate) max_in_flight: usize,
    pub(crate) connect_timeout_secs: u64,
    pub(crate) read_timeout_secs: u64,
}

/// Merges CLI flags over the file config over built-in defaults.
pub(crate) fn resolve_settings(
    args: &Args,
    file: Option<&FileConfig>,
) -> Result<Settings, ConfigError> {
    let file = file.cloned().unwrap_or_default();

    let user_id = args
        .user_id
        .clone()
        .or(file.user_id)
        .unwrap_or_else(|| DEFAULT_USER_ID.to_string());
    if user_id.is_empty() {
        return Err(ConfigError::EmptyUserId);
    }

    let feed_base_url = args
        .feed_url
        .clone()
        .or(file.feed_base_url)
        .unwrap_or_else(|| DEFAULT_FEED_BASE_URL.to_string());
    validate_http_url("feed_base_url", &feed_base_url)?;

    let stylesheet_url = if args.no_stylesheet {
        None
    } else {
        match file.stylesheet_url {
            Some(url) if url.is_empty() => None,
            Some(url) => Some(url),
            None => Some(default_stylesheet_url()),
        }
    };

    let max_in_flight = args
        .max_in_flight
        .or(file.max_in_flight)
        .map_or(DEFAULT_IN_FLIGHT_CEILING, |n| {
            usize::try_from(n).unwrap_or(usize::MAX)
        });

    let interval_secs = args.interval.or(file.interval_secs).unwrap_or(0);

    Ok(Settings {
        user_id,
        dest: args
            .dest
            .clone()
            .or(file.dest)
            .unwrap_or_else(|| PathBuf::from(".")),
        interval: (interval_secs > 0).then(|| Duration::from_secs(interval_secs)),
        feed_base_url,
        stylesheet_url,
        validate_images: args.validate_images || file.validate_images.unwrap_or(false),
        max_in_flight,
        connect_timeout_secs: file.connect_timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS),
        read_timeout_secs: file.read_timeout_secs.unwrap_or(READ_TIMEOUT_SECS),
    })
}
