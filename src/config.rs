//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$ATTACHGRAB_CONFIG` (environment variable)
//! 2. `~/.config/attachgrab/config.toml` (Linux/macOS)
//!    `%APPDATA%\attachgrab\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! Credentials come from the environment (`ATTACHGRAB_EMAIL`,
//! `ATTACHGRAB_APP_PASSWORD`). The address may also be set in `[imap]`;
//! the secret is never read from or written to the file.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::ConnectionError;
use crate::export::naming::CollisionPolicy;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "ATTACHGRAB_CONFIG";
/// Environment variable holding the account address.
pub const EMAIL_ENV: &str = "ATTACHGRAB_EMAIL";
/// Environment variable holding the app password.
pub const PASSWORD_ENV: &str = "ATTACHGRAB_APP_PASSWORD";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mail server and folder.
    pub imap: ImapSettings,
    /// What to look for.
    pub search: SearchSettings,
    /// Where and how to write files.
    pub files: FileSettings,
    /// Log levels.
    pub logging: LoggingSettings,
}

/// Mail server and folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImapSettings {
    pub host: String,
    pub port: u16,
    /// Folder selected after login.
    pub folder: String,
    /// Account address; `ATTACHGRAB_EMAIL` takes precedence.
    pub address: Option<String>,
}

/// What to look for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Keyword searched in subject, body, and headers.
    pub keyword: String,
    /// Attachment file extension to extract, without the dot.
    pub extension: String,
}

/// Where and how to write files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    /// Destination folder for extracted attachments.
    pub downloads_dir: PathBuf,
    /// Folder for log files.
    pub logs_dir: PathBuf,
    /// `strftime` format inserted between filename stem and extension.
    pub timestamp_format: String,
    /// What to do when a derived filename already exists.
    pub on_collision: CollisionPolicy,
}

/// Log levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Console level: "error", "warn", "info", "debug", "trace".
    pub level: String,
    /// Level for the log file.
    pub file_level: String,
}

// ── Default implementations ─────────────────────────────────────

impl Default for ImapSettings {
    fn default() -> Self {
        Self {
            host: "imap.gmail.com".to_string(),
            port: 993,
            folder: "INBOX".to_string(),
            address: None,
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            keyword: "Mediafill".to_string(),
            extension: "pdf".to_string(),
        }
    }
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            downloads_dir: PathBuf::from("downloads"),
            logs_dir: PathBuf::from("logs"),
            timestamp_format: crate::export::naming::DEFAULT_TIMESTAMP_FORMAT.to_string(),
            on_collision: CollisionPolicy::Overwrite,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_level: "debug".to_string(),
        }
    }
}

// ── Credentials ─────────────────────────────────────────────────

/// Address and secret passed to `LOGIN`. Opaque to the rest of the crate.
#[derive(Clone)]
pub struct Credentials {
    address: String,
    secret: String,
}

impl Credentials {
    pub fn new(address: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            secret: secret.into(),
        }
    }

    /// Resolve credentials from the environment, falling back to the
    /// configured address.
    pub fn from_env(settings: &ImapSettings) -> Result<Self, ConnectionError> {
        let address = non_empty_env(EMAIL_ENV)
            .or_else(|| settings.address.clone().filter(|a| !a.trim().is_empty()))
            .ok_or_else(|| {
                ConnectionError::MissingCredentials(format!(
                    "set {EMAIL_ENV} or imap.address in the config file"
                ))
            })?;
        let secret = non_empty_env(PASSWORD_ENV).ok_or_else(|| {
            ConnectionError::MissingCredentials(format!("set {PASSWORD_ENV}"))
        })?;
        Ok(Self::new(address, secret))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("address", &self.address)
            .field("secret", &"<redacted>")
            .finish()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// ── Load / save ─────────────────────────────────────────────────

/// Where the loaded configuration came from.
///
/// Loading happens before logging is set up, so problems are kept here and
/// logged later through [`ConfigSource::report`].
#[derive(Debug)]
pub enum ConfigSource {
    /// No config file; built-in defaults.
    Defaults,
    /// Parsed from this file.
    File(PathBuf),
    /// The file exists but could not be used; built-in defaults.
    Fallback { path: PathBuf, reason: String },
}

impl ConfigSource {
    /// Log where the configuration came from.
    pub fn report(&self) {
        match self {
            Self::Defaults => tracing::debug!("No config file, using defaults"),
            Self::File(path) => tracing::info!(path = %path.display(), "Loaded config"),
            Self::Fallback { path, reason } => tracing::warn!(
                path = %path.display(),
                error = %reason,
                "Could not use config file, using defaults"
            ),
        }
    }
}

/// Load configuration, searching standard locations.
///
/// Falls back to the default configuration if no file is found or it
/// cannot be read or parsed; the returned [`ConfigSource`] says which.
pub fn load_config() -> (Config, ConfigSource) {
    match config_file_path() {
        Some(path) => load_config_at(&path),
        None => (Config::default(), ConfigSource::Defaults),
    }
}

/// Load configuration from `path`, with the same fallbacks as [`load_config`].
pub fn load_config_at(path: &Path) -> (Config, ConfigSource) {
    if !path.exists() {
        return (Config::default(), ConfigSource::Defaults);
    }
    match read_config(path) {
        Ok(cfg) => (cfg, ConfigSource::File(path.to_path_buf())),
        Err(e) => (
            Config::default(),
            ConfigSource::Fallback {
                path: path.to_path_buf(),
                reason: format!("{e:#}"),
            },
        ),
    }
}

fn read_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path).context("failed to read config file")?;
    let cfg = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(cfg)
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<PathBuf> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(path)
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("attachgrab").join("config.toml"))
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    config.files.logs_dir.join("attachgrab.log")
}

/// Check that a run can proceed.
///
/// Creates the download and log folders as a side effect. Returns one
/// human-readable line per problem; an empty list means the config is usable.
pub fn validate(config: &Config) -> Vec<String> {
    let mut problems = Vec::new();

    if let Err(e) = Credentials::from_env(&config.imap) {
        problems.push(e.to_string());
    }
    if config.search.keyword.trim().is_empty() {
        problems.push("search.keyword is empty".to_string());
    }
    if crate::export::naming::normalize_extension(&config.search.extension).is_empty() {
        problems.push("search.extension is empty".to_string());
    }

    for dir in [&config.files.downloads_dir, &config.files.logs_dir] {
        if let Err(e) = std::fs::create_dir_all(dir) {
            problems.push(format!("Cannot create directory {}: {e}", dir.display()));
        }
    }

    problems
}
