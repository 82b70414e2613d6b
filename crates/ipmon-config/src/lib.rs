//! Shared configuration for the ipmon CLI and TUI.
//!
//! TOML profiles (one per IP monitor server), platform paths for the
//! config file and local drafts, and translation to
//! `ipmon_core::MonitorConfig`. Both binaries depend on this crate; the
//! CLI layers its global flags on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use ipmon_core::{DEFAULT_PRODUCTION_HOST, DEFAULT_SEGMENT, MonitorConfig, TlsVerification};

/// File name of the local draft store inside the data directory.
pub const DRAFTS_FILE: &str = "drafts.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("cannot write config as TOML: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("cannot read config: {0}")]
    Figment(Box<figment::Error>),

    #[error("config file I/O: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── File layout ─────────────────────────────────────────────────────

/// Contents of `config.toml`.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when neither `--profile` nor `IPMON_PROFILE` is set.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Keyed by profile name; ordered so the file is written stably.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

/// Fallbacks for flags and per-profile overrides.
#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named IP monitor server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Server base URL (e.g., "http://10.0.0.5:5000").
    pub server: String,

    /// Host substring that selects the `/ipmonitor` path prefix.
    #[serde(default = "default_production_host")]
    pub production_host: String,

    /// Segment the status view opens on.
    #[serde(default = "default_segment")]
    pub default_segment: String,

    /// Automatic status refresh period, seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Delay before retrying a failed status refresh, seconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// PEM bundle to trust for this server.
    pub ca_cert: Option<PathBuf>,

    /// Skip certificate checks; falls back to `defaults.insecure`.
    pub insecure: Option<bool>,

    /// Request timeout in seconds; falls back to `defaults.timeout`.
    pub timeout: Option<u64>,

    /// Override the draft store location.
    pub draft_path: Option<PathBuf>,
}

impl Profile {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            production_host: default_production_host(),
            default_segment: default_segment(),
            poll_interval_secs: default_poll_interval(),
            retry_delay_secs: default_retry_delay(),
            ca_cert: None,
            insecure: None,
            timeout: None,
            draft_path: None,
        }
    }
}

fn default_production_host() -> String {
    DEFAULT_PRODUCTION_HOST.into()
}
fn default_segment() -> String {
    DEFAULT_SEGMENT.into()
}
fn default_poll_interval() -> u64 {
    20
}
fn default_retry_delay() -> u64 {
    5
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("br", "ipmon", "ipmon")
}

/// `config.toml` in the platform config directory.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default location of the local draft store.
pub fn default_draft_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".local/share").join(DRAFTS_FILE),
        |dirs| dirs.data_dir().join(DRAFTS_FILE),
    )
}

fn dirs_fallback(under_home: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(under_home);
    p.push("ipmon");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Read the config: built-in defaults, then the file, then `IPMON_*`
/// environment variables.
///
/// Environment keys use `__` between levels, e.g.
/// `IPMON_DEFAULTS__TIMEOUT=10`.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("IPMON_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Like [`load_config`], but a broken or missing file yields defaults.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// The config as it would be written to disk, profiles sorted by name.
pub fn to_toml(cfg: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(cfg)?)
}

/// Write the config to [`config_path`], returning where it went.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, to_toml(cfg)?)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Parse and check a server URL.
pub fn parse_server_url(raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "server".into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "server".into(),
            reason: format!("expected an http(s) URL, got {raw}"),
        });
    }
    Ok(url)
}

/// Build a `MonitorConfig` from a profile, no CLI flag overrides.
pub fn profile_to_monitor_config(profile: &Profile) -> Result<MonitorConfig, ConfigError> {
    let url = parse_server_url(&profile.server)?;

    if profile.poll_interval_secs == 0 {
        return Err(ConfigError::Validation {
            field: "poll_interval_secs".into(),
            reason: "must be at least 1".into(),
        });
    }

    let tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let mut config = MonitorConfig::new(url);
    config.production_host.clone_from(&profile.production_host);
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(30));
    config.poll_interval = Duration::from_secs(profile.poll_interval_secs);
    config.retry_delay = Duration::from_secs(profile.retry_delay_secs);
    config.default_segment.clone_from(&profile.default_segment);
    config.draft_path = Some(
        profile
            .draft_path
            .clone()
            .unwrap_or_else(default_draft_path),
    );
    Ok(config)
}
