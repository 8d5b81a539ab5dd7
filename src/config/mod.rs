//! Configuration: typed settings with layered precedence (file → env → CLI).

pub mod cli;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::path::{self, OverlayRoot};

pub use cli::{CliArgs, Command, Overrides};

const CONFIG_DIR_NAME: &str = "tachyon-overlay";
const CONFIG_FILE_NAME: &str = "config.toml";
const ENV_PREFIX: &str = "TACHYON_OVERLAY";
const DEFAULT_URI: &str = "tachyon://localhost:19998/";
const DEFAULT_STAGING_PREFIX: &str = "/tmp/staging";
const DEFAULT_STORE_URL: &str = "http://localhost:9870";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone)]
pub struct Settings {
    pub overlay: OverlaySettings,
    pub store: StoreSettings,
    pub registry: RegistrySettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct OverlaySettings {
    /// Filesystem URI; its host and port address the cache registry
    pub uri: String,
    pub staging_prefix: String,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// WebHDFS base URL
    pub url: String,
    pub user: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RegistrySettings {
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Default location of the optional config file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder();

    if let Some(path) = default_config_path() {
        builder = builder.add_source(File::from(path).required(false));
    }
    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    overlay: RawOverlaySettings,
    store: RawStoreSettings,
    registry: RawRegistrySettings,
    logging: RawLoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawOverlaySettings {
    uri: Option<String>,
    staging_prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    url: Option<String>,
    user: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRegistrySettings {
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(uri) = overrides.uri.as_ref() {
            self.overlay.uri = Some(uri.clone());
        }
        if let Some(prefix) = overrides.staging_prefix.as_ref() {
            self.overlay.staging_prefix = Some(prefix.clone());
        }
        if let Some(url) = overrides.store_url.as_ref() {
            self.store.url = Some(url.clone());
        }
        if let Some(user) = overrides.store_user.as_ref() {
            self.store.user = Some(user.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
    }
}

fn timeout(key: &'static str, secs: Option<u64>) -> Result<Duration, LoadError> {
    match secs.unwrap_or(DEFAULT_TIMEOUT_SECS) {
        0 => Err(LoadError::invalid(key, "must be greater than zero")),
        secs => Ok(Duration::from_secs(secs)),
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let uri = raw.overlay.uri.unwrap_or_else(|| DEFAULT_URI.to_string());
        OverlayRoot::from_uri(&uri).map_err(|e| LoadError::invalid("overlay.uri", e.to_string()))?;

        let staging_prefix = raw
            .overlay
            .staging_prefix
            .unwrap_or_else(|| DEFAULT_STAGING_PREFIX.to_string());
        if !staging_prefix.starts_with('/') {
            return Err(LoadError::invalid(
                "overlay.staging_prefix",
                format!("`{}` is not an absolute path", staging_prefix),
            ));
        }
        if path::decode(&staging_prefix)
            .map(|(_, id)| id.is_some())
            .unwrap_or(true)
        {
            return Err(LoadError::invalid(
                "overlay.staging_prefix",
                format!("`{}` may not contain an entry separator", staging_prefix),
            ));
        }

        let store_url = raw.store.url.unwrap_or_else(|| DEFAULT_STORE_URL.to_string());
        match url::Url::parse(&store_url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(parsed) => {
                return Err(LoadError::invalid(
                    "store.url",
                    format!("unsupported scheme `{}`", parsed.scheme()),
                ))
            }
            Err(e) => return Err(LoadError::invalid("store.url", e.to_string())),
        }

        let level_str = raw
            .logging
            .level
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let level = LevelFilter::from_str(&level_str)
            .map_err(|_| LoadError::invalid("logging.level", format!("unknown level `{}`", level_str)))?;

        Ok(Self {
            overlay: OverlaySettings {
                uri,
                staging_prefix,
            },
            store: StoreSettings {
                url: store_url,
                user: raw.store.user.filter(|u| !u.is_empty()),
                timeout: timeout("store.timeout_secs", raw.store.timeout_secs)?,
            },
            registry: RegistrySettings {
                timeout: timeout("registry.timeout_secs", raw.registry.timeout_secs)?,
            },
            logging: LoggingSettings { level },
        })
    }
}
