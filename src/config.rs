//! Application-level configuration loading for timer defaults.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "DRAFT_CLOCK_CONFIG_PATH";
/// Timer duration used when neither the session nor the command names one.
const DEFAULT_TIMER_SECONDS: u32 = 30;
/// Period of the authority-driven correction broadcast while running.
const DEFAULT_SYNC_BROADCAST_SECONDS: u64 = 10;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    default_timer_seconds: u32,
    sync_broadcast_interval: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        default_timer_seconds = app_config.default_timer_seconds,
                        sync_broadcast_seconds = app_config.sync_broadcast_interval.as_secs(),
                        "loaded timer configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Timer duration applied when a start/reset command and the session both
    /// omit one.
    pub fn default_timer_seconds(&self) -> u32 {
        self.default_timer_seconds
    }

    /// How often a running authority broadcasts a `timer_sync` correction.
    pub fn sync_broadcast_interval(&self) -> Duration {
        self.sync_broadcast_interval
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_timer_seconds: DEFAULT_TIMER_SECONDS,
            sync_broadcast_interval: Duration::from_secs(DEFAULT_SYNC_BROADCAST_SECONDS),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    default_timer_seconds: Option<u32>,
    sync_broadcast_seconds: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let default_timer_seconds = match value.default_timer_seconds {
            Some(seconds) if seconds > 0 => seconds,
            Some(_) => {
                warn!("default_timer_seconds must be positive; using built-in default");
                DEFAULT_TIMER_SECONDS
            }
            None => DEFAULT_TIMER_SECONDS,
        };
        let sync_broadcast_seconds = match value.sync_broadcast_seconds {
            Some(seconds) if seconds > 0 => seconds,
            Some(_) => {
                warn!("sync_broadcast_seconds must be positive; using built-in default");
                DEFAULT_SYNC_BROADCAST_SECONDS
            }
            None => DEFAULT_SYNC_BROADCAST_SECONDS,
        };

        Self {
            default_timer_seconds,
            sync_broadcast_interval: Duration::from_secs(sync_broadcast_seconds),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
