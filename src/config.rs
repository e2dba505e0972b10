//! Application-level configuration loading.
//!
//! Configuration is a small JSON file; every field is optional and anything
//! missing or malformed falls back to a built-in default with a log line,
//! never an error. Bad config must not keep the server from starting.

use std::time::Duration;
use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::dto::lobby::SettingsPatch;
use crate::lobby::LobbySettings;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TRIVIA_PARTY_BACK_CONFIG_PATH";
/// Default location of the question corpus.
const DEFAULT_QUESTIONS_PATH: &str = "config/questions.json";
/// How long a departed host keeps a claim on the seat.
const DEFAULT_HOST_RELEASE_GRACE_MS: u64 = 60_000;
/// How long an empty lobby survives before the reaper destroys it.
const DEFAULT_LOBBY_DESTROY_GRACE_MS: u64 = 120_000;

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    questions_path: PathBuf,
    default_settings: LobbySettings,
    host_release_grace: Duration,
    lobby_destroy_grace: Duration,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    config
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

    /// Where the question corpus lives.
    pub fn questions_path(&self) -> &PathBuf {
        &self.questions_path
    }

    /// Settings given to a freshly created lobby.
    pub fn default_settings(&self) -> LobbySettings {
        self.default_settings.clone()
    }

    /// Grace window during which a departed host can reclaim the seat.
    pub fn host_release_grace(&self) -> Duration {
        self.host_release_grace
    }

    /// Grace window before an empty lobby is destroyed.
    pub fn lobby_destroy_grace(&self) -> Duration {
        self.lobby_destroy_grace
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            questions_path: PathBuf::from(DEFAULT_QUESTIONS_PATH),
            default_settings: LobbySettings::default(),
            host_release_grace: Duration::from_millis(DEFAULT_HOST_RELEASE_GRACE_MS),
            lobby_destroy_grace: Duration::from_millis(DEFAULT_LOBBY_DESTROY_GRACE_MS),
        }
    }
}

/// JSON representation of the configuration file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    questions_path: Option<PathBuf>,
    /// Defaults for new lobbies, clamped through the same patch logic as
    /// client updates so a wild config value cannot break rounds.
    defaults: Option<SettingsPatch>,
    host_release_grace_ms: Option<u64>,
    lobby_destroy_grace_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let base = Self::default();

        let mut default_settings = base.default_settings;
        if let Some(patch) = &raw.defaults {
            default_settings.apply_patch(patch);
        }

        Self {
            questions_path: raw.questions_path.unwrap_or(base.questions_path),
            default_settings,
            host_release_grace: raw
                .host_release_grace_ms
                .map(Duration::from_millis)
                .unwrap_or(base.host_release_grace),
            lobby_destroy_grace: raw
                .lobby_destroy_grace_ms
                .map(Duration::from_millis)
                .unwrap_or(base.lobby_destroy_grace),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_config_defaults_are_clamped() {
        let raw = RawConfig {
            questions_path: None,
            defaults: Some(SettingsPatch {
                round_duration_ms: Some(999_999),
                points_to_win: Some(1),
                question_filter: None,
            }),
            host_release_grace_ms: Some(5_000),
            lobby_destroy_grace_ms: None,
        };

        let config: AppConfig = raw.into();
        assert_eq!(config.default_settings().round_duration_ms, 120_000);
        assert_eq!(config.default_settings().points_to_win, 5);
        assert_eq!(config.host_release_grace(), Duration::from_secs(5));
        assert_eq!(
            config.lobby_destroy_grace(),
            Duration::from_millis(DEFAULT_LOBBY_DESTROY_GRACE_MS)
        );
    }
}
