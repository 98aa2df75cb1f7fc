//! Application-level configuration loading, including the default rules applied to new matches.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::dao::models::MatchRulesEntity;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "FOOSBALL_BACK_CONFIG_PATH";
/// Capacity of the public SSE broadcast channel when the file does not set one.
const DEFAULT_SSE_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    match_defaults: MatchRulesEntity,
    sse_capacity: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        num_goals_to_win = app_config.match_defaults.num_goals_to_win,
                        num_sets_to_win = app_config.match_defaults.num_sets_to_win,
                        "loaded match defaults from config"
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

    /// Parse a configuration document. Missing keys take their default value.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Rules applied to a new match for every field its request leaves out.
    pub fn match_defaults(&self) -> &MatchRulesEntity {
        &self.match_defaults
    }

    /// Capacity of the public SSE broadcast channel.
    pub fn sse_capacity(&self) -> usize {
        self.sse_capacity
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            match_defaults: MatchRulesEntity::default(),
            sse_capacity: DEFAULT_SSE_CAPACITY,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    match_defaults: RawMatchDefaults,
    sse_capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// Match rules as written in the configuration file.
struct RawMatchDefaults {
    num_goals_to_win: Option<u32>,
    num_sets_to_win: Option<u32>,
    two_ahead: Option<bool>,
    two_ahead_up_until: Option<u32>,
    timeouts_per_set: Option<u32>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let fallback = MatchRulesEntity::default();
        let raw = value.match_defaults;
        Self {
            match_defaults: MatchRulesEntity {
                num_goals_to_win: raw
                    .num_goals_to_win
                    .filter(|goals| *goals >= 1)
                    .unwrap_or(fallback.num_goals_to_win),
                num_sets_to_win: raw
                    .num_sets_to_win
                    .filter(|sets| *sets >= 1)
                    .unwrap_or(fallback.num_sets_to_win),
                two_ahead: raw.two_ahead.unwrap_or(fallback.two_ahead),
                two_ahead_up_until: raw
                    .two_ahead_up_until
                    .unwrap_or(fallback.two_ahead_up_until),
                timeouts_per_set: raw.timeouts_per_set.unwrap_or(fallback.timeouts_per_set),
            },
            sse_capacity: value
                .sse_capacity
                .filter(|capacity| *capacity > 0)
                .unwrap_or(DEFAULT_SSE_CAPACITY),
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
