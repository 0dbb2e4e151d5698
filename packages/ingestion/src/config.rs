//! Client configuration.
//!
//! Values are layered: built-in defaults from `config/defaults.toml`, then
//! `SOLAR_FLARES_*` environment variables, then whatever the caller sets
//! on the returned struct (CLI flags).

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use solar_flares_api::ApiConfig;
use solar_flares_ingestion_models::{PollPolicy, SnapshotScope};

const DEFAULTS_TOML: &str = include_str!("../config/defaults.toml");

pub const API_URL_VAR: &str = "SOLAR_FLARES_API_URL";
pub const REQUEST_TIMEOUT_VAR: &str = "SOLAR_FLARES_REQUEST_TIMEOUT_MS";
pub const READ_RETRIES_VAR: &str = "SOLAR_FLARES_READ_RETRIES";
pub const POLL_ATTEMPTS_VAR: &str = "SOLAR_FLARES_POLL_ATTEMPTS";
pub const POLL_INTERVAL_VAR: &str = "SOLAR_FLARES_POLL_INTERVAL_MS";
pub const POLL_MAX_WAIT_VAR: &str = "SOLAR_FLARES_POLL_MAX_WAIT_MS";
pub const SNAPSHOT_SCOPE_VAR: &str = "SOLAR_FLARES_SNAPSHOT_SCOPE";

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {message}")]
    Env { var: String, message: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Everything the dashboard client needs to talk to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardConfig {
    pub api: ApiConfig,
    pub poll: PollPolicy,
    pub snapshot_scope: SnapshotScope,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    api: ApiSection,
    #[serde(default)]
    poll: PollSection,
    #[serde(default)]
    snapshot: SnapshotSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ApiSection {
    base_url: Option<String>,
    request_timeout_ms: Option<u64>,
    read_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PollSection {
    max_attempts: Option<u32>,
    interval_ms: Option<u64>,
    max_wait_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SnapshotSection {
    scope: Option<SnapshotScope>,
}

impl DashboardConfig {
    /// The built-in defaults.
    ///
    /// # Errors
    ///
    /// Only fails if the embedded defaults file is broken.
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::from_toml(DEFAULTS_TOML)
    }

    /// Built-in defaults overridden by the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if a variable is set to an unusable
    /// value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::defaults()?.with_overrides(|var| std::env::var(var).ok())
    }

    /// Parses a TOML document. Missing keys keep their default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] for malformed or unknown keys and
    /// [`ConfigError::Invalid`] if the result fails validation.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(source)?;
        let mut config = Self::default();

        if let Some(base_url) = file.api.base_url {
            config.api.base_url = base_url;
        }
        if let Some(ms) = file.api.request_timeout_ms {
            config.api.request_timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = file.api.read_retries {
            config.api.read_retries = retries;
        }
        if let Some(attempts) = file.poll.max_attempts {
            config.poll.max_attempts = attempts;
        }
        if let Some(ms) = file.poll.interval_ms {
            config.poll.interval = Duration::from_millis(ms);
        }
        if let Some(ms) = file.poll.max_wait_ms {
            config.poll.max_wait = Some(Duration::from_millis(ms));
        }
        if let Some(scope) = file.snapshot.scope {
            config.snapshot_scope = scope;
        }
        config.poll.read_timeout = config.api.request_timeout;

        config.validate()?;
        Ok(config)
    }

    /// Applies `SOLAR_FLARES_*` overrides looked up through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if a variable does not parse, or
    /// [`ConfigError::Invalid`] if the result fails validation.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_VAR).filter(|url| !url.trim().is_empty()) {
            self.api.base_url = url.trim().to_string();
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, REQUEST_TIMEOUT_VAR)? {
            self.api.request_timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = parse_var(&lookup, READ_RETRIES_VAR)? {
            self.api.read_retries = retries;
        }
        if let Some(attempts) = parse_var(&lookup, POLL_ATTEMPTS_VAR)? {
            self.poll.max_attempts = attempts;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, POLL_INTERVAL_VAR)? {
            self.poll.interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, POLL_MAX_WAIT_VAR)? {
            self.poll.max_wait = Some(Duration::from_millis(ms));
        }
        if let Some(scope) = parse_var(&lookup, SNAPSHOT_SCOPE_VAR)? {
            self.snapshot_scope = scope;
        }
        self.poll.read_timeout = self.api.request_timeout;

        self.validate()?;
        Ok(self)
    }

    /// Checks values that would make the workflow meaningless.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "api.base_url must not be empty".to_string(),
            });
        }
        if self.api.request_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                message: "api.request_timeout_ms must be positive".to_string(),
            });
        }
        if self.poll.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                message: "poll.max_attempts must be at least 1".to_string(),
            });
        }
        if self.poll.interval.is_zero() {
            return Err(ConfigError::Invalid {
                message: "poll.interval_ms must be positive".to_string(),
            });
        }
        if let Some(max_wait) = self.poll.max_wait {
            let nominal = self.poll.nominal_duration();
            if max_wait < nominal {
                return Err(ConfigError::Invalid {
                    message: format!(
                        "poll.max_wait_ms ({}) is shorter than max_attempts * interval_ms ({})",
                        max_wait.as_millis(),
                        nominal.as_millis()
                    ),
                });
            }
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(|e: T::Err| ConfigError::Env {
        var: var.to_string(),
        message: format!("{raw:?}: {e}"),
    })
}
