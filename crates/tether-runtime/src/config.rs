//! Runtime configuration

use std::time::Duration;

use regex::Regex;

use tether_core::{TetherError, TetherResult};
use tether_intercept::{DEFAULT_POLL_INTERVAL, SESSION_URL_PATTERN};

pub const ENV_POLL_INTERVAL: &str = "TETHER_POLL_INTERVAL";
pub const ENV_SESSION_PATTERN: &str = "TETHER_SESSION_PATTERN";
pub const ENV_LOG: &str = "TETHER_LOG";
pub const ENV_LOG_JSON: &str = "TETHER_LOG_JSON";

/// Logging configuration
#[derive(Clone, Debug)]
pub struct LogConfig {
    /// `EnvFilter` directives
    pub filter: String,
    /// Emit JSON lines instead of plain text
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            filter: "info".to_string(),
            json: false,
        }
    }
}

/// Tether runtime configuration
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Delay between two checks for the audio library
    pub poll_interval: Duration,
    /// Regex selecting the new session endpoint
    pub session_url_pattern: String,
    pub log: LogConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            poll_interval: DEFAULT_POLL_INTERVAL,
            session_url_pattern: SESSION_URL_PATTERN.to_string(),
            log: LogConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by `TETHER_*` environment variables
    pub fn from_env() -> TetherResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> TetherResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = RuntimeConfig::default();

        if let Some(raw) = lookup(ENV_POLL_INTERVAL) {
            config.poll_interval = humantime::parse_duration(raw.trim())
                .map_err(|error| TetherError::Config(format!("{ENV_POLL_INTERVAL}: {error}")))?;
        }
        if let Some(pattern) = lookup(ENV_SESSION_PATTERN) {
            config.session_url_pattern = pattern;
        }
        if let Some(filter) = lookup(ENV_LOG) {
            config.log.filter = filter;
        }
        if let Some(raw) = lookup(ENV_LOG_JSON) {
            config.log.json = parse_flag(&raw)
                .ok_or_else(|| TetherError::Config(format!("{ENV_LOG_JSON}: not a boolean: {raw}")))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TetherResult<()> {
        if self.poll_interval.is_zero() {
            return Err(TetherError::Config("poll interval must be positive".to_string()));
        }
        Regex::new(&self.session_url_pattern)
            .map_err(|error| TetherError::InvalidPattern(error.to_string()))?;
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.session_url_pattern, SESSION_URL_PATTERN);
        assert_eq!(config.log.filter, "info");
        assert!(!config.log.json);
    }

    #[test]
    fn test_overrides() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            (ENV_POLL_INTERVAL, "250ms"),
            (ENV_SESSION_PATTERN, "/sessions$"),
            (ENV_LOG, "tether=debug"),
            (ENV_LOG_JSON, "yes"),
        ]))
        .unwrap();

        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.session_url_pattern, "/sessions$");
        assert_eq!(config.log.filter, "tether=debug");
        assert!(config.log.json);
    }

    #[test]
    fn test_invalid_values() {
        let bad_interval = RuntimeConfig::from_lookup(lookup(&[(ENV_POLL_INTERVAL, "soon")]));
        assert!(matches!(bad_interval, Err(TetherError::Config(_))));

        let zero = RuntimeConfig::from_lookup(lookup(&[(ENV_POLL_INTERVAL, "0s")]));
        assert!(matches!(zero, Err(TetherError::Config(_))));

        let bad_pattern = RuntimeConfig::from_lookup(lookup(&[(ENV_SESSION_PATTERN, "([")]));
        assert!(matches!(bad_pattern, Err(TetherError::InvalidPattern(_))));

        let bad_flag = RuntimeConfig::from_lookup(lookup(&[(ENV_LOG_JSON, "maybe")]));
        assert!(matches!(bad_flag, Err(TetherError::Config(_))));
    }
}
