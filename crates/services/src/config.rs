use std::env;
use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;

pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 3_000;
pub const DEFAULT_DEBOUNCE_MS: u64 = 1_500;

/// Where the backend lives and how to authenticate against it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
}

impl ApiConfig {
    /// Validates `base_url` and strips trailing slashes.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBaseUrl` unless the url parses and uses
    /// `http` or `https`.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            value: base_url.to_string(),
            reason,
        };
        let parsed = Url::parse(base_url.trim()).map_err(|err| invalid(err.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", parsed.scheme())));
        }
        Ok(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }
}

/// Settings for the sync engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    /// `None` leaves the HTTP client disabled.
    pub api: Option<ApiConfig>,
    pub fetch_timeout: Duration,
    pub debounce: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api: None,
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }
}

impl SyncConfig {
    /// Reads `PROGRESS_API_BASE_URL`, `PROGRESS_API_TOKEN`,
    /// `PROGRESS_FETCH_TIMEOUT_MS` and `PROGRESS_DEBOUNCE_MS`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as `from_env` with an injectable variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api = match set("PROGRESS_API_BASE_URL") {
            Some(base_url) => Some(ApiConfig::new(&base_url, set("PROGRESS_API_TOKEN"))?),
            None => None,
        };
        let fetch_timeout = millis(
            "PROGRESS_FETCH_TIMEOUT_MS",
            set("PROGRESS_FETCH_TIMEOUT_MS"),
            DEFAULT_FETCH_TIMEOUT_MS,
        )?;
        let debounce = millis(
            "PROGRESS_DEBOUNCE_MS",
            set("PROGRESS_DEBOUNCE_MS"),
            DEFAULT_DEBOUNCE_MS,
        )?;

        Ok(Self {
            api,
            fetch_timeout,
            debounce,
        })
    }
}

fn millis(name: &'static str, raw: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Duration::from_millis(default));
    };
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidNumber { name, value: raw })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = SyncConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.fetch_timeout, Duration::from_millis(3_000));
        assert_eq!(config.debounce, Duration::from_millis(1_500));
    }

    #[test]
    fn reads_api_and_timings() {
        let config = SyncConfig::from_lookup(lookup(&[
            ("PROGRESS_API_BASE_URL", "https://api.example.com/v1/"),
            ("PROGRESS_API_TOKEN", "secret"),
            ("PROGRESS_FETCH_TIMEOUT_MS", "500"),
            ("PROGRESS_DEBOUNCE_MS", " 250 "),
        ]))
        .unwrap();
        let api = config.api.unwrap();
        assert_eq!(api.base_url, "https://api.example.com/v1");
        assert_eq!(api.token.as_deref(), Some("secret"));
        assert_eq!(config.fetch_timeout, Duration::from_millis(500));
        assert_eq!(config.debounce, Duration::from_millis(250));
    }

    #[test]
    fn blank_token_is_ignored() {
        let config = SyncConfig::from_lookup(lookup(&[
            ("PROGRESS_API_BASE_URL", "http://localhost:8080"),
            ("PROGRESS_API_TOKEN", "   "),
        ]))
        .unwrap();
        assert_eq!(config.api.unwrap().token, None);
    }

    #[test]
    fn rejects_malformed_values() {
        let err = SyncConfig::from_lookup(lookup(&[("PROGRESS_API_BASE_URL", "ftp://x")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));

        let err = SyncConfig::from_lookup(lookup(&[("PROGRESS_DEBOUNCE_MS", "-1")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                name: "PROGRESS_DEBOUNCE_MS",
                value: "-1".into()
            }
        );
    }
}
