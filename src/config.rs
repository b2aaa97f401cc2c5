//! Client configuration.
//!
//! Values are validated once, on construction; a `DashboardConfig` that exists is
//! usable. Environment variables:
//!
//! | variable | default |
//! |---|---|
//! | `RATELENS_API_BASE_URL` | `http://localhost:8080` |
//! | `RATELENS_TIMEOUT_SECS` | `10` |
//! | `RATELENS_PROFILE_TTL_SECS` | `300` |

use crate::error::ConfigError;
use crate::timeout::{TimeoutPolicy, DEFAULT_TIMEOUT};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_PROFILE_TTL: Duration = Duration::from_secs(300);

pub const ENV_BASE_URL: &str = "RATELENS_API_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "RATELENS_TIMEOUT_SECS";
pub const ENV_PROFILE_TTL_SECS: &str = "RATELENS_PROFILE_TTL_SECS";

/// Backend paths the client talks to.
pub mod paths {
    pub const DASHBOARD: &str = "/api/view/dashboard";
    pub const ME: &str = "/api/auth/me";
    pub const LOGIN: &str = "/api/auth/login";
    pub const LOGOUT: &str = "/api/auth/logout";
    pub const CREATE_KEY: &str = "/api/create-key";
}

/// Validated configuration for the dashboard client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    base_url: String,
    timeout: Duration,
    profile_ttl: Duration,
}

impl DashboardConfig {
    /// Create a config with validation. Trailing slashes on `base_url` are dropped.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let cfg = Self {
            base_url: normalize_base(base_url.into())?,
            timeout: DEFAULT_TIMEOUT,
            profile_ttl: DEFAULT_PROFILE_TTL,
        };
        Ok(cfg)
    }

    /// Build from `RATELENS_*` environment variables, defaulting anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = lookup(ENV_BASE_URL)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut cfg = Self::new(base)?;
        if let Some(secs) = env_seconds(&lookup, ENV_TIMEOUT_SECS)? {
            cfg = cfg.with_timeout(secs)?;
        }
        if let Some(secs) = env_seconds(&lookup, ENV_PROFILE_TTL_SECS)? {
            cfg = cfg.with_profile_ttl(secs)?;
        }
        Ok(cfg)
    }

    /// Override the request timeout; must be > 0.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() || timeout == Duration::MAX {
            return Err(ConfigError::InvalidTimeout(timeout));
        }
        self.timeout = timeout;
        Ok(self)
    }

    /// Override how long a cached admin profile stays fresh; must be > 0.
    pub fn with_profile_ttl(mut self, ttl: Duration) -> Result<Self, ConfigError> {
        if ttl.is_zero() {
            return Err(ConfigError::InvalidProfileTtl(ttl));
        }
        self.profile_ttl = ttl;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::new(self.timeout)
    }

    pub fn profile_ttl(&self) -> Duration {
        self.profile_ttl
    }

    /// Resolve `path` against the base URL.
    ///
    /// Absolute `http(s)://` paths are returned untouched; relative ones gain a leading `/`.
    pub fn api_url(&self, path: &str) -> String {
        if path.is_empty() {
            return self.base_url.clone();
        }
        let lower = path.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            profile_ttl: DEFAULT_PROFILE_TTL,
        }
    }
}

fn normalize_base(raw: String) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/').to_string();
    let invalid = |reason: &str| ConfigError::InvalidBaseUrl { url: raw.clone(), reason: reason.into() };
    let url = reqwest::Url::parse(&trimmed).map_err(|e| invalid(&e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(trimmed),
        other => Err(invalid(&format!("unsupported scheme {:?}", other))),
    }
}

fn env_seconds<F>(lookup: &F, name: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| ConfigError::InvalidEnv { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn base_url_loses_trailing_slashes() {
        let cfg = DashboardConfig::new("https://limits.example.com///").unwrap();
        assert_eq!(cfg.base_url(), "https://limits.example.com");
    }

    #[test]
    fn api_url_joins_like_the_browser_helper() {
        let cfg = DashboardConfig::new("http://localhost:8080/").unwrap();
        assert_eq!(cfg.api_url("/api/view/dashboard"), "http://localhost:8080/api/view/dashboard");
        assert_eq!(cfg.api_url("api/stats"), "http://localhost:8080/api/stats");
        assert_eq!(cfg.api_url("HTTPS://other.host/x"), "HTTPS://other.host/x");
        assert_eq!(cfg.api_url(""), "http://localhost:8080");
    }

    #[test]
    fn rejects_bad_urls() {
        assert!(matches!(
            DashboardConfig::new("not a url"),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            DashboardConfig::new("ftp://files.example.com"),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn rejects_zero_durations() {
        let cfg = DashboardConfig::default();
        assert_eq!(
            cfg.clone().with_timeout(Duration::ZERO).unwrap_err(),
            ConfigError::InvalidTimeout(Duration::ZERO)
        );
        assert!(cfg.with_profile_ttl(Duration::ZERO).is_err());
    }

    #[test]
    fn env_defaults_and_overrides() {
        let cfg = DashboardConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, DashboardConfig::default());

        let cfg = DashboardConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "https://rl.internal/"),
            (ENV_TIMEOUT_SECS, "15"),
            (ENV_PROFILE_TTL_SECS, "60"),
        ]))
        .unwrap();
        assert_eq!(cfg.base_url(), "https://rl.internal");
        assert_eq!(cfg.timeout(), Duration::from_secs(15));
        assert_eq!(cfg.profile_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn env_rejects_non_numeric_seconds() {
        let err = DashboardConfig::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, "ten")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidEnv { name: ENV_TIMEOUT_SECS, value: "ten".into() });
    }
}
