//! Error types for dashboard fetches and configuration
use std::time::Duration;

/// Banner text shown when the backend could not be reached or answered garbage.
pub const GENERIC_LOAD_MESSAGE: &str = "Unable to load API keys.";

/// Unified error type for everything the dashboard client can hit while loading data.
///
/// None of these are fatal: the view turns each into a dismissible banner and keeps
/// whatever rows it rendered last.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DashboardError {
    /// The backend could not be reached (DNS, connect, TLS, reset).
    #[error("unable to reach backend: {0}")]
    Network(String),
    /// The backend answered with a non-2xx status.
    #[error("backend returned {status}: {message}")]
    Http { status: u16, message: String },
    /// The fetch exceeded the configured limit.
    #[error("request timed out after {elapsed:?} (limit: {timeout:?})")]
    Timeout { elapsed: Duration, timeout: Duration },
    /// A 2xx response whose body was not JSON at all.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    /// A request the client refused to send (e.g. blank owner name on create).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Configuration rejected before any request was made.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DashboardError {
    /// Build an `Http` error from a status and the raw response body.
    ///
    /// A JSON body carrying `message` (or `status_message`) supplies the text; anything
    /// else falls back to a generic line naming the status.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                ["message", "status_message"].iter().find_map(|field| {
                    value
                        .get(*field)
                        .and_then(|m| m.as_str())
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(str::to_owned)
                })
            })
            .unwrap_or_else(|| format!("request failed with status {}", status));
        DashboardError::Http { status, message }
    }

    /// Check if this error is due to timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
    /// Check if the backend could not be reached
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
    /// Check if the backend rejected the session (HTTP 401).
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }
    /// Check if the response body could not be parsed
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedPayload(_))
    }
    /// HTTP status, when the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
    /// Access timeout details as (elapsed, limit).
    pub fn timeout_details(&self) -> Option<(Duration, Duration)> {
        match self {
            Self::Timeout { elapsed, timeout } => Some((*elapsed, *timeout)),
            _ => None,
        }
    }

    /// Short machine-friendly name, used in telemetry.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Http { .. } => "http",
            Self::Timeout { .. } => "timeout",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Config(_) => "config",
        }
    }

    /// Text for the error banner.
    pub fn banner_message(&self) -> String {
        match self {
            Self::Network(_) | Self::MalformedPayload(_) => GENERIC_LOAD_MESSAGE.to_string(),
            Self::Http { message, .. } | Self::InvalidRequest(message) => message.clone(),
            Self::Timeout { timeout, .. } => {
                format!("Request timed out after {}s.", timeout.as_secs_f64())
            }
            Self::Config(e) => e.to_string(),
        }
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => DashboardError::Http {
                status: status.as_u16(),
                message: format!("request failed with status {}", status.as_u16()),
            },
            None if err.is_decode() => DashboardError::MalformedPayload(err.to_string()),
            None => DashboardError::Network(err.to_string()),
        }
    }
}

/// Errors produced when validating [`DashboardConfig`](crate::config::DashboardConfig).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Base URL missing, unparsable, or not http(s).
    #[error("invalid base url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    /// Timeout must be > 0.
    #[error("timeout must be > 0 (got {0:?})")]
    InvalidTimeout(Duration),
    /// Profile TTL must be > 0.
    #[error("profile ttl must be > 0 (got {0:?})")]
    InvalidProfileTtl(Duration),
    /// An environment variable held something that is not a number of seconds.
    #[error("environment variable {name} must be a whole number of seconds (got {value:?})")]
    InvalidEnv { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_prefers_json_message() {
        let err = DashboardError::from_response(400, r#"{"message":"Rate limit must be positive"}"#);
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.banner_message(), "Rate limit must be positive");
    }

    #[test]
    fn http_error_reads_status_message_field() {
        let err = DashboardError::from_response(429, r#"{"status_message":"Too Many Requests"}"#);
        assert_eq!(err.banner_message(), "Too Many Requests");
    }

    #[test]
    fn http_error_falls_back_on_plain_body() {
        let err = DashboardError::from_response(502, "<html>bad gateway</html>");
        assert_eq!(err.banner_message(), "request failed with status 502");
        let blank = DashboardError::from_response(500, r#"{"message":"   "}"#);
        assert_eq!(blank.banner_message(), "request failed with status 500");
    }

    #[test]
    fn unauthorized_is_only_401() {
        assert!(DashboardError::from_response(401, "").is_unauthorized());
        assert!(!DashboardError::from_response(403, "").is_unauthorized());
        assert!(!DashboardError::Network("refused".into()).is_unauthorized());
    }

    #[test]
    fn network_and_malformed_share_generic_banner() {
        assert_eq!(DashboardError::Network("x".into()).banner_message(), GENERIC_LOAD_MESSAGE);
        assert_eq!(
            DashboardError::MalformedPayload("x".into()).banner_message(),
            GENERIC_LOAD_MESSAGE
        );
    }

    #[test]
    fn timeout_display_and_accessors() {
        let err = DashboardError::Timeout {
            elapsed: Duration::from_millis(10_050),
            timeout: Duration::from_secs(10),
        };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("timed out"));
        assert_eq!(err.banner_message(), "Request timed out after 10s.");
        assert_eq!(
            err.timeout_details(),
            Some((Duration::from_millis(10_050), Duration::from_secs(10)))
        );
        assert_eq!(err.kind(), "timeout");
    }

    #[test]
    fn config_error_converts_transparently() {
        let err: DashboardError = ConfigError::InvalidTimeout(Duration::ZERO).into();
        assert_eq!(err.kind(), "config");
        assert!(err.to_string().contains("timeout must be > 0"));
    }
}
