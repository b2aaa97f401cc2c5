//! Normalized dashboard records.
//!
//! Everything here is produced by the parse boundary in [`crate::payload`]; by the time a
//! value reaches the projector every optional backend field has been resolved.

use std::fmt;

/// Red used for blocked keys and usage above 90%.
pub const COLOR_RED: &str = "#f87171";
/// Amber used for warning keys and usage above 70%.
pub const COLOR_AMBER: &str = "#fbbf24";
/// Green used for everything else.
pub const COLOR_GREEN: &str = "#86efac";

/// Rate-limiting strategy attached to a key. Opaque here; used for filtering and display.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Algorithm {
    SlidingWindow,
    TokenBucket,
    FixedWindow,
    LeakyBucket,
    Combined,
    /// Anything the backend sends that is not one of the known strategies, upper-cased.
    Other(String),
}

impl Algorithm {
    /// Parse a backend value, ignoring case and surrounding whitespace.
    ///
    /// Never fails: unknown names are kept as [`Algorithm::Other`].
    pub fn parse(raw: &str) -> Self {
        let upper = raw.trim().to_ascii_uppercase();
        match upper.as_str() {
            "SLIDING_WINDOW" => Algorithm::SlidingWindow,
            "TOKEN_BUCKET" => Algorithm::TokenBucket,
            "FIXED_WINDOW" => Algorithm::FixedWindow,
            "LEAKY_BUCKET" => Algorithm::LeakyBucket,
            "COMBINED" => Algorithm::Combined,
            _ => Algorithm::Other(upper),
        }
    }

    /// Wire form, e.g. `TOKEN_BUCKET`.
    pub fn as_str(&self) -> &str {
        match self {
            Algorithm::SlidingWindow => "SLIDING_WINDOW",
            Algorithm::TokenBucket => "TOKEN_BUCKET",
            Algorithm::FixedWindow => "FIXED_WINDOW",
            Algorithm::LeakyBucket => "LEAKY_BUCKET",
            Algorithm::Combined => "COMBINED",
            Algorithm::Other(name) => name,
        }
    }

    /// The five strategies the backend knows about, in menu order.
    pub fn known() -> [Algorithm; 5] {
        [
            Algorithm::SlidingWindow,
            Algorithm::TokenBucket,
            Algorithm::FixedWindow,
            Algorithm::LeakyBucket,
            Algorithm::Combined,
        ]
    }
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::SlidingWindow
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health of a key as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyStatus {
    #[default]
    Normal,
    Warning,
    Blocked,
}

impl KeyStatus {
    /// Total mapping from any backend string. Unrecognized values are `Normal`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "BLOCKED" => KeyStatus::Blocked,
            "WARNING" => KeyStatus::Warning,
            _ => KeyStatus::Normal,
        }
    }

    /// Upper-case value used when comparing against a status filter.
    pub fn as_str(self) -> &'static str {
        match self {
            KeyStatus::Normal => "NORMAL",
            KeyStatus::Warning => "WARNING",
            KeyStatus::Blocked => "BLOCKED",
        }
    }

    /// Human label shown in the status pill.
    pub fn label(self) -> &'static str {
        match self {
            KeyStatus::Normal => "Normal",
            KeyStatus::Warning => "Warning",
            KeyStatus::Blocked => "Blocked",
        }
    }

    /// Pill color when the backend does not send one.
    pub fn default_color(self) -> &'static str {
        match self {
            KeyStatus::Normal => COLOR_GREEN,
            KeyStatus::Warning => COLOR_AMBER,
            KeyStatus::Blocked => COLOR_RED,
        }
    }
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Usage relative to the limit, in percent.
///
/// A zero limit means the key has no meaningful usage and yields 0 rather than dividing.
pub fn usage_percentage(request_count: u64, rate_limit: u64) -> f64 {
    if rate_limit == 0 {
        return 0.0;
    }
    request_count as f64 / rate_limit.max(1) as f64 * 100.0
}

/// Bar color for a usage percentage.
pub fn usage_color(percentage: f64) -> &'static str {
    if percentage > 90.0 {
        COLOR_RED
    } else if percentage > 70.0 {
        COLOR_AMBER
    } else {
        COLOR_GREEN
    }
}

/// Mask a full key for display: short keys are shown whole, longer ones as
/// `first8...last8`.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 16 {
        return key.to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 8..].iter().collect();
    format!("{}...{}", head, tail)
}

/// One API key's usage, normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiKeyUsageRecord {
    pub id: String,
    pub user_name: String,
    pub api_key_display: String,
    pub api_key_full: String,
    pub rate_limit: u64,
    pub window_seconds: u64,
    pub algorithm: Algorithm,
    pub request_count: u64,
    pub status: KeyStatus,
    /// Backend value when it sent a finite one, otherwise [`usage_percentage`].
    pub usage_percentage: f64,
    pub status_color: String,
    pub usage_color: String,
}

impl ApiKeyUsageRecord {
    /// Build a record with every derived field computed locally.
    pub fn new(
        id: impl Into<String>,
        user_name: impl Into<String>,
        api_key_full: impl Into<String>,
        rate_limit: u64,
        request_count: u64,
        status: KeyStatus,
    ) -> Self {
        let api_key_full = api_key_full.into();
        let usage = usage_percentage(request_count, rate_limit);
        Self {
            id: id.into(),
            user_name: user_name.into(),
            api_key_display: mask_api_key(&api_key_full),
            api_key_full,
            rate_limit,
            window_seconds: 0,
            algorithm: Algorithm::default(),
            request_count,
            status,
            usage_percentage: usage,
            status_color: status.default_color().to_string(),
            usage_color: usage_color(usage).to_string(),
        }
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_window_seconds(mut self, window_seconds: u64) -> Self {
        self.window_seconds = window_seconds;
        self
    }
}

/// Backend-computed totals for the summary cards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardStats {
    pub total_requests: u64,
    pub allowed_requests: u64,
    pub blocked_requests: u64,
    pub allowed_percent: Option<f64>,
    pub blocked_percent: Option<f64>,
}

/// Everything one successful dashboard fetch yields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardPayload {
    pub records: Vec<ApiKeyUsageRecord>,
    pub stats: Option<DashboardStats>,
}
