//! Dashboard view projector.
//!
//! Turns the current record set plus the current filter state into the rows a table
//! renders and the figures the summary cards show. Pure and cheap: it is re-run on
//! every render and never caches.
//!
//! ```rust
//! use ratelens::model::{ApiKeyUsageRecord, KeyStatus};
//! use ratelens::projector::{project, FilterState};
//!
//! let records = vec![ApiKeyUsageRecord::new("1", "Acme", "key-1", 10, 5, KeyStatus::Normal)];
//! let rows = project(&records, &FilterState::default());
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0].usage_percentage(), 50.0);
//! assert_eq!(rows[0].status_label(), "Normal");
//! ```

use crate::model::{Algorithm, ApiKeyUsageRecord, DashboardStats, KeyStatus};
use std::fmt;
use std::str::FromStr;

/// Algorithm dropdown value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AlgorithmFilter {
    #[default]
    All,
    Only(Algorithm),
}

impl AlgorithmFilter {
    pub fn matches(&self, algorithm: &Algorithm) -> bool {
        match self {
            AlgorithmFilter::All => true,
            AlgorithmFilter::Only(wanted) => wanted == algorithm,
        }
    }
}

impl FromStr for AlgorithmFilter {
    type Err = std::convert::Infallible;

    /// `ALL` (any case) or an algorithm name; never fails.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("ALL") {
            Ok(AlgorithmFilter::All)
        } else {
            Ok(AlgorithmFilter::Only(Algorithm::parse(s)))
        }
    }
}

impl fmt::Display for AlgorithmFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlgorithmFilter::All => f.write_str("ALL"),
            AlgorithmFilter::Only(a) => write!(f, "{}", a),
        }
    }
}

/// Status dropdown value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(KeyStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: KeyStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

/// Returned for status filter strings outside `ALL | NORMAL | WARNING | BLOCKED`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status filter {0:?} (expected ALL, NORMAL, WARNING or BLOCKED)")]
pub struct UnknownStatusFilter(pub String);

impl FromStr for StatusFilter {
    type Err = UnknownStatusFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(StatusFilter::All),
            "NORMAL" => Ok(StatusFilter::Only(KeyStatus::Normal)),
            "WARNING" => Ok(StatusFilter::Only(KeyStatus::Warning)),
            "BLOCKED" => Ok(StatusFilter::Only(KeyStatus::Blocked)),
            _ => Err(UnknownStatusFilter(s.to_string())),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("ALL"),
            StatusFilter::Only(s) => f.write_str(s.as_str()),
        }
    }
}

/// Search box plus both dropdowns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    search: String,
    pub algorithm: AlgorithmFilter,
    pub status: StatusFilter,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the search text. Stored trimmed and lower-cased.
    pub fn with_search(mut self, text: &str) -> Self {
        self.search = text.trim().to_lowercase();
        self
    }

    pub fn with_algorithm(mut self, algorithm: AlgorithmFilter) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    /// Normalized search text.
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Whether `record` passes every active filter.
    pub fn matches(&self, record: &ApiKeyUsageRecord) -> bool {
        if !self.algorithm.matches(&record.algorithm) || !self.status.matches(record.status) {
            return false;
        }
        if self.search.is_empty() {
            return true;
        }
        searchable_text(record).contains(&self.search)
    }
}

/// Lower-cased `user api_key algorithm status` line the search box matches against.
fn searchable_text(record: &ApiKeyUsageRecord) -> String {
    [
        record.user_name.as_str(),
        record.api_key_display.as_str(),
        record.algorithm.as_str(),
        record.status.label(),
    ]
    .iter()
    .filter(|part| !part.is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}

/// A record ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRow {
    record: ApiKeyUsageRecord,
}

impl DerivedRow {
    pub fn record(&self) -> &ApiKeyUsageRecord {
        &self.record
    }

    pub fn usage_percentage(&self) -> f64 {
        self.record.usage_percentage
    }

    /// Usage clamped to `[0, 100]` for the progress bar.
    pub fn bar_width(&self) -> f64 {
        self.record.usage_percentage.clamp(0.0, 100.0)
    }

    /// Percentage with one decimal, e.g. `"50.0%"`.
    pub fn usage_label(&self) -> String {
        format!("{:.1}%", self.record.usage_percentage)
    }

    pub fn status_label(&self) -> &'static str {
        self.record.status.label()
    }

    pub fn status_color(&self) -> &str {
        &self.record.status_color
    }

    pub fn usage_color(&self) -> &str {
        &self.record.usage_color
    }
}

impl std::ops::Deref for DerivedRow {
    type Target = ApiKeyUsageRecord;

    fn deref(&self) -> &Self::Target {
        &self.record
    }
}

/// Rows matching `filter`, in original record order.
pub fn project(records: &[ApiKeyUsageRecord], filter: &FilterState) -> Vec<DerivedRow> {
    records
        .iter()
        .filter(|record| filter.matches(record))
        .map(|record| DerivedRow { record: record.clone() })
        .collect()
}

/// Figures behind the summary cards.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryCards {
    pub total_requests: u64,
    pub allowed_requests: u64,
    pub blocked_requests: u64,
    pub allowed_percent: f64,
    pub blocked_percent: f64,
}

impl SummaryCards {
    /// One-decimal label, `"0.0"` when nothing has been counted.
    pub fn allowed_percent_label(&self) -> String {
        format!("{:.1}", self.allowed_percent)
    }

    pub fn blocked_percent_label(&self) -> String {
        format!("{:.1}", self.blocked_percent)
    }
}

/// Summarize the *unfiltered* record set.
///
/// Backend stats win when present. Without them the total is the sum of request
/// counts and allowed/blocked are unknown, so both percentages fall back to zero.
pub fn summarize(records: &[ApiKeyUsageRecord], stats: Option<&DashboardStats>) -> SummaryCards {
    match stats {
        Some(stats) => {
            let total = stats.total_requests;
            SummaryCards {
                total_requests: total,
                allowed_requests: stats.allowed_requests,
                blocked_requests: stats.blocked_requests,
                allowed_percent: stats
                    .allowed_percent
                    .unwrap_or_else(|| percent_of(stats.allowed_requests, total)),
                blocked_percent: stats
                    .blocked_percent
                    .unwrap_or_else(|| percent_of(stats.blocked_requests, total)),
            }
        }
        None => SummaryCards {
            total_requests: records
                .iter()
                .fold(0u64, |acc, r| acc.saturating_add(r.request_count)),
            allowed_requests: 0,
            blocked_requests: 0,
            allowed_percent: 0.0,
            blocked_percent: 0.0,
        },
    }
}

fn percent_of(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}
