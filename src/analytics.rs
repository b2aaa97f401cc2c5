//! Top-consumer chart projection.

use crate::model::ApiKeyUsageRecord;

/// Number of bars the analytics chart shows by default.
pub const DEFAULT_TOP_LIMIT: usize = 7;

/// Chart-ready view of the heaviest keys.
///
/// Only the totals series: dashboard records have no per-key allowed/blocked split, so
/// `max_value` is taken over totals alone.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TopConsumers {
    /// User name per bar; `"Unknown"` when the record has none.
    pub labels: Vec<String>,
    /// Request count per bar, descending.
    pub totals: Vec<u64>,
    /// Sum of `totals`.
    pub sum: u64,
    /// Largest bar, never below 1 so it can be used as a divisor.
    pub max_value: u64,
}

impl TopConsumers {
    /// Height of bar `index` relative to the tallest, in `[0, 1]`.
    pub fn scaled(&self, index: usize) -> Option<f64> {
        self.totals.get(index).map(|v| *v as f64 / self.max_value as f64)
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

/// The `limit` records with the most requests. Ties keep their original order.
pub fn top_consumers(records: &[ApiKeyUsageRecord], limit: usize) -> TopConsumers {
    let mut ranked: Vec<&ApiKeyUsageRecord> = records.iter().collect();
    // stable sort, so equal counts stay in backend order
    ranked.sort_by(|a, b| b.request_count.cmp(&a.request_count));
    ranked.truncate(limit);

    let labels = ranked
        .iter()
        .map(|r| if r.user_name.is_empty() { "Unknown".to_string() } else { r.user_name.clone() })
        .collect();
    let totals: Vec<u64> = ranked.iter().map(|r| r.request_count).collect();
    let sum = totals.iter().fold(0u64, |acc, t| acc.saturating_add(*t));
    let max_value = totals.iter().copied().max().unwrap_or(0).max(1);

    TopConsumers { labels, totals, sum, max_value }
}
