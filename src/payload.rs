//! Parse-and-default boundary for backend payloads.
//!
//! The backend's JSON is loosely shaped: optional fields, mixed enum casing, legacy
//! field names, numbers that sometimes arrive as strings. This module is the only
//! place that deals with that. It never fails on shape, only on bodies that are not
//! JSON at all:
//!
//! - missing or wrong-typed arrays become empty
//! - missing or wrong-typed scalars become zero / empty / the documented default
//! - entries that are not objects are skipped
//!
//! Output is the fully-resolved [`ApiKeyUsageRecord`], so nothing downstream re-checks
//! optionality.

use crate::error::DashboardError;
use crate::model::{
    mask_api_key, usage_color, usage_percentage, Algorithm, ApiKeyUsageRecord, DashboardPayload,
    DashboardStats, KeyStatus,
};
use serde_json::Value;

/// Parse a raw response body.
///
/// Errors only with [`DashboardError::MalformedPayload`] when the body is not JSON.
pub fn parse_dashboard(body: &[u8]) -> Result<DashboardPayload, DashboardError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| DashboardError::MalformedPayload(e.to_string()))?;
    Ok(normalize_dashboard(&value))
}

/// Normalize an already-decoded body.
///
/// Accepts the `{ "apiKeys": [...], "stats": {...} }` envelope as well as a bare array
/// of records (the older list endpoint). Anything else yields an empty payload.
pub fn normalize_dashboard(value: &Value) -> DashboardPayload {
    match value {
        Value::Array(items) => DashboardPayload { records: normalize_records(items), stats: None },
        Value::Object(map) => {
            let records = match map.get("apiKeys") {
                Some(Value::Array(items)) => normalize_records(items),
                _ => Vec::new(),
            };
            let stats = map.get("stats").filter(|s| s.is_object()).map(normalize_stats);
            DashboardPayload { records, stats }
        }
        _ => DashboardPayload::default(),
    }
}

fn normalize_records(items: &[Value]) -> Vec<ApiKeyUsageRecord> {
    items.iter().filter_map(normalize_record).collect()
}

/// Normalize one record. Returns `None` only for entries that are not JSON objects.
pub fn normalize_record(value: &Value) -> Option<ApiKeyUsageRecord> {
    if !value.is_object() {
        return None;
    }

    let api_key_full = text(value, &["apiKeyFull", "apiKey"]).unwrap_or_default();
    let api_key_display =
        text(value, &["apiKeyDisplay"]).unwrap_or_else(|| mask_api_key(&api_key_full));
    let id = identifier(value.get("id"))
        .unwrap_or_else(|| if api_key_display.is_empty() { api_key_full.clone() } else { api_key_display.clone() });

    let rate_limit = count(value.get("rateLimit"));
    let request_count = count(value.get("requestCount"));
    let status = text(value, &["status"]).map(|s| KeyStatus::parse(&s)).unwrap_or_default();
    let algorithm = text(value, &["algorithm"]).map(|a| Algorithm::parse(&a)).unwrap_or_default();

    let usage = finite(value.get("usagePercentage"))
        .unwrap_or_else(|| usage_percentage(request_count, rate_limit));
    let status_color =
        text(value, &["statusColor"]).unwrap_or_else(|| status.default_color().to_string());
    let usage_color = text(value, &["usageColor"]).unwrap_or_else(|| usage_color(usage).to_string());

    Some(ApiKeyUsageRecord {
        id,
        user_name: text(value, &["userName", "ownerName"]).unwrap_or_default(),
        api_key_display,
        api_key_full,
        rate_limit,
        window_seconds: count(value.get("windowSeconds")),
        algorithm,
        request_count,
        status,
        usage_percentage: usage,
        status_color,
        usage_color,
    })
}

fn normalize_stats(value: &Value) -> DashboardStats {
    DashboardStats {
        total_requests: count(value.get("totalRequests")),
        allowed_requests: count(value.get("allowedRequests")),
        blocked_requests: count(value.get("blockedRequests")),
        allowed_percent: finite(value.get("allowedPercent")),
        blocked_percent: finite(value.get("blockedPercent")),
    }
}

/// First non-blank string among `fields`.
fn text(value: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match value.get(*field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

fn identifier(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-negative integer; negatives, fractions and garbage collapse to the nearest sane value.
fn count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    }
}

fn finite(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64().filter(|f| f.is_finite()),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{COLOR_AMBER, COLOR_GREEN};
    use serde_json::json;

    #[test]
    fn full_envelope_is_taken_verbatim() {
        let body = json!({
            "apiKeys": [{
                "id": 7,
                "userName": "acme-corp",
                "apiKeyDisplay": "rl_live_...bcdefXYZ",
                "apiKeyFull": "rl_live_0123456789abcdefXYZ",
                "rateLimit": 100,
                "windowSeconds": 60,
                "algorithm": "token_bucket",
                "requestCount": 42,
                "usagePercentage": 42.0,
                "status": "warning",
                "statusColor": "#f59e0b",
                "usageColor": "#10b981"
            }],
            "stats": {
                "totalRequests": 1000,
                "allowedRequests": 900,
                "blockedRequests": 100,
                "allowedPercent": 90.0,
                "blockedPercent": 10.0
            }
        });

        let payload = normalize_dashboard(&body);
        assert_eq!(payload.records.len(), 1);
        let record = &payload.records[0];
        assert_eq!(record.id, "7");
        assert_eq!(record.algorithm, Algorithm::TokenBucket);
        assert_eq!(record.status, KeyStatus::Warning);
        assert_eq!(record.status_color, "#f59e0b");
        assert_eq!(record.usage_color, "#10b981");
        assert_eq!(record.window_seconds, 60);

        let stats = payload.stats.expect("stats present");
        assert_eq!(stats.total_requests, 1000);
        assert_eq!(stats.allowed_percent, Some(90.0));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let payload = normalize_dashboard(&json!({
            "apiKeys": [{ "ownerName": "Globex", "apiKey": "rl_live_0123456789abcdefXYZ",
                          "rateLimit": 10, "requestCount": 8 }]
        }));
        let record = &payload.records[0];
        assert_eq!(record.user_name, "Globex");
        assert_eq!(record.api_key_display, "rl_live_...bcdefXYZ");
        assert_eq!(record.id, "rl_live_...bcdefXYZ");
        assert_eq!(record.algorithm, Algorithm::SlidingWindow);
        assert_eq!(record.status, KeyStatus::Normal);
        assert_eq!(record.usage_percentage, 80.0);
        assert_eq!(record.usage_color, COLOR_AMBER);
        assert_eq!(record.status_color, COLOR_GREEN);
        assert!(payload.stats.is_none());
    }

    #[test]
    fn wrong_shapes_degrade_instead_of_failing() {
        assert_eq!(normalize_dashboard(&json!({ "apiKeys": "nope" })).records.len(), 0);
        assert_eq!(normalize_dashboard(&json!(42)), DashboardPayload::default());

        let payload = normalize_dashboard(&json!({
            "apiKeys": [null, 3, { "rateLimit": "12", "requestCount": -4, "usagePercentage": "n/a" }],
            "stats": []
        }));
        assert_eq!(payload.records.len(), 1);
        assert_eq!(payload.records[0].rate_limit, 12);
        assert_eq!(payload.records[0].request_count, 0);
        assert_eq!(payload.records[0].usage_percentage, 0.0);
        assert!(payload.stats.is_none());
    }

    #[test]
    fn bare_array_is_accepted() {
        let payload = normalize_dashboard(&json!([{ "id": "a" }, { "id": "b" }]));
        let ids: Vec<_> = payload.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn backend_usage_is_authoritative() {
        let payload = normalize_dashboard(&json!([
            { "rateLimit": 10, "requestCount": 50, "usagePercentage": 100.0 }
        ]));
        assert_eq!(payload.records[0].usage_percentage, 100.0);
    }

    #[test]
    fn non_json_body_is_malformed() {
        let err = parse_dashboard(b"<html>login</html>").unwrap_err();
        assert!(err.is_malformed());
        assert!(parse_dashboard(b"{}").unwrap().records.is_empty());
    }
}
