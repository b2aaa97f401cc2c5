#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # ratelens
//!
//! Client-side view layer for a rate-limiter admin dashboard: it fetches per-key usage
//! records, normalizes whatever the backend sends, and projects them into filtered,
//! colored rows and summary cards.
//!
//! ## Features
//!
//! - **Tolerant parsing**: missing or mistyped fields degrade to defaults, never panics
//! - **Projection**: search, algorithm and status filters over a single pass
//! - **Race-free refresh**: only the latest issued fetch may update the view
//! - **Timeouts** on every backend call
//! - **Profile cache** with TTL and 401 invalidation
//! - **Telemetry** as `tower::Service` sinks
//!
//! ## Quick Start
//!
//! ```rust
//! use ratelens::{project, FilterState, KeyStatus, StatusFilter, ApiKeyUsageRecord};
//!
//! let records = vec![
//!     ApiKeyUsageRecord::new("1", "acme", "k1", 100, 95, KeyStatus::Warning),
//!     ApiKeyUsageRecord::new("2", "globex", "k2", 100, 10, KeyStatus::Normal),
//! ];
//! let filter = FilterState::new().with_status(StatusFilter::Only(KeyStatus::Warning));
//! let rows = project(&records, &filter);
//!
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0].usage_label(), "95.0%");
//! assert_eq!(rows[0].usage_color(), "#f87171");
//! ```

pub mod analytics;
pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod payload;
pub mod prelude;
pub mod profile;
pub mod projector;
pub mod source;
pub mod telemetry;
pub mod timeout;
pub mod view;

// Re-exports
pub use analytics::{top_consumers, TopConsumers, DEFAULT_TOP_LIMIT};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::DashboardConfig;
pub use error::{ConfigError, DashboardError};
pub use model::{
    mask_api_key, usage_color, usage_percentage, Algorithm, ApiKeyUsageRecord, DashboardPayload,
    DashboardStats, KeyStatus,
};
pub use payload::{normalize_dashboard, normalize_record, parse_dashboard};
pub use profile::{AdminProfile, AdminSession, ProfileCache};
pub use projector::{
    project, summarize, AlgorithmFilter, DerivedRow, FilterState, StatusFilter, SummaryCards,
};
pub use source::{CreatedApiKey, DashboardSource, HttpDashboardSource, NewApiKey, ProfileSource};
pub use timeout::{TimeoutPolicy, DEFAULT_TIMEOUT};
pub use view::{Banner, ChangeSignal, DashboardView, Phase, RefreshOutcome, RenderModel, Snapshot};
