//! Convenient re-exports for common ratelens types.
pub use crate::{
    analytics::{top_consumers, TopConsumers},
    config::DashboardConfig,
    error::DashboardError,
    model::{Algorithm, ApiKeyUsageRecord, DashboardPayload, DashboardStats, KeyStatus},
    profile::{AdminProfile, AdminSession, ProfileCache},
    projector::{project, summarize, AlgorithmFilter, FilterState, StatusFilter},
    source::{DashboardSource, HttpDashboardSource, NewApiKey, ProfileSource},
    telemetry::{LogSink, MemorySink, NullSink, TelemetrySink},
    timeout::TimeoutPolicy,
    view::{ChangeSignal, DashboardView, Phase, RefreshOutcome},
};
