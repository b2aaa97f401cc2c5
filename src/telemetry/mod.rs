//! Telemetry for the dashboard client.
//!
//! The view and the admin session describe what they did as [`DashboardEvent`]s.
//! Events flow through `TelemetrySink` implementations which can log, collect,
//! or forward them (see the `ratelens-jsonl` crate for a file sink).
//!
//! # Event Types
//!
//! - **Fetch**: `Started`, `Applied`, `Failed`, `Discarded`, `Unmounted`
//! - **Profile**: `CacheHit`, `Refreshed`, `Invalidated`, `StaleServed`
//!
//! # Telemetry Sinks
//!
//! The `TelemetrySink` trait is a `tower::Service<DashboardEvent>`, so sinks compose
//! with ordinary tower combinators.
//!
//! ```rust
//! use ratelens::telemetry::{emit_best_effort, FetchEvent, MemorySink};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let sink = MemorySink::new();
//! emit_best_effort(sink.clone(), FetchEvent::Started { generation: 1 }.into()).await;
//! assert_eq!(sink.len(), 1);
//! # }
//! ```

pub mod events;
pub mod sinks;

pub use events::{DashboardEvent, FetchEvent, ProfileEvent};
pub use sinks::{emit_best_effort, LogSink, MemorySink, NullSink, TelemetrySink};
