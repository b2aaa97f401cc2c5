//! JSONL sink for `ratelens`. Writes one dashboard event per line.
//! Always appends; bring your own path.

use ratelens::telemetry::{DashboardEvent, FetchEvent, ProfileEvent, TelemetrySink};
use serde_json::json;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

#[derive(Clone, Debug)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl tower_service::Service<DashboardEvent> for JsonlSink {
    type Response = ();
    type Error = io::Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<(), Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: DashboardEvent) -> Self::Future {
        let path = self.path.clone();
        let line = event_to_json(&event).to_string() + "\n";
        Box::pin(async move {
            use tokio::io::AsyncWriteExt;
            let mut file =
                tokio::fs::OpenOptions::new().create(true).append(true).open(&path).await?;
            file.write_all(line.as_bytes()).await?;
            file.flush().await.map_err(|e| {
                tracing::warn!(path = %path.display(), error = %e, "jsonl flush failed");
                e
            })
        })
    }
}

impl TelemetrySink for JsonlSink {
    type SinkError = io::Error;
}

fn event_to_json(event: &DashboardEvent) -> serde_json::Value {
    match event {
        DashboardEvent::Fetch(f) => match f {
            FetchEvent::Started { generation } => {
                json!({ "kind": "fetch_started", "generation": generation })
            }
            FetchEvent::Applied { generation, records, duration } => {
                json!({ "kind": "fetch_applied", "generation": generation, "records": records, "duration_ms": duration.as_millis() })
            }
            FetchEvent::Failed { generation, kind, duration } => {
                json!({ "kind": "fetch_failed", "generation": generation, "error": kind, "duration_ms": duration.as_millis() })
            }
            FetchEvent::Discarded { generation, latest } => {
                json!({ "kind": "fetch_discarded", "generation": generation, "latest": latest })
            }
            FetchEvent::Unmounted { generation } => {
                json!({ "kind": "fetch_unmounted", "generation": generation })
            }
        },
        DashboardEvent::Profile(p) => match p {
            ProfileEvent::CacheHit => json!({ "kind": "profile_cache_hit" }),
            ProfileEvent::Refreshed => json!({ "kind": "profile_refreshed" }),
            ProfileEvent::Invalidated => json!({ "kind": "profile_invalidated" }),
            ProfileEvent::StaleServed => json!({ "kind": "profile_stale_served" }),
        },
    }
}
