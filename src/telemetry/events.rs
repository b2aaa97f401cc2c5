use std::fmt;
use std::time::Duration;

/// Events emitted while the dashboard loads data.
///
/// The view and the admin session report what they did through these so a sink can
/// log, count, or forward them without the caller wiring anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardEvent {
    /// Dashboard fetch lifecycle
    Fetch(FetchEvent),
    /// Admin profile cache activity
    Profile(ProfileEvent),
}

/// Events emitted by [`DashboardView`](crate::view::DashboardView) refreshes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    /// A refresh was issued.
    Started {
        /// Generation number assigned to this refresh
        generation: u64,
    },
    /// The response was the latest and replaced the visible records.
    Applied {
        generation: u64,
        /// Number of records in the new set
        records: usize,
        duration: Duration,
    },
    /// The fetch failed; previous records were kept.
    Failed {
        generation: u64,
        /// [`DashboardError::kind`](crate::error::DashboardError::kind)
        kind: &'static str,
        duration: Duration,
    },
    /// A newer refresh was issued before this one resolved, so its result was dropped.
    Discarded {
        generation: u64,
        /// Latest generation at the time this one resolved
        latest: u64,
    },
    /// The view was unmounted before the fetch resolved.
    Unmounted { generation: u64 },
}

/// Events emitted by [`AdminSession`](crate::profile::AdminSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileEvent {
    /// Served from a fresh cache entry.
    CacheHit,
    /// Fetched from the backend and cached.
    Refreshed,
    /// Backend rejected the session; cache dropped.
    Invalidated,
    /// Backend failed; an expired entry was served instead.
    StaleServed,
}

impl fmt::Display for DashboardEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardEvent::Fetch(event) => write!(f, "Fetch::{}", event),
            DashboardEvent::Profile(event) => write!(f, "Profile::{}", event),
        }
    }
}

impl fmt::Display for FetchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchEvent::Started { generation } => write!(f, "Started(gen={})", generation),
            FetchEvent::Applied { generation, records, duration } => {
                write!(f, "Applied(gen={}, records={}, duration={:?})", generation, records, duration)
            }
            FetchEvent::Failed { generation, kind, duration } => {
                write!(f, "Failed(gen={}, kind={}, duration={:?})", generation, kind, duration)
            }
            FetchEvent::Discarded { generation, latest } => {
                write!(f, "Discarded(gen={}, latest={})", generation, latest)
            }
            FetchEvent::Unmounted { generation } => write!(f, "Unmounted(gen={})", generation),
        }
    }
}

impl fmt::Display for ProfileEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProfileEvent::CacheHit => "CacheHit",
            ProfileEvent::Refreshed => "Refreshed",
            ProfileEvent::Invalidated => "Invalidated",
            ProfileEvent::StaleServed => "StaleServed",
        };
        f.write_str(name)
    }
}

impl From<FetchEvent> for DashboardEvent {
    fn from(event: FetchEvent) -> Self {
        DashboardEvent::Fetch(event)
    }
}

impl From<ProfileEvent> for DashboardEvent {
    fn from(event: ProfileEvent) -> Self {
        DashboardEvent::Profile(event)
    }
}
