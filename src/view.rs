//! Dashboard view state machine.
//!
//! ```text
//!   new() ──► Loading ──ok──► Ready ◄──ok──┐
//!                │              │          │
//!                └──err──► Error ◄──err────┘   (records from the last Ready are kept)
//! ```
//!
//! Every [`refresh`](DashboardView::refresh) takes the next generation number. When a
//! fetch resolves, its result is committed only if its generation is still the latest
//! issued and the view is still mounted; anything else is dropped silently. Overlapping
//! refreshes therefore cannot roll the view back to older data.
//!
//! Readers never block: the visible state is an immutable [`Snapshot`] behind an
//! `ArcSwap`, replaced wholesale on each commit.

use crate::error::DashboardError;
use crate::model::{ApiKeyUsageRecord, DashboardStats};
use crate::projector::{project, summarize, DerivedRow, FilterState, SummaryCards};
use crate::source::DashboardSource;
use crate::telemetry::{emit_best_effort, DashboardEvent, FetchEvent, NullSink, TelemetrySink};
use crate::timeout::TimeoutPolicy;
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Where the view is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing has resolved yet.
    Loading,
    /// The latest fetch succeeded.
    Ready,
    /// The latest fetch failed. Records from an earlier success may still be shown.
    Error,
}

/// Non-blocking error banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub message: String,
    /// [`DashboardError::kind`] of the failure behind it.
    pub kind: &'static str,
}

impl From<&DashboardError> for Banner {
    fn from(err: &DashboardError) -> Self {
        Banner { message: err.banner_message(), kind: err.kind() }
    }
}

/// Immutable visible state.
#[derive(Debug, Clone)]
pub struct Snapshot {
    phase: Phase,
    records: Arc<Vec<ApiKeyUsageRecord>>,
    stats: Option<DashboardStats>,
    banner: Option<Banner>,
    loaded: bool,
    generation: u64,
}

impl Snapshot {
    fn initial() -> Self {
        Self {
            phase: Phase::Loading,
            records: Arc::new(Vec::new()),
            stats: None,
            banner: None,
            loaded: false,
            generation: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Unfiltered records from the last successful fetch.
    pub fn records(&self) -> &[ApiKeyUsageRecord] {
        &self.records
    }

    pub fn stats(&self) -> Option<&DashboardStats> {
        self.stats.as_ref()
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    /// Whether any fetch has ever succeeded.
    pub fn has_data(&self) -> bool {
        self.loaded
    }

    /// Generation of the fetch that produced this snapshot; 0 before the first.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What a single [`refresh`](DashboardView::refresh) ended up doing.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// New records are visible.
    Applied { generation: u64, records: usize },
    /// The fetch failed; the banner is up and old records remain.
    Failed { generation: u64, error: DashboardError },
    /// A newer refresh was issued first; this result was dropped.
    Discarded { generation: u64, latest: u64 },
    /// The view was unmounted while the fetch was in flight.
    Unmounted { generation: u64 },
}

impl RefreshOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RefreshOutcome::Applied { .. })
    }

    pub fn is_discarded(&self) -> bool {
        matches!(self, RefreshOutcome::Discarded { .. })
    }

    pub fn error(&self) -> Option<&DashboardError> {
        match self {
            RefreshOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone)]
pub struct RenderModel {
    pub phase: Phase,
    pub rows: Vec<DerivedRow>,
    /// Size of the unfiltered record set.
    pub total_records: usize,
    pub summary: SummaryCards,
    pub banner: Option<Banner>,
}

impl RenderModel {
    /// `"2 of 5 API Keys"`.
    pub fn count_label(&self) -> String {
        let noun = if self.total_records == 1 { "API Key" } else { "API Keys" };
        format!("{} of {} {}", self.rows.len(), self.total_records, noun)
    }
}

/// Counter bumped by collaborators after they change backend data (e.g. a key was created).
#[derive(Debug, Clone)]
pub struct ChangeSignal {
    tx: Arc<watch::Sender<u64>>,
}

impl ChangeSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Announce a change. Returns the new tick.
    pub fn bump(&self) -> u64 {
        let mut tick = 0;
        self.tx.send_modify(|value| {
            *value += 1;
            tick = *value;
        });
        tick
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }

    pub fn tick(&self) -> u64 {
        *self.tx.borrow()
    }
}

impl Default for ChangeSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// The dashboard table view: records, filters, banner, and the refresh protocol.
#[derive(Debug)]
pub struct DashboardView<S, T = NullSink> {
    source: S,
    timeout: TimeoutPolicy,
    sink: T,
    issued: AtomicU64,
    // true while mounted; background tasks watch it to stop promptly
    mounted: watch::Sender<bool>,
    snapshot: ArcSwap<Snapshot>,
    filter: ArcSwap<FilterState>,
    // serializes generation check + store; never held across an await
    commit: Mutex<()>,
}

impl<S: DashboardSource> DashboardView<S, NullSink> {
    /// A mounted view in [`Phase::Loading`]. Call [`refresh`](Self::refresh) for the
    /// initial fetch.
    pub fn new(source: S, timeout: TimeoutPolicy) -> Self {
        Self {
            source,
            timeout,
            sink: NullSink,
            issued: AtomicU64::new(0),
            mounted: watch::channel(true).0,
            snapshot: ArcSwap::from_pointee(Snapshot::initial()),
            filter: ArcSwap::from_pointee(FilterState::default()),
            commit: Mutex::new(()),
        }
    }
}

impl<S, T> DashboardView<S, T>
where
    S: DashboardSource,
    T: TelemetrySink + Sync,
    T::Future: Send + 'static,
{
    /// Attach a telemetry sink.
    pub fn with_sink<U: TelemetrySink>(self, sink: U) -> DashboardView<S, U> {
        DashboardView {
            source: self.source,
            timeout: self.timeout,
            sink,
            issued: self.issued,
            mounted: self.mounted,
            snapshot: self.snapshot,
            filter: self.filter,
            commit: self.commit,
        }
    }

    /// Fetch and, if still current, publish the result.
    pub async fn refresh(&self) -> RefreshOutcome {
        let generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.emit(FetchEvent::Started { generation }).await;

        let started = Instant::now();
        let result = self.timeout.execute(|| self.source.fetch_dashboard()).await;
        let duration = started.elapsed();

        let outcome = self.commit(generation, result);
        match &outcome {
            RefreshOutcome::Applied { records, .. } => {
                self.emit(FetchEvent::Applied { generation, records: *records, duration }).await;
            }
            RefreshOutcome::Failed { error, .. } => {
                tracing::warn!(generation, error = %error, "dashboard fetch failed; keeping previous rows");
                self.emit(FetchEvent::Failed { generation, kind: error.kind(), duration }).await;
            }
            RefreshOutcome::Discarded { latest, .. } => {
                tracing::debug!(generation, latest, "discarding stale dashboard response");
                self.emit(FetchEvent::Discarded { generation, latest: *latest }).await;
            }
            RefreshOutcome::Unmounted { .. } => {
                tracing::debug!(generation, "view unmounted; dropping dashboard response");
                self.emit(FetchEvent::Unmounted { generation }).await;
            }
        }
        outcome
    }

    fn commit(
        &self,
        generation: u64,
        result: Result<crate::model::DashboardPayload, DashboardError>,
    ) -> RefreshOutcome {
        let _guard = self.commit.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if !self.is_mounted() {
            return RefreshOutcome::Unmounted { generation };
        }
        let latest = self.issued.load(Ordering::SeqCst);
        if generation != latest {
            return RefreshOutcome::Discarded { generation, latest };
        }

        match result {
            Ok(payload) => {
                let records = payload.records.len();
                self.snapshot.store(Arc::new(Snapshot {
                    phase: Phase::Ready,
                    records: Arc::new(payload.records),
                    stats: payload.stats,
                    banner: None,
                    loaded: true,
                    generation,
                }));
                RefreshOutcome::Applied { generation, records }
            }
            Err(error) => {
                let current = self.snapshot.load_full();
                self.snapshot.store(Arc::new(Snapshot {
                    phase: Phase::Error,
                    banner: Some(Banner::from(&error)),
                    generation,
                    ..(*current).clone()
                }));
                RefreshOutcome::Failed { generation, error }
            }
        }
    }

    async fn emit(&self, event: FetchEvent) {
        emit_best_effort(self.sink.clone(), DashboardEvent::from(event)).await;
    }
}

impl<S, T> DashboardView<S, T> {
    /// Current visible state.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    pub fn phase(&self) -> Phase {
        self.snapshot.load().phase
    }

    /// Highest generation issued so far.
    pub fn latest_generation(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    pub fn filter(&self) -> Arc<FilterState> {
        self.filter.load_full()
    }

    pub fn set_filter(&self, filter: FilterState) {
        self.filter.store(Arc::new(filter));
    }

    /// Rows, counts, summary and banner for the current records and filter.
    pub fn render(&self) -> RenderModel {
        let snapshot = self.snapshot.load_full();
        let filter = self.filter.load();
        RenderModel {
            phase: snapshot.phase,
            rows: project(&snapshot.records, &filter),
            total_records: snapshot.records.len(),
            summary: summarize(&snapshot.records, snapshot.stats.as_ref()),
            banner: snapshot.banner.clone(),
        }
    }

    /// Hide the banner. Records and phase are untouched.
    pub fn dismiss_banner(&self) {
        let _guard = self.commit.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let current = self.snapshot.load_full();
        if current.banner.is_some() {
            self.snapshot.store(Arc::new(Snapshot { banner: None, ..(*current).clone() }));
        }
    }

    /// Tear the view down. In-flight fetches resolve into nothing and tasks started by
    /// [`follow`](Self::follow) or [`poll_every`](Self::poll_every) exit.
    pub fn unmount(&self) {
        self.mounted.send_replace(false);
    }

    pub fn is_mounted(&self) -> bool {
        *self.mounted.borrow()
    }
}

impl<S, T> DashboardView<S, T>
where
    S: DashboardSource + 'static,
    T: TelemetrySink + Sync,
    T::Future: Send + 'static,
{
    /// Refetch after every bump of `changes`, until unmounted or the signal is dropped.
    ///
    /// Bumps that land while a fetch is running coalesce into one more refetch.
    pub fn follow(self: &Arc<Self>, mut changes: watch::Receiver<u64>) -> JoinHandle<()> {
        let view = Arc::clone(self);
        let stop = unmounted(self.mounted.subscribe());
        tokio::spawn(async move {
            tokio::pin!(stop);
            loop {
                tokio::select! {
                    _ = &mut stop => break,
                    changed = changes.changed() => {
                        if changed.is_err() || !view.is_mounted() {
                            break;
                        }
                        view.refresh().await;
                    }
                }
            }
            tracing::debug!("change follower stopped");
        })
    }

    /// Refetch every `period` until unmounted. The first poll happens one period from now.
    pub fn poll_every(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let view = Arc::clone(self);
        let stop = unmounted(self.mounted.subscribe());
        tokio::spawn(async move {
            tokio::pin!(stop);
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut stop => break,
                    _ = ticker.tick() => {
                        if !view.is_mounted() {
                            break;
                        }
                        view.refresh().await;
                    }
                }
            }
            tracing::debug!("poller stopped");
        })
    }
}

/// Resolves once the view reports unmounted (or is gone).
async fn unmounted(mut mounted: watch::Receiver<bool>) {
    loop {
        let still_mounted = *mounted.borrow_and_update();
        if !still_mounted || mounted.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DashboardPayload, KeyStatus};
    use async_trait::async_trait;

    struct Fixed(Result<DashboardPayload, DashboardError>);

    #[async_trait]
    impl DashboardSource for Fixed {
        async fn fetch_dashboard(&self) -> Result<DashboardPayload, DashboardError> {
            self.0.clone()
        }
    }

    fn payload(n: usize) -> DashboardPayload {
        DashboardPayload {
            records: (0..n)
                .map(|i| {
                    ApiKeyUsageRecord::new(i.to_string(), "acme", "k", 10, 5, KeyStatus::Normal)
                })
                .collect(),
            stats: None,
        }
    }

    #[tokio::test]
    async fn starts_loading_then_ready() {
        let view = DashboardView::new(Fixed(Ok(payload(2))), TimeoutPolicy::default());
        assert_eq!(view.phase(), Phase::Loading);
        assert!(!view.snapshot().has_data());

        let outcome = view.refresh().await;
        assert!(outcome.is_applied());
        assert_eq!(view.phase(), Phase::Ready);
        assert_eq!(view.snapshot().generation(), 1);
        assert_eq!(view.render().count_label(), "2 of 2 API Keys");
    }

    #[tokio::test]
    async fn first_failure_is_error_without_data() {
        let view = DashboardView::new(
            Fixed(Err(DashboardError::Network("refused".into()))),
            TimeoutPolicy::default(),
        );
        let outcome = view.refresh().await;
        assert!(outcome.error().unwrap().is_network());
        let snap = view.snapshot();
        assert_eq!(snap.phase(), Phase::Error);
        assert!(!snap.has_data());
        assert_eq!(snap.banner().unwrap().message, "Unable to load API keys.");
    }

    #[tokio::test]
    async fn dismiss_keeps_phase_and_rows() {
        let view = DashboardView::new(
            Fixed(Err(DashboardError::from_response(503, r#"{"message":"down for maintenance"}"#))),
            TimeoutPolicy::default(),
        );
        view.refresh().await;
        assert_eq!(view.render().banner.unwrap().message, "down for maintenance");
        view.dismiss_banner();
        assert!(view.render().banner.is_none());
        assert_eq!(view.phase(), Phase::Error);
    }

    #[tokio::test]
    async fn unmounted_view_ignores_results() {
        let view = DashboardView::new(Fixed(Ok(payload(1))), TimeoutPolicy::default());
        view.unmount();
        let outcome = view.refresh().await;
        assert!(matches!(outcome, RefreshOutcome::Unmounted { generation: 1 }));
        assert_eq!(view.phase(), Phase::Loading);
    }

    #[test]
    fn change_signal_counts_bumps() {
        let signal = ChangeSignal::new();
        let rx = signal.subscribe();
        assert_eq!(signal.bump(), 1);
        assert_eq!(signal.bump(), 2);
        assert_eq!(*rx.borrow(), 2);
        assert_eq!(signal.tick(), 2);
    }

    #[test]
    fn count_label_singular() {
        let model = RenderModel {
            phase: Phase::Ready,
            rows: Vec::new(),
            total_records: 1,
            summary: summarize(&[], None),
            banner: None,
        };
        assert_eq!(model.count_label(), "0 of 1 API Key");
    }
}
