//! Rate-limiter dashboard in the terminal.
//!
//! ```sh
//! # One-shot table against the default backend (http://localhost:8080)
//! ratelens
//!
//! # Sign in first, filter, and refresh every 5 seconds
//! ratelens --username admin --password admin123 --status warning --watch 5
//!
//! # Record fetch telemetry
//! ratelens --events /tmp/ratelens.jsonl
//!
//! # Create a key, then show the refreshed table
//! ratelens --username admin --password admin123 create --owner Acme --limit 100 --window 60
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ratelens::telemetry::{LogSink, TelemetrySink};
use ratelens::{
    top_consumers, AdminSession, Algorithm, AlgorithmFilter, ChangeSignal, DashboardConfig,
    DashboardView, FilterState, HttpDashboardSource, NewApiKey, ProfileCache, RenderModel,
    StatusFilter, DEFAULT_TOP_LIMIT,
};
use ratelens_jsonl::JsonlSink;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type Source = Arc<HttpDashboardSource>;

/// Show per-key usage from a rate-limiter admin backend.
#[derive(Parser, Debug)]
#[command(name = "ratelens", version, about = "Rate-limiter admin dashboard for the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Backend base URL. Defaults to $RATELENS_API_BASE_URL, then http://localhost:8080.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Sign in with this admin user before loading.
    #[arg(long, global = true, requires = "password")]
    username: Option<String>,

    #[arg(long, global = true)]
    password: Option<String>,

    /// Case-insensitive match on user, key, algorithm or status.
    #[arg(short, long, default_value = "")]
    search: String,

    /// ALL or an algorithm name such as TOKEN_BUCKET.
    #[arg(short, long, default_value = "ALL")]
    algorithm: String,

    /// ALL, NORMAL, WARNING or BLOCKED.
    #[arg(long, default_value = "ALL")]
    status: String,

    /// Number of bars in the top-consumer chart.
    #[arg(long, default_value_t = DEFAULT_TOP_LIMIT)]
    top: usize,

    /// Refresh every N seconds until Ctrl-C.
    #[arg(short, long)]
    watch: Option<u64>,

    /// Append fetch telemetry to this JSONL file.
    #[arg(long, global = true)]
    events: Option<PathBuf>,

    /// Log filter (overrides RUST_LOG).
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an API key and show the dashboard once it has refetched.
    Create {
        /// Owner shown in the USER column.
        #[arg(long)]
        owner: String,

        /// Requests allowed per window.
        #[arg(long)]
        limit: u64,

        /// Window length in seconds.
        #[arg(long, default_value_t = 60)]
        window: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let mut config = match &cli.base_url {
        Some(url) => DashboardConfig::new(url.as_str())?,
        None => DashboardConfig::from_env().context("reading RATELENS_* environment")?,
    };
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs))?;
    }
    let policy = config.timeout_policy();
    let profile_ttl = config.profile_ttl();
    info!(base_url = config.base_url(), timeout = ?config.timeout(), "starting dashboard");

    let source: Source = Arc::new(HttpDashboardSource::new(config)?);
    if let (Some(user), Some(password)) = (&cli.username, &cli.password) {
        let session = AdminSession::new(Arc::clone(&source), ProfileCache::new(profile_ttl));
        session.cache().store(source.login(user, password).await.context("login failed")?);
        let profile = session.current().await.context("loading admin profile")?;
        println!("Signed in as {} ({})", profile.full_name, profile.initials());
    }

    let view = DashboardView::new(Arc::clone(&source), policy);
    view.set_filter(filter_from(&cli)?);
    match &cli.events {
        Some(path) => run(Arc::new(view.with_sink(JsonlSink::new(path))), source, &cli).await,
        None => run(Arc::new(view.with_sink(LogSink)), source, &cli).await,
    }
}

fn filter_from(cli: &Cli) -> Result<FilterState> {
    let algorithm = cli.algorithm.parse::<AlgorithmFilter>().unwrap_or_default();
    if let Some(unknown) = unknown_algorithm(&algorithm) {
        warn!(algorithm = %unknown, "unknown algorithm; the filter only matches keys reporting it verbatim");
        eprintln!(
            "warning: unknown algorithm {unknown}; expected ALL or one of {}",
            Algorithm::known().map(|a| a.as_str().to_string()).join(", ")
        );
    }
    Ok(FilterState::new()
        .with_search(&cli.search)
        .with_algorithm(algorithm)
        .with_status(cli.status.parse::<StatusFilter>()?))
}

fn unknown_algorithm(filter: &AlgorithmFilter) -> Option<&Algorithm> {
    match filter {
        AlgorithmFilter::Only(wanted) if !Algorithm::known().contains(wanted) => Some(wanted),
        _ => None,
    }
}

async fn run<T>(view: Arc<DashboardView<Source, T>>, source: Source, cli: &Cli) -> Result<()>
where
    T: TelemetrySink + Sync,
    T::Future: Send + 'static,
{
    let changes = ChangeSignal::new();
    let follower = view.follow(changes.subscribe());

    view.refresh().await;
    if let Some(Command::Create { owner, limit, window }) = &cli.command {
        let key = NewApiKey::new(owner.as_str(), *limit, *window)?;
        let created = source.create_key(&key).await.context("creating api key")?;
        println!("{} (id {}, owner {})", created.message, created.id, created.owner_name);

        let before = view.snapshot().generation();
        changes.bump();
        let refetched = tokio::time::timeout(source.config().timeout() * 2, async {
            while view.snapshot().generation() <= before {
                tokio::time::sleep(Duration::from_millis(25)).await;
            }
        })
        .await;
        if refetched.is_err() {
            warn!("dashboard did not refetch after creating the key");
        }
    }
    print_frame(&view.render(), &*view, cli.top);

    let poller = cli.watch.map(|secs| view.poll_every(Duration::from_secs(secs.max(1))));
    if poller.is_some() {
        let mut shown = view.snapshot().generation();
        let mut redraw = tokio::time::interval(Duration::from_millis(200));
        loop {
            tokio::select! {
                _ = redraw.tick() => {
                    let generation = view.snapshot().generation();
                    if generation != shown {
                        shown = generation;
                        print_frame(&view.render(), &*view, cli.top);
                    }
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }
    }

    view.unmount();
    if let Some(poller) = poller {
        poller.await?;
    }
    follower.await?;
    Ok(())
}

fn print_frame<S, T>(model: &RenderModel, view: &DashboardView<S, T>, top: usize) {
    if let Some(banner) = &model.banner {
        println!("! {}", banner.message);
    }
    println!(
        "Total requests: {}   Allowed: {} ({}%)   Blocked: {} ({}%)",
        model.summary.total_requests,
        model.summary.allowed_requests,
        model.summary.allowed_percent_label(),
        model.summary.blocked_requests,
        model.summary.blocked_percent_label(),
    );
    println!();
    println!(
        "{:<20} {:<22} {:<15} {:>8} {:>9} {:>8}  {}",
        "USER", "API KEY", "ALGORITHM", "LIMIT", "REQUESTS", "USAGE", "STATUS"
    );
    for row in &model.rows {
        println!(
            "{:<20} {:<22} {:<15} {:>8} {:>9} {:>8}  {}",
            truncate(&row.user_name, 20),
            truncate(&row.api_key_display, 22),
            row.algorithm.as_str(),
            row.rate_limit,
            row.request_count,
            row.usage_label(),
            row.status_label(),
        );
    }
    println!("{}", model.count_label());

    let snapshot = view.snapshot();
    let chart = top_consumers(snapshot.records(), top);
    if !chart.is_empty() {
        println!();
        println!("Top consumers ({} requests)", chart.sum);
        for (index, label) in chart.labels.iter().enumerate() {
            let scaled = chart.scaled(index).unwrap_or(0.0);
            let bar = "#".repeat((scaled * 30.0).round() as usize);
            println!("{:<20} {:<30} {}", truncate(label, 20), bar, chart.totals[index]);
        }
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('~');
        cut
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_subcommand_parses_after_global_flags() {
        let cli = Cli::try_parse_from([
            "ratelens", "--base-url", "http://localhost:9000", "create", "--owner", "Acme", "--limit", "100",
        ])
        .unwrap();
        assert_eq!(cli.base_url.as_deref(), Some("http://localhost:9000"));
        match cli.command {
            Some(Command::Create { owner, limit, window }) => {
                assert_eq!((owner.as_str(), limit, window), ("Acme", 100, 60));
            }
            None => panic!("expected create"),
        }
    }

    #[test]
    fn password_is_required_with_username() {
        assert!(Cli::try_parse_from(["ratelens", "--username", "admin"]).is_err());
    }

    #[test]
    fn only_unlisted_algorithms_are_flagged() {
        let typo: AlgorithmFilter = "TOKEN_BUCKT".parse().unwrap();
        assert_eq!(unknown_algorithm(&typo).map(|a| a.as_str().to_string()), Some("TOKEN_BUCKT".to_string()));
        assert!(unknown_algorithm(&"token_bucket".parse().unwrap()).is_none());
        assert!(unknown_algorithm(&AlgorithmFilter::All).is_none());
    }

    #[test]
    fn unknown_algorithm_still_builds_a_filter() {
        let cli = Cli::try_parse_from(["ratelens", "-a", "leaky", "--status", "warning"]).unwrap();
        let filter = filter_from(&cli).unwrap();
        assert!(unknown_algorithm(&filter.algorithm).is_some());
    }
}
