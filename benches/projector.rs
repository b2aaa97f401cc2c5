use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ratelens::{
    normalize_dashboard, project, summarize, top_consumers, Algorithm, AlgorithmFilter,
    ApiKeyUsageRecord, DashboardError, DashboardPayload, DashboardSource, DashboardView,
    FilterState, KeyStatus, TimeoutPolicy,
};
use serde_json::json;

// Roughly the size of a busy tenant's key list.
fn records(n: usize) -> Vec<ApiKeyUsageRecord> {
    let algorithms = Algorithm::known();
    (0..n)
        .map(|i| {
            let status = match i % 10 {
                0 => KeyStatus::Blocked,
                1 | 2 => KeyStatus::Warning,
                _ => KeyStatus::Normal,
            };
            ApiKeyUsageRecord::new(
                i.to_string(),
                format!("tenant-{}", i % 97),
                format!("rl_live_{:032x}", i),
                1000,
                (i * 37 % 1200) as u64,
                status,
            )
            .with_algorithm(algorithms[i % algorithms.len()].clone())
        })
        .collect()
}

// Hands back the same payload instantly.
struct Canned(DashboardPayload);

#[async_trait]
impl DashboardSource for Canned {
    async fn fetch_dashboard(&self) -> Result<DashboardPayload, DashboardError> {
        Ok(self.0.clone())
    }
}

fn projection(c: &mut Criterion) {
    let data = records(5_000);
    let unfiltered = FilterState::default();
    let narrow = FilterState::new()
        .with_search("tenant-4")
        .with_algorithm(AlgorithmFilter::Only(Algorithm::TokenBucket));

    c.bench_function("project_5k_unfiltered", |b| {
        b.iter(|| black_box(project(black_box(&data), &unfiltered)))
    });
    c.bench_function("project_5k_search_and_algorithm", |b| {
        b.iter(|| black_box(project(black_box(&data), &narrow)))
    });
    c.bench_function("summarize_and_top_5k", |b| {
        b.iter(|| {
            black_box(summarize(&data, None));
            black_box(top_consumers(&data, 7));
        })
    });
}

fn normalization(c: &mut Criterion) {
    let body = json!({
        "apiKeys": (0..1_000).map(|i| json!({
            "id": i,
            "ownerName": format!("tenant-{}", i % 50),
            "apiKey": format!("rl_live_{:032x}", i),
            "rateLimit": "1000",
            "requestCount": i * 3,
            "algorithm": "sliding_window",
            "status": if i % 9 == 0 { "blocked" } else { "NORMAL" },
        })).collect::<Vec<_>>(),
        "stats": { "totalRequests": 1_500_000, "allowedRequests": 1_400_000, "blockedRequests": 100_000 }
    });

    c.bench_function("normalize_1k_records", |b| {
        b.iter(|| black_box(normalize_dashboard(black_box(&body))))
    });
}

fn refresh(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let view = DashboardView::new(
        Canned(DashboardPayload { records: records(1_000), stats: None }),
        TimeoutPolicy::default(),
    );

    c.bench_function("refresh_and_render_1k", |b| {
        b.to_async(&rt).iter(|| async {
            let _ = black_box(view.refresh().await);
            black_box(view.render());
        });
    });
}

criterion_group!(benches, projection, normalization, refresh);
criterion_main!(benches);
