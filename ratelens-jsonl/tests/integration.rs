use ratelens::telemetry::{DashboardEvent, FetchEvent, ProfileEvent};
use ratelens_jsonl::JsonlSink;
use std::time::Duration;
use tower_service::Service;

#[tokio::test]
async fn writes_json_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("dashboard.jsonl");
    let mut sink = JsonlSink::new(&path);

    sink.call(DashboardEvent::Fetch(FetchEvent::Applied {
        generation: 3,
        records: 12,
        duration: Duration::from_millis(40),
    }))
    .await
    .unwrap();
    sink.call(DashboardEvent::Fetch(FetchEvent::Discarded { generation: 2, latest: 3 }))
        .await
        .unwrap();
    sink.call(DashboardEvent::Profile(ProfileEvent::StaleServed)).await.unwrap();

    let contents = std::fs::read_to_string(&path).expect("file");
    let lines: Vec<serde_json::Value> =
        contents.lines().map(|l| serde_json::from_str(l).expect("one json object per line")).collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["kind"], "fetch_applied");
    assert_eq!(lines[0]["records"], 12);
    assert_eq!(lines[0]["duration_ms"], 40);
    assert_eq!(lines[1]["latest"], 3);
    assert_eq!(lines[2]["kind"], "profile_stale_served");
}
