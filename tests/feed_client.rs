mod common;

use common::{history_path, last_path, route, StubServer, UNREACHABLE_BASE_URL};
use std::time::Duration;
use tempcast_bot::config::FeedChannel;
use tempcast_bot::feeds::{FeedError, MetricsSource, ThingSpeakClient};

const CHANNEL_ID: u64 = 2_749_134;

fn channel() -> FeedChannel {
    FeedChannel::new("Polynomial", CHANNEL_ID, Some("READKEY".to_string()))
}

fn client(base_url: &str) -> ThingSpeakClient {
    ThingSpeakClient::new(base_url, Duration::from_secs(5)).expect("client builds")
}

#[tokio::test]
async fn test_latest_parses_record() {
    let server = StubServer::start(vec![route(
        last_path(CHANNEL_ID),
        200,
        r#"{"created_at":"2025-03-01T08:00:00Z","entry_id":42,"field1":"21.37","field2":"1"}"#,
    )])
    .await;

    let record = client(&server.base_url)
        .latest(&channel())
        .await
        .expect("latest record");
    assert_eq!(record.entry_id, Some(42));
    assert_eq!(record.value(), Some(21.37));
    assert!(record.is_anomalous());

    assert_eq!(
        server.request_lines(),
        vec!["GET /channels/2749134/feeds/last.json?api_key=READKEY".to_string()]
    );
}

#[tokio::test]
async fn test_history_parses_feeds_in_order() {
    let server = StubServer::start(vec![route(
        history_path(CHANNEL_ID),
        200,
        r#"{"channel":{"id":2749134},"feeds":[
            {"created_at":"2025-03-01T08:00:00Z","entry_id":1,"field1":"20.0","field2":"0"},
            {"created_at":"2025-03-01T08:15:00Z","entry_id":2,"field1":"20.5","field2":"0"},
            {"created_at":"2025-03-01T08:30:00Z","entry_id":3,"field1":"21.0","field2":"1"}
        ]}"#,
    )])
    .await;

    let series = client(&server.base_url)
        .history(&channel(), 3)
        .await
        .expect("history");
    assert_eq!(series.len(), 3);
    let points = series.points().expect("numeric points");
    assert!((points[2].1 - 21.0).abs() < f64::EPSILON);
    assert!(points[0].0 < points[2].0);

    assert_eq!(
        server.request_lines(),
        vec!["GET /channels/2749134/feeds.json?results=3&api_key=READKEY".to_string()]
    );
}

#[tokio::test]
async fn test_error_status_is_reported_without_key() {
    let server =
        StubServer::start(vec![route(last_path(CHANNEL_ID), 500, r#"{"error":"boom"}"#)]).await;

    let err = client(&server.base_url)
        .latest(&channel())
        .await
        .expect_err("500 must fail");
    match &err {
        FeedError::Status { status, url } => {
            assert_eq!(*status, 500);
            assert!(!url.contains("READKEY"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
    assert!(!err.to_string().contains("READKEY"));
}

#[tokio::test]
async fn test_unknown_path_is_status_error() {
    // Only the latest-entry endpoint exists
    let server = StubServer::start(vec![route(last_path(CHANNEL_ID), 200, "{}")]).await;

    let err = client(&server.base_url)
        .history(&channel(), 10)
        .await
        .expect_err("history endpoint is not served");
    assert!(matches!(err, FeedError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_empty_channel_marker_is_malformed() {
    let server = StubServer::start(vec![route(last_path(CHANNEL_ID), 200, "-1")]).await;

    let err = client(&server.base_url)
        .latest(&channel())
        .await
        .expect_err("-1 is not a record");
    assert!(matches!(err, FeedError::Malformed(_)));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let err = client(UNREACHABLE_BASE_URL)
        .history(&channel(), 10)
        .await
        .expect_err("nothing listens on port 9");
    assert!(matches!(err, FeedError::Network(_)));
    assert!(!err.to_string().contains("READKEY"));
}
