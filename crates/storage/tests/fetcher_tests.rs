//! Fetcher tests against an in-process HTTP server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use chrono::NaiveDate;
use storage::{DiskCache, FetchConfig, FetchError, GridSource, RemoteGridFetcher};
use test_utils::{date, synthetic_container, test_old_geometry};

/// Scripted responses per filename; anything unknown is a 404.
#[derive(Default)]
struct Archive {
    files: HashMap<String, Bytes>,
    /// Status codes returned before the real file, consumed in order.
    failures: Mutex<HashMap<String, Vec<StatusCode>>>,
    requests: AtomicUsize,
}

async fn serve_file(
    State(archive): State<Arc<Archive>>,
    Path((_year, _month, file)): Path<(String, String, String)>,
) -> Response {
    archive.requests.fetch_add(1, Ordering::SeqCst);

    if let Some(queue) = archive.failures.lock().unwrap().get_mut(&file) {
        if !queue.is_empty() {
            return queue.remove(0).into_response();
        }
    }

    match archive.files.get(&file) {
        Some(bytes) => (StatusCode::OK, bytes.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn start_server(archive: Arc<Archive>) -> String {
    let app = Router::new()
        .route("/masked/:year/:month/:file", get(serve_file))
        .with_state(archive);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/masked")
}

fn fast_config(base_url: String) -> FetchConfig {
    FetchConfig {
        base_url,
        request_timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(2),
        max_retries: 3,
        initial_retry_delay: Duration::from_millis(5),
        max_retry_delay: Duration::from_millis(20),
        max_in_flight: 2,
        as_of: Some(date(2021, 12, 31)),
    }
}

fn container(day: NaiveDate) -> Bytes {
    synthetic_container(day, &test_old_geometry(), &["1036"])
}

#[tokio::test]
async fn test_download_then_cache_hit() {
    let day = date(2021, 1, 1);
    let body = container(day);
    let archive = Arc::new(Archive {
        files: HashMap::from([("SNODAS_20210101.tar".to_string(), body.clone())]),
        ..Default::default()
    });
    let base = start_server(archive.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let fetcher = RemoteGridFetcher::new(fast_config(base), DiskCache::new(dir.path())).unwrap();

    let first = fetcher.fetch(day).await.unwrap();
    assert!(!first.from_cache);
    assert_eq!(first.bytes, body);
    assert_eq!(first.filename, "SNODAS_20210101.tar");
    assert!(dir.path().join("SNODAS_20210101.tar").is_file());

    let second = fetcher.fetch(day).await.unwrap();
    assert!(second.from_cache);
    assert_eq!(second.bytes, body);
    assert_eq!(archive.requests.load(Ordering::SeqCst), 1);

    let stats = fetcher.stats();
    assert_eq!(stats.downloads, 1);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.failures, 0);
    assert_eq!(stats.bytes_downloaded, body.len() as u64);
}

#[tokio::test]
async fn test_cache_hit_needs_no_network() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DiskCache::new(dir.path());
    cache.put("SNODAS_20210102.tar", b"cached").await.unwrap();

    // Nothing listens on port 9 of the loopback; a request would fail.
    let fetcher =
        RemoteGridFetcher::new(fast_config("http://127.0.0.1:9".into()), cache).unwrap();
    let raw = fetcher.fetch(date(2021, 1, 2)).await.unwrap();
    assert!(raw.from_cache);
    assert_eq!(raw.bytes.as_ref(), b"cached");
}

#[tokio::test]
async fn test_missing_file_is_not_published_without_retry() {
    let archive = Arc::new(Archive::default());
    let base = start_server(archive.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let fetcher = RemoteGridFetcher::new(fast_config(base), DiskCache::new(dir.path())).unwrap();

    let err = fetcher.fetch(date(2021, 1, 2)).await.unwrap_err();
    assert!(matches!(err, FetchError::NotPublished { status: 404, .. }));
    assert_eq!(archive.requests.load(Ordering::SeqCst), 1);
    assert_eq!(fetcher.stats().failures, 1);
    assert!(!dir.path().join("SNODAS_20210102.tar").exists());
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let day = date(2021, 1, 3);
    let archive = Arc::new(Archive {
        files: HashMap::from([("SNODAS_20210103.tar".to_string(), container(day))]),
        failures: Mutex::new(HashMap::from([(
            "SNODAS_20210103.tar".to_string(),
            vec![StatusCode::SERVICE_UNAVAILABLE, StatusCode::BAD_GATEWAY],
        )])),
        ..Default::default()
    });
    let base = start_server(archive.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let fetcher = RemoteGridFetcher::new(fast_config(base), DiskCache::new(dir.path())).unwrap();

    let raw = fetcher.fetch(day).await.unwrap();
    assert!(!raw.from_cache);
    assert_eq!(archive.requests.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let day = date(2021, 1, 4);
    let archive = Arc::new(Archive {
        files: HashMap::from([("SNODAS_20210104.tar".to_string(), container(day))]),
        failures: Mutex::new(HashMap::from([(
            "SNODAS_20210104.tar".to_string(),
            vec![StatusCode::INTERNAL_SERVER_ERROR; 10],
        )])),
        ..Default::default()
    });
    let base = start_server(archive.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let fetcher = RemoteGridFetcher::new(fast_config(base), DiskCache::new(dir.path())).unwrap();

    let err = fetcher.fetch(day).await.unwrap_err();
    match err {
        FetchError::Status {
            status, attempts, ..
        } => {
            assert_eq!(status, 500);
            assert_eq!(attempts, 4);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(archive.requests.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_empty_body_is_unavailable() {
    let archive = Arc::new(Archive {
        files: HashMap::from([("SNODAS_20210105.tar".to_string(), Bytes::new())]),
        ..Default::default()
    });
    let base = start_server(archive).await;
    let dir = tempfile::tempdir().unwrap();
    let fetcher = RemoteGridFetcher::new(fast_config(base), DiskCache::new(dir.path())).unwrap();

    let err = fetcher.fetch(date(2021, 1, 5)).await.unwrap_err();
    assert!(matches!(err, FetchError::EmptyBody { .. }));
    assert!(!dir.path().join("SNODAS_20210105.tar").exists());
}

#[tokio::test]
async fn test_future_date_is_refused_before_any_request() {
    let archive = Arc::new(Archive::default());
    let base = start_server(archive.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let fetcher = RemoteGridFetcher::new(fast_config(base), DiskCache::new(dir.path())).unwrap();

    let err = fetcher.fetch(date(2022, 1, 1)).await.unwrap_err();
    assert!(matches!(err, FetchError::FutureDate { .. }));
    assert_eq!(archive.requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = FetchConfig {
        max_in_flight: 0,
        ..Default::default()
    };
    assert!(matches!(
        RemoteGridFetcher::new(config, DiskCache::new(dir.path())),
        Err(FetchError::Config(_))
    ));
}
