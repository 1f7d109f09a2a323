//! 実 HTTP 越しの同期テスト
//!
//! axum で立てた偽リレーを proxy に、インメモリ backend を direct に使う。

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use qastatus_core::app::{RetryPolicy, Route};
use qastatus_core::domain::{Task, TestCase, TestResult, TestStatus, compute_all};
use qastatus_core::impls::{DirectTransport, InMemoryBackend, ProxyTransport};
use qastatus_core::ports::{Clock, HostnameEnvironment, SystemClock};
use qastatus_core::{SaveOutcome, SyncFacade};

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}/api/proxy")
}

/// 常に 500 を返し、受けた回数を数えるリレー
async fn spawn_broken_proxy() -> (String, Arc<AtomicUsize>) {
    async fn broken(State(hits): State<Arc<AtomicUsize>>) -> (StatusCode, Json<Value>) {
        hits.fetch_add(1, Ordering::SeqCst);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": "upstream exploded" })),
        )
    }

    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/api/proxy", get(broken).post(broken))
        .with_state(hits.clone());
    (spawn(app).await, hits)
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(4, vec![Duration::from_millis(5)])
}

fn facade(proxy_url: &str, backend: Arc<InMemoryBackend>, host: &str) -> SyncFacade {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    SyncFacade::builder()
        .proxy(Arc::new(
            ProxyTransport::new(proxy_url, clock.clone()).expect("proxy url"),
        ))
        .direct(Arc::new(DirectTransport::new(backend, clock)))
        .environment(Arc::new(HostnameEnvironment::new(host)))
        .retry_policy(fast_retry())
        .timeout(Duration::from_secs(2))
        .build()
}

#[tokio::test]
async fn development_falls_back_to_direct_after_proxy_500s() {
    let (url, hits) = spawn_broken_proxy().await;
    let backend = Arc::new(InMemoryBackend::new());
    let sync = facade(&url, backend.clone(), "localhost");

    let outcome = sync.save("QA-1", TestStatus::Completed).await;

    assert_eq!(outcome, SaveOutcome::Persisted(Route::Direct));
    assert_eq!(hits.load(Ordering::SeqCst), 4);
    assert_eq!(
        backend.get("QA-1").map(|r| r.status),
        Some(TestStatus::Completed)
    );
    assert_eq!(sync.load("QA-1").await, Some(TestStatus::Completed));
}

#[tokio::test]
async fn production_never_touches_direct() {
    let (url, hits) = spawn_broken_proxy().await;
    let backend = Arc::new(InMemoryBackend::new());
    let sync = facade(&url, backend.clone(), "qa-board.vercel.app");

    let outcome = sync.save("QA-1", TestStatus::Completed).await;

    assert_eq!(outcome, SaveOutcome::LocalOnly);
    assert_eq!(hits.load(Ordering::SeqCst), 4);
    assert_eq!(backend.calls(), 0);
    assert_eq!(sync.load("QA-1").await, None);
}

#[tokio::test]
async fn computed_forest_round_trips_through_direct() {
    let (url, _) = spawn_broken_proxy().await;
    let backend = Arc::new(InMemoryBackend::new());
    let sync = facade(&url, backend, "localhost");

    let tasks = vec![
        Task::container("E1"),
        Task::leaf("T1", vec![TestCase::new("c1", TestResult::Passed)]).under("E1"),
        Task::leaf("T2", vec![TestCase::new("c2", TestResult::Failed)]).under("E1"),
    ];
    let statuses = compute_all(&tasks);
    let report = sync.save_all(&statuses).await;
    assert_eq!(report.persisted, 3);
    assert!(report.local_only.is_empty());

    let keys: Vec<String> = tasks.iter().map(|t| t.key.clone()).collect();
    let loaded = sync.load_many(&keys).await;
    let expected: HashMap<String, TestStatus> = HashMap::from([
        ("E1".to_string(), TestStatus::Pending),
        ("T1".to_string(), TestStatus::Completed),
        ("T2".to_string(), TestStatus::Pending),
    ]);
    assert_eq!(loaded, expected);
}
