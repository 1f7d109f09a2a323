//! ProxyTransport - サーバー側リレー経由でステータステーブルにアクセス
//!
//! # ワイヤ形式
//!
//! - read one:  `GET  <proxy>?table=task_test_status&task_key=K`
//! - read many: `GET  <proxy>?table=task_test_status&task_keys=a,b,c`
//! - write:     `POST <proxy>` with `{ "table": "task_test_status", "record": {...} }`
//!
//!
//! レスポンスはすべて次のエンベロープ: `{ success, error?, record?, records? }`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{STATUS_TABLE, SyncError, TaskTestStatusRecord, TestStatus};
use crate::ports::{Clock, StatusTransport};

#[derive(Debug, Deserialize)]
struct ProxyEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    record: Option<TaskTestStatusRecord>,
    #[serde(default)]
    records: Vec<TaskTestStatusRecord>,
}

#[derive(Debug, Serialize)]
struct ProxyWrite<'a> {
    table: &'static str,
    record: &'a TaskTestStatusRecord,
}

/// HTTP リレー transport
///
/// リダイレクトは追わない。3xx は設定ミスのリレー（URL 違い、CORS の書き換え）
/// が返すもので、設定エラーとして報告する。
#[derive(Clone)]
pub struct ProxyTransport {
    endpoint: Url,
    client: Client,
    clock: Arc<dyn Clock>,
}

impl ProxyTransport {
    /// エンドポイント URL から作成（解析できなければ設定エラー）
    pub fn new(endpoint: &str, clock: Arc<dyn Clock>) -> Result<Self, SyncError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| SyncError::configuration(format!("invalid proxy url {endpoint:?}: {e}")))?;
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| SyncError::configuration(format!("failed to build http client: {e}")))?;
        Ok(Self {
            endpoint,
            client,
            clock,
        })
    }

    /// リレーのエンドポイント
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn get(&self, query: &[(&str, &str)]) -> Result<ProxyEnvelope, SyncError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(query)
            .send()
            .await
            .map_err(request_error)?;
        read_envelope(response).await
    }
}

fn request_error(e: reqwest::Error) -> SyncError {
    if e.is_builder() {
        SyncError::configuration(format!("proxy request could not be built: {e}"))
    } else {
        SyncError::network(format!("proxy request failed: {e}"))
    }
}

async fn read_envelope(response: Response) -> Result<ProxyEnvelope, SyncError> {
    let status = response.status();
    if status.is_redirection() {
        return Err(SyncError::configuration(format!(
            "proxy answered with an opaque response ({status}); check the proxy url and CORS setup"
        )));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| SyncError::network(format!("failed reading proxy response: {e}")))?;
    let parsed = serde_json::from_slice::<ProxyEnvelope>(&body);

    if !status.is_success() {
        let message = parsed
            .ok()
            .and_then(|envelope| envelope.error)
            .unwrap_or_else(|| String::from_utf8_lossy(&body).to_string());
        return Err(SyncError::Http {
            status: status.as_u16(),
            message,
        });
    }

    let envelope =
        parsed.map_err(|e| SyncError::decode(format!("invalid proxy envelope: {e}")))?;
    if !envelope.success {
        return Err(SyncError::application(
            envelope
                .error
                .unwrap_or_else(|| "proxy reported failure without a message".to_string()),
        ));
    }
    Ok(envelope)
}

#[async_trait]
impl StatusTransport for ProxyTransport {
    fn name(&self) -> &'static str {
        "proxy"
    }

    async fn read_one(&self, key: &str) -> Result<Option<TestStatus>, SyncError> {
        let envelope = self
            .get(&[("table", STATUS_TABLE), ("task_key", key)])
            .await?;
        Ok(envelope.record.map(|record| record.status))
    }

    async fn read_many(&self, keys: &[String]) -> Result<HashMap<String, TestStatus>, SyncError> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        let joined = keys.join(",");
        let envelope = self
            .get(&[("table", STATUS_TABLE), ("task_keys", joined.as_str())])
            .await?;
        debug!(requested = keys.len(), found = envelope.records.len(), "proxy batch read");
        Ok(envelope
            .records
            .into_iter()
            .map(|record| (record.task_key, record.status))
            .collect())
    }

    async fn write_one(&self, key: &str, status: TestStatus) -> Result<(), SyncError> {
        let record = TaskTestStatusRecord::new(key, status, self.clock.now());
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&ProxyWrite {
                table: STATUS_TABLE,
                record: &record,
            })
            .send()
            .await
            .map_err(request_error)?;
        read_envelope(response).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;
    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Redirect};
    use axum::routing::get;
    use axum::{Json, Router};
    use chrono::{TimeZone, Utc};
    use serde_json::{Value, json};
    use std::sync::Mutex;

    type Store = Arc<Mutex<HashMap<String, Value>>>;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        ))
    }

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

    async fn proxy_read(
        State(store): State<Store>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        assert_eq!(params.get("table").map(String::as_str), Some(STATUS_TABLE));
        let store = store.lock().unwrap();
        if let Some(keys) = params.get("task_keys") {
            let records: Vec<Value> = keys
                .split(',')
                .filter_map(|k| store.get(k).cloned())
                .collect();
            return Json(json!({ "success": true, "records": records }));
        }
        let key = params.get("task_key").cloned().unwrap_or_default();
        Json(json!({ "success": true, "record": store.get(&key).cloned() }))
    }

    async fn proxy_write(State(store): State<Store>, Json(body): Json<Value>) -> Json<Value> {
        assert_eq!(body["table"], STATUS_TABLE);
        let record = body["record"].clone();
        let key = record["task_key"].as_str().unwrap_or_default().to_string();
        store.lock().unwrap().insert(key, record);
        Json(json!({ "success": true }))
    }

    async fn spawn_fake_proxy() -> (String, Store) {
        let store: Store = Arc::default();
        let app = Router::new()
            .route("/api/proxy", get(proxy_read).post(proxy_write))
            .with_state(store.clone());
        (spawn(app).await, store)
    }

    async fn spawn_fixed(status: StatusCode, body: Value) -> String {
        let app = Router::new().route(
            "/api/proxy",
            get(move || {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        );
        spawn(app).await
    }

    #[tokio::test]
    async fn write_then_read_back() {
        let (url, store) = spawn_fake_proxy().await;
        let proxy = ProxyTransport::new(&url, clock()).unwrap();

        proxy.write_one("QA-1", TestStatus::Executing).await.unwrap();

        let stored = store.lock().unwrap().get("QA-1").cloned().unwrap();
        assert_eq!(stored["status"], "testando");
        assert_eq!(stored["updated_at"], "2024-05-01T08:00:00Z");

        assert_eq!(
            proxy.read_one("QA-1").await.unwrap(),
            Some(TestStatus::Executing)
        );
        assert_eq!(proxy.read_one("QA-404").await.unwrap(), None);
    }

    #[tokio::test]
    async fn batch_read_omits_missing_keys() {
        let (url, _store) = spawn_fake_proxy().await;
        let proxy = ProxyTransport::new(&url, clock()).unwrap();
        proxy.write_one("QA-1", TestStatus::Completed).await.unwrap();
        proxy.write_one("QA-2", TestStatus::Pending).await.unwrap();

        let keys = vec!["QA-1".to_string(), "QA-2".to_string(), "QA-3".to_string()];
        let statuses = proxy.read_many(&keys).await.unwrap();

        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses["QA-1"], TestStatus::Completed);
        assert_eq!(statuses["QA-2"], TestStatus::Pending);
    }

    #[tokio::test]
    async fn success_false_is_application_error() {
        let url = spawn_fixed(
            StatusCode::OK,
            json!({ "success": false, "error": "permission denied for table" }),
        )
        .await;
        let proxy = ProxyTransport::new(&url, clock()).unwrap();

        let err = proxy.read_one("QA-1").await.unwrap_err();
        assert_eq!(err, SyncError::application("permission denied for table"));
    }

    #[tokio::test]
    async fn server_error_carries_status_and_message() {
        let url = spawn_fixed(
            StatusCode::SERVICE_UNAVAILABLE,
            json!({ "success": false, "error": "upstream down" }),
        )
        .await;
        let proxy = ProxyTransport::new(&url, clock()).unwrap();

        let err = proxy.read_one("QA-1").await.unwrap_err();
        assert_eq!(
            err,
            SyncError::Http {
                status: 503,
                message: "upstream down".into()
            }
        );
    }

    #[tokio::test]
    async fn redirect_is_configuration_error() {
        let app = Router::new().route(
            "/api/proxy",
            get(|| async { Redirect::temporary("/login").into_response() }),
        );
        let url = spawn(app).await;
        let proxy = ProxyTransport::new(&url, clock()).unwrap();

        let err = proxy.read_one("QA-1").await.unwrap_err();
        assert!(matches!(err, SyncError::Configuration { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn non_json_success_is_decode_error() {
        let app = Router::new().route("/api/proxy", get(|| async { "<html>hi</html>" }));
        let url = spawn(app).await;
        let proxy = ProxyTransport::new(&url, clock()).unwrap();

        let err = proxy.read_one("QA-1").await.unwrap_err();
        assert!(matches!(err, SyncError::Decode { .. }), "{err:?}");
    }

    #[test]
    fn invalid_url_is_configuration_error() {
        let err = ProxyTransport::new("not a url", clock()).err().unwrap();
        assert!(matches!(err, SyncError::Configuration { .. }));
    }

    #[tokio::test]
    async fn empty_batch_makes_no_request() {
        // nothing listens here; an actual request would fail
        let proxy = ProxyTransport::new("http://127.0.0.1:9/api/proxy", clock()).unwrap();
        assert!(proxy.read_many(&[]).await.unwrap().is_empty());
    }
}
