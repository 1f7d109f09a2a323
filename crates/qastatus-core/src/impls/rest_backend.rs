//! RestBackendClient - PostgREST 形式の BackendClient
//!
//! - select one: `GET  {base}/rest/v1/{table}?task_key=eq.K`
//! - select in:  `GET  {base}/rest/v1/{table}?task_key=in.("a","b")`
//! - upsert:     `POST {base}/rest/v1/{table}?on_conflict=task_key`
//!   （`Prefer: resolution=merge-duplicates`）
//!
//! select は常に配列で受け取るので、レコードなしは空配列でありエラーではない。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::warn;

use crate::config::SyncConfig;
use crate::domain::{SyncError, TaskTestStatusRecord};
use crate::ports::BackendClient;

const SELECT_COLUMNS: &str = "task_key,status,updated_at";

#[derive(Debug, Default, Deserialize)]
struct RestErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// reqwest による PostgREST クライアント
///
/// `apikey` ヘッダと Bearer 認証の両方に同じ key を載せる。
#[derive(Clone)]
pub struct RestBackendClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl std::fmt::Debug for RestBackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestBackendClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RestBackendClient {
    /// 設定からクライアントを作成
    ///
    /// URL か key が欠けている、または HTTP クライアントを作れないときは None。
    pub fn from_config(config: &SyncConfig) -> Option<Self> {
        let (url, key) = config.backend_credentials()?;
        match Self::new(url, key, config.timeout()) {
            Ok(client) => Some(client),
            Err(err) => {
                warn!(error = %err, "direct backend client unavailable");
                None
            }
        }
    }

    /// base URL・key・タイムアウトを指定して作成（URL が不正なら Configuration）
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, SyncError> {
        reqwest::Url::parse(base_url).map_err(|e| {
            SyncError::configuration(format!("invalid backend url {base_url:?}: {e}"))
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::configuration(format!("failed to build http client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SyncError> {
        self.authorized(request)
            .send()
            .await
            .map_err(|e| SyncError::network(format!("backend request failed: {e}")))
    }

    async fn select(
        &self,
        table: &str,
        filter: String,
    ) -> Result<Vec<TaskTestStatusRecord>, SyncError> {
        let request = self
            .client
            .get(self.table_url(table))
            .query(&[("select", SELECT_COLUMNS), ("task_key", filter.as_str())]);
        let response = self.send(request).await?;
        let response = check(response).await?;
        response
            .json::<Vec<TaskTestStatusRecord>>()
            .await
            .map_err(|e| SyncError::decode(format!("invalid backend rows: {e}")))
    }
}

/// 2xx 以外をサーバーのメッセージ付きの `SyncError::Http` にする
async fn check(response: Response) -> Result<Response, SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    let parsed: RestErrorBody = serde_json::from_slice(&body).unwrap_or_default();
    let message = parsed
        .message
        .unwrap_or_else(|| String::from_utf8_lossy(&body).to_string());
    Err(SyncError::Http {
        status: status.as_u16(),
        message,
    })
}

fn quote_in_list(keys: &[String]) -> String {
    let quoted: Vec<String> = keys
        .iter()
        .map(|k| format!("\"{}\"", k.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

#[async_trait]
impl BackendClient for RestBackendClient {
    async fn select_one(
        &self,
        table: &str,
        key: &str,
    ) -> Result<Option<TaskTestStatusRecord>, SyncError> {
        let rows = self.select(table, format!("eq.{key}")).await?;
        Ok(rows.into_iter().next())
    }

    async fn select_in(
        &self,
        table: &str,
        keys: &[String],
    ) -> Result<Vec<TaskTestStatusRecord>, SyncError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        self.select(table, quote_in_list(keys)).await
    }

    async fn upsert(
        &self,
        table: &str,
        record: &TaskTestStatusRecord,
        conflict_key: &str,
    ) -> Result<(), SyncError> {
        let request = self
            .client
            .post(self.table_url(table))
            .query(&[("on_conflict", conflict_key)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[record]);
        let response = self.send(request).await?;
        check(response).await.map(|_| ())
    }
}
