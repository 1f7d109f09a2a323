//! StatusTransport port - リモートのステータスストアへの経路

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{SyncError, TestStatus};

/// タスクキー単位で導出ステータスを読み書きする
///
/// 実装は `ProxyTransport`（HTTP リレー）と `DirectTransport`（backend client）。
/// どの呼び出しも繰り返して安全でなければならない（読み取りは副作用なし、
/// `write_one` はキー単位の upsert）。
#[async_trait]
pub trait StatusTransport: Send + Sync {
    /// ログ用の短い名前（"proxy", "direct"）
    fn name(&self) -> &'static str;

    /// `key` の保存済みステータス（レコードがなければ None）
    async fn read_one(&self, key: &str) -> Result<Option<TestStatus>, SyncError>;

    /// `keys` の保存済みステータス（レコードのないキーは含まない）
    async fn read_many(&self, keys: &[String]) -> Result<HashMap<String, TestStatus>, SyncError>;

    /// `key` の `status` を upsert（後勝ち）
    async fn write_one(&self, key: &str, status: TestStatus) -> Result<(), SyncError>;
}
