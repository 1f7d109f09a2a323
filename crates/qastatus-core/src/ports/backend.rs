//! BackendClient port - backend SDK の抽象化
//!
//! `DirectTransport` はこの trait 越しにのみストアへアクセスする。
//! 具体的なクライアント（REST、インメモリ）は構築時に注入する。

use async_trait::async_trait;

use crate::domain::{SyncError, TaskTestStatusRecord};

/// ステータステーブルへの直接アクセス
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// `task_key` が `key` の行を取得（見つからなければ `Ok(None)`）
    async fn select_one(
        &self,
        table: &str,
        key: &str,
    ) -> Result<Option<TaskTestStatusRecord>, SyncError>;

    /// `task_key` が `keys` に含まれる行を取得
    async fn select_in(
        &self,
        table: &str,
        keys: &[String],
    ) -> Result<Vec<TaskTestStatusRecord>, SyncError>;

    /// `record` を upsert（`conflict_key` で衝突を解決）
    async fn upsert(
        &self,
        table: &str,
        record: &TaskTestStatusRecord,
        conflict_key: &str,
    ) -> Result<(), SyncError>;
}
