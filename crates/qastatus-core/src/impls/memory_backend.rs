//! InMemoryBackend - 開発用・テスト用の BackendClient
//!
//! 実ストアの `task_key` 一意制約と同じく、キーごとに 1 レコードを保持する。
//! 障害を注入して停止状態を再現できる。

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::domain::{STATUS_TABLE, SyncError, TaskTestStatusRecord};
use crate::ports::BackendClient;

/// インメモリの BackendClient
#[derive(Default)]
pub struct InMemoryBackend {
    rows: Mutex<HashMap<String, TaskTestStatusRecord>>,
    failure: Mutex<Option<SyncError>>,
    calls: AtomicUsize,
}

impl InMemoryBackend {
    /// 空の InMemoryBackend を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 以降の呼び出しをすべて `error` で失敗させる（None で元に戻す）
    pub fn fail_with(&self, error: Option<SyncError>) {
        *lock(&self.failure) = error;
    }

    /// 受けた呼び出し回数（失敗分を含む）
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `key` の保存済みレコード
    pub fn get(&self, key: &str) -> Option<TaskTestStatusRecord> {
        lock(&self.rows).get(key).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.rows).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.rows).is_empty()
    }

    fn enter(&self, table: &str) -> Result<(), SyncError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = lock(&self.failure).clone() {
            return Err(err);
        }
        if table != STATUS_TABLE {
            return Err(SyncError::application(format!(
                "relation \"{table}\" does not exist"
            )));
        }
        Ok(())
    }
}

// poison はテストの panic によるもので、中身はそのまま使える
fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl BackendClient for InMemoryBackend {
    async fn select_one(
        &self,
        table: &str,
        key: &str,
    ) -> Result<Option<TaskTestStatusRecord>, SyncError> {
        self.enter(table)?;
        Ok(self.get(key))
    }

    async fn select_in(
        &self,
        table: &str,
        keys: &[String],
    ) -> Result<Vec<TaskTestStatusRecord>, SyncError> {
        self.enter(table)?;
        let rows = lock(&self.rows);
        Ok(keys.iter().filter_map(|k| rows.get(k).cloned()).collect())
    }

    async fn upsert(
        &self,
        table: &str,
        record: &TaskTestStatusRecord,
        conflict_key: &str,
    ) -> Result<(), SyncError> {
        self.enter(table)?;
        if conflict_key != crate::domain::CONFLICT_KEY {
            return Err(SyncError::application(format!(
                "there is no unique constraint matching on_conflict={conflict_key}"
            )));
        }
        lock(&self.rows).insert(record.task_key.clone(), record.clone());
        Ok(())
    }
}
