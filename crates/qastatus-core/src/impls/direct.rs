//! DirectTransport - backend client 経由でステータステーブルにアクセス

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{CONFLICT_KEY, STATUS_TABLE, SyncError, TaskTestStatusRecord, TestStatus};
use crate::ports::{BackendClient, Clock, StatusTransport};

/// 注入された `BackendClient` を使う transport
///
/// レコードが見つからない場合はエラーではなく空の結果になる。
#[derive(Clone)]
pub struct DirectTransport {
    backend: Arc<dyn BackendClient>,
    clock: Arc<dyn Clock>,
}

impl DirectTransport {
    /// 新しい DirectTransport を作成
    pub fn new(backend: Arc<dyn BackendClient>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }
}

#[async_trait]
impl StatusTransport for DirectTransport {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn read_one(&self, key: &str) -> Result<Option<TestStatus>, SyncError> {
        let record = self.backend.select_one(STATUS_TABLE, key).await?;
        Ok(record.map(|r| r.status))
    }

    async fn read_many(&self, keys: &[String]) -> Result<HashMap<String, TestStatus>, SyncError> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        let records = self.backend.select_in(STATUS_TABLE, keys).await?;
        Ok(records
            .into_iter()
            .map(|r| (r.task_key, r.status))
            .collect())
    }

    async fn write_one(&self, key: &str, status: TestStatus) -> Result<(), SyncError> {
        let record = TaskTestStatusRecord::new(key, status, self.clock.now());
        self.backend
            .upsert(STATUS_TABLE, &record, CONFLICT_KEY)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryBackend;
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};

    fn transport(backend: Arc<InMemoryBackend>) -> DirectTransport {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 2, 2, 0, 0, 0).unwrap());
        DirectTransport::new(backend, Arc::new(clock))
    }

    #[tokio::test]
    async fn missing_record_is_none() {
        let direct = transport(Arc::new(InMemoryBackend::new()));
        assert_eq!(direct.read_one("QA-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn upsert_overwrites_by_key() {
        let backend = Arc::new(InMemoryBackend::new());
        let direct = transport(backend.clone());

        direct.write_one("QA-1", TestStatus::Executing).await.unwrap();
        direct.write_one("QA-1", TestStatus::Completed).await.unwrap();

        assert_eq!(backend.len(), 1);
        assert_eq!(
            direct.read_one("QA-1").await.unwrap(),
            Some(TestStatus::Completed)
        );
        let stored = backend.get("QA-1").unwrap();
        assert_eq!(
            stored.updated_at,
            Utc.with_ymd_and_hms(2024, 2, 2, 0, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn batch_read_omits_missing_keys() {
        let backend = Arc::new(InMemoryBackend::new());
        let direct = transport(backend);
        direct.write_one("QA-1", TestStatus::Pending).await.unwrap();

        let keys = vec!["QA-1".to_string(), "QA-2".to_string()];
        let statuses = direct.read_many(&keys).await.unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses["QA-1"], TestStatus::Pending);
    }

    #[tokio::test]
    async fn backend_failure_propagates() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.fail_with(Some(SyncError::network("connection reset")));
        let direct = transport(backend);

        let err = direct.read_one("QA-1").await.unwrap_err();
        assert_eq!(err, SyncError::network("connection reset"));
    }
}
