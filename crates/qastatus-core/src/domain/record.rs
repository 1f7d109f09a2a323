//! TaskTestStatusRecord - リモートに永続化されるステータスレコード

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::TestStatus;

/// タスクキーごとに 1 行を持つ backend テーブル
pub const STATUS_TABLE: &str = "task_test_status";

/// upsert の衝突キーになる列
pub const CONFLICT_KEY: &str = "task_key";

/// リモートの形: `{ task_key, status, updated_at }`
///
/// `task_key` で upsert し、履歴は持たない。最初の save で作られ、同じキーへの
/// 以降の save で上書きされる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTestStatusRecord {
    pub task_key: String,
    pub status: TestStatus,
    pub updated_at: DateTime<Utc>,
}

impl TaskTestStatusRecord {
    /// 新しいレコードを作成
    pub fn new(task_key: impl Into<String>, status: TestStatus, updated_at: DateTime<Utc>) -> Self {
        Self {
            task_key: task_key.into(),
            status,
            updated_at,
        }
    }
}
