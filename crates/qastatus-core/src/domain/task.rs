//! Task - タスクフォレストのモデル
//!
//! 周囲のアプリケーションから渡される読み取り専用のビュー。

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::status::TestResult;

/// フォレスト内のタスク識別子（親リンクが参照する）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// 新しい TaskId を作成
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// タスクが他のタスクを束ねるか、テストケースを持つか
///
/// トラッカーの issue type 名（`Epic`, `Story`, `Task`, `Bug`, `Subtask`）と
/// `container` / `leaf` を受け付ける。大文字小文字は区別しない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Container,
    Leaf,
}

impl TaskKind {
    /// issue type 名から判定（未知の名前は None）
    pub fn from_issue_type(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "container" | "epic" | "story" => Some(TaskKind::Container),
            "leaf" | "task" | "bug" | "subtask" | "sub-task" => Some(TaskKind::Leaf),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for TaskKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        TaskKind::from_issue_type(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown task kind: {name}")))
    }
}

/// タスクが持つテストケース（このクレートからは読み取り専用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    #[serde(default)]
    pub result: TestResult,
}

impl TestCase {
    /// 新しい TestCase を作成
    pub fn new(id: impl Into<String>, result: TestResult) -> Self {
        Self {
            id: id.into(),
            result,
        }
    }
}

/// フォレスト内のタスク
///
/// - `key`: 全体で一意な同期キー
/// - `id`: `parent_id` が参照する識別子
///
/// 両者は同じことが多いが、一致している必要はない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub key: String,
    #[serde(alias = "type")]
    pub kind: TaskKind,
    #[serde(default)]
    pub parent_id: Option<TaskId>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

impl Task {
    /// テストケースを持つ Leaf を作成（`key` は `id` と同じ）
    pub fn leaf(id: &str, test_cases: Vec<TestCase>) -> Self {
        Self {
            id: TaskId::new(id),
            key: id.to_string(),
            kind: TaskKind::Leaf,
            parent_id: None,
            test_cases,
        }
    }

    /// 子を束ねる Container を作成（`key` は `id` と同じ）
    pub fn container(id: &str) -> Self {
        Self {
            id: TaskId::new(id),
            key: id.to_string(),
            kind: TaskKind::Container,
            parent_id: None,
            test_cases: Vec::new(),
        }
    }

    /// 親を設定（フォレストを組み立てるときの builder 形式）
    pub fn under(mut self, parent: &str) -> Self {
        self.parent_id = Some(TaskId::new(parent));
        self
    }

    /// 子を集約するタスクか（テストケースは見ない）
    pub fn is_container(&self) -> bool {
        self.kind == TaskKind::Container
    }
}
