//! TestStatus / TestResult - 派生テストステータスとテストケースの結果

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// タスクの集約 QA 状態
///
/// serde 表現は backend に保存されるワイヤ文字列
/// （`testar` / `testando` / `pendente` / `teste_concluido`）。既存の行がこの
/// 文字列のまま入っているので変更してはいけない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestStatus {
    /// まだ何も実行していない
    #[serde(rename = "testar")]
    ToExecute,

    /// 一部が Passed、残りは未実行
    #[serde(rename = "testando")]
    Executing,

    /// どこかに Failed がある（または子のいない Container）
    #[serde(rename = "pendente")]
    Pending,

    /// 全件実行済みで全件 Passed
    #[serde(rename = "teste_concluido")]
    Completed,
}

impl TestStatus {
    /// 全ステータス（宣言順）
    pub const ALL: [TestStatus; 4] = [
        TestStatus::ToExecute,
        TestStatus::Executing,
        TestStatus::Pending,
        TestStatus::Completed,
    ];

    /// backend レコードで使うワイヤ文字列
    pub fn as_wire(self) -> &'static str {
        match self {
            TestStatus::ToExecute => "testar",
            TestStatus::Executing => "testando",
            TestStatus::Pending => "pendente",
            TestStatus::Completed => "teste_concluido",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// UnknownStatus はワイヤ文字列として解釈できない値
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown test status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for TestStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TestStatus::ALL
            .into_iter()
            .find(|status| status.as_wire() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// テストケース 1 件の結果（既定は NotRun）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestResult {
    #[default]
    NotRun,
    Passed,
    Failed,
}

impl TestResult {
    /// NotRun 以外なら実行済み
    pub fn is_executed(self) -> bool {
        !matches!(self, TestResult::NotRun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::to_execute(TestStatus::ToExecute, "\"testar\"")]
    #[case::executing(TestStatus::Executing, "\"testando\"")]
    #[case::pending(TestStatus::Pending, "\"pendente\"")]
    #[case::completed(TestStatus::Completed, "\"teste_concluido\"")]
    fn status_uses_backend_wire_literals(#[case] status: TestStatus, #[case] json: &str) {
        assert_eq!(serde_json::to_string(&status).unwrap(), json);
        let parsed: TestStatus = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, status);
    }

    #[test]
    fn from_str_accepts_wire_literal_only() {
        assert_eq!("pendente".parse::<TestStatus>(), Ok(TestStatus::Pending));
        assert!("Pending".parse::<TestStatus>().is_err());
    }

    #[test]
    fn default_result_is_not_run() {
        assert_eq!(TestResult::default(), TestResult::NotRun);
        assert!(!TestResult::NotRun.is_executed());
        assert!(TestResult::Failed.is_executed());
    }
}
