//! Errors - 同期の失敗とその運用上の分類

use std::time::Duration;

use thiserror::Error;

/// 同期失敗の運用上の分類
///
/// - Transient: ネットワーク層の障害。リトライ対象
/// - Configuration: エンドポイントの欠落・設定ミス。リトライしない
/// - Permanent: アプリケーションエラー（不正なペイロード、拒否）。原則リトライしない
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Configuration,
    Permanent,
}

/// transport 呼び出し 1 回の失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("http status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("{message}")]
    Application { message: String },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("invalid payload: {message}")]
    Decode { message: String },
}

impl SyncError {
    /// 期限切れ（設定された期間を保持）
    pub fn timeout(after: Duration) -> Self {
        SyncError::Timeout {
            timeout_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// 接続・送受信の失敗
    pub fn network(message: impl Into<String>) -> Self {
        SyncError::Network {
            message: message.into(),
        }
    }

    /// サーバーが処理を拒否した
    pub fn application(message: impl Into<String>) -> Self {
        SyncError::Application {
            message: message.into(),
        }
    }

    /// 設定の欠落・誤り
    pub fn configuration(message: impl Into<String>) -> Self {
        SyncError::Configuration {
            message: message.into(),
        }
    }

    /// 応答を解釈できない
    pub fn decode(message: impl Into<String>) -> Self {
        SyncError::Decode {
            message: message.into(),
        }
    }

    /// エラーが持つ HTTP ステータス
    pub fn http_status(&self) -> Option<u16> {
        match self {
            SyncError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// variant だけによる分類
    ///
    /// メッセージによる判定は `app::classify` が行う。
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Timeout { .. } | SyncError::Network { .. } => ErrorKind::Transient,
            SyncError::Configuration { .. } => ErrorKind::Configuration,
            SyncError::Http { .. } | SyncError::Application { .. } | SyncError::Decode { .. } => {
                ErrorKind::Permanent
            }
        }
    }
}
