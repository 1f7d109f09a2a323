//! ErrorClassifier - 一時的な失敗と恒久的な失敗の判定
//!
//! エラーの variant、メッセージ、含まれる HTTP ステータスだけを見る純粋な
//! パターンマッチ。部分文字列とステータスコードはデータ（`TransientPatterns`）
//! として持つので、単独で確認・テストできる。

use crate::domain::{ErrorKind, SyncError};

/// ネットワーク起因の失敗を示すメッセージ断片（小文字）
pub const TRANSIENT_MESSAGE_PATTERNS: &[&str] = &[
    "timeout",
    "timed out",
    "time-out",
    "connection reset",
    "econnreset",
    "connection refused",
    "dns",
    "enotfound",
    "getaddrinfo",
    "failed to fetch",
    "network error",
    "error sending request",
    "service unavailable",
    "gateway timeout",
];

/// 一時的とみなす HTTP ステータス
pub const TRANSIENT_HTTP_STATUSES: &[u16] = &[500, 502, 503, 504, 522];

/// DefaultClassifier の判定データ
#[derive(Debug, Clone)]
pub struct TransientPatterns {
    pub messages: Vec<&'static str>,
    pub statuses: Vec<u16>,
}

impl Default for TransientPatterns {
    fn default() -> Self {
        Self {
            messages: TRANSIENT_MESSAGE_PATTERNS.to_vec(),
            statuses: TRANSIENT_HTTP_STATUSES.to_vec(),
        }
    }
}

impl TransientPatterns {
    /// メッセージが一時的な障害を示しているか
    ///
    /// 部分文字列に加えて、メッセージ中の独立した 3 桁の数字
    /// （`status 503`, `status code 503`, `HTTP 502 Bad Gateway`, `error 504`）を
    /// ステータスとして照合する。
    pub fn matches_message(&self, message: &str) -> bool {
        let message = message.to_ascii_lowercase();
        self.messages.iter().any(|p| message.contains(p))
            || status_codes(&message).any(|s| self.statuses.contains(&s))
    }

    /// ステータスが一時的なものか
    pub fn matches_status(&self, status: u16) -> bool {
        self.statuses.contains(&status)
    }
}

/// メッセージ中の独立した 3 桁の数字（`5000ms` や `1234` は対象外）
fn status_codes(message: &str) -> impl Iterator<Item = u16> + '_ {
    message
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| token.len() == 3 && token.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|token| token.parse().ok())
}

/// 失敗をリトライする価値があるかを判定
pub trait ErrorClassifier: Send + Sync {
    fn is_transient(&self, error: &SyncError) -> bool;
}

/// `TransientPatterns` に基づく標準の判定
///
/// - Configuration: 常にリトライしない
/// - Transient（Timeout / Network）: 常にリトライする
/// - Permanent: ステータスかメッセージがパターンに一致すればリトライする
#[derive(Debug, Clone, Default)]
pub struct DefaultClassifier {
    patterns: TransientPatterns,
}

impl DefaultClassifier {
    /// 任意のパターンで DefaultClassifier を作成
    pub fn new(patterns: TransientPatterns) -> Self {
        Self { patterns }
    }

    /// 判定に使うパターン
    pub fn patterns(&self) -> &TransientPatterns {
        &self.patterns
    }
}

impl ErrorClassifier for DefaultClassifier {
    fn is_transient(&self, error: &SyncError) -> bool {
        match error.kind() {
            ErrorKind::Configuration => false,
            ErrorKind::Transient => true,
            ErrorKind::Permanent => {
                error
                    .http_status()
                    .is_some_and(|s| self.patterns.matches_status(s))
                    || self.patterns.matches_message(&error.to_string())
            }
        }
    }
}
