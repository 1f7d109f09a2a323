//! SyncConfig - 同期の設定
//!
//! どのエンドポイントがあり、1 回の呼び出しにどれだけ時間をかけてよいか。

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::timeout::DEFAULT_TIMEOUT;

/// proxy（サーバー側リレー）のエンドポイント
pub const ENV_PROXY_URL: &str = "QASTATUS_PROXY_URL";
/// direct backend の base URL
pub const ENV_BACKEND_URL: &str = "QASTATUS_BACKEND_URL";
/// direct backend の API key
pub const ENV_BACKEND_KEY: &str = "QASTATUS_BACKEND_KEY";
/// アプリの配信元ホスト名（本番判定に使う）
pub const ENV_HOSTNAME: &str = "QASTATUS_HOSTNAME";
/// 1 試行あたりのタイムアウト（ミリ秒）
pub const ENV_TIMEOUT_MS: &str = "QASTATUS_TIMEOUT_MS";

/// ConfigError は設定の読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {name}={value:?}: expected milliseconds")]
    InvalidTimeout { name: &'static str, value: String },
}

/// エンドポイントとタイムアウトの設定
///
/// 空白だけの値は「未設定」として扱う。export されていて中身が空の変数は
/// 存在しない変数と同じ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// サーバー側リレーのエンドポイント
    pub proxy_url: Option<String>,

    /// direct backend の base URL（REST）
    pub backend_url: Option<String>,

    /// direct backend の API key
    pub backend_key: Option<String>,

    /// アプリの配信元ホスト名。本番判定に使う
    pub hostname: Option<String>,

    /// 1 試行あたりの期限
    pub timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            proxy_url: None,
            backend_url: None,
            backend_key: None,
            hostname: None,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
        }
    }
}

impl SyncConfig {
    /// `QASTATUS_*` 環境変数から読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の lookup 関数から読み込む（テストでは map を渡す）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_ms = match non_blank(lookup(ENV_TIMEOUT_MS)) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout {
                    name: ENV_TIMEOUT_MS,
                    value,
                })?,
            None => DEFAULT_TIMEOUT.as_millis() as u64,
        };

        Ok(Self {
            proxy_url: non_blank(lookup(ENV_PROXY_URL)),
            backend_url: non_blank(lookup(ENV_BACKEND_URL)),
            backend_key: non_blank(lookup(ENV_BACKEND_KEY)),
            hostname: non_blank(lookup(ENV_HOSTNAME)),
            timeout_ms,
        })
    }

    /// 空でない proxy URL
    pub fn proxy_url(&self) -> Option<&str> {
        self.proxy_url.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// backend の URL と key（両方そろっているときだけ）
    pub fn backend_credentials(&self) -> Option<(&str, &str)> {
        let url = self.backend_url.as_deref().filter(|s| !s.trim().is_empty())?;
        let key = self.backend_key.as_deref().filter(|s| !s.trim().is_empty())?;
        Some((url, key))
    }

    /// 1 回の呼び出しの締め切り
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
