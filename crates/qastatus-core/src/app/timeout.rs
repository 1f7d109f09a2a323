//! Timeout - 非同期処理に締め切りを付ける

use std::future::Future;
use std::time::Duration;

use crate::domain::SyncError;

/// transport 呼び出しの既定の締め切り
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// `fut` と `after` のタイマーを競争させる
///
/// 先に終わった方が勝つ。タイムアウト時は設定値入りの `SyncError::Timeout`
/// を返し、`fut` は drop される（送信済みのリクエストは止まらないことがある）。
pub async fn with_timeout<F, T>(after: Duration, fut: F) -> Result<T, SyncError>
where
    F: Future<Output = Result<T, SyncError>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_elapsed) => Err(SyncError::timeout(after)),
    }
}
