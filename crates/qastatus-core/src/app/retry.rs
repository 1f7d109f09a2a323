//! RetryPolicy - 固定バックオフによる有限回リトライ
//!
//! # 設計
//!
//! - 試行回数の上限は facade が持つポリシーで決まる（呼び出し側から増やせない）
//! - transient と判定されたエラーだけを再試行する

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use super::classify::ErrorClassifier;
use crate::domain::SyncError;

/// transport 呼び出しのリトライポリシー
///
/// 標準ポリシーは 4 回試行（初回 + 再試行 3 回）で、間に 1s, 2s, 4s 待つ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 初回を含む総試行回数（最小 1）
    max_attempts: u32,

    /// 再試行 `i` の前の待ち時間（0 始まり、最後の要素を繰り返す）
    backoff: Vec<Duration>,
}

impl RetryPolicy {
    /// 標準の総試行回数
    pub const REFERENCE_MAX_ATTEMPTS: u32 = 4;
    /// 標準のバックオフ（ミリ秒）
    pub const REFERENCE_BACKOFF_MS: [u64; 3] = [1000, 2000, 4000];

    /// 試行回数とバックオフ列を指定して作成（0 回は 1 回に切り上げ）
    pub fn new(max_attempts: u32, backoff: Vec<Duration>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// 標準ポリシー（4 回、1s/2s/4s）
    pub fn reference() -> Self {
        Self {
            max_attempts: Self::REFERENCE_MAX_ATTEMPTS,
            backoff: Self::REFERENCE_BACKOFF_MS
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
        }
    }

    /// 1 回だけ試行し、待たない
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff: Vec::new(),
        }
    }

    /// 初回を含む総試行回数
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// `attempt_index` 回目（0 始まり）の失敗後の待ち時間
    ///
    /// スケジュールを超えた分は最後の要素に丸める。
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        let Some(last) = self.backoff.last() else {
            return Duration::ZERO;
        };
        self.backoff
            .get(attempt_index as usize)
            .copied()
            .unwrap_or(*last)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::reference()
    }
}

/// `op` を成功するか恒久的に失敗するか試行回数が尽きるまで実行
///
/// `op` は試行ごとに 1 回呼ばれる。読み取りかキー単位の upsert のように
/// 冪等でなければならない（ここでは副作用の重複を除かない）。
pub async fn with_retry<F, Fut, T>(
    operation: &str,
    policy: &RetryPolicy,
    classifier: &dyn ErrorClassifier,
    mut op: F,
) -> Result<T, SyncError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SyncError>>,
{
    let max_attempts = policy.max_attempts();
    let mut attempt: u32 = 0;

    loop {
        debug!(operation, attempt, max_attempts, "sync attempt");

        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 < max_attempts && classifier.is_transient(&err) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying after backoff"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                debug!(operation, attempt, error = %err, "giving up");
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::classify::DefaultClassifier;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn reference_policy_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn delay_is_clamped_to_last_entry() {
        let policy = RetryPolicy::reference();
        assert_eq!(policy.delay_for(7), Duration::from_secs(4));
        assert_eq!(RetryPolicy::no_retry().delay_for(0), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_makes_one_attempt() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result: Result<(), SyncError> = with_retry(
            "test",
            &RetryPolicy::reference(),
            &DefaultClassifier::default(),
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(SyncError::application("row violates check constraint"))
                }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn three_transient_failures_then_success_makes_four_attempts() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let started = Instant::now();

        let result = with_retry(
            "test",
            &RetryPolicy::reference(),
            &DefaultClassifier::default(),
            move || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    if n < 3 {
                        Err(SyncError::network("connection reset by peer"))
                    } else {
                        Ok(42u32)
                    }
                }
            },
        )
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        // 1s + 2s + 4s of backoff
        assert!(started.elapsed() >= Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn always_transient_stops_at_ceiling() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result: Result<(), SyncError> = with_retry(
            "test",
            &RetryPolicy::reference(),
            &DefaultClassifier::default(),
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(SyncError::Timeout { timeout_ms: 5000 })
                }
            },
        )
        .await;

        assert_eq!(result, Err(SyncError::Timeout { timeout_ms: 5000 }));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn configuration_error_is_not_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let _ = with_retry(
            "test",
            &RetryPolicy::reference(),
            &DefaultClassifier::default(),
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(SyncError::configuration("opaque response"))
                }
            },
        )
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
