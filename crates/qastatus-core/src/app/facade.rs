//! SyncFacade - 派生ステータスの永続化・取得の公開窓口
//!
//! 派生テストステータスはキャッシュであって正本ではない。ここの操作は
//! 呼び出し側にエラーを返さず、失敗はログに残して「ローカルの値だけを使う」に
//! 縮退する。

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::builder::SyncFacadeBuilder;
use super::classify::ErrorClassifier;
use super::retry::{RetryPolicy, with_retry};
use super::selector::{Route, TransportSelector};
use super::timeout::with_timeout;
use crate::domain::{SyncError, TestStatus};
use crate::ports::StatusTransport;

/// `save_all` が同時に走らせる save の既定上限
pub const DEFAULT_SAVE_CONCURRENCY: usize = 8;

/// `save` の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// この経路でリモートに保存できた
    Persisted(Route),
    /// リモートには保存されず、このセッションのローカル値のみ
    LocalOnly,
}

impl SaveOutcome {
    pub fn is_persisted(self) -> bool {
        matches!(self, SaveOutcome::Persisted(_))
    }
}

/// `save_all` のキーごとの集計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub persisted: usize,
    /// ソート済み
    pub local_only: Vec<String>,
}

/// 経路選択・リトライ・タイムアウトを組み込んだリモート同期
///
/// # 並行性
/// - clone は安価で、共有状態は build 後に不変
/// - 同じキーへの並行 save は順序付けしない（最後に届いた upsert が勝つ）
///
/// # 使用例
/// ```ignore
/// let sync = SyncFacade::from_config(&SyncConfig::from_env()?);
/// let outcome = sync.save("QA-1", TestStatus::Completed).await;
/// ```
#[derive(Clone)]
pub struct SyncFacade {
    pub(super) proxy: Option<Arc<dyn StatusTransport>>,
    pub(super) direct: Option<Arc<dyn StatusTransport>>,
    pub(super) selector: TransportSelector,
    pub(super) retry: RetryPolicy,
    pub(super) classifier: Arc<dyn ErrorClassifier>,
    pub(super) timeout: Duration,
    pub(super) save_concurrency: usize,
}

impl SyncFacade {
    /// 新しい SyncFacadeBuilder を作成
    pub fn builder() -> SyncFacadeBuilder {
        SyncFacadeBuilder::new()
    }

    /// proxy か direct のどちらかが設定されていれば true
    pub fn is_available(&self) -> bool {
        self.selector.select().is_available()
    }

    /// build 時に確定した経路選択
    pub fn selector(&self) -> &TransportSelector {
        &self.selector
    }

    /// `key` の永続化済みステータスを取得
    ///
    /// レコードがない場合も、全経路が失敗した場合も None。
    pub async fn load(&self, key: &str) -> Option<TestStatus> {
        for route in self.selector.plan() {
            let Some(transport) = self.transport(route) else {
                continue;
            };
            match self.guarded("load", route, || transport.read_one(key)).await {
                Ok(status) => return status,
                Err(err) => self.degraded("load", route, key, &err),
            }
        }
        None
    }

    /// `keys` の永続化済みステータスをまとめて取得
    ///
    /// - レコードのないキーは結果に含まれない
    /// - 重複キーは I/O の前に除く（初出順を保つ）
    /// - 経路ごとに all or nothing: 全経路が失敗したら空の map
    pub async fn load_many(&self, keys: &[String]) -> HashMap<String, TestStatus> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(keys.len());
        let mut unique: Vec<String> = Vec::with_capacity(keys.len());
        for key in keys {
            if seen.insert(key.as_str()) {
                unique.push(key.clone());
            }
        }
        if unique.is_empty() {
            return HashMap::new();
        }

        for route in self.selector.plan() {
            let Some(transport) = self.transport(route) else {
                continue;
            };
            match self
                .guarded("load_many", route, || transport.read_many(&unique))
                .await
            {
                Ok(statuses) => {
                    debug!(
                        route = route.as_str(),
                        requested = unique.len(),
                        found = statuses.len(),
                        "statuses loaded"
                    );
                    return statuses;
                }
                Err(err) => {
                    let label = format!("{} keys", unique.len());
                    self.degraded("load_many", route, &label, &err);
                }
            }
        }
        HashMap::new()
    }

    /// `key` に `status` を保存（upsert）
    ///
    /// 失敗しない。結果は `SaveOutcome` で返すが、無視してよい。
    pub async fn save(&self, key: &str, status: TestStatus) -> SaveOutcome {
        for route in self.selector.plan() {
            let Some(transport) = self.transport(route) else {
                continue;
            };
            match self
                .guarded("save", route, || transport.write_one(key, status))
                .await
            {
                Ok(()) => {
                    debug!(route = route.as_str(), key, %status, "status saved");
                    return SaveOutcome::Persisted(route);
                }
                Err(err) => self.degraded("save", route, key, &err),
            }
        }
        if self.is_available() {
            info!(key, %status, "status kept local only");
        }
        SaveOutcome::LocalOnly
    }

    /// 複数のステータスを並行に保存
    ///
    /// キーごとに独立した `save` を走らせ、同時実行数は `save_concurrency`
    /// （既定 [`DEFAULT_SAVE_CONCURRENCY`]）で抑える。
    pub async fn save_all(&self, statuses: &HashMap<String, TestStatus>) -> SaveReport {
        let permits = Arc::new(Semaphore::new(self.save_concurrency.max(1)));
        let mut set = JoinSet::new();
        let mut report = SaveReport::default();

        for (key, status) in statuses {
            let Ok(permit) = permits.clone().acquire_owned().await else {
                // セマフォは close しないので到達しない
                report.local_only.push(key.clone());
                continue;
            };
            let facade = self.clone();
            let key = key.clone();
            let status = *status;
            set.spawn(async move {
                let outcome = facade.save(&key, status).await;
                drop(permit);
                (key, outcome)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, SaveOutcome::Persisted(_))) => report.persisted += 1,
                Ok((key, SaveOutcome::LocalOnly)) => report.local_only.push(key),
                Err(e) => warn!(error = %e, "save task aborted"),
            }
        }
        report.local_only.sort();
        report
    }

    fn transport(&self, route: Route) -> Option<&Arc<dyn StatusTransport>> {
        match route {
            Route::Proxy => self.proxy.as_ref(),
            Route::Direct => self.direct.as_ref(),
        }
    }

    /// 1 回の transport 呼び出し。リトライの各試行にタイムアウトをかける
    async fn guarded<T, F, Fut>(
        &self,
        operation: &'static str,
        route: Route,
        mut call: F,
    ) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let timeout = self.timeout;
        debug!(operation, route = route.as_str(), "transport call");
        with_retry(operation, &self.retry, self.classifier.as_ref(), || {
            with_timeout(timeout, call())
        })
        .await
    }

    fn degraded(&self, operation: &'static str, route: Route, subject: &str, err: &SyncError) {
        warn!(
            operation,
            route = route.as_str(),
            subject,
            kind = ?err.kind(),
            production = self.selector.is_production(),
            error = %err,
            "remote status unavailable"
        );
    }
}
