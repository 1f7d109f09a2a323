//! SyncFacadeBuilder - transport・環境・ポリシーのワイヤリング
//!
//! 経路のスナップショット（どの transport があるか、本番かどうか）は `build()`
//! で 1 回だけ取る。以降は環境変数などのグローバルを読まない。

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::classify::{DefaultClassifier, ErrorClassifier};
use super::facade::{DEFAULT_SAVE_CONCURRENCY, SyncFacade};
use super::retry::RetryPolicy;
use super::selector::{Availability, TransportSelector};
use super::timeout::DEFAULT_TIMEOUT;
use crate::config::SyncConfig;
use crate::impls::{DirectTransport, ProxyTransport, RestBackendClient};
use crate::ports::{Clock, DeploymentEnv, HostnameEnvironment, StatusTransport, SystemClock};

/// SyncFacade を構築
///
/// # 使用例
/// ```ignore
/// let sync = SyncFacade::builder()
///     .proxy(Arc::new(proxy))
///     .environment(Arc::new(HostnameEnvironment::new("qa.vercel.app")))
///     .build();
/// ```
///
/// # 既定値
/// - 環境: ホスト名不明（開発扱い）
/// - リトライ: `RetryPolicy::reference()`（4 回、1s / 2s / 4s）
/// - タイムアウト: 5000ms
/// - save_all の同時実行数: 8
pub struct SyncFacadeBuilder {
    proxy: Option<Arc<dyn StatusTransport>>,
    direct: Option<Arc<dyn StatusTransport>>,
    environment: Arc<dyn DeploymentEnv>,
    classifier: Arc<dyn ErrorClassifier>,
    retry: RetryPolicy,
    timeout: Duration,
    save_concurrency: usize,
}

impl SyncFacadeBuilder {
    /// 新しい SyncFacadeBuilder を作成
    pub fn new() -> Self {
        Self {
            proxy: None,
            direct: None,
            environment: Arc::new(HostnameEnvironment::unknown()),
            classifier: Arc::new(DefaultClassifier::default()),
            retry: RetryPolicy::reference(),
            timeout: DEFAULT_TIMEOUT,
            save_concurrency: DEFAULT_SAVE_CONCURRENCY,
        }
    }

    /// proxy 経路の transport を設定
    pub fn proxy(mut self, transport: Arc<dyn StatusTransport>) -> Self {
        self.proxy = Some(transport);
        self
    }

    /// direct 経路の transport を設定
    pub fn direct(mut self, transport: Arc<dyn StatusTransport>) -> Self {
        self.direct = Some(transport);
        self
    }

    /// 本番判定に使う環境を設定
    pub fn environment(mut self, environment: Arc<dyn DeploymentEnv>) -> Self {
        self.environment = environment;
        self
    }

    /// 一時的な失敗の判定を差し替え
    pub fn classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// リトライポリシーを設定
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// 1 試行あたりのタイムアウトを設定
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// save_all の同時実行数の上限を設定（0 は 1 として扱う）
    pub fn save_concurrency(mut self, limit: usize) -> Self {
        self.save_concurrency = limit.max(1);
        self
    }

    /// SyncFacade を生成
    ///
    /// この時点の構成から `TransportSelector` を確定し、info でログに出す。
    pub fn build(self) -> SyncFacade {
        let availability = Availability {
            has_proxy: self.proxy.is_some(),
            has_direct: self.direct.is_some(),
        };
        let production = self.environment.is_production();
        let selector = TransportSelector::new(availability, production);

        info!(
            has_proxy = availability.has_proxy,
            has_direct = availability.has_direct,
            production,
            routes = ?selector.plan(),
            "status sync configured"
        );

        SyncFacade {
            proxy: self.proxy,
            direct: self.direct,
            selector,
            retry: self.retry,
            classifier: self.classifier,
            timeout: self.timeout,
            save_concurrency: self.save_concurrency,
        }
    }
}

impl Default for SyncFacadeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncFacade {
    /// 設定から SyncFacade を構築（システム時計を使う）
    pub fn from_config(config: &SyncConfig) -> SyncFacade {
        Self::from_config_with_clock(config, Arc::new(SystemClock))
    }

    /// 設定から SyncFacade を構築し、レコードの時刻を `clock` から取る
    ///
    /// - 使えない proxy URL は warn を出して「proxy なし」として扱う
    /// - direct は backend URL と key が両方あるときだけ作る
    pub fn from_config_with_clock(config: &SyncConfig, clock: Arc<dyn Clock>) -> SyncFacade {
        let environment = match &config.hostname {
            Some(host) => HostnameEnvironment::new(host.clone()),
            None => HostnameEnvironment::unknown(),
        };
        let mut builder = SyncFacadeBuilder::new()
            .environment(Arc::new(environment))
            .timeout(config.timeout());

        if let Some(url) = config.proxy_url() {
            match ProxyTransport::new(url, clock.clone()) {
                Ok(proxy) => builder = builder.proxy(Arc::new(proxy)),
                Err(err) => warn!(error = %err, "proxy transport disabled"),
            }
        }
        if let Some(client) = RestBackendClient::from_config(config) {
            builder = builder.direct(Arc::new(DirectTransport::new(Arc::new(client), clock)));
        }
        builder.build()
    }
}
