//! DeploymentEnv port - 本番 / 開発の判定をホストから受け取る

/// 本番デプロイを示すホスト名の断片
pub const PRODUCTION_HOST_MARKERS: &[&str] = &["vercel.app", "vercel.com"];

/// 同期レイヤーが本番で動いているかを返す
///
/// 本番では proxy が失敗しても direct にフォールバックしない
/// （匿名の直接アクセスは拒否される）。
pub trait DeploymentEnv: Send + Sync {
    /// 本番なら true
    fn is_production(&self) -> bool;
}

/// ホスト名による判定（本番マーカーを含めば本番）
#[derive(Debug, Clone, Default)]
pub struct HostnameEnvironment {
    hostname: Option<String>,
}

impl HostnameEnvironment {
    /// ホスト名を指定して作成
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: Some(hostname.into()),
        }
    }

    /// ホスト名が不明（CLI、テスト）。開発扱いになる
    pub fn unknown() -> Self {
        Self { hostname: None }
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }
}

impl DeploymentEnv for HostnameEnvironment {
    fn is_production(&self) -> bool {
        let Some(host) = &self.hostname else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        PRODUCTION_HOST_MARKERS
            .iter()
            .any(|marker| host.contains(marker))
    }
}

/// 固定の判定を返す（配線のテスト用）
#[derive(Debug, Clone, Copy)]
pub struct StaticEnvironment(pub bool);

impl DeploymentEnv for StaticEnvironment {
    fn is_production(&self) -> bool {
        self.0
    }
}
