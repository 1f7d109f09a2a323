//! TransportSelector - 操作ごとに使える transport を決める
//!
//! facade の構築時に 1 度だけ評価し、各呼び出しの経路はそのスナップショットの
//! 純粋関数になる。

/// どの transport が設定されているか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Availability {
    pub has_proxy: bool,
    pub has_direct: bool,
}

impl Availability {
    /// いずれかの transport があれば true
    pub fn is_available(self) -> bool {
        self.has_proxy || self.has_direct
    }
}

/// 1 回の呼び出しで試す経路
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Proxy,
    Direct,
}

impl Route {
    pub fn as_str(self) -> &'static str {
        match self {
            Route::Proxy => "proxy",
            Route::Direct => "direct",
        }
    }
}

/// 経路ポリシーのスナップショット
///
/// - proxy あり: すべての操作で proxy を先に試す
/// - proxy 失敗後の direct は本番以外でのみ試す
/// - proxy なし: direct のみ（フォールバック先はない）
/// - どちらもなし: 空の経路（ローカルのみ）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSelector {
    availability: Availability,
    production: bool,
}

impl TransportSelector {
    /// 設定状況と本番判定から作成
    pub fn new(availability: Availability, production: bool) -> Self {
        Self {
            availability,
            production,
        }
    }

    /// 構築時に確定した transport の設定状況
    pub fn select(&self) -> Availability {
        self.availability
    }

    /// 本番環境として動いているか
    pub fn is_production(&self) -> bool {
        self.production
    }

    /// 1 回の操作で順に試す経路
    pub fn plan(&self) -> Vec<Route> {
        let Availability {
            has_proxy,
            has_direct,
        } = self.availability;
        match (has_proxy, has_direct) {
            (true, true) if !self.production => vec![Route::Proxy, Route::Direct],
            (true, _) => vec![Route::Proxy],
            (false, true) => vec![Route::Direct],
            (false, false) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn availability(has_proxy: bool, has_direct: bool) -> Availability {
        Availability {
            has_proxy,
            has_direct,
        }
    }

    #[rstest]
    #[case::dev_both(true, true, false, vec![Route::Proxy, Route::Direct])]
    #[case::prod_both(true, true, true, vec![Route::Proxy])]
    #[case::proxy_only(true, false, false, vec![Route::Proxy])]
    #[case::direct_only_dev(false, true, false, vec![Route::Direct])]
    #[case::direct_only_prod(false, true, true, vec![Route::Direct])]
    #[case::none(false, false, false, vec![])]
    fn plan_follows_policy(
        #[case] has_proxy: bool,
        #[case] has_direct: bool,
        #[case] production: bool,
        #[case] expected: Vec<Route>,
    ) {
        let selector = TransportSelector::new(availability(has_proxy, has_direct), production);
        assert_eq!(selector.plan(), expected);
    }

    #[test]
    fn availability_requires_one_transport() {
        assert!(!Availability::default().is_available());
        assert!(availability(false, true).is_available());
        assert!(availability(true, false).is_available());
    }
}
