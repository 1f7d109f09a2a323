//! App - アプリケーション層
//!
//! ports を組み合わせて同期パイプラインを構成する。
//!
//! - **classify**: 一時的 / 恒久的な失敗の判定
//! - **retry**: 固定バックオフによる上限付きリトライ
//! - **timeout**: 呼び出しごとの期限
//! - **selector**: 利用可否と経路選択
//! - **facade**: `load` / `load_many` / `save` / `save_all` / `is_available`
//! - **builder**: 個別部品または `SyncConfig` からのワイヤリング

pub mod builder;
pub mod classify;
pub mod facade;
pub mod retry;
pub mod selector;
pub mod timeout;

pub use self::builder::SyncFacadeBuilder;
pub use self::classify::{DefaultClassifier, ErrorClassifier, TransientPatterns};
pub use self::facade::{DEFAULT_SAVE_CONCURRENCY, SaveOutcome, SaveReport, SyncFacade};
pub use self::retry::{RetryPolicy, with_retry};
pub use self::selector::{Availability, Route, TransportSelector};
pub use self::timeout::{DEFAULT_TIMEOUT, with_timeout};
