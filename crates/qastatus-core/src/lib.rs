//! qastatus-core
//!
//! タスクフォレストの派生 QA テストステータスと、そのリモートストアへの
//! 耐障害な同期。
//!
//! # モジュール構成
//! - **domain**: タスクフォレスト、`TestStatus`、純粋なロールアップ、リモートレコード、エラー
//! - **ports**: 外部との境界（transport, backend client, clock, environment）
//! - **impls**: proxy / direct transport、REST とインメモリの backend client
//! - **app**: 判定・リトライ・タイムアウト・経路選択と `SyncFacade`
//! - **config**: 環境変数からの `SyncConfig`
//! - **observability**: `tracing` subscriber の初期化

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;

pub use app::{SaveOutcome, SyncFacade};
pub use config::SyncConfig;
pub use domain::{Task, TestStatus, compute, compute_all};
