//! Ports - 抽象化レイヤー
//!
//! 各 trait はコアの外側との境界:
//!
//! - **StatusTransport**: リモートのステータスストア（proxy / direct）
//! - **BackendClient**: backend SDK
//! - **Clock**: 時刻
//! - **DeploymentEnv**: 実行環境

pub mod backend;
pub mod clock;
pub mod environment;
pub mod transport;

pub use self::backend::BackendClient;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::environment::{DeploymentEnv, HostnameEnvironment, StaticEnvironment};
pub use self::transport::StatusTransport;
