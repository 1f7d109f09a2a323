//! Domain - ドメインモデル
//!
//! タスクフォレスト、派生テストステータス、リモートレコード、エラー。
//! I/O を持たない。

pub mod compute;
pub mod errors;
pub mod index;
pub mod record;
pub mod status;
pub mod task;

pub use self::compute::{compute, compute_all, container_status, leaf_status};
pub use self::errors::{ErrorKind, SyncError};
pub use self::index::{ChildIndex, ChildSource};
pub use self::record::{CONFLICT_KEY, STATUS_TABLE, TaskTestStatusRecord};
pub use self::status::{TestResult, TestStatus, UnknownStatus};
pub use self::task::{Task, TaskId, TaskKind, TestCase};
