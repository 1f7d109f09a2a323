//! Impls - ports の実装
//!
//! - **ProxyTransport**: HTTP リレー経由の transport
//! - **DirectTransport**: `BackendClient` 経由の transport
//! - **RestBackendClient**: PostgREST 形式の backend client
//! - **InMemoryBackend**: 開発用・テスト用の backend

pub mod direct;
pub mod memory_backend;
pub mod proxy;
pub mod rest_backend;

pub use self::direct::DirectTransport;
pub use self::memory_backend::InMemoryBackend;
pub use self::proxy::ProxyTransport;
pub use self::rest_backend::RestBackendClient;
