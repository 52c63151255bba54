//! Multi-tier storage.
//!
//! Three logical stores (state, user data, menu resources) resolve through
//! connection descriptors to heterogeneous backends: memory, filesystem,
//! embedded keyed files, Postgres. The [`service::StorageService`] broker
//! materializes backends on demand and shares a physical backend between
//! slots whose descriptors are equal.

pub mod conn;
pub mod fs;
pub mod keys;
pub mod kv;
pub mod mem;
pub mod postgres;
pub mod service;
pub mod sub_prefix;
pub mod user;

use async_trait::async_trait;

use crate::types::Result;

pub use conn::{parse_conn, ConnData, ConnKind, Conns, StoreSlot};
pub use keys::{pack_key, DataTyp};
pub use service::StorageService;
pub use sub_prefix::{SubPrefixDb, TimedDb};
pub use user::UserStore;

/// Keyed byte store.
///
/// Keys are fully composed by the caller (see [`keys::pack_key`]); backends
/// carry no transient prefix or session state, so any single call is a
/// complete logical operation.
#[async_trait]
pub trait Db: Send + Sync {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    async fn remove(&self, key: &[u8]) -> Result<()>;

    /// Release the physical backend. Idempotent; operations after close
    /// fail with a storage error.
    async fn close(&self) -> Result<()>;
}
