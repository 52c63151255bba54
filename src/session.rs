//! Session storage bundling.
//!
//! A [`Storage`] bundle pairs the state persister with the user-data
//! handle for one request. [`SimpleStorageProvider`] hands the same bundle
//! to every session id; the trait seam exists so a sharded or cached
//! provider can partition by session id later.

use async_trait::async_trait;
use std::sync::Arc;

use crate::engine::Persister;
use crate::store::{StorageService, StoreSlot, UserStore};
use crate::types::Result;

#[derive(Clone)]
pub struct Storage {
    pub persister: Persister,
    pub user: UserStore,
}

#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Acquire the storage bundle for a session.
    async fn get(&self, session_id: &str) -> Result<Storage>;

    /// Release the bundle after the request. Best-effort.
    async fn put(&self, session_id: &str, storage: Storage) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Single-process provider over one storage service.
pub struct SimpleStorageProvider {
    service: Arc<StorageService>,
}

impl SimpleStorageProvider {
    pub fn new(service: Arc<StorageService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl StorageProvider for SimpleStorageProvider {
    async fn get(&self, _session_id: &str) -> Result<Storage> {
        let state = self.service.get(StoreSlot::State).await?;
        let user = self.service.get(StoreSlot::User).await?;
        Ok(Storage {
            persister: Persister::new(state),
            user: UserStore::new(user),
        })
    }

    async fn put(&self, _session_id: &str, _storage: Storage) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.service.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ConnData, Conns};

    #[tokio::test]
    async fn test_provider_returns_shared_bundle() {
        let mut conns = Conns::new();
        conns.set(StoreSlot::State, ConnData::mem());
        conns.set(StoreSlot::User, ConnData::mem());
        let provider = SimpleStorageProvider::new(Arc::new(StorageService::new(conns)));

        let a = provider.get("s1").await.unwrap();
        let _b = provider.get("s2").await.unwrap();
        a.persister
            .save("s1", &crate::engine::PersistedState::new("root", 16))
            .await
            .unwrap();
        let c = provider.get("s1").await.unwrap();
        assert!(c.persister.load("s1").await.unwrap().is_some());
        provider.put("s1", a).await.unwrap();
        provider.close().await.unwrap();
    }
}
