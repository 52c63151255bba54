//! Storage service.
//!
//! Owns the connection broker: a map from connection descriptor to live
//! backend. Store slots are materialized lazily; when two slots resolve to
//! an equal descriptor they share one physical backend, and `close`
//! releases each physical backend exactly once.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::types::{MlangoError, Result};

use super::conn::{ConnData, ConnKind, Conns, StoreSlot};
use super::fs::FsDb;
use super::kv::KvDb;
use super::mem::MemDb;
use super::postgres::PgDb;
use super::Db;

#[derive(Default)]
struct Bound {
    slots: HashMap<StoreSlot, Arc<dyn Db>>,
    broker: HashMap<ConnData, Arc<dyn Db>>,
}

pub struct StorageService {
    conns: Conns,
    bound: Mutex<Bound>,
}

impl StorageService {
    pub fn new(conns: Conns) -> Self {
        Self {
            conns,
            bound: Mutex::new(Bound::default()),
        }
    }

    /// Backend for a store slot, constructing it on first use.
    pub async fn get(&self, slot: StoreSlot) -> Result<Arc<dyn Db>> {
        let mut bound = self.bound.lock().await;
        if let Some(db) = bound.slots.get(&slot) {
            return Ok(Arc::clone(db));
        }

        let descriptor = self.conns.resolved(slot);
        let db = match bound.broker.get(&descriptor) {
            Some(existing) => {
                debug!(?slot, conn = %descriptor, "adopting shared backend");
                Arc::clone(existing)
            }
            None => {
                let db = construct(&descriptor).await?;
                info!(?slot, conn = %descriptor, "store backend opened");
                bound.broker.insert(descriptor, Arc::clone(&db));
                db
            }
        };
        bound.slots.insert(slot, Arc::clone(&db));
        Ok(db)
    }

    /// Auxiliary keyed store alongside the user store (the SSH
    /// authorized-keys database). Shares the physical backend whenever the
    /// resolved descriptor matches an already-open one.
    pub async fn auxiliary(&self, file: &str) -> Result<Arc<dyn Db>> {
        let descriptor = self.conns.get(StoreSlot::User).join_file(file);
        let mut bound = self.bound.lock().await;
        if let Some(existing) = bound.broker.get(&descriptor) {
            return Ok(Arc::clone(existing));
        }
        let db = construct(&descriptor).await?;
        info!(conn = %descriptor, "auxiliary store opened");
        bound.broker.insert(descriptor, Arc::clone(&db));
        Ok(db)
    }

    /// Close every physical backend once, reporting the union of errors.
    pub async fn close(&self) -> Result<()> {
        let mut bound = self.bound.lock().await;
        let mut failures = Vec::new();
        for (descriptor, db) in bound.broker.drain() {
            if let Err(e) = db.close().await {
                failures.push(format!("{descriptor}: {e}"));
            }
        }
        bound.slots.clear();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(MlangoError::Storage(failures.join("; ")))
        }
    }
}

async fn construct(conn: &ConnData) -> Result<Arc<dyn Db>> {
    Ok(match conn.kind {
        ConnKind::None | ConnKind::Mem => Arc::new(MemDb::new()),
        ConnKind::Fs => Arc::new(FsDb::open(&conn.path).await?),
        ConnKind::Kv => Arc::new(KvDb::open(&conn.path).await?),
        ConnKind::Postgres => Arc::new(PgDb::connect(&conn.path, &conn.domain).await?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::parse_conn;

    #[tokio::test]
    async fn test_equal_descriptors_share_backend() {
        let mut conns = Conns::new();
        conns.set(StoreSlot::State, ConnData::mem());
        conns.set(StoreSlot::User, ConnData::mem());
        let svc = StorageService::new(conns);

        let state = svc.get(StoreSlot::State).await.unwrap();
        let user = svc.get(StoreSlot::User).await.unwrap();
        assert!(Arc::ptr_eq(&state, &user));
    }

    #[tokio::test]
    async fn test_kv_slots_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let conn = parse_conn(dir.path().to_str().unwrap()).unwrap();
        let mut conns = Conns::new();
        conns.set(StoreSlot::State, conn.clone());
        conns.set(StoreSlot::User, conn);
        let svc = StorageService::new(conns);

        let state = svc.get(StoreSlot::State).await.unwrap();
        let user = svc.get(StoreSlot::User).await.unwrap();
        assert!(!Arc::ptr_eq(&state, &user));

        state.put(b"k", b"state").await.unwrap();
        assert_eq!(user.get(b"k").await.unwrap(), None);
        svc.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_get_after_get_returns_same_handle() {
        let svc = StorageService::new(Conns::new());
        let a = svc.get(StoreSlot::State).await.unwrap();
        let b = svc.get(StoreSlot::State).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_close_shared_backend_once() {
        let mut conns = Conns::new();
        conns.set(StoreSlot::State, ConnData::mem());
        conns.set(StoreSlot::User, ConnData::mem());
        let svc = StorageService::new(conns);
        svc.get(StoreSlot::State).await.unwrap();
        svc.get(StoreSlot::User).await.unwrap();
        svc.close().await.unwrap();
    }
}
