//! In-process memory store.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::types::{MlangoError, Result};

use super::Db;

/// Concurrent in-memory store; the default when no connection string is
/// configured. Contents vanish with the process.
#[derive(Default)]
pub struct MemDb {
    map: DashMap<Vec<u8>, Vec<u8>>,
    closed: AtomicBool,
}

impl MemDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(MlangoError::Storage("memory store is closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Db for MemDb {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.check_open()?;
        Ok(self.map.get(key).map(|v| v.clone()))
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.check_open()?;
        self.map.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &[u8]) -> Result<()> {
        self.check_open()?;
        self.map.remove(key);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let db = MemDb::new();
        db.put(b"k", b"v").await.unwrap();
        assert_eq!(db.get(b"k").await.unwrap(), Some(b"v".to_vec()));
        db.remove(b"k").await.unwrap();
        assert_eq!(db.get(b"k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_blocks_ops() {
        let db = MemDb::new();
        db.close().await.unwrap();
        db.close().await.unwrap();
        assert!(db.put(b"k", b"v").await.is_err());
    }
}
