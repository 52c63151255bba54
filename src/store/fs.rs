//! Filesystem key-value store.
//!
//! One file per key under a flat directory; file names are the hex-encoded
//! key so arbitrary key bytes stay path-safe.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::types::{MlangoError, Result};

use super::Db;

pub struct FsDb {
    dir: PathBuf,
    closed: AtomicBool,
}

impl FsDb {
    /// Open the directory, creating it if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| MlangoError::Storage(format!("create {}: {e}", dir.display())))?;
        Ok(Self {
            dir,
            closed: AtomicBool::new(false),
        })
    }

    fn path_for(&self, key: &[u8]) -> PathBuf {
        self.dir.join(hex::encode(key))
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(MlangoError::Storage("filesystem store is closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Db for FsDb {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.check_open()?;
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MlangoError::storage(e)),
        }
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.check_open()?;
        tokio::fs::write(self.path_for(key), value)
            .await
            .map_err(MlangoError::storage)
    }

    async fn remove(&self, key: &[u8]) -> Result<()> {
        self.check_open()?;
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MlangoError::storage(e)),
        }
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
    async fn test_round_trip_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let db = FsDb::open(dir.path()).await.unwrap();
        assert_eq!(db.get(b"absent").await.unwrap(), None);
        db.put(&[0x00, 0x04, 0xFF], b"value").await.unwrap();
        assert_eq!(db.get(&[0x00, 0x04, 0xFF]).await.unwrap(), Some(b"value".to_vec()));
        db.remove(&[0x00, 0x04, 0xFF]).await.unwrap();
        assert_eq!(db.get(&[0x00, 0x04, 0xFF]).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let db = FsDb::open(dir.path()).await.unwrap();
        db.remove(b"never-written").await.unwrap();
    }
}
