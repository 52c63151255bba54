//! Embedded keyed-file store.
//!
//! One SQLite file per logical store, opened through `rusqlite`. The
//! connection is not shareable across tasks, so it lives in a one-slot
//! channel: every operation checks the handle out, runs the complete
//! logical operation, and returns it. Two tasks hitting the same file
//! serialize through that slot; nothing can observe a half-done operation.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::types::{MlangoError, Result};

use super::Db;

pub struct KvDb {
    handle_tx: mpsc::Sender<Connection>,
    handle_rx: Mutex<mpsc::Receiver<Connection>>,
    path: PathBuf,
    closed: AtomicBool,
}

impl KvDb {
    /// Open (or create) a keyed database file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| MlangoError::Storage(format!("create {}: {e}", parent.display())))?;
            }
        }

        let conn = Connection::open(&path)
            .map_err(|e| MlangoError::Storage(format!("open {}: {e}", path.display())))?;
        // journal_mode answers with a row, so it cannot go through execute.
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
            .map_err(MlangoError::storage)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                 key   BLOB PRIMARY KEY,
                 value BLOB NOT NULL
             );",
        )
        .map_err(MlangoError::storage)?;

        let (handle_tx, handle_rx) = mpsc::channel(1);
        handle_tx
            .send(conn)
            .await
            .map_err(|_| MlangoError::Storage("keyed store handle slot unavailable".into()))?;

        debug!(path = %path.display(), "keyed store opened");
        Ok(Self {
            handle_tx,
            handle_rx: Mutex::new(handle_rx),
            path,
            closed: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check the connection out of the one-slot channel.
    ///
    /// The caller must hand it back through [`Self::release`]; the bracket
    /// spans the whole logical operation.
    async fn reserve(&self) -> Result<Connection> {
        if self.closed.load(Ordering::Acquire) {
            return Err(MlangoError::Storage("keyed store is closed".into()));
        }
        let mut rx = self.handle_rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| MlangoError::Storage("keyed store is closed".into()))
    }

    async fn release(&self, conn: Connection) {
        // Fails only when the store closed mid-operation; the handle is
        // dropped with the connection in that case.
        let _ = self.handle_tx.send(conn).await;
    }
}

#[async_trait]
impl Db for KvDb {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let conn = self.reserve().await?;
        let result = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()
            .map_err(MlangoError::storage);
        self.release(conn).await;
        result
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let conn = self.reserve().await?;
        let result = conn
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT (key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map(|_| ())
            .map_err(MlangoError::storage);
        self.release(conn).await;
        result
    }

    async fn remove(&self, key: &[u8]) -> Result<()> {
        let conn = self.reserve().await?;
        let result = conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map(|_| ())
            .map_err(MlangoError::storage);
        self.release(conn).await;
        result
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        // Drain the slot so the connection drops; an in-flight operation
        // returns its handle into the now-ignored channel.
        let mut rx = self.handle_rx.lock().await;
        if let Ok(conn) = rx.try_recv() {
            drop(conn);
        }
        debug!(path = %self.path.display(), "keyed store closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_round_trip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let db = KvDb::open(dir.path().join("userdata.db")).await.unwrap();
        db.put(b"k", b"v1").await.unwrap();
        db.put(b"k", b"v2").await.unwrap();
        assert_eq!(db.get(b"k").await.unwrap(), Some(b"v2".to_vec()));
        db.remove(b"k").await.unwrap();
        assert_eq!(db.get(b"k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reopen_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");
        {
            let db = KvDb::open(&path).await.unwrap();
            db.put(b"session", b"blob").await.unwrap();
            db.close().await.unwrap();
        }
        let db = KvDb::open(&path).await.unwrap();
        assert_eq!(db.get(b"session").await.unwrap(), Some(b"blob".to_vec()));
    }

    #[tokio::test]
    async fn test_concurrent_writers_serialize() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(KvDb::open(dir.path().join("shared.db")).await.unwrap());

        let mut tasks = Vec::new();
        for t in 0u8..4 {
            let db = Arc::clone(&db);
            tasks.push(tokio::spawn(async move {
                for i in 0u8..16 {
                    let key = vec![t, i];
                    db.put(&key, &[t; 8]).await.unwrap();
                    assert_eq!(db.get(&key).await.unwrap(), Some(vec![t; 8]));
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_close_blocks_further_ops() {
        let dir = tempfile::tempdir().unwrap();
        let db = KvDb::open(dir.path().join("x.db")).await.unwrap();
        db.close().await.unwrap();
        db.close().await.unwrap();
        assert!(db.get(b"k").await.is_err());
    }
}
