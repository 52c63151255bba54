//! Sub-prefixed and timestamped store wrappers.
//!
//! [`SubPrefixDb`] carves an ad-hoc keyspace out of a backend under the
//! `Extended` data-type namespace: every key becomes
//! `BE16(Extended) || prefix || key`. The SSH authorized-keys store and
//! the put-timestamp bookkeeping of [`TimedDb`] both live in such
//! keyspaces.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::types::Result;

use super::{pack_key, DataTyp, Db};

/// Prefix byte for the put-timestamp keyspace of [`TimedDb`].
const TIMESTAMP_PREFIX: u8 = 0x02;

pub struct SubPrefixDb {
    inner: Arc<dyn Db>,
    prefix: Vec<u8>,
}

impl SubPrefixDb {
    pub fn new(inner: Arc<dyn Db>, prefix: &[u8]) -> Self {
        Self {
            inner,
            prefix: prefix.to_vec(),
        }
    }

    fn full_key(&self, key: &[u8]) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.prefix.len() + key.len());
        data.extend_from_slice(&self.prefix);
        data.extend_from_slice(key);
        pack_key(DataTyp::Extended, &data)
    }
}

#[async_trait]
impl Db for SubPrefixDb {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.inner.get(&self.full_key(key)).await
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner.put(&self.full_key(key), value).await
    }

    async fn remove(&self, key: &[u8]) -> Result<()> {
        self.inner.remove(&self.full_key(key)).await
    }

    /// The wrapped backend is owned by the storage service; closing the
    /// view is a no-op.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Store wrapper that records the wall-clock time of every put in a
/// parallel sub-prefixed keyspace, so callers can ask whether an entry has
/// gone stale.
pub struct TimedDb {
    inner: Arc<dyn Db>,
    stamps: SubPrefixDb,
    ttl: Duration,
}

impl TimedDb {
    pub fn new(inner: Arc<dyn Db>, ttl: Duration) -> Self {
        let stamps = SubPrefixDb::new(Arc::clone(&inner), &[TIMESTAMP_PREFIX]);
        Self { inner, stamps, ttl }
    }

    /// Whether the entry's last put is older than the TTL.
    ///
    /// A missing timestamp reads as fresh; the caller logs and moves on.
    pub async fn stale(&self, key: &[u8]) -> Result<bool> {
        let Some(raw) = self.stamps.get(key).await? else {
            debug!("no put timestamp for key, treating as fresh");
            return Ok(false);
        };
        let Ok(bytes) = <[u8; 8]>::try_from(raw.as_slice()) else {
            return Ok(false);
        };
        let stored_ms = u64::from_be_bytes(bytes);
        Ok(now_ms() > stored_ms + self.ttl.as_millis() as u64)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[async_trait]
impl Db for TimedDb {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner.put(key, value).await?;
        self.stamps.put(key, &now_ms().to_be_bytes()).await
    }

    async fn remove(&self, key: &[u8]) -> Result<()> {
        self.stamps.remove(key).await?;
        self.inner.remove(key).await
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
