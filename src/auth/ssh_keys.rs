//! SSH authorized-keys store.
//!
//! Maps a public key's wire-format bytes to the session id it
//! authenticates as. Lives in a sub-prefixed keyspace (prefix `0x01`) of
//! an auxiliary keyed store, seeded out-of-band by the `mlango-sshkey`
//! binary.

use std::sync::Arc;

use crate::store::{Db, SubPrefixDb};
use crate::types::Result;

/// Sub-prefix byte for the authorized-keys keyspace.
const SSH_KEY_PREFIX: u8 = 0x01;

pub struct SshKeyStore {
    db: SubPrefixDb,
}

impl SshKeyStore {
    pub fn new(inner: Arc<dyn Db>) -> Self {
        Self {
            db: SubPrefixDb::new(inner, &[SSH_KEY_PREFIX]),
        }
    }

    /// Authorize a public key for a session id.
    pub async fn put(&self, key_wire: &[u8], session_id: &str) -> Result<()> {
        self.db.put(key_wire, session_id.as_bytes()).await
    }

    /// Session id an offered public key authenticates as, if any.
    pub async fn session_for(&self, key_wire: &[u8]) -> Result<Option<String>> {
        Ok(self
            .db
            .get(key_wire)
            .await?
            .map(|v| String::from_utf8_lossy(&v).into_owned()))
    }

    pub async fn revoke(&self, key_wire: &[u8]) -> Result<()> {
        self.db.remove(key_wire).await
    }
}
