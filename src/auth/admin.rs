//! Privileged session registry.
//!
//! A read-mostly set of session identifiers (phone numbers) allowed to run
//! administrative operations, loaded once at startup from a JSON seed file:
//!
//! ```json
//! { "admins": ["+254712345678", "+254733000000"] }
//! ```

use dashmap::DashSet;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::types::{MlangoError, Result};

#[derive(Deserialize)]
struct AdminSeed {
    admins: Vec<String>,
}

#[derive(Default)]
pub struct AdminStore {
    sessions: DashSet<String>,
}

impl AdminStore {
    /// Empty store; nobody is privileged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the seed file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| MlangoError::Config(format!("read admin seed {}: {e}", path.display())))?;
        let seed: AdminSeed = serde_json::from_slice(&raw)
            .map_err(|e| MlangoError::Config(format!("parse admin seed {}: {e}", path.display())))?;

        let store = Self::new();
        for session_id in seed.admins {
            store.sessions.insert(session_id);
        }
        info!(count = store.sessions.len(), "admin seed loaded");
        Ok(store)
    }

    pub fn insert(&self, session_id: &str) {
        self.sessions.insert(session_id.to_string());
    }

    pub fn is_admin(&self, session_id: &str) -> bool {
        self.sessions.contains(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_load_seed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"admins": ["+254712345678"]}}"#).unwrap();

        let store = AdminStore::load(file.path()).await.unwrap();
        assert!(store.is_admin("+254712345678"));
        assert!(!store.is_admin("+254700000001"));
    }

    #[tokio::test]
    async fn test_bad_seed_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(AdminStore::load(file.path()).await.is_err());
    }

    #[test]
    fn test_empty_store() {
        assert!(!AdminStore::new().is_admin("+254712345678"));
    }
}
