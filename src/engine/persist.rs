//! State persistence.
//!
//! Serializes engine state into the STATE store under the session id.

use std::sync::Arc;

use crate::store::Db;
use crate::types::{MlangoError, Result};

use super::state::PersistedState;

#[derive(Clone)]
pub struct Persister {
    store: Arc<dyn Db>,
}

impl Persister {
    pub fn new(store: Arc<dyn Db>) -> Self {
        Self { store }
    }

    /// Load the session's state; None means a fresh session starting at
    /// the menu root.
    pub async fn load(&self, session_id: &str) -> Result<Option<PersistedState>> {
        let Some(blob) = self.store.get(session_id.as_bytes()).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&blob)
            .map(Some)
            .map_err(|e| MlangoError::EngineInit(format!("corrupt state for session: {e}")))
    }

    pub async fn save(&self, session_id: &str, state: &PersistedState) -> Result<()> {
        let blob = serde_json::to_vec(state)
            .map_err(|e| MlangoError::EngineExec(format!("serialize state: {e}")))?;
        self.store.put(session_id.as_bytes(), &blob).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::state::PersistedState;
    use crate::store::mem::MemDb;

    #[tokio::test]
    async fn test_load_missing_is_fresh() {
        let p = Persister::new(Arc::new(MemDb::new()));
        assert!(p.load("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let p = Persister::new(Arc::new(MemDb::new()));
        let mut state = PersistedState::new("root", 16);
        state.push("main");
        p.save("s1", &state).await.unwrap();

        let loaded = p.load("s1").await.unwrap().unwrap();
        assert_eq!(loaded.current(), "main");
        assert!(p.load("s2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_state_is_engine_init_error() {
        let store = Arc::new(MemDb::new());
        store.put(b"s1", b"{not json").await.unwrap();
        let p = Persister::new(store);
        assert!(matches!(
            p.load("s1").await,
            Err(MlangoError::EngineInit(_))
        ));
    }
}
