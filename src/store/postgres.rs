//! Postgres store.
//!
//! One schema per deployment (the `domain` segment of the connection
//! descriptor), one keyed table inside it. Writes are upserts, so a write
//! is atomic and concurrent readers of the same key observe either the old
//! or the new value. The pool is shared between store slots that resolve
//! to the same descriptor.

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_postgres::NoTls;
use tracing::{debug, info};

use crate::types::{MlangoError, Result};

use super::Db;

const POOL_SIZE: usize = 8;

pub struct PgDb {
    pool: Pool,
    schema: String,
    closed: AtomicBool,
}

impl PgDb {
    /// Connect, ensure the schema and keyed table exist, and return the
    /// pooled store.
    pub async fn connect(url: &str, schema: &str) -> Result<Self> {
        if !is_valid_schema_name(schema) {
            return Err(MlangoError::Config(format!(
                "invalid postgres schema name: {schema}"
            )));
        }

        let pg_config: tokio_postgres::Config = url
            .parse()
            .map_err(|e| MlangoError::Config(format!("postgres connection string: {e}")))?;
        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let pool = Pool::builder(manager)
            .max_size(POOL_SIZE)
            .build()
            .map_err(|e| MlangoError::Storage(format!("postgres pool: {e}")))?;

        let db = Self {
            pool,
            schema: schema.to_string(),
            closed: AtomicBool::new(false),
        };
        db.ensure_schema().await?;
        info!(schema = %schema, "postgres store ready");
        Ok(db)
    }

    async fn ensure_schema(&self) -> Result<()> {
        let client = self.client().await?;
        client
            .batch_execute(&format!(
                "CREATE SCHEMA IF NOT EXISTS {schema};
                 CREATE TABLE IF NOT EXISTS {schema}.kv_store (
                     key        BYTEA PRIMARY KEY,
                     value      BYTEA NOT NULL,
                     updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
                 );",
                schema = self.schema
            ))
            .await
            .map_err(MlangoError::storage)
    }

    async fn client(&self) -> Result<deadpool_postgres::Object> {
        if self.closed.load(Ordering::Acquire) {
            return Err(MlangoError::Storage("postgres store is closed".into()));
        }
        self.pool
            .get()
            .await
            .map_err(|e| MlangoError::Storage(format!("postgres pool get: {e}")))
    }
}

/// Schema names are embedded in DDL, so only plain identifiers pass.
fn is_valid_schema_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[async_trait]
impl Db for PgDb {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                &format!("SELECT value FROM {}.kv_store WHERE key = $1", self.schema),
                &[&key],
            )
            .await
            .map_err(MlangoError::storage)?;
        Ok(row.map(|r| r.get::<_, Vec<u8>>(0)))
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let client = self.client().await?;
        client
            .execute(
                &format!(
                    "INSERT INTO {}.kv_store (key, value) VALUES ($1, $2)
                     ON CONFLICT (key) DO UPDATE
                     SET value = EXCLUDED.value, updated_at = now()",
                    self.schema
                ),
                &[&key, &value],
            )
            .await
            .map_err(MlangoError::storage)?;
        Ok(())
    }

    async fn remove(&self, key: &[u8]) -> Result<()> {
        let client = self.client().await?;
        client
            .execute(
                &format!("DELETE FROM {}.kv_store WHERE key = $1", self.schema),
                &[&key],
            )
            .await
            .map_err(MlangoError::storage)?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.pool.close();
        debug!(schema = %self.schema, "postgres store closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_name_validation() {
        assert!(is_valid_schema_name("mlango"));
        assert!(is_valid_schema_name("_wallet2"));
        assert!(!is_valid_schema_name(""));
        assert!(!is_valid_schema_name("2wallet"));
        assert!(!is_valid_schema_name("wallet;drop"));
        assert!(!is_valid_schema_name("wallet-prod"));
    }
}
