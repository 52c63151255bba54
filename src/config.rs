//! Configuration.
//!
//! CLI arguments and environment variable handling using clap. All
//! binaries share this surface; the SSH and stdin binaries add their own
//! extras on top.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::api::ApiConfig;
use crate::engine::EngineConfig;
use crate::store::{parse_conn, ConnData, Conns, StoreSlot};
use crate::types::{MlangoError, Result};

/// Backend hint for slots without an explicit connection string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DbHint {
    Mem,
    Kv,
    Postgres,
}

/// Mlango - session gateway for the Sarafu community-currency wallet
#[derive(Parser, Debug, Clone)]
#[command(name = "mlango")]
#[command(about = "USSD/HTTP/SSH menu gateway for the Sarafu wallet")]
pub struct Args {
    /// State directory for keyed-file stores
    #[arg(long, env = "DB_DIR", default_value = ".state")]
    pub dbdir: PathBuf,

    /// Directory of menu templates (optionally per language: <sym>_<lang>)
    #[arg(long, env = "RESOURCE_DIR", default_value = "services/registration")]
    pub resourcedir: PathBuf,

    /// Store backend when no connection string is configured
    #[arg(long, value_enum, default_value = "kv")]
    pub db: DbHint,

    /// Output byte budget per response
    #[arg(short = 's', long = "size", env = "OUTPUT_SIZE", default_value_t = 160)]
    pub output_size: usize,

    /// Engine debug trace
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Listen host (HTTP and SSH)
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Listen port (HTTP and SSH)
    #[arg(short = 'p', long, env = "PORT", default_value_t = 7123)]
    pub port: u16,

    /// Path the Africa's Talking gateway posts to
    #[arg(long, env = "AT_ENDPOINT", default_value = "/at")]
    pub at_endpoint: String,

    /// Optional translation directory, merged over the resource directory
    #[arg(long = "gettext", env = "GETTEXT_DIR")]
    pub gettext: Option<PathBuf>,

    /// Supported language codes; the first is the default
    #[arg(long = "language", env = "LANGUAGES", value_delimiter = ',')]
    pub languages: Vec<String>,

    /// Default language override
    #[arg(long, env = "DEFAULT_LANGUAGE")]
    pub default_language: Option<String>,

    /// Session id (stdin loop and one-shot runs)
    #[arg(long = "session-id", env = "SESSION_ID")]
    pub session_id: Option<String>,

    /// Connection string for all store slots
    #[arg(long, env = "DB_CONN")]
    pub db_conn: Option<String>,

    /// Connection string for the state store (falls back to --db-conn)
    #[arg(long, env = "DB_CONN_STATE")]
    pub db_conn_state: Option<String>,

    /// Connection string for the user-data store (falls back to --db-conn)
    #[arg(long, env = "DB_CONN_USER")]
    pub db_conn_user: Option<String>,

    /// Connection string for the resource store (falls back to --db-conn)
    #[arg(long, env = "DB_CONN_RESOURCE")]
    pub db_conn_resource: Option<String>,

    /// Custodial signing service base URL
    #[arg(long, env = "CUSTODIAL_URL_BASE", default_value = "http://localhost:5003")]
    pub custodial_url_base: String,

    /// Chain data indexer base URL
    #[arg(long, env = "DATA_URL_BASE", default_value = "http://localhost:5006")]
    pub data_url_base: String,

    /// API key for the custodial service
    #[arg(long, env = "CUSTODIAL_API_KEY", default_value = "")]
    pub custodial_api_key: String,

    /// API key for the data service
    #[arg(long, env = "DATA_API_KEY", default_value = "")]
    pub data_api_key: String,

    /// External request timeout in milliseconds
    #[arg(long, env = "API_TIMEOUT_MS", default_value_t = 15000)]
    pub api_timeout_ms: u64,

    /// JSON seed of admin session ids
    #[arg(long, env = "ADMIN_SEED")]
    pub admin_seed: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Per-slot connection descriptors, explicit strings first, then the
    /// shared string, then the backend hint over the state directory.
    pub fn conns(&self) -> Result<Conns> {
        let fallback = match &self.db_conn {
            Some(s) => parse_conn(s)?,
            None => match self.db {
                DbHint::Mem => ConnData::mem(),
                DbHint::Kv => ConnData::kv(self.dbdir.to_string_lossy().into_owned()),
                DbHint::Postgres => {
                    return Err(MlangoError::Config(
                        "postgres backend needs DB_CONN".into(),
                    ))
                }
            },
        };

        let mut conns = Conns::new();
        for (slot, explicit) in [
            (StoreSlot::State, &self.db_conn_state),
            (StoreSlot::User, &self.db_conn_user),
            (StoreSlot::Resource, &self.db_conn_resource),
        ] {
            let conn = match explicit {
                Some(s) => parse_conn(s)?,
                None => fallback.clone(),
            };
            conns.set(slot, conn);
        }
        Ok(conns)
    }

    /// Language codes, defaulting to English.
    pub fn language_codes(&self) -> Vec<String> {
        if self.languages.is_empty() {
            vec!["eng".to_string()]
        } else {
            self.languages.clone()
        }
    }

    pub fn default_language_code(&self) -> String {
        self.default_language
            .clone()
            .unwrap_or_else(|| self.language_codes()[0].clone())
    }

    pub fn api_config(&self) -> ApiConfig {
        let mut config = ApiConfig::new(&self.custodial_url_base, &self.data_url_base);
        config.custodial_api_key = self.custodial_api_key.clone();
        config.data_api_key = self.data_api_key.clone();
        config.timeout = Duration::from_millis(self.api_timeout_ms);
        config
    }

    pub fn engine_config(&self, session_id: &str) -> EngineConfig {
        let mut config = EngineConfig::new(session_id);
        config.root = crate::menu::ROOT.to_string();
        config.output_size = self.output_size;
        config.default_language = Some(self.default_language_code());
        config.debug = self.debug;
        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.output_size == 0 {
            return Err(MlangoError::Config("output size must be positive".into()));
        }
        if !self.at_endpoint.starts_with('/') {
            return Err(MlangoError::Config(
                "AT endpoint must be an absolute path".into(),
            ));
        }
        self.conns().map(|_| ())
    }
}
