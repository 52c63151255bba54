//! Mlango - session gateway for the Sarafu community-currency wallet.
//!
//! Short text inputs from USSD gateways, HTTP clients, SSH shells or a
//! local terminal drive a persistent text-menu state machine. Per-session
//! state and user data live in a multi-tier storage service; account
//! lifecycle and token transfers go through a custodial signing service
//! and a chain data indexer.
//!
//! ## Services
//!
//! - **Pipeline**: process / output / reset over one (session, input) pair
//! - **Engine**: menu state machine with flag-based branching
//! - **Store**: state, user-data and resource tiers over memory,
//!   filesystem, keyed files or Postgres
//! - **Handlers**: named callbacks the menu binds to nodes
//! - **Transports**: generic HTTP, Africa's Talking, SSH, stdin

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod engine;
pub mod handlers;
pub mod logging;
pub mod menu;
pub mod pipeline;
pub mod session;
pub mod store;
pub mod transport;
pub mod types;
pub mod validate;

pub use config::Args;
pub use pipeline::{Pipeline, RequestSession};
pub use types::{MlangoError, Result};

/// Crate version, reported by the health endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
