//! Logging bootstrap.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing for a binary. `RUST_LOG` wins over the configured
/// level.
pub fn init(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("mlango={log_level},info").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
