//! SSH gateway binary.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use mlango::app::App;
use mlango::transport::ssh;
use mlango::Args;

/// Mlango SSH transport
#[derive(Parser, Debug)]
#[command(name = "mlango-ssh")]
struct SshArgs {
    #[command(flatten)]
    common: Args,

    /// Server host key file (PEM)
    host_key: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = SshArgs::parse();
    mlango::logging::init(&args.common.log_level);

    if let Err(e) = args.common.validate() {
        error!("configuration error: {e}");
        std::process::exit(1);
    }

    info!("mlango {} - ssh transport", mlango::VERSION);
    info!("listen: {}:{}", args.common.host, args.common.port);
    info!("host key: {}", args.host_key.display());

    let app = match App::build(args.common).await {
        Ok(app) => Arc::new(app),
        Err(e) => {
            error!("startup failed: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = ssh::serve(app, &args.host_key).await {
        error!("server error: {e}");
        std::process::exit(1);
    }
    Ok(())
}
