//! HTTP gateway binary: generic sessions plus the Africa's Talking
//! endpoint.

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use mlango::app::App;
use mlango::transport::http;
use mlango::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    mlango::logging::init(&args.log_level);

    if let Err(e) = args.validate() {
        error!("configuration error: {e}");
        std::process::exit(1);
    }

    info!("mlango {} - http transport", mlango::VERSION);
    info!("listen: {}:{}", args.host, args.port);
    info!("at endpoint: {}", args.at_endpoint);
    info!("output size: {} bytes", args.output_size);

    let app = match App::build(args).await {
        Ok(app) => Arc::new(app),
        Err(e) => {
            error!("startup failed: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = http::serve(app).await {
        error!("server error: {e}");
        std::process::exit(1);
    }
    Ok(())
}
