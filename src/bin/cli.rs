//! Local terminal loop binary.

use clap::Parser;
use tracing::error;

use mlango::app::App;
use mlango::transport::stdin;
use mlango::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    mlango::logging::init(&args.log_level);

    let Some(session_id) = args.session_id.clone() else {
        error!("--session-id is required for the terminal loop");
        std::process::exit(1);
    };
    if let Err(e) = args.validate() {
        error!("configuration error: {e}");
        std::process::exit(1);
    }

    let app = match App::build(args).await {
        Ok(app) => app,
        Err(e) => {
            error!("startup failed: {e}");
            std::process::exit(1);
        }
    };

    let result = stdin::run(&app, &session_id).await;
    app.close().await.ok();
    if let Err(e) = result {
        error!("session error: {e}");
        std::process::exit(1);
    }
    Ok(())
}
