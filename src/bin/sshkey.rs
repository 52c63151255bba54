//! Seed an SSH public key into the authorized-keys store.
//!
//! ```text
//! mlango-sshkey --dbdir .state -i +254712345678 id_ed25519.pub
//! ```

use clap::Parser;
use russh_keys::PublicKeyBase64;
use std::path::PathBuf;
use tracing::{error, info};

use mlango::app::App;
use mlango::Args;

/// Authorize an SSH public key for a session id
#[derive(Parser, Debug)]
#[command(name = "mlango-sshkey")]
struct SshKeyArgs {
    #[command(flatten)]
    common: Args,

    /// Session id the key authenticates as
    #[arg(short = 'i', long = "session")]
    session_id: String,

    /// OpenSSH public key file
    public_key: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = SshKeyArgs::parse();
    mlango::logging::init(&args.common.log_level);

    let raw = match std::fs::read_to_string(&args.public_key) {
        Ok(raw) => raw,
        Err(e) => {
            error!("read {}: {e}", args.public_key.display());
            std::process::exit(1);
        }
    };
    // OpenSSH format: "<algo> <base64> [comment]".
    let Some(b64) = raw.split_whitespace().nth(1) else {
        error!("not an OpenSSH public key file");
        std::process::exit(1);
    };
    let key = match russh_keys::parse_public_key_base64(b64) {
        Ok(key) => key,
        Err(e) => {
            error!("parse public key: {e}");
            std::process::exit(1);
        }
    };

    let app = match App::build(args.common).await {
        Ok(app) => app,
        Err(e) => {
            error!("startup failed: {e}");
            std::process::exit(1);
        }
    };
    let keys = app.ssh_keys().await?;
    keys.put(&key.public_key_bytes(), &args.session_id).await?;
    app.close().await?;

    info!("key authorized for session {}", args.session_id);
    Ok(())
}
