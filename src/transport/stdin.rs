//! Local terminal loop.
//!
//! Development helper: reads a line, runs the pipeline triad, prints the
//! output, repeats until the session terminates or stdin closes.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use crate::app::App;
use crate::types::Result;

pub async fn run(app: &App, session_id: &str) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    // Blank first exec renders the session's current node.
    let mut input = String::new();
    loop {
        let config = app.args.engine_config(session_id);
        let (output, continues) = app.pipeline.run(config, &input).await?;
        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;
        if !continues {
            info!("session terminated");
            break;
        }

        match lines.next_line().await? {
            Some(line) => input = line,
            None => break,
        }
    }
    Ok(())
}
