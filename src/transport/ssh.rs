//! SSH transport.
//!
//! Public-key-only SSH v2 server. An offered key is looked up in the
//! authorized-keys store; a match binds the connection to the owning
//! session id, and each session channel becomes a line-oriented menu
//! loop over the request pipeline. Channels are concurrent; the storage
//! layer serializes shared state.

use russh::server::{Auth, Config as SshConfig, Handler, Msg, Server, Session};
use russh::{Channel, ChannelId, CryptoVec, MethodSet};
use russh_keys::key::PublicKey;
use russh_keys::PublicKeyBase64;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::app::App;
use crate::auth::SshKeyStore;
use crate::types::{MlangoError, Result};

/// Run the SSH listener until interrupted, then close the stores.
pub async fn serve(app: Arc<App>, host_key_path: &Path) -> Result<()> {
    let pem = tokio::fs::read_to_string(host_key_path).await.map_err(|e| {
        MlangoError::Config(format!("read host key {}: {e}", host_key_path.display()))
    })?;
    let host_key = russh_keys::decode_secret_key(&pem, None)
        .map_err(|e| MlangoError::Config(format!("decode host key: {e}")))?;

    let keys = Arc::new(app.ssh_keys().await?);
    let config = Arc::new(SshConfig {
        methods: MethodSet::PUBLICKEY,
        auth_rejection_time: Duration::from_millis(300),
        inactivity_timeout: Some(Duration::from_secs(600)),
        keys: vec![host_key],
        ..Default::default()
    });

    let addr = format!("{}:{}", app.args.host, app.args.port);
    info!(%addr, "ssh transport listening");
    let mut server = SshServer {
        app: Arc::clone(&app),
        keys,
    };

    tokio::select! {
        result = server.run_on_address(config, addr.as_str()) => {
            result.map_err(MlangoError::Io)?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }
    app.close().await
}

struct SshServer {
    app: Arc<App>,
    keys: Arc<SshKeyStore>,
}

impl Server for SshServer {
    type Handler = SshSession;

    fn new_client(&mut self, peer: Option<std::net::SocketAddr>) -> SshSession {
        debug!(?peer, "ssh client connected");
        SshSession {
            app: Arc::clone(&self.app),
            keys: Arc::clone(&self.keys),
            session_id: None,
            line_buffers: HashMap::new(),
        }
    }
}

struct SshSession {
    app: Arc<App>,
    keys: Arc<SshKeyStore>,
    /// Bound after successful public-key auth.
    session_id: Option<String>,
    /// Pending input bytes per channel.
    line_buffers: HashMap<ChannelId, Vec<u8>>,
}

impl SshSession {
    /// Run one input through the pipeline for the bound session.
    async fn step(&self, input: &str) -> Result<(String, bool)> {
        let session_id = self
            .session_id
            .clone()
            .ok_or(MlangoError::SessionMissing)?;
        let config = self.app.args.engine_config(&session_id);
        self.app.pipeline.run(config, input).await
    }

    fn send(&self, session: &mut Session, channel: ChannelId, text: &str) {
        let framed = format!("{}\r\n> ", text.replace('\n', "\r\n"));
        session.data(channel, CryptoVec::from_slice(framed.as_bytes()));
    }
}

#[async_trait::async_trait]
impl Handler for SshSession {
    type Error = anyhow::Error;

    async fn auth_publickey(
        &mut self,
        user: &str,
        public_key: &PublicKey,
    ) -> std::result::Result<Auth, Self::Error> {
        let wire = public_key.public_key_bytes();
        match self.keys.session_for(&wire).await? {
            Some(session_id) => {
                info!(%user, %session_id, "ssh key authorized");
                self.session_id = Some(session_id);
                Ok(Auth::Accept)
            }
            None => {
                warn!(%user, "unknown ssh key rejected");
                Ok(Auth::Reject {
                    proceed_with_methods: None,
                })
            }
        }
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> std::result::Result<bool, Self::Error> {
        self.line_buffers.insert(channel.id(), Vec::new());
        Ok(true)
    }

    async fn pty_request(
        &mut self,
        channel: ChannelId,
        _term: &str,
        _col_width: u32,
        _row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(russh::Pty, u32)],
        session: &mut Session,
    ) -> std::result::Result<(), Self::Error> {
        session.channel_success(channel);
        Ok(())
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> std::result::Result<(), Self::Error> {
        session.channel_success(channel);
        // Blank first exec renders the session's current node.
        let (output, continues) = self.step("").await?;
        self.send(session, channel, &output);
        if !continues {
            session.close(channel);
        }
        Ok(())
    }

    async fn data(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> std::result::Result<(), Self::Error> {
        // Echo so the far end sees its own typing.
        session.data(channel, CryptoVec::from_slice(data));

        self.line_buffers
            .entry(channel)
            .or_default()
            .extend_from_slice(data);

        loop {
            let line = {
                let buffer = self.line_buffers.entry(channel).or_default();
                match buffer.iter().position(|b| *b == b'\n' || *b == b'\r') {
                    Some(pos) => Some(buffer.drain(..=pos).collect::<Vec<u8>>()),
                    None => None,
                }
            };
            let Some(line) = line else { break };
            let input = String::from_utf8_lossy(&line).trim().to_string();

            let (output, continues) = self.step(&input).await?;
            self.send(session, channel, &output);
            if !continues {
                session.close(channel);
                self.line_buffers.remove(&channel);
                break;
            }
        }
        Ok(())
    }
}
