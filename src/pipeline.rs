//! Request pipeline.
//!
//! The `process` / `output` / `reset` triad lifts one (session id, input)
//! pair into a stateful menu evaluation: acquire the session's storage,
//! hydrate an engine bound to its persister, execute the input, flush the
//! bounded output to the transport's writer, persist and release.

use std::io::Write;
use std::sync::Arc;
use tracing::{error, warn};

use crate::engine::{Engine, EngineConfig, HandlerDispatch, Resource};
use crate::session::{Storage, StorageProvider};
use crate::types::{MlangoError, Result};

/// Longest accepted input line.
const MAX_INPUT_BYTES: usize = 256;

/// One request in flight.
pub struct RequestSession {
    pub config: EngineConfig,
    pub input: String,
    /// Whether the menu session stays open after this request; transports
    /// frame their response with it.
    pub continue_session: bool,
    engine: Option<Engine>,
    storage: Option<Storage>,
}

impl RequestSession {
    pub fn new(config: EngineConfig, input: impl Into<String>) -> Self {
        Self {
            config,
            input: input.into(),
            continue_session: false,
            engine: None,
            storage: None,
        }
    }
}

pub struct Pipeline {
    provider: Arc<dyn StorageProvider>,
    resource: Arc<Resource>,
    handlers: Arc<dyn HandlerDispatch>,
}

impl Pipeline {
    pub fn new(
        provider: Arc<dyn StorageProvider>,
        resource: Arc<Resource>,
        handlers: Arc<dyn HandlerDispatch>,
    ) -> Self {
        Self {
            provider,
            resource,
            handlers,
        }
    }

    /// Execute the request's input against its session.
    pub async fn process(&self, rqs: &mut RequestSession) -> Result<()> {
        if rqs.config.session_id.is_empty() {
            return Err(MlangoError::SessionMissing);
        }
        check_input(&rqs.input)?;

        let storage = self.provider.get(&rqs.config.session_id).await?;
        let mut engine = Engine::new(
            rqs.config.clone(),
            Arc::clone(&self.resource),
            Arc::clone(&self.handlers),
            storage.persister.clone(),
        );
        rqs.storage = Some(storage);

        match engine.exec(&rqs.input).await {
            Ok(continues) => {
                rqs.continue_session = continues;
                rqs.engine = Some(engine);
                Ok(())
            }
            Err(e) => {
                // Hand storage back before surfacing the failure.
                if let Some(storage) = rqs.storage.take() {
                    let _ = self.provider.put(&rqs.config.session_id, storage).await;
                }
                Err(e)
            }
        }
    }

    /// Flush the rendered output to the transport's writer. Bounded by the
    /// configured output size.
    pub fn output(&self, rqs: &mut RequestSession, writer: &mut dyn Write) -> Result<usize> {
        let engine = rqs
            .engine
            .as_mut()
            .ok_or_else(|| MlangoError::EngineType("output before process".into()))?;
        engine.flush(writer)
    }

    /// Persist engine state and release storage.
    ///
    /// State persistence happens here, before the provider put; the put
    /// itself is best-effort because the user already has their output.
    pub async fn reset(&self, rqs: &mut RequestSession) -> Result<()> {
        if let Some(mut engine) = rqs.engine.take() {
            if let Err(e) = engine.finish().await {
                error!(session = %rqs.config.session_id, error = %e, "state persist failed");
                if let Some(storage) = rqs.storage.take() {
                    let _ = self.provider.put(&rqs.config.session_id, storage).await;
                }
                return Err(e);
            }
        }
        if let Some(storage) = rqs.storage.take() {
            if let Err(e) = self.provider.put(&rqs.config.session_id, storage).await {
                warn!(session = %rqs.config.session_id, error = %e, "storage release failed");
            }
        }
        Ok(())
    }

    /// Convenience: run the full triad and return (output, continues).
    pub async fn run(&self, config: EngineConfig, input: &str) -> Result<(String, bool)> {
        let mut rqs = RequestSession::new(config, input);
        self.process(&mut rqs).await?;
        let mut buf = Vec::new();
        self.output(&mut rqs, &mut buf)?;
        self.reset(&mut rqs).await?;
        Ok((String::from_utf8_lossy(&buf).into_owned(), rqs.continue_session))
    }
}

/// Shape-level input validation, before the engine sees it.
fn check_input(input: &str) -> Result<()> {
    if input.len() > MAX_INPUT_BYTES {
        return Err(MlangoError::InvalidInput(format!(
            "input exceeds {MAX_INPUT_BYTES} bytes"
        )));
    }
    if input.chars().any(|c| c.is_control() && c != '\n' && c != '\r') {
        return Err(MlangoError::InvalidInput("control characters in input".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_input() {
        assert!(check_input("1234").is_ok());
        assert!(check_input("").is_ok());
        assert!(check_input("milo\n").is_ok());
        assert!(check_input("\x00").is_err());
        assert!(check_input(&"9".repeat(300)).is_err());
    }
}
