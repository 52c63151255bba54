//! HTTP transports.
//!
//! One listener serves both HTTP shapes:
//!
//! - generic: `POST /` with the session id in the `X-Vise-Session` header
//!   and the raw body as input; the response body is the engine output
//! - Africa's Talking: form posts on the configured endpoint path
//!
//! plus a `GET /health` probe.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::app::App;
use crate::transport::at;
use crate::types::{MlangoError, Result};

/// Session id header of the generic HTTP interface.
pub const SESSION_HEADER: &str = "X-Vise-Session";

#[derive(Serialize)]
struct HealthResponse {
    healthy: bool,
    version: &'static str,
    uptime: u64,
}

/// Run the HTTP listener until interrupted, then close the stores.
pub async fn serve(app: Arc<App>) -> Result<()> {
    let addr = format!("{}:{}", app.args.host, app.args.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, at_endpoint = %app.args.at_endpoint, "http transport listening");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(error = %e, "accept failed");
                        continue;
                    }
                };
                let app = Arc::clone(&app);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let service =
                        service_fn(move |req| handle(Arc::clone(&app), req));
                    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                        debug!(%peer, error = %e, "connection error");
                    }
                });
            }
        }
    }
    app.close().await
}

async fn handle(
    app: Arc<App>,
    request: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = match (method, path.as_str()) {
        (Method::GET, "/health") => health(&app),
        (Method::POST, p) if p == app.args.at_endpoint => at_leg(&app, request).await,
        (Method::POST, "/") => generic(&app, request).await,
        _ => Ok(plain(StatusCode::NOT_FOUND, "not found")),
    };

    Ok(response.unwrap_or_else(|e| {
        let status =
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %e, "request failed");
        } else {
            debug!(error = %e, "request rejected");
        }
        plain(status, &e.to_string())
    }))
}

/// Generic interface: session header plus raw body input.
async fn generic(app: &App, request: Request<Incoming>) -> Result<Response<Full<Bytes>>> {
    let session_id = request
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or(MlangoError::SessionMissing)?;
    if session_id.is_empty() {
        return Err(MlangoError::SessionMissing);
    }

    let body = read_body(request).await?;
    let input = String::from_utf8(body)
        .map_err(|_| MlangoError::InvalidInput("input is not valid utf-8".into()))?;

    let config = app.args.engine_config(&session_id);
    let (output, _continues) = app.pipeline.run(config, &input).await?;
    Ok(plain(StatusCode::OK, &output))
}

/// Africa's Talking interface: form body, CON/END framing.
async fn at_leg(app: &App, request: Request<Incoming>) -> Result<Response<Full<Bytes>>> {
    let body = read_body(request).await?;
    let output = at::handle(app, &body).await?;
    Ok(plain(StatusCode::OK, &output))
}

fn health(app: &App) -> Result<Response<Full<Bytes>>> {
    let health = HealthResponse {
        healthy: true,
        version: crate::VERSION,
        uptime: app.started_at.elapsed().as_secs(),
    };
    let body = serde_json::to_string(&health).unwrap_or_else(|_| "{}".to_string());
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap())
}

async fn read_body(request: Request<Incoming>) -> Result<Vec<u8>> {
    let collected = request
        .into_body()
        .collect()
        .await
        .map_err(|e| MlangoError::InvalidRequest(format!("body read failed: {e}")))?;
    Ok(collected.to_bytes().to_vec())
}

fn plain(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
