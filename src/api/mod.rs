//! Client for the custodial signing service and the chain data indexer.
//!
//! Both services answer with one envelope shape:
//!
//! ```json
//! { "ok": true,  "description": "...", "result": { ... } }
//! { "ok": false, "description": "...", "errorCode": "..." }
//! ```
//!
//! `result` is decoded into the request-specific value type. Failures are
//! reported, never retried; the calling handler decides whether the user
//! sees a flag or a zero-display fallback.

pub mod models;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::types::{MlangoError, Result};

pub use models::{
    AccountResult, BalanceResult, TrackStatusResult, TransferBatch, TransferEntry,
    TransferRequest, TransferResult, VoucherData, VoucherHolding, VoucherHoldings,
};

/// API-key header shared by both services.
const API_KEY_HEADER: &str = "X-GE-KEY";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub custodial_base: String,
    pub data_base: String,
    pub custodial_api_key: String,
    pub data_api_key: String,
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(custodial_base: &str, data_base: &str) -> Self {
        Self {
            custodial_base: custodial_base.trim_end_matches('/').to_string(),
            data_base: data_base.trim_end_matches('/').to_string(),
            custodial_api_key: String::new(),
            data_api_key: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    description: String,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default, rename = "errorCode")]
    error_code: Option<String>,
}

enum Service {
    Custodial,
    Data,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MlangoError::Config(format!("http client: {e}")))?;
        Ok(Self { http, config })
    }

    /// Register a new custodial account.
    pub async fn create_account(&self) -> Result<AccountResult> {
        let url = format!("{}/account", self.config.custodial_base);
        self.do_request(Method::POST, &url, Service::Custodial, None).await
    }

    /// Current balance and nonce for a public key.
    pub async fn balance(&self, public_key: &str) -> Result<BalanceResult> {
        let url = format!("{}/balance/{public_key}", self.config.custodial_base);
        self.do_request(Method::GET, &url, Service::Custodial, None).await
    }

    /// Whether the tracked account activation has landed on chain.
    pub async fn track_status(&self, public_key: &str) -> Result<TrackStatusResult> {
        let url = format!("{}/track/{public_key}", self.config.custodial_base);
        self.do_request(Method::GET, &url, Service::Custodial, None).await
    }

    /// Submit a token transfer for custodial signing.
    pub async fn transfer(&self, request: &TransferRequest) -> Result<TransferResult> {
        let url = format!("{}/transfer", self.config.custodial_base);
        let body = serde_json::to_value(request)
            .map_err(|e| MlangoError::External {
                message: format!("encode transfer: {e}"),
                error_code: None,
            })?;
        self.do_request(Method::POST, &url, Service::Custodial, Some(body)).await
    }

    /// Token holdings of a public key.
    pub async fn vouchers(&self, public_key: &str) -> Result<Vec<VoucherHolding>> {
        let url = format!("{}/vouchers/{public_key}", self.config.data_base);
        let result: VoucherHoldings =
            self.do_request(Method::GET, &url, Service::Data, None).await?;
        Ok(result.holdings)
    }

    /// Last ten transfers touching a public key.
    pub async fn transfers(&self, public_key: &str) -> Result<Vec<TransferEntry>> {
        let url = format!("{}/transfers/{public_key}", self.config.data_base);
        let result: TransferBatch = self.do_request(Method::GET, &url, Service::Data, None).await?;
        Ok(result.transfers)
    }

    /// Voucher metadata by contract address.
    pub async fn voucher_data(&self, address: &str) -> Result<VoucherData> {
        let url = format!("{}/voucher/{address}", self.config.data_base);
        self.do_request(Method::GET, &url, Service::Data, None).await
    }

    async fn do_request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        service: Service,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let api_key = match service {
            Service::Custodial => &self.config.custodial_api_key,
            Service::Data => &self.config.data_api_key,
        };

        let mut request = self
            .http
            .request(method, url)
            .header("Content-Type", "application/json")
            .header(API_KEY_HEADER, api_key);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| MlangoError::External {
            message: format!("request to {url} failed: {e}"),
            error_code: None,
        })?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| MlangoError::External {
            message: format!("read response from {url}: {e}"),
            error_code: None,
        })?;

        let envelope: Envelope =
            serde_json::from_slice(&bytes).map_err(|e| MlangoError::External {
                message: format!("malformed envelope from {url}: {e}"),
                error_code: None,
            })?;

        if status >= StatusCode::BAD_REQUEST || !envelope.ok {
            debug!(%url, code = ?envelope.error_code, "api error envelope");
            return Err(MlangoError::External {
                message: envelope.description,
                error_code: envelope.error_code,
            });
        }

        let result = match envelope.result {
            Some(v) if !v.is_null() => v,
            _ => {
                return Err(MlangoError::External {
                    message: "empty api result".into(),
                    error_code: None,
                })
            }
        };
        serde_json::from_value(result).map_err(|e| MlangoError::External {
            message: format!("unexpected result shape from {url}: {e}"),
            error_code: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_envelope_decodes() {
        let raw = r#"{"ok":true,"description":"created","result":{"custodialId":42,"publicKey":"0xabc","trackingId":"t-1"}}"#;
        let env: Envelope = serde_json::from_str(raw).unwrap();
        assert!(env.ok);
        let result: AccountResult = serde_json::from_value(env.result.unwrap()).unwrap();
        assert_eq!(result.public_key, "0xabc");
        assert_eq!(result.tracking_id, "t-1");
    }

    #[test]
    fn test_error_envelope_decodes() {
        let raw = r#"{"ok":false,"description":"no such account","errorCode":"E04"}"#;
        let env: Envelope = serde_json::from_str(raw).unwrap();
        assert!(!env.ok);
        assert_eq!(env.error_code.as_deref(), Some("E04"));
        assert_eq!(env.description, "no such account");
    }

    #[test]
    fn test_holdings_decode() {
        let raw = r#"{"holdings":[{"contractAddress":"0x41c188d63Qa","tokenSymbol":"MILO","tokenDecimals":"4","balance":"200"}]}"#;
        let holdings: VoucherHoldings = serde_json::from_str(raw).unwrap();
        assert_eq!(holdings.holdings.len(), 1);
        assert_eq!(holdings.holdings[0].token_symbol, "MILO");
    }
}
