//! Typed payloads of the custodial and data services.

use serde::{Deserialize, Serialize};

/// `POST {custodial}/account`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResult {
    pub custodial_id: serde_json::Number,
    pub public_key: String,
    pub tracking_id: String,
}

/// `GET {custodial}/balance/{pubkey}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResult {
    pub balance: String,
    #[serde(default = "default_nonce")]
    pub nonce: serde_json::Number,
}

fn default_nonce() -> serde_json::Number {
    serde_json::Number::from(0)
}

/// `GET {custodial}/track/{pubkey}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStatusResult {
    pub active: bool,
}

/// `POST {custodial}/transfer`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    pub value: String,
    pub token_address: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResult {
    pub tracking_id: String,
}

/// One element of `GET {data}/vouchers/{pubkey}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherHolding {
    pub contract_address: String,
    pub token_symbol: String,
    pub token_decimals: String,
    pub balance: String,
}

/// One element of `GET {data}/transfers/{pubkey}` (last ten).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferEntry {
    pub sender: String,
    pub recipient: String,
    pub transfer_value: String,
    pub contract_address: String,
    pub tx_hash: String,
    pub date_block: String,
    pub token_symbol: String,
    pub token_decimals: String,
}

/// `GET {data}/voucher/{address}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherData {
    pub token_name: String,
    pub token_symbol: String,
    pub token_decimals: String,
    pub sink_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoucherHoldings {
    pub holdings: Vec<VoucherHolding>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferBatch {
    pub transfers: Vec<TransferEntry>,
}
