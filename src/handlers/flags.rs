//! Application flag identifiers.
//!
//! The menu script branches on these; handlers raise and lower them.
//! Ids below [`crate::engine::APP_FLAG_BASE`] are reserved by the engine.

pub const FLAG_ACCOUNT_CREATED: u32 = 8;
pub const FLAG_ACCOUNT_CREATION_FAILED: u32 = 9;
pub const FLAG_ACCOUNT_SUCCESS: u32 = 10;
pub const FLAG_ACCOUNT_PENDING: u32 = 11;
pub const FLAG_INCORRECT_PIN: u32 = 12;
pub const FLAG_VALID_PIN: u32 = 13;
pub const FLAG_PIN_MISMATCH: u32 = 14;
pub const FLAG_INVALID_RECIPIENT: u32 = 15;
pub const FLAG_INVALID_AMOUNT: u32 = 16;
pub const FLAG_INCORRECT_DATE_FORMAT: u32 = 17;
pub const FLAG_ACCOUNT_UNLOCKED: u32 = 18;
pub const FLAG_UNLOCK_FOR_UPDATE: u32 = 19;
pub const FLAG_LANGUAGE_SET: u32 = 20;
pub const FLAG_ACCOUNT_BLOCKED: u32 = 21;
pub const FLAG_INVALID_VOUCHER: u32 = 22;
pub const FLAG_TRANSACTION_FAILED: u32 = 23;
pub const FLAG_UNAUTHORIZED: u32 = 24;
