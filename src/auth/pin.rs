//! PIN hashing and verification.
//!
//! PINs are four digits, bcrypt-hashed before storage. The cost is fixed
//! low so a verify fits inside a USSD gateway's round-trip budget.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{MlangoError, Result};

/// Failures tolerated before the account is blocked.
pub const ALLOWED_PIN_ATTEMPTS: u8 = 3;

const BCRYPT_COST: u32 = 8;

static PIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}$").unwrap());

/// Whether the input is a well-formed four-digit PIN.
pub fn is_valid_pin(pin: &str) -> bool {
    PIN_PATTERN.is_match(pin)
}

/// Hash a PIN for storage.
pub fn hash_pin(pin: &str) -> Result<String> {
    bcrypt::hash(pin, BCRYPT_COST)
        .map_err(|e| MlangoError::Validation(format!("failed to hash PIN: {e}")))
}

/// Verify a PIN against a stored hash.
///
/// Returns false on any decode error; a corrupt hash never authenticates.
pub fn verify_pin(hash: &str, pin: &str) -> bool {
    bcrypt::verify(pin, hash).unwrap_or(false)
}
