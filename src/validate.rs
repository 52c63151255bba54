//! Recipient and amount validation.
//!
//! Recipients come in three forms: a Kenyan phone number, an EVM-style
//! address, or an alphanumeric alias. Amounts are decimal strings scaled
//! by the active voucher's decimals into integer token units.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{MlangoError, Result};

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\+254|254|0)?((7\d{8})|(1[01]\d{7}))$").unwrap());
static ADDRESS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").unwrap());
static ALIAS_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+$").unwrap());

/// Accepted recipient forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientKind {
    Phone,
    Address,
    Alias,
}

pub fn is_valid_phone_number(s: &str) -> bool {
    PHONE_PATTERN.is_match(s)
}

pub fn is_valid_address(s: &str) -> bool {
    ADDRESS_PATTERN.is_match(s)
}

pub fn is_valid_alias(s: &str) -> bool {
    ALIAS_PATTERN.is_match(s)
}

/// Classify a recipient string. Phone wins over alias for all-digit
/// inputs; anything matching none of the three forms is rejected.
pub fn recipient_kind(s: &str) -> Option<RecipientKind> {
    if is_valid_phone_number(s) {
        Some(RecipientKind::Phone)
    } else if is_valid_address(s) {
        Some(RecipientKind::Address)
    } else if is_valid_alias(s) {
        Some(RecipientKind::Alias)
    } else {
        None
    }
}

/// Canonicalize a valid Kenyan phone number to `+2547XXXXXXXX` /
/// `+2541XXXXXXXX`.
pub fn format_phone_number(s: &str) -> Result<String> {
    let captures = PHONE_PATTERN
        .captures(s)
        .ok_or_else(|| MlangoError::Validation(format!("not a Kenyan phone number: {s}")))?;
    Ok(format!("+254{}", &captures[1]))
}

/// Parse a decimal amount and scale it into integer token units:
/// `⌊amount · 10^decimals⌋` rendered as a decimal string.
pub fn parse_and_scale_amount(amount: &str, decimals: u32) -> Result<String> {
    let amount = amount.trim();
    let (int_part, frac_part) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(MlangoError::Validation("empty amount".into()));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(MlangoError::Validation(format!("not a decimal amount: {amount}")));
    }

    let int_value: u128 = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse()
            .map_err(|_| MlangoError::Validation(format!("amount too large: {amount}")))?
    };

    // Truncate the fraction at the token's precision; extra digits floor away.
    let mut frac = frac_part.to_string();
    frac.truncate(decimals as usize);
    while (frac.len() as u32) < decimals {
        frac.push('0');
    }
    let frac_value: u128 = if frac.is_empty() { 0 } else { frac.parse().unwrap_or(0) };

    let scale = 10u128
        .checked_pow(decimals)
        .ok_or_else(|| MlangoError::Validation(format!("unsupported decimals: {decimals}")))?;
    let scaled = int_value
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(|| MlangoError::Validation(format!("amount too large: {amount}")))?;

    Ok(scaled.to_string())
}

/// Render integer token units back into a human decimal string.
pub fn descale_amount(scaled: &str, decimals: u32) -> String {
    let digits = scaled.trim_start_matches('0');
    let digits = if digits.is_empty() { "0" } else { digits };
    if decimals == 0 {
        return digits.to_string();
    }
    let d = decimals as usize;
    if digits.len() <= d {
        let frac = format!("{digits:0>width$}", width = d);
        format!("0.{}", frac.trim_end_matches('0')).trim_end_matches('.').to_string()
    } else {
        let (int_part, frac_part) = digits.split_at(digits.len() - d);
        let frac = frac_part.trim_end_matches('0');
        if frac.is_empty() {
            int_part.to_string()
        } else {
            format!("{int_part}.{frac}")
        }
    }
}
