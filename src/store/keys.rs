//! Storage key codec.
//!
//! Every user-data value is addressed by a 16-bit data-type tag packed in
//! front of the session id: `BE16(typ) || session-bytes`. The tag set is
//! closed; `Extended` reserves a namespace for ad-hoc sub-prefixed keyspaces
//! (SSH authorized keys, put timestamps).

/// User-data field identifiers.
///
/// The numeric values are part of the persisted layout; never reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum DataTyp {
    Account = 1,
    AccountCreated = 2,
    TrackingId = 3,
    PublicKey = 4,
    CustodialId = 5,
    AccountPin = 6,
    AccountStatus = 7,
    FirstName = 8,
    FamilyName = 9,
    Yob = 10,
    Location = 11,
    Gender = 12,
    Offerings = 13,
    Recipient = 14,
    Amount = 15,
    TemporaryValue = 16,
    VoucherList = 17,
    ActiveSym = 18,
    ActiveBal = 19,
    ActiveDecimal = 20,
    ActiveAddress = 21,
    BlockedNumber = 22,
    PublicKeyReverse = 23,
    Transactions = 24,
    PinAttempts = 25,
    VoucherBalances = 26,
    VoucherDecimals = 27,
    VoucherAddresses = 28,
    /// Namespace for sub-prefixed keyspaces; never used for a field directly.
    Extended = 0xFFFF,
}

/// Pack a data-type tag and session bytes into a storage key.
pub fn pack_key(typ: DataTyp, data: &[u8]) -> Vec<u8> {
    let tag = (typ as u16).to_be_bytes();
    let mut key = Vec::with_capacity(2 + data.len());
    key.extend_from_slice(&tag);
    key.extend_from_slice(data);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_key_layout() {
        let key = pack_key(DataTyp::PublicKey, b"+254712345678");
        assert_eq!(&key[..2], &4u16.to_be_bytes());
        assert_eq!(&key[2..], b"+254712345678");
    }

    #[test]
    fn test_pack_key_distinct_types() {
        let a = pack_key(DataTyp::AccountPin, b"s1");
        let b = pack_key(DataTyp::AccountStatus, b"s1");
        assert_ne!(a, b);
    }

    #[test]
    fn test_extended_tag_is_reserved_high() {
        let key = pack_key(DataTyp::Extended, b"");
        assert_eq!(key, vec![0xFF, 0xFF]);
    }
}
