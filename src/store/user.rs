//! Typed user-data access.
//!
//! A thin handle over the USER store that composes keys through the codec
//! and knows the few multi-key writes that must stay together: the public
//! key with its reverse mapping, the active-voucher quartet, and the PIN
//! attempt counter.

use std::sync::Arc;

use crate::types::Result;

use super::{pack_key, DataTyp, Db};

/// The active voucher is always written and cleared as a group of four.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveVoucher {
    pub symbol: String,
    pub balance: String,
    pub decimals: String,
    pub address: String,
}

#[derive(Clone)]
pub struct UserStore {
    db: Arc<dyn Db>,
}

impl UserStore {
    pub fn new(db: Arc<dyn Db>) -> Self {
        Self { db }
    }

    pub async fn get(&self, session_id: &str, typ: DataTyp) -> Result<Option<Vec<u8>>> {
        self.db.get(&pack_key(typ, session_id.as_bytes())).await
    }

    pub async fn get_str(&self, session_id: &str, typ: DataTyp) -> Result<Option<String>> {
        Ok(self
            .get(session_id, typ)
            .await?
            .map(|v| String::from_utf8_lossy(&v).into_owned()))
    }

    pub async fn set(&self, session_id: &str, typ: DataTyp, value: &[u8]) -> Result<()> {
        self.db.put(&pack_key(typ, session_id.as_bytes()), value).await
    }

    pub async fn remove(&self, session_id: &str, typ: DataTyp) -> Result<()> {
        self.db.remove(&pack_key(typ, session_id.as_bytes())).await
    }

    /// Store the account public key together with its reverse entry, so
    /// "who owns address X" resolves without scanning.
    pub async fn set_public_key(&self, session_id: &str, public_key: &str) -> Result<()> {
        self.set(session_id, DataTyp::PublicKey, public_key.as_bytes()).await?;
        self.db
            .put(
                &pack_key(DataTyp::PublicKeyReverse, public_key.as_bytes()),
                session_id.as_bytes(),
            )
            .await
    }

    /// Owning session of a public key, via the reverse mapping.
    pub async fn session_for_public_key(&self, public_key: &str) -> Result<Option<String>> {
        Ok(self
            .db
            .get(&pack_key(DataTyp::PublicKeyReverse, public_key.as_bytes()))
            .await?
            .map(|v| String::from_utf8_lossy(&v).into_owned()))
    }

    pub async fn set_active_voucher(&self, session_id: &str, voucher: &ActiveVoucher) -> Result<()> {
        self.set(session_id, DataTyp::ActiveSym, voucher.symbol.as_bytes()).await?;
        self.set(session_id, DataTyp::ActiveBal, voucher.balance.as_bytes()).await?;
        self.set(session_id, DataTyp::ActiveDecimal, voucher.decimals.as_bytes()).await?;
        self.set(session_id, DataTyp::ActiveAddress, voucher.address.as_bytes()).await
    }

    pub async fn clear_active_voucher(&self, session_id: &str) -> Result<()> {
        self.remove(session_id, DataTyp::ActiveSym).await?;
        self.remove(session_id, DataTyp::ActiveBal).await?;
        self.remove(session_id, DataTyp::ActiveDecimal).await?;
        self.remove(session_id, DataTyp::ActiveAddress).await
    }

    /// The quartet, or None when any member is missing.
    pub async fn active_voucher(&self, session_id: &str) -> Result<Option<ActiveVoucher>> {
        let symbol = self.get_str(session_id, DataTyp::ActiveSym).await?;
        let balance = self.get_str(session_id, DataTyp::ActiveBal).await?;
        let decimals = self.get_str(session_id, DataTyp::ActiveDecimal).await?;
        let address = self.get_str(session_id, DataTyp::ActiveAddress).await?;
        Ok(match (symbol, balance, decimals, address) {
            (Some(symbol), Some(balance), Some(decimals), Some(address)) => Some(ActiveVoucher {
                symbol,
                balance,
                decimals,
                address,
            }),
            _ => None,
        })
    }

    pub async fn pin_attempts(&self, session_id: &str) -> Result<u8> {
        Ok(self
            .get(session_id, DataTyp::PinAttempts)
            .await?
            .and_then(|v| v.first().copied())
            .unwrap_or(0))
    }

    pub async fn set_pin_attempts(&self, session_id: &str, attempts: u8) -> Result<()> {
        self.set(session_id, DataTyp::PinAttempts, &[attempts]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mem::MemDb;

    fn store() -> UserStore {
        UserStore::new(Arc::new(MemDb::new()))
    }

    #[tokio::test]
    async fn test_field_round_trip() {
        let users = store();
        users.set("+254712345678", DataTyp::FirstName, b"Amina").await.unwrap();
        assert_eq!(
            users.get("+254712345678", DataTyp::FirstName).await.unwrap(),
            Some(b"Amina".to_vec())
        );
        assert_eq!(users.get("+254700000000", DataTyp::FirstName).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_public_key_reverse_round_trip() {
        let users = store();
        let key = "0x1bc49a2dd23a6b32c44c6d18d50cbd10bf922a26";
        users.set_public_key("+254712345678", key).await.unwrap();
        assert_eq!(
            users.session_for_public_key(key).await.unwrap(),
            Some("+254712345678".to_string())
        );
    }

    #[tokio::test]
    async fn test_active_voucher_quartet() {
        let users = store();
        assert_eq!(users.active_voucher("s1").await.unwrap(), None);

        let voucher = ActiveVoucher {
            symbol: "MILO".into(),
            balance: "200".into(),
            decimals: "4".into(),
            address: "0x41c188d63Qa".into(),
        };
        users.set_active_voucher("s1", &voucher).await.unwrap();
        assert_eq!(users.active_voucher("s1").await.unwrap(), Some(voucher));

        users.clear_active_voucher("s1").await.unwrap();
        assert_eq!(users.active_voucher("s1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pin_attempts_default_zero() {
        let users = store();
        assert_eq!(users.pin_attempts("s1").await.unwrap(), 0);
        users.set_pin_attempts("s1", 2).await.unwrap();
        assert_eq!(users.pin_attempts("s1").await.unwrap(), 2);
    }
}
