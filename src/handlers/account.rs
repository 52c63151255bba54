//! Account lifecycle and PIN authorization handlers.

use tracing::{debug, warn};

use crate::auth::{hash_pin, is_valid_pin, verify_pin, ALLOWED_PIN_ATTEMPTS};
use crate::engine::{HandlerContext, HandlerResult};
use crate::store::DataTyp;
use crate::types::Result;

use super::flags::*;
use super::MenuHandlers;

const STATUS_PENDING: &str = "PENDING";
const STATUS_SUCCESS: &str = "SUCCESS";

impl MenuHandlers {
    /// Register a custodial account and record its material. Idempotent
    /// per session: a created account is never re-registered.
    pub(crate) async fn create_account(&self, ctx: &HandlerContext) -> Result<HandlerResult> {
        if ctx.flags.get(FLAG_ACCOUNT_CREATED) {
            return Ok(HandlerResult::default());
        }
        let session = &ctx.session_id;
        match self.api.create_account().await {
            Ok(account) => {
                self.user.set_public_key(session, &account.public_key).await?;
                self.user
                    .set(
                        session,
                        DataTyp::CustodialId,
                        account.custodial_id.to_string().as_bytes(),
                    )
                    .await?;
                self.user
                    .set(session, DataTyp::TrackingId, account.tracking_id.as_bytes())
                    .await?;
                self.user
                    .set(session, DataTyp::AccountStatus, STATUS_PENDING.as_bytes())
                    .await?;
                self.user.set(session, DataTyp::AccountCreated, b"1").await?;
                debug!(%session, "custodial account registered");
                Ok(HandlerResult::default()
                    .set(FLAG_ACCOUNT_CREATED)
                    .set(FLAG_ACCOUNT_PENDING)
                    .reset(FLAG_ACCOUNT_CREATION_FAILED))
            }
            Err(e) => {
                warn!(%session, error = %e, "account creation failed");
                Ok(HandlerResult::default().set(FLAG_ACCOUNT_CREATION_FAILED))
            }
        }
    }

    /// Validate the PIN format and park its hash for confirmation.
    pub(crate) async fn save_temporary_pin(
        &self,
        ctx: &HandlerContext,
        input: &str,
    ) -> Result<HandlerResult> {
        if !is_valid_pin(input) {
            return Ok(HandlerResult::content(input).set(FLAG_INCORRECT_PIN));
        }
        let hash = hash_pin(input)?;
        self.user
            .set(&ctx.session_id, DataTyp::TemporaryValue, hash.as_bytes())
            .await?;
        Ok(HandlerResult::default().reset(FLAG_INCORRECT_PIN))
    }

    /// Compare the confirmation entry against the parked hash; a match
    /// promotes it to the account PIN.
    pub(crate) async fn verify_create_pin(
        &self,
        ctx: &HandlerContext,
        input: &str,
    ) -> Result<HandlerResult> {
        let session = &ctx.session_id;
        let parked = self
            .user
            .get_str(session, DataTyp::TemporaryValue)
            .await?
            .unwrap_or_default();
        if !verify_pin(&parked, input) {
            return Ok(HandlerResult::default().set(FLAG_PIN_MISMATCH));
        }
        self.user
            .set(session, DataTyp::AccountPin, parked.as_bytes())
            .await?;
        self.user.remove(session, DataTyp::TemporaryValue).await?;
        Ok(HandlerResult::default()
            .set(FLAG_VALID_PIN)
            .reset(FLAG_PIN_MISMATCH))
    }

    /// Verify the account PIN, counting failures. The third consecutive
    /// failure blocks the account until an admin resets it.
    pub(crate) async fn authorize_account(
        &self,
        ctx: &HandlerContext,
        input: &str,
    ) -> Result<HandlerResult> {
        let session = &ctx.session_id;
        let attempts = self.user.pin_attempts(session).await?;
        if attempts >= ALLOWED_PIN_ATTEMPTS {
            return Ok(HandlerResult::default()
                .set(FLAG_ACCOUNT_BLOCKED)
                .reset(FLAG_ACCOUNT_UNLOCKED));
        }

        let stored = self
            .user
            .get_str(session, DataTyp::AccountPin)
            .await?
            .unwrap_or_default();
        if verify_pin(&stored, input) {
            self.user.set_pin_attempts(session, 0).await?;
            return Ok(HandlerResult::default()
                .set(FLAG_ACCOUNT_UNLOCKED)
                .reset(FLAG_INCORRECT_PIN)
                .reset(FLAG_ACCOUNT_BLOCKED));
        }

        let attempts = attempts + 1;
        self.user.set_pin_attempts(session, attempts).await?;
        if attempts >= ALLOWED_PIN_ATTEMPTS {
            self.user
                .set(session, DataTyp::BlockedNumber, session.as_bytes())
                .await?;
            warn!(%session, "account blocked after repeated PIN failures");
            return Ok(HandlerResult::default()
                .set(FLAG_ACCOUNT_BLOCKED)
                .set(FLAG_INCORRECT_PIN)
                .reset(FLAG_ACCOUNT_UNLOCKED));
        }
        Ok(HandlerResult::default()
            .set(FLAG_INCORRECT_PIN)
            .reset(FLAG_ACCOUNT_UNLOCKED))
    }

    /// Poll the custodial tracker for account activation.
    pub(crate) async fn check_account_status(&self, ctx: &HandlerContext) -> Result<HandlerResult> {
        let session = &ctx.session_id;
        let Some(public_key) = self.user.get_str(session, DataTyp::PublicKey).await? else {
            return Ok(HandlerResult::default());
        };
        match self.api.track_status(&public_key).await {
            Ok(status) if status.active => {
                self.user
                    .set(session, DataTyp::AccountStatus, STATUS_SUCCESS.as_bytes())
                    .await?;
                Ok(HandlerResult::default()
                    .set(FLAG_ACCOUNT_SUCCESS)
                    .reset(FLAG_ACCOUNT_PENDING))
            }
            Ok(_) => Ok(HandlerResult::default().set(FLAG_ACCOUNT_PENDING)),
            Err(e) => {
                debug!(%session, error = %e, "status poll failed");
                Ok(HandlerResult::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{ctx, handlers};
    use super::*;
    use crate::engine::HandlerDispatch;

    #[tokio::test]
    async fn test_temporary_pin_rejects_bad_format() {
        let h = handlers();
        let result = h.save_temporary_pin(&ctx("s1"), "12").await.unwrap();
        assert!(result.flag_set.contains(&FLAG_INCORRECT_PIN));
        assert_eq!(
            h.user.get("s1", DataTyp::TemporaryValue).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_pin_confirmation_promotes_hash() {
        let h = handlers();
        h.save_temporary_pin(&ctx("s1"), "1234").await.unwrap();
        let result = h.verify_create_pin(&ctx("s1"), "1234").await.unwrap();
        assert!(result.flag_set.contains(&FLAG_VALID_PIN));

        let stored = h.user.get_str("s1", DataTyp::AccountPin).await.unwrap().unwrap();
        assert!(verify_pin(&stored, "1234"));
        assert_eq!(h.user.get("s1", DataTyp::TemporaryValue).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pin_mismatch_leaves_account_pin_unset() {
        let h = handlers();
        h.save_temporary_pin(&ctx("s1"), "1234").await.unwrap();
        let result = h.verify_create_pin(&ctx("s1"), "5678").await.unwrap();
        assert!(result.flag_set.contains(&FLAG_PIN_MISMATCH));
        assert_eq!(h.user.get("s1", DataTyp::AccountPin).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_three_failures_block_then_admin_reset_clears() {
        let h = handlers();
        h.save_temporary_pin(&ctx("s1"), "1234").await.unwrap();
        h.verify_create_pin(&ctx("s1"), "1234").await.unwrap();

        for _ in 0..2 {
            let result = h.authorize_account(&ctx("s1"), "0000").await.unwrap();
            assert!(result.flag_set.contains(&FLAG_INCORRECT_PIN));
            assert!(!result.flag_set.contains(&FLAG_ACCOUNT_BLOCKED));
        }
        let result = h.authorize_account(&ctx("s1"), "0000").await.unwrap();
        assert!(result.flag_set.contains(&FLAG_ACCOUNT_BLOCKED));

        // Even the correct PIN is refused while blocked.
        let result = h.authorize_account(&ctx("s1"), "1234").await.unwrap();
        assert!(result.flag_set.contains(&FLAG_ACCOUNT_BLOCKED));

        // Admin reset zeroes the counter; the correct PIN unlocks again.
        h.admin.insert("admin");
        h.dispatch("reset_account_blocked", &ctx("admin"), "s1")
            .await
            .unwrap();
        assert_eq!(h.user.pin_attempts("s1").await.unwrap(), 0);
        let result = h.authorize_account(&ctx("s1"), "1234").await.unwrap();
        assert!(result.flag_set.contains(&FLAG_ACCOUNT_UNLOCKED));
        assert!(result.flag_reset.contains(&FLAG_INCORRECT_PIN));
    }

    #[tokio::test]
    async fn test_success_resets_attempt_counter() {
        let h = handlers();
        h.save_temporary_pin(&ctx("s1"), "1234").await.unwrap();
        h.verify_create_pin(&ctx("s1"), "1234").await.unwrap();

        h.authorize_account(&ctx("s1"), "1111").await.unwrap();
        assert_eq!(h.user.pin_attempts("s1").await.unwrap(), 1);
        h.authorize_account(&ctx("s1"), "1234").await.unwrap();
        assert_eq!(h.user.pin_attempts("s1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_account_failure_raises_flag_only() {
        let h = handlers(); // unreachable API
        let result = h.create_account(&ctx("s1")).await.unwrap();
        assert!(result.flag_set.contains(&FLAG_ACCOUNT_CREATION_FAILED));
        assert_eq!(h.user.get("s1", DataTyp::PublicKey).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_status_poll_failure_is_silent() {
        let h = handlers();
        h.user.set_public_key("s1", "0xabc").await.unwrap();
        let result = h.check_account_status(&ctx("s1")).await.unwrap();
        assert!(result.flag_set.is_empty());
        assert!(result.flag_reset.is_empty());
    }
}
