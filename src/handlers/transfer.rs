//! Send-flow handlers: recipient, amount, transaction initiation.

use tracing::{debug, warn};

use crate::api::TransferRequest;
use crate::engine::{HandlerContext, HandlerResult};
use crate::store::DataTyp;
use crate::types::Result;
use crate::validate::{self, RecipientKind};

use super::flags::*;
use super::MenuHandlers;

const STATUS_PENDING: &str = "PENDING";

impl MenuHandlers {
    /// Validate and store the transfer recipient.
    ///
    /// Phone recipients canonicalize to `+254...` and must belong to a
    /// registered account; addresses and aliases are taken as given. The
    /// rejected input echoes back in content so the menu can display it.
    pub(crate) async fn validate_recipient(
        &self,
        ctx: &HandlerContext,
        input: &str,
    ) -> Result<HandlerResult> {
        let session = &ctx.session_id;
        let input = input.trim();
        let recipient = match validate::recipient_kind(input) {
            // Addresses transfer directly; no registration needed.
            Some(RecipientKind::Address) => input.to_string(),
            // Phones and aliases must name a registered account.
            Some(RecipientKind::Phone) | Some(RecipientKind::Alias) => {
                let id = validate::format_phone_number(input)
                    .unwrap_or_else(|_| input.to_string());
                let registered = self.user.get(&id, DataTyp::PublicKey).await?.is_some();
                if !registered {
                    return Ok(HandlerResult::content(input).set(FLAG_INVALID_RECIPIENT));
                }
                id
            }
            None => {
                return Ok(HandlerResult::content(input).set(FLAG_INVALID_RECIPIENT));
            }
        };
        self.user
            .set(session, DataTyp::Recipient, recipient.as_bytes())
            .await?;
        Ok(HandlerResult::default().reset(FLAG_INVALID_RECIPIENT))
    }

    /// Parse the amount against the active voucher's decimals and store
    /// the scaled integer string.
    pub(crate) async fn validate_amount(
        &self,
        ctx: &HandlerContext,
        input: &str,
    ) -> Result<HandlerResult> {
        let session = &ctx.session_id;
        let decimals = self.active_decimals(session).await?;
        match validate::parse_and_scale_amount(input, decimals) {
            Ok(scaled) if scaled != "0" => {
                self.user
                    .set(session, DataTyp::Amount, scaled.as_bytes())
                    .await?;
                Ok(HandlerResult::default().reset(FLAG_INVALID_AMOUNT))
            }
            _ => Ok(HandlerResult::content(input.trim()).set(FLAG_INVALID_AMOUNT)),
        }
    }

    pub(crate) async fn get_recipient(&self, ctx: &HandlerContext) -> Result<HandlerResult> {
        let recipient = self
            .user
            .get_str(&ctx.session_id, DataTyp::Recipient)
            .await?
            .unwrap_or_default();
        Ok(HandlerResult::content(recipient))
    }

    pub(crate) async fn get_amount(&self, ctx: &HandlerContext) -> Result<HandlerResult> {
        let session = &ctx.session_id;
        let scaled = self
            .user
            .get_str(session, DataTyp::Amount)
            .await?
            .unwrap_or_default();
        let decimals = self.active_decimals(session).await?;
        Ok(HandlerResult::content(validate::descale_amount(
            &scaled, decimals,
        )))
    }

    pub(crate) async fn get_sender(&self, ctx: &HandlerContext) -> Result<HandlerResult> {
        Ok(HandlerResult::content(ctx.session_id.clone()))
    }

    /// Submit the transfer for custodial signing.
    ///
    /// Runs only behind a successful PIN authorization; the unlock is
    /// consumed either way. Phone recipients resolve to the public key of
    /// the owning account at submission time.
    pub(crate) async fn initiate_transaction(&self, ctx: &HandlerContext) -> Result<HandlerResult> {
        if !ctx.flags.get(FLAG_ACCOUNT_UNLOCKED) {
            return Ok(HandlerResult::default());
        }
        let session = &ctx.session_id;

        let from = self
            .user
            .get_str(session, DataTyp::PublicKey)
            .await?
            .unwrap_or_default();
        let recipient = self
            .user
            .get_str(session, DataTyp::Recipient)
            .await?
            .unwrap_or_default();
        let to = if validate::is_valid_phone_number(&recipient) {
            self.user
                .get_str(&recipient, DataTyp::PublicKey)
                .await?
                .unwrap_or(recipient)
        } else {
            recipient
        };
        let value = self
            .user
            .get_str(session, DataTyp::Amount)
            .await?
            .unwrap_or_default();
        let token_address = self
            .user
            .get_str(session, DataTyp::ActiveAddress)
            .await?
            .unwrap_or_default();

        let request = TransferRequest {
            from,
            to,
            value,
            token_address,
        };
        match self.api.transfer(&request).await {
            Ok(result) => {
                self.user
                    .set(session, DataTyp::TrackingId, result.tracking_id.as_bytes())
                    .await?;
                self.user
                    .set(session, DataTyp::AccountStatus, STATUS_PENDING.as_bytes())
                    .await?;
                debug!(%session, tracking = %result.tracking_id, "transfer submitted");
                Ok(HandlerResult::default()
                    .set(FLAG_ACCOUNT_PENDING)
                    .reset(FLAG_ACCOUNT_UNLOCKED)
                    .reset(FLAG_TRANSACTION_FAILED))
            }
            Err(e) => {
                warn!(%session, error = %e, "transfer submission failed");
                Ok(HandlerResult::default()
                    .set(FLAG_TRANSACTION_FAILED)
                    .reset(FLAG_ACCOUNT_UNLOCKED))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{ctx, handlers};
    use super::*;
    use crate::engine::FlagSet;

    #[tokio::test]
    async fn test_invalid_recipient_echoes_input() {
        let h = handlers();
        let result = h.validate_recipient(&ctx("s1"), "000").await.unwrap();
        assert!(result.flag_set.contains(&FLAG_INVALID_RECIPIENT));
        assert_eq!(result.content, "000");
        assert_eq!(h.user.get("s1", DataTyp::Recipient).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_registered_phone_recipient_canonicalizes() {
        let h = handlers();
        h.user.set_public_key("+254712345678", "0xdef").await.unwrap();
        let result = h.validate_recipient(&ctx("s1"), "0712345678").await.unwrap();
        assert!(result.flag_set.is_empty());
        assert_eq!(
            h.user.get_str("s1", DataTyp::Recipient).await.unwrap(),
            Some("+254712345678".to_string())
        );
    }

    #[tokio::test]
    async fn test_unregistered_phone_recipient_rejected() {
        let h = handlers();
        let result = h.validate_recipient(&ctx("s1"), "0712345678").await.unwrap();
        assert!(result.flag_set.contains(&FLAG_INVALID_RECIPIENT));
    }

    #[tokio::test]
    async fn test_address_recipient_stored_verbatim() {
        let h = handlers();
        let addr = "0x1bc49a2dd23a6b32c44c6d18d50cbd10bf922a26";
        h.validate_recipient(&ctx("s1"), addr).await.unwrap();
        assert_eq!(
            h.user.get_str("s1", DataTyp::Recipient).await.unwrap(),
            Some(addr.to_string())
        );
    }

    #[tokio::test]
    async fn test_amount_scales_by_active_decimals() {
        let h = handlers();
        h.user
            .set("s1", DataTyp::ActiveDecimal, b"6")
            .await
            .unwrap();
        h.validate_amount(&ctx("s1"), "1.5").await.unwrap();
        assert_eq!(
            h.user.get_str("s1", DataTyp::Amount).await.unwrap(),
            Some("1500000".to_string())
        );
    }

    #[tokio::test]
    async fn test_bad_amount_raises_flag() {
        let h = handlers();
        let result = h.validate_amount(&ctx("s1"), "1,5").await.unwrap();
        assert!(result.flag_set.contains(&FLAG_INVALID_AMOUNT));
        assert_eq!(result.content, "1,5");
        assert_eq!(h.user.get("s1", DataTyp::Amount).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_zero_amount_rejected() {
        let h = handlers();
        let result = h.validate_amount(&ctx("s1"), "0").await.unwrap();
        assert!(result.flag_set.contains(&FLAG_INVALID_AMOUNT));
    }

    #[tokio::test]
    async fn test_initiate_requires_unlock() {
        let h = handlers();
        let result = h.initiate_transaction(&ctx("s1")).await.unwrap();
        assert!(result.flag_set.is_empty());
        assert_eq!(h.user.get("s1", DataTyp::TrackingId).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_initiate_failure_consumes_unlock() {
        let h = handlers(); // unreachable API
        let mut flags = FlagSet::new(32);
        flags.set(FLAG_ACCOUNT_UNLOCKED);
        let unlocked = crate::engine::HandlerContext {
            session_id: "s1".to_string(),
            flags,
            language: None,
        };
        let result = h.initiate_transaction(&unlocked).await.unwrap();
        assert!(result.flag_set.contains(&FLAG_TRANSACTION_FAILED));
        assert!(result.flag_reset.contains(&FLAG_ACCOUNT_UNLOCKED));
    }
}
