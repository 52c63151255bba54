//! Administrative handlers.
//!
//! Privileged operations act on a third-party account named by the input;
//! the calling session must be present in the admin store.

use tracing::{info, warn};

use crate::engine::{HandlerContext, HandlerResult};
use crate::store::DataTyp;
use crate::types::Result;
use crate::validate;

use super::flags::*;
use super::MenuHandlers;

impl MenuHandlers {
    /// Unblock a blocked account and reset its PIN state so the owner can
    /// set a new PIN. Admin-only.
    pub(crate) async fn reset_account_blocked(
        &self,
        ctx: &HandlerContext,
        input: &str,
    ) -> Result<HandlerResult> {
        if !self.admin.is_admin(&ctx.session_id) {
            warn!(session = %ctx.session_id, "unauthorized account reset attempt");
            return Ok(HandlerResult::default().set(FLAG_UNAUTHORIZED));
        }

        let input = input.trim();
        if input.is_empty() {
            return Ok(HandlerResult::content(input).set(FLAG_INVALID_RECIPIENT));
        }
        // Phone numbers canonicalize; any other identifier is taken as a
        // session id verbatim.
        let target = match validate::format_phone_number(input) {
            Ok(phone) => phone,
            Err(_) => input.to_string(),
        };

        self.user.set_pin_attempts(&target, 0).await?;
        self.user.remove(&target, DataTyp::BlockedNumber).await?;
        self.user.remove(&target, DataTyp::TemporaryValue).await?;
        info!(admin = %ctx.session_id, %target, "account unblocked, PIN state reset");
        Ok(HandlerResult::content(target)
            .reset(FLAG_UNAUTHORIZED)
            .reset(FLAG_INVALID_RECIPIENT))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{ctx, handlers};
    use super::*;

    #[tokio::test]
    async fn test_non_admin_is_unauthorized() {
        let h = handlers();
        let result = h
            .reset_account_blocked(&ctx("+254700000001"), "0712345678")
            .await
            .unwrap();
        assert!(result.flag_set.contains(&FLAG_UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_admin_reset_clears_block_state() {
        let h = handlers();
        h.admin.insert("+254733000000");

        h.user.set_pin_attempts("+254712345678", 3).await.unwrap();
        h.user
            .set("+254712345678", DataTyp::BlockedNumber, b"+254712345678")
            .await
            .unwrap();

        let result = h
            .reset_account_blocked(&ctx("+254733000000"), "0712345678")
            .await
            .unwrap();
        assert_eq!(result.content, "+254712345678");
        assert_eq!(h.user.pin_attempts("+254712345678").await.unwrap(), 0);
        assert_eq!(
            h.user
                .get("+254712345678", DataTyp::BlockedNumber)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_empty_target_rejected() {
        let h = handlers();
        h.admin.insert("admin");
        let result = h.reset_account_blocked(&ctx("admin"), "  ").await.unwrap();
        assert!(result.flag_set.contains(&FLAG_INVALID_RECIPIENT));
    }
}
