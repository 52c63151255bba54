//! Menu handler registry.
//!
//! Handlers are named callbacks the menu resource binds to nodes. Every
//! handler reads and writes user data through the key codec only, and
//! reports its outcome as flag transitions plus content bytes - external
//! and validation failures never propagate as errors, so the menu can
//! branch on them.

pub mod account;
pub mod admin;
pub mod flags;
pub mod profile;
pub mod transfer;
pub mod voucher;

use async_trait::async_trait;
use std::sync::Arc;

use crate::api::ApiClient;
use crate::auth::AdminStore;
use crate::engine::{HandlerContext, HandlerDispatch, HandlerResult};
use crate::store::{DataTyp, UserStore};
use crate::types::{MlangoError, Result};
use crate::validate;

pub use flags::*;

/// The handler table: one instance shared across requests.
pub struct MenuHandlers {
    pub(crate) user: UserStore,
    pub(crate) api: ApiClient,
    pub(crate) admin: Arc<AdminStore>,
    /// Configured language codes; the first is the default.
    pub(crate) languages: Vec<String>,
}

impl MenuHandlers {
    pub fn new(
        user: UserStore,
        api: ApiClient,
        admin: Arc<AdminStore>,
        languages: Vec<String>,
    ) -> Self {
        Self {
            user,
            api,
            admin,
            languages,
        }
    }
}

#[async_trait]
impl HandlerDispatch for MenuHandlers {
    async fn dispatch(
        &self,
        name: &str,
        ctx: &HandlerContext,
        input: &str,
    ) -> Result<HandlerResult> {
        match name {
            "create_account" => self.create_account(ctx).await,
            "save_temporary_pin" => self.save_temporary_pin(ctx, input).await,
            "verify_create_pin" => self.verify_create_pin(ctx, input).await,
            "authorize_account" => self.authorize_account(ctx, input).await,
            "check_account_status" => self.check_account_status(ctx).await,
            "check_identifier" => self.check_identifier(ctx).await,
            "set_language" => self.set_language(ctx, input).await,
            "save_firstname" => self.save_field(ctx, DataTyp::FirstName, input).await,
            "save_familyname" => self.save_field(ctx, DataTyp::FamilyName, input).await,
            "save_location" => self.save_field(ctx, DataTyp::Location, input).await,
            "save_offerings" => self.save_field(ctx, DataTyp::Offerings, input).await,
            "save_gender" => self.save_gender(ctx, input).await,
            "verify_yob" => self.verify_yob(ctx, input).await,
            "save_yob" => self.save_yob(ctx, input).await,
            "view_profile" => self.view_profile(ctx).await,
            "view_transactions" => self.view_transactions(ctx).await,
            "check_balance" => self.check_balance(ctx).await,
            "fetch_community_balance" => self.fetch_community_balance(ctx).await,
            "validate_recipient" => self.validate_recipient(ctx, input).await,
            "validate_amount" => self.validate_amount(ctx, input).await,
            "get_recipient" => self.get_recipient(ctx).await,
            "get_amount" => self.get_amount(ctx).await,
            "get_sender" => self.get_sender(ctx).await,
            "initiate_transaction" => self.initiate_transaction(ctx).await,
            "check_vouchers" => self.check_vouchers(ctx).await,
            "set_voucher" => self.set_voucher(ctx, input).await,
            "reset_account_blocked" => self.reset_account_blocked(ctx, input).await,
            _ => Err(MlangoError::EngineExec(format!("unknown handler: {name}"))),
        }
    }

    async fn resolve(&self, placeholder: &str, session_id: &str) -> Result<Option<String>> {
        Ok(match placeholder {
            "recipient" => self.user.get_str(session_id, DataTyp::Recipient).await?,
            "amount" => {
                let scaled = self.user.get_str(session_id, DataTyp::Amount).await?;
                let decimals = self.active_decimals(session_id).await?;
                scaled.map(|s| validate::descale_amount(&s, decimals))
            }
            "symbol" => self.user.get_str(session_id, DataTyp::ActiveSym).await?,
            "firstname" => self.user.get_str(session_id, DataTyp::FirstName).await?,
            "familyname" => self.user.get_str(session_id, DataTyp::FamilyName).await?,
            "sender" => Some(session_id.to_string()),
            _ => None,
        })
    }
}

impl MenuHandlers {
    /// Decimals of the active voucher, zero when unset or unparsable.
    pub(crate) async fn active_decimals(&self, session_id: &str) -> Result<u32> {
        Ok(self
            .user
            .get_str(session_id, DataTyp::ActiveDecimal)
            .await?
            .and_then(|d| d.parse().ok())
            .unwrap_or(0))
    }

    async fn check_identifier(&self, ctx: &HandlerContext) -> Result<HandlerResult> {
        Ok(HandlerResult::content(ctx.session_id.clone()))
    }

    async fn set_language(&self, _ctx: &HandlerContext, input: &str) -> Result<HandlerResult> {
        let index: usize = match input.parse::<usize>() {
            Ok(i) if i >= 1 && i <= self.languages.len() => i - 1,
            _ => return Ok(HandlerResult::default()),
        };
        Ok(HandlerResult::content(self.languages[index].clone())
            .set(crate::engine::FLAG_LANG)
            .set(FLAG_LANGUAGE_SET))
    }
}
