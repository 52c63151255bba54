//! Voucher handlers: holdings list, selection, balances, statement.

use tracing::debug;

use crate::engine::{HandlerContext, HandlerResult};
use crate::store::{user::ActiveVoucher, DataTyp};
use crate::types::Result;
use crate::validate;

use super::flags::*;
use super::MenuHandlers;

/// Join values as the numbered parallel-list shape the menu templates by
/// line: `1:SRF\n2:MILO`.
fn numbered_list<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values
        .enumerate()
        .map(|(i, v)| format!("{}:{}", i + 1, v))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One entry of a stored numbered list, by position.
fn list_entry(list: &str, index: usize) -> Option<String> {
    list.lines()
        .nth(index)
        .and_then(|line| line.split_once(':'))
        .map(|(_, v)| v.to_string())
}

impl MenuHandlers {
    /// Fetch the session's holdings and store them as four parallel
    /// numbered lists; content is the symbol list for display.
    pub(crate) async fn check_vouchers(&self, ctx: &HandlerContext) -> Result<HandlerResult> {
        let session = &ctx.session_id;
        let Some(public_key) = self.user.get_str(session, DataTyp::PublicKey).await? else {
            return Ok(HandlerResult::default());
        };
        let holdings = match self.api.vouchers(&public_key).await {
            Ok(holdings) => holdings,
            Err(e) => {
                debug!(%session, error = %e, "holdings fetch failed");
                let stored = self
                    .user
                    .get_str(session, DataTyp::VoucherList)
                    .await?
                    .unwrap_or_default();
                return Ok(HandlerResult::content(stored));
            }
        };

        let symbols = numbered_list(holdings.iter().map(|h| h.token_symbol.as_str()));
        let balances = numbered_list(holdings.iter().map(|h| h.balance.as_str()));
        let decimals = numbered_list(holdings.iter().map(|h| h.token_decimals.as_str()));
        let addresses = numbered_list(holdings.iter().map(|h| h.contract_address.as_str()));

        self.user
            .set(session, DataTyp::VoucherList, symbols.as_bytes())
            .await?;
        self.user
            .set(session, DataTyp::VoucherBalances, balances.as_bytes())
            .await?;
        self.user
            .set(session, DataTyp::VoucherDecimals, decimals.as_bytes())
            .await?;
        self.user
            .set(session, DataTyp::VoucherAddresses, addresses.as_bytes())
            .await?;
        Ok(HandlerResult::content(symbols))
    }

    /// Select the active voucher by list index or (case-insensitive)
    /// symbol, writing the quartet as a group.
    pub(crate) async fn set_voucher(
        &self,
        ctx: &HandlerContext,
        input: &str,
    ) -> Result<HandlerResult> {
        let session = &ctx.session_id;
        let input = input.trim();
        let symbols = self
            .user
            .get_str(session, DataTyp::VoucherList)
            .await?
            .unwrap_or_default();

        let index = match input.parse::<usize>() {
            Ok(i) if i >= 1 => Some(i - 1),
            _ => symbols.lines().position(|line| {
                line.split_once(':')
                    .is_some_and(|(_, sym)| sym.eq_ignore_ascii_case(input))
            }),
        };
        let Some(index) = index else {
            return Ok(HandlerResult::content(input).set(FLAG_INVALID_VOUCHER));
        };

        let symbol = list_entry(&symbols, index);
        let balance = self
            .user
            .get_str(session, DataTyp::VoucherBalances)
            .await?
            .and_then(|l| list_entry(&l, index));
        let decimals = self
            .user
            .get_str(session, DataTyp::VoucherDecimals)
            .await?
            .and_then(|l| list_entry(&l, index));
        let address = self
            .user
            .get_str(session, DataTyp::VoucherAddresses)
            .await?
            .and_then(|l| list_entry(&l, index));

        let (Some(symbol), Some(balance), Some(decimals), Some(address)) =
            (symbol, balance, decimals, address)
        else {
            return Ok(HandlerResult::content(input).set(FLAG_INVALID_VOUCHER));
        };

        let voucher = ActiveVoucher {
            symbol: symbol.clone(),
            balance,
            decimals,
            address,
        };
        self.user.set_active_voucher(session, &voucher).await?;
        Ok(HandlerResult::content(symbol).reset(FLAG_INVALID_VOUCHER))
    }

    /// Balance of the active voucher, formatted `"<amount> <symbol>"`.
    /// A fetch failure falls through to a zero display without a flag.
    pub(crate) async fn check_balance(&self, ctx: &HandlerContext) -> Result<HandlerResult> {
        let session = &ctx.session_id;
        let symbol = self
            .user
            .get_str(session, DataTyp::ActiveSym)
            .await?
            .unwrap_or_default();
        let Some(public_key) = self.user.get_str(session, DataTyp::PublicKey).await? else {
            return Ok(HandlerResult::content(format!("0.00 {symbol}")));
        };

        match self.api.vouchers(&public_key).await {
            Ok(holdings) => {
                let holding = holdings.iter().find(|h| h.token_symbol == symbol);
                match holding {
                    Some(h) => {
                        self.user
                            .set(session, DataTyp::ActiveBal, h.balance.as_bytes())
                            .await?;
                        Ok(HandlerResult::content(format!("{} {}", h.balance, symbol)))
                    }
                    None => Ok(HandlerResult::content(format!("0.00 {symbol}"))),
                }
            }
            Err(e) => {
                debug!(%session, error = %e, "balance fetch failed");
                Ok(HandlerResult::content(format!("0.00 {symbol}")))
            }
        }
    }

    /// Balance held by the active voucher's community sink address.
    pub(crate) async fn fetch_community_balance(
        &self,
        ctx: &HandlerContext,
    ) -> Result<HandlerResult> {
        let session = &ctx.session_id;
        let symbol = self
            .user
            .get_str(session, DataTyp::ActiveSym)
            .await?
            .unwrap_or_default();
        let Some(address) = self.user.get_str(session, DataTyp::ActiveAddress).await? else {
            return Ok(HandlerResult::content(format!("0.00 {symbol}")));
        };

        let balance = async {
            let data = self.api.voucher_data(&address).await?;
            let balance = self.api.balance(&data.sink_address).await?;
            Ok::<_, crate::types::MlangoError>(balance.balance)
        }
        .await;
        match balance {
            Ok(balance) => Ok(HandlerResult::content(format!("{balance} {symbol}"))),
            Err(e) => {
                debug!(%session, error = %e, "community balance fetch failed");
                Ok(HandlerResult::content(format!("0.00 {symbol}")))
            }
        }
    }

    /// Last transactions, fetched and stored as display lines.
    pub(crate) async fn view_transactions(&self, ctx: &HandlerContext) -> Result<HandlerResult> {
        let session = &ctx.session_id;
        let Some(public_key) = self.user.get_str(session, DataTyp::PublicKey).await? else {
            return Ok(HandlerResult::content("No transactions found."));
        };

        match self.api.transfers(&public_key).await {
            Ok(transfers) if !transfers.is_empty() => {
                let lines: Vec<String> = transfers
                    .iter()
                    .enumerate()
                    .map(|(i, t)| {
                        let decimals: u32 = t.token_decimals.parse().unwrap_or(0);
                        let amount = validate::descale_amount(&t.transfer_value, decimals);
                        let direction = if t.sender == public_key { "Sent" } else { "Received" };
                        format!("{}. {direction} {amount} {} {}", i + 1, t.token_symbol, t.date_block)
                    })
                    .collect();
                let joined = lines.join("\n");
                self.user
                    .set(session, DataTyp::Transactions, joined.as_bytes())
                    .await?;
                Ok(HandlerResult::content(joined))
            }
            Ok(_) => Ok(HandlerResult::content("No transactions found.")),
            Err(e) => {
                debug!(%session, error = %e, "statement fetch failed");
                let stored = self
                    .user
                    .get_str(session, DataTyp::Transactions)
                    .await?
                    .unwrap_or_else(|| "No transactions found.".to_string());
                Ok(HandlerResult::content(stored))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{ctx, handlers};
    use super::*;

    async fn seed_vouchers(h: &super::MenuHandlers) {
        h.user
            .set("s1", DataTyp::VoucherList, b"1:SRF\n2:MILO")
            .await
            .unwrap();
        h.user
            .set("s1", DataTyp::VoucherBalances, b"1:100\n2:200")
            .await
            .unwrap();
        h.user
            .set("s1", DataTyp::VoucherDecimals, b"1:6\n2:4")
            .await
            .unwrap();
        h.user
            .set(
                "s1",
                DataTyp::VoucherAddresses,
                b"1:0xab1\n2:0x41c188d63Qa",
            )
            .await
            .unwrap();
    }

    #[test]
    fn test_numbered_list_shape() {
        let list = numbered_list(["SRF", "MILO"].into_iter());
        assert_eq!(list, "1:SRF\n2:MILO");
        assert_eq!(numbered_list(std::iter::empty::<&str>()), "");
    }

    #[tokio::test]
    async fn test_set_voucher_by_index() {
        let h = handlers();
        seed_vouchers(&h).await;
        let result = h.set_voucher(&ctx("s1"), "2").await.unwrap();
        assert_eq!(result.content, "MILO");

        let voucher = h.user.active_voucher("s1").await.unwrap().unwrap();
        assert_eq!(voucher.symbol, "MILO");
        assert_eq!(voucher.balance, "200");
        assert_eq!(voucher.decimals, "4");
        assert_eq!(voucher.address, "0x41c188d63Qa");
    }

    #[tokio::test]
    async fn test_set_voucher_by_symbol_case_insensitive() {
        let h = handlers();
        seed_vouchers(&h).await;
        h.set_voucher(&ctx("s1"), "milo").await.unwrap();
        let voucher = h.user.active_voucher("s1").await.unwrap().unwrap();
        assert_eq!(voucher.symbol, "MILO");
        assert_eq!(voucher.balance, "200");
    }

    #[tokio::test]
    async fn test_set_voucher_unknown_raises_flag() {
        let h = handlers();
        seed_vouchers(&h).await;
        let result = h.set_voucher(&ctx("s1"), "NOPE").await.unwrap();
        assert!(result.flag_set.contains(&FLAG_INVALID_VOUCHER));
        assert_eq!(h.user.active_voucher("s1").await.unwrap(), None);

        let result = h.set_voucher(&ctx("s1"), "5").await.unwrap();
        assert!(result.flag_set.contains(&FLAG_INVALID_VOUCHER));
    }

    #[tokio::test]
    async fn test_check_balance_error_is_zero_display() {
        let h = handlers(); // unreachable API
        h.user.set_public_key("s1", "0xabc").await.unwrap();
        h.user.set("s1", DataTyp::ActiveSym, b"SRF").await.unwrap();
        let result = h.check_balance(&ctx("s1")).await.unwrap();
        assert_eq!(result.content, "0.00 SRF");
        assert!(result.flag_set.is_empty());
    }

    #[tokio::test]
    async fn test_statement_falls_back_to_stored() {
        let h = handlers(); // unreachable API
        h.user.set_public_key("s1", "0xabc").await.unwrap();
        h.user
            .set("s1", DataTyp::Transactions, b"1. Sent 5 SRF 2024-01-01")
            .await
            .unwrap();
        let result = h.view_transactions(&ctx("s1")).await.unwrap();
        assert_eq!(result.content, "1. Sent 5 SRF 2024-01-01");
    }
}
