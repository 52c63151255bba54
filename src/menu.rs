//! The wallet menu.
//!
//! Node graph for registration, sending, vouchers, profile and account
//! management. Built-in templates are the English defaults; the RESOURCE
//! store can override any of them per language.

use crate::engine::{MenuNode, Resource};
use crate::handlers::*;

/// Root node symbol.
pub const ROOT: &str = "root";

/// Build the full menu resource.
pub fn build() -> Resource {
    let nodes = vec![
        // Entry: route by registration state.
        MenuNode::new(ROOT, "")
            .forward(FLAG_ACCOUNT_CREATED, false, "terms")
            .forward(FLAG_ACCOUNT_CREATED, true, "main"),
        // --- Registration ---
        MenuNode::new(
            "terms",
            "Welcome to Sarafu Network!\nDo you agree to terms and conditions?\n1:Yes\n2:No",
        )
        .option("1", "create_pin")
        .option("2", "quit"),
        MenuNode::new("quit", "Thank you for using Sarafu. Goodbye!").terminal(),
        MenuNode::new(
            "create_pin",
            "Please enter a new four digit PIN for your account:",
        )
        .handler("create_account")
        .forward(FLAG_ACCOUNT_CREATION_FAILED, true, "account_creation_failed")
        .option_any("confirm_pin"),
        MenuNode::new(
            "account_creation_failed",
            "Your account could not be created. Please try again later.",
        )
        .terminal(),
        MenuNode::new("confirm_pin", "Enter your four number PIN again:")
            .handler("save_temporary_pin")
            .forward(FLAG_INCORRECT_PIN, true, "invalid_pin")
            .option_any("pin_confirmed"),
        MenuNode::new(
            "invalid_pin",
            "The PIN you entered is invalid. A PIN must be four digits:",
        )
        .option_any("confirm_pin"),
        MenuNode::new(
            "pin_confirmed",
            "Your account is being created. You will receive an SMS when it is ready.",
        )
        .handler("verify_create_pin")
        .forward(FLAG_PIN_MISMATCH, true, "pin_mismatch")
        .terminal(),
        MenuNode::new(
            "pin_mismatch",
            "The PIN entered does not match. Enter your four number PIN again:",
        )
        .option_any("pin_confirmed"),
        // --- Main menu ---
        MenuNode::new(
            "main",
            "Balance: {content}\n1:Send\n2:My Vouchers\n3:My Account\n9:Quit",
        )
        .handler("check_account_status")
        .handler("check_balance")
        .option_push("1", "send")
        .option_push("2", "vouchers")
        .option_push("3", "my_account")
        .option("9", "quit"),
        // --- Send flow ---
        MenuNode::new("send", "Enter recipient's phone number, address or alias:")
            .option_any("amount"),
        MenuNode::new("amount", "Enter amount:")
            .handler("validate_recipient")
            .forward(FLAG_INVALID_RECIPIENT, true, "invalid_recipient")
            .option_any("transaction_pin"),
        MenuNode::new(
            "invalid_recipient",
            "{content} is not registered or invalid, please try again:",
        )
        .option_any("amount"),
        MenuNode::new(
            "transaction_pin",
            "{recipient} will receive {amount} {symbol}.\nEnter your PIN to confirm:",
        )
        .handler("validate_amount")
        .forward(FLAG_INVALID_AMOUNT, true, "invalid_amount")
        .option_any("transaction_initiated"),
        MenuNode::new(
            "invalid_amount",
            "Amount {content} is invalid, please try again:",
        )
        .option_any("transaction_pin"),
        MenuNode::new(
            "transaction_initiated",
            "Your request has been sent. {recipient} will receive {amount} {symbol}.",
        )
        .handler("authorize_account")
        .handler("initiate_transaction")
        .forward(FLAG_ACCOUNT_BLOCKED, true, "blocked")
        .forward(FLAG_INCORRECT_PIN, true, "incorrect_pin")
        .forward(FLAG_TRANSACTION_FAILED, true, "transaction_failed")
        .terminal(),
        MenuNode::new("incorrect_pin", "Incorrect PIN. Please try again:")
            .option_any("transaction_initiated"),
        MenuNode::new(
            "blocked",
            "Your account has been locked. Contact support to unlock it.",
        )
        .terminal(),
        MenuNode::new(
            "transaction_failed",
            "Your transaction could not be completed. Please try again later.",
        )
        .terminal(),
        // --- Vouchers ---
        MenuNode::new("vouchers", "Select a voucher:\n{content}")
            .handler("check_vouchers")
            .option_back("0")
            .option_any("voucher_set"),
        MenuNode::new(
            "voucher_set",
            "Success! {symbol} is now your active voucher.\n0:Back\n9:Quit",
        )
        .handler("set_voucher")
        .forward(FLAG_INVALID_VOUCHER, true, "invalid_voucher")
        .option_back("0")
        .option("9", "quit"),
        MenuNode::new(
            "invalid_voucher",
            "The voucher you entered is not in your list, please try again:",
        )
        .option_any("voucher_set"),
        // --- My account ---
        MenuNode::new(
            "my_account",
            "My Account\n1:Profile\n2:Change language\n3:Check balances\n4:Check statement\n5:PIN options\n0:Back",
        )
        .option_push("1", "profile")
        .option_push("2", "select_language")
        .option_push("3", "balances")
        .option_push("4", "statement")
        .option_push("5", "pin_options")
        .option_back("0"),
        // Profile
        MenuNode::new(
            "profile",
            "My profile\n1:Edit name\n2:Edit family name\n3:Edit gender\n4:Edit year of birth\n5:Edit location\n6:Edit offerings\n7:View profile\n0:Back",
        )
        .option_push("1", "edit_firstname")
        .option_push("2", "edit_familyname")
        .option_push("3", "edit_gender")
        .option_push("4", "edit_yob")
        .option_push("5", "edit_location")
        .option_push("6", "edit_offerings")
        .option_push("7", "view_profile")
        .option_back("0"),
        MenuNode::new("edit_firstname", "Enter your first name:").option_any("firstname_saved"),
        MenuNode::new("firstname_saved", "Profile updated.\n0:Back")
            .handler("save_firstname")
            .option_back("0"),
        MenuNode::new("edit_familyname", "Enter your family name:").option_any("familyname_saved"),
        MenuNode::new("familyname_saved", "Profile updated.\n0:Back")
            .handler("save_familyname")
            .option_back("0"),
        MenuNode::new("edit_gender", "Select gender:\n1:Male\n2:Female\n3:Other")
            .option_any("gender_saved"),
        MenuNode::new("gender_saved", "Profile updated.\n0:Back")
            .handler("save_gender")
            .option_back("0"),
        MenuNode::new("edit_yob", "Enter your year of birth:").option_any("yob_saved"),
        MenuNode::new("yob_saved", "Profile updated.\n0:Back")
            .handler("verify_yob")
            .handler("save_yob")
            .forward(FLAG_INCORRECT_DATE_FORMAT, true, "invalid_yob")
            .option_back("0"),
        MenuNode::new(
            "invalid_yob",
            "The year you entered is invalid. Enter a four digit year:",
        )
        .option_any("yob_saved"),
        MenuNode::new("edit_location", "Enter your location:").option_any("location_saved"),
        MenuNode::new("location_saved", "Profile updated.\n0:Back")
            .handler("save_location")
            .option_back("0"),
        MenuNode::new("edit_offerings", "Enter the services or goods you offer:")
            .option_any("offerings_saved"),
        MenuNode::new("offerings_saved", "Profile updated.\n0:Back")
            .handler("save_offerings")
            .option_back("0"),
        MenuNode::new("view_profile", "{content}\n0:Back")
            .handler("view_profile")
            .option_back("0"),
        // Language
        MenuNode::new("select_language", "Select language:\n1:English\n2:Kiswahili")
            .option_any("language_set"),
        MenuNode::new("language_set", "Language updated.\n0:Back")
            .handler("set_language")
            .option_back("0"),
        // Balances
        MenuNode::new(
            "balances",
            "Balances\n1:My balance\n2:Community balance\n0:Back",
        )
        .option_push("1", "my_balance")
        .option_push("2", "community_balance")
        .option_back("0"),
        MenuNode::new("my_balance", "Your balance is {content}\n0:Back")
            .handler("check_balance")
            .option_back("0"),
        MenuNode::new("community_balance", "Community balance: {content}\n0:Back")
            .handler("fetch_community_balance")
            .option_back("0"),
        // Statement
        MenuNode::new("statement", "{content}\n0:Back")
            .handler("view_transactions")
            .option_back("0"),
        // PIN options
        MenuNode::new(
            "pin_options",
            "PIN Options\n1:Change PIN\n2:Reset another account\n0:Back",
        )
        .option_push("1", "old_pin")
        .option_push("2", "admin_reset_entry")
        .option_back("0"),
        MenuNode::new("old_pin", "Enter your current PIN:").option_any("pin_authorized"),
        MenuNode::new("pin_authorized", "Enter a new four digit PIN:")
            .handler("authorize_account")
            .forward(FLAG_ACCOUNT_BLOCKED, true, "blocked")
            .forward(FLAG_INCORRECT_PIN, true, "old_pin_incorrect")
            .option_any("new_pin_confirm"),
        MenuNode::new("old_pin_incorrect", "Incorrect PIN. Enter your current PIN:")
            .option_any("pin_authorized"),
        MenuNode::new("new_pin_confirm", "Enter your new PIN again:")
            .handler("save_temporary_pin")
            .forward(FLAG_INCORRECT_PIN, true, "new_pin_invalid")
            .option_any("pin_changed"),
        MenuNode::new(
            "new_pin_invalid",
            "The PIN you entered is invalid. A PIN must be four digits:",
        )
        .option_any("new_pin_confirm"),
        MenuNode::new("pin_changed", "Your PIN has been updated.\n0:Back")
            .handler("verify_create_pin")
            .forward(FLAG_PIN_MISMATCH, true, "new_pin_mismatch")
            .option_back("0"),
        MenuNode::new(
            "new_pin_mismatch",
            "The PIN entered does not match. Enter your new PIN again:",
        )
        .option_any("pin_changed"),
        // Admin reset
        MenuNode::new(
            "admin_reset_entry",
            "Enter the phone number of the account to reset:",
        )
        .option_any("admin_reset_done"),
        MenuNode::new(
            "admin_reset_done",
            "The account {content} has been unblocked and its PIN reset.\n0:Back",
        )
        .handler("reset_account_blocked")
        .forward(FLAG_UNAUTHORIZED, true, "admin_unauthorized")
        .forward(FLAG_INVALID_RECIPIENT, true, "admin_reset_invalid")
        .option_back("0"),
        MenuNode::new(
            "admin_unauthorized",
            "You are not authorized to perform this operation.",
        )
        .terminal(),
        MenuNode::new(
            "admin_reset_invalid",
            "That is not a valid phone number, please try again:",
        )
        .option_any("admin_reset_done"),
    ];
    Resource::new(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_target_exists() {
        let resource = build();
        let nodes = [
            ROOT, "terms", "quit", "create_pin", "account_creation_failed", "confirm_pin",
            "invalid_pin", "pin_confirmed", "pin_mismatch", "main", "send", "amount",
            "invalid_recipient", "transaction_pin", "invalid_amount", "transaction_initiated",
            "incorrect_pin", "blocked", "transaction_failed", "vouchers", "voucher_set",
            "invalid_voucher", "my_account", "profile", "edit_firstname", "firstname_saved",
            "edit_familyname", "familyname_saved", "edit_gender", "gender_saved", "edit_yob",
            "yob_saved", "invalid_yob", "edit_location", "location_saved", "edit_offerings",
            "offerings_saved", "view_profile", "select_language", "language_set", "balances",
            "my_balance", "community_balance", "statement", "pin_options", "old_pin",
            "pin_authorized", "old_pin_incorrect", "new_pin_confirm", "new_pin_invalid",
            "pin_changed", "new_pin_mismatch", "admin_reset_entry", "admin_reset_done",
            "admin_unauthorized", "admin_reset_invalid",
        ];
        for sym in nodes {
            let node = resource.node(sym).unwrap_or_else(|| panic!("missing node {sym}"));
            for option in &node.options {
                match &option.target {
                    crate::engine::Target::Goto(t) | crate::engine::Target::Push(t) => {
                        assert!(resource.node(t).is_some(), "{sym} -> missing target {t}");
                    }
                    crate::engine::Target::Back => {}
                }
            }
            for forward in &node.forwards {
                assert!(
                    resource.node(&forward.target).is_some(),
                    "{sym} forwards to missing {}",
                    forward.target
                );
            }
        }
    }

    #[test]
    fn test_terminal_nodes_have_no_options() {
        let resource = build();
        for sym in ["quit", "pin_confirmed", "blocked", "transaction_failed"] {
            let node = resource.node(sym).unwrap();
            assert!(node.terminal, "{sym} should be terminal");
            assert!(node.options.is_empty(), "{sym} should not branch");
        }
    }
}
