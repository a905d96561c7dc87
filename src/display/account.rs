//! Account display formatting
//!
//! Formats accounts for terminal output in table and detail views.

use super::DisplayFormat;
use crate::models::{Account, BalanceCheck, Money};

/// Format accounts with balances as a table
pub fn format_account_list(accounts: &[Account], fmt: &DisplayFormat) -> String {
    if accounts.is_empty() {
        return "No accounts found.\n".to_string();
    }

    let name_width = accounts
        .iter()
        .map(|a| a.name.chars().count())
        .max()
        .unwrap_or(4)
        .max(5);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<6}  {:<name_width$}  {:>14}  {}\n",
        "ID",
        "Name",
        "Balance",
        "Status",
        name_width = name_width,
    ));
    output.push_str(&format!(
        "{:-<6}  {:-<name_width$}  {:->14}  {:-<8}\n",
        "",
        "",
        "",
        "",
        name_width = name_width,
    ));

    for account in accounts {
        output.push_str(&format!(
            "{:<6}  {:<name_width$}  {:>14}  {}\n",
            account.id.to_string(),
            account.name,
            fmt.money(account.current_balance),
            if account.is_active { "" } else { "Inactive" },
            name_width = name_width,
        ));
    }

    let total: Money = accounts
        .iter()
        .filter(|a| a.is_active)
        .map(|a| a.current_balance)
        .sum();
    output.push_str(&format!(
        "{:<6}  {:<name_width$}  {:>14}\n",
        "",
        "TOTAL",
        fmt.money(total),
        name_width = name_width,
    ));

    output
}

/// Format a single account's details
pub fn format_account_details(account: &Account, fmt: &DisplayFormat) -> String {
    let mut output = String::new();

    output.push_str(&format!("Account: {}\n", account.name));
    output.push_str(&format!("  ID:              {}\n", account.id));
    output.push_str(&format!(
        "  Active:          {}\n",
        if account.is_active { "Yes" } else { "No" }
    ));
    output.push('\n');
    output.push_str(&format!(
        "  Initial Balance: {}\n",
        fmt.money(account.initial_balance)
    ));
    output.push_str(&format!(
        "  Current Balance: {}\n",
        fmt.money(account.current_balance)
    ));
    output.push_str(&format!(
        "  Net Change:      {}\n",
        fmt.money(account.net_change())
    ));
    output.push('\n');
    output.push_str(&format!(
        "  Created:  {}\n",
        account.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    output.push_str(&format!(
        "  Modified: {}\n",
        account.updated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    output
}

/// One line per account: stored vs recomputed balance
pub fn format_balance_checks(checks: &[(Account, BalanceCheck)], fmt: &DisplayFormat) -> String {
    if checks.is_empty() {
        return "No accounts found.\n".to_string();
    }

    let mut output = String::new();
    for (account, check) in checks {
        if check.is_consistent() {
            output.push_str(&format!(
                "OK     {}  {}\n",
                account.name,
                fmt.money(check.stored)
            ));
        } else {
            output.push_str(&format!(
                "DRIFT  {}  stored {}  computed {}  (off by {})\n",
                account.name,
                fmt.money(check.stored),
                fmt.money(check.computed),
                fmt.money(check.drift())
            ));
        }
    }
    output
}
