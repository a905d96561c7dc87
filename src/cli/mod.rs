//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod account;
pub mod audit;
pub mod category;
pub mod history;
pub mod import;
pub mod transaction;

pub use account::{handle_account_command, AccountCommands};
pub use audit::{handle_audit_command, AuditArgs};
pub use category::{handle_category_command, CategoryCommands};
pub use history::{handle_history_command, HistoryCommands};
pub use import::{handle_import_command, ImportArgs};
pub use transaction::{handle_transaction_command, TransactionCommands};

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{LedgerError, LedgerResult};
use crate::models::Money;

/// Parse a user-entered amount such as `-50.00`, `$1,200` or `(12.50)`
pub(crate) fn parse_amount(input: &str) -> LedgerResult<Money> {
    Money::from_major_str(input).map_err(|e| {
        LedgerError::Validation(format!(
            "Invalid amount '{}'. Use a format like '-50.00' or '100'. Error: {}",
            input, e
        ))
    })
}

/// Parse a `YYYY-MM-DD` date
pub(crate) fn parse_date(input: &str) -> LedgerResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        LedgerError::Validation(format!("Invalid date '{}'. Use YYYY-MM-DD.", input))
    })
}

/// Split a comma-separated tag list
pub(crate) fn parse_tags(input: &str) -> Vec<String> {
    input.split(',').map(|t| t.trim().to_string()).collect()
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> LedgerResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("-50.00").unwrap(), Money::from_cents(-5000));
        assert_eq!(parse_amount("$1,200").unwrap(), Money::from_cents(120_000));
        assert!(parse_amount("lots").unwrap_err().is_validation());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date(" 2024-02-29 ").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(parse_date("02/29/2024").is_err());
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags("food, home"), vec!["food", "home"]);
    }
}
