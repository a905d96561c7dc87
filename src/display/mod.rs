//! Display formatting for terminal output
//!
//! Plain aligned text. Every formatter takes a [`DisplayFormat`] so the
//! configured currency symbol and date format apply everywhere.

pub mod account;
pub mod category;
pub mod import;
pub mod transaction;

pub use account::{format_account_details, format_account_list, format_balance_checks};
pub use category::format_category_list;
pub use import::{format_import_history, format_import_result};
pub use transaction::{format_totals, format_transaction_details, format_transaction_register};

use crate::config::Settings;
use crate::models::Money;

/// User-facing formatting preferences
#[derive(Debug, Clone, Copy)]
pub struct DisplayFormat<'a> {
    pub currency_symbol: &'a str,
    pub date_format: &'a str,
}

impl Default for DisplayFormat<'static> {
    fn default() -> Self {
        Self {
            currency_symbol: "$",
            date_format: "%Y-%m-%d",
        }
    }
}

impl<'a> From<&'a Settings> for DisplayFormat<'a> {
    fn from(settings: &'a Settings) -> Self {
        Self {
            currency_symbol: &settings.currency_symbol,
            date_format: &settings.display_date_format,
        }
    }
}

impl DisplayFormat<'_> {
    pub fn money(&self, amount: Money) -> String {
        amount.format_with_symbol(self.currency_symbol)
    }

    pub fn date(&self, date: chrono::NaiveDate) -> String {
        date.format(self.date_format).to_string()
    }
}

/// Truncate to `max_len` characters, marking the cut with `...`
pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        ".".repeat(max_len)
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
