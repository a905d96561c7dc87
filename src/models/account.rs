//! Account model
//!
//! An account carries two balances: the opening balance it was created with,
//! and the running balance that the transaction service keeps equal to the
//! opening balance plus the sum of the account's transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::AccountId;
use super::money::Money;

/// A financial account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub id: AccountId,

    /// Account name (e.g., "Chase Checking")
    pub name: String,

    /// Opening balance when the account was created
    pub initial_balance: Money,

    /// Running balance, maintained by the transaction service only
    pub current_balance: Money,

    /// Inactive accounts keep their history but reject new transactions
    pub is_active: bool,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account (or its balance) was last modified
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Net movement since the account was opened
    pub fn net_change(&self) -> Money {
        self.current_balance - self.initial_balance
    }

    /// Validate the account name
    pub fn validate_name(name: &str) -> Result<(), AccountValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AccountValidationError::EmptyName);
        }
        if name.len() > 100 {
            return Err(AccountValidationError::NameTooLong(name.len()));
        }
        Ok(())
    }
}

/// Result of recomputing an account's balance from its transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceCheck {
    pub account_id: AccountId,
    /// Balance stored on the account row
    pub stored: Money,
    /// Opening balance plus the sum of all surviving transactions
    pub computed: Money,
}

impl BalanceCheck {
    pub fn is_consistent(&self) -> bool {
        self.stored == self.computed
    }

    pub fn drift(&self) -> Money {
        self.stored - self.computed
    }
}

/// Validation errors for accounts
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountValidationError {
    #[error("Account name cannot be empty")]
    EmptyName,
    #[error("Account name too long ({0} chars, max 100)")]
    NameTooLong(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(initial: i64, current: i64) -> Account {
        let now = Utc::now();
        Account {
            id: AccountId::new(1),
            name: "Checking".into(),
            initial_balance: Money::from_cents(initial),
            current_balance: Money::from_cents(current),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_net_change() {
        assert_eq!(account(100000, 342470).net_change().cents(), 242470);
    }

    #[test]
    fn test_validate_name() {
        assert!(Account::validate_name("Checking").is_ok());
        assert_eq!(
            Account::validate_name("   "),
            Err(AccountValidationError::EmptyName)
        );
        assert!(matches!(
            Account::validate_name(&"a".repeat(101)),
            Err(AccountValidationError::NameTooLong(101))
        ));
    }

    #[test]
    fn test_balance_check() {
        let check = BalanceCheck {
            account_id: AccountId::new(1),
            stored: Money::from_cents(1000),
            computed: Money::from_cents(900),
        };
        assert!(!check.is_consistent());
        assert_eq!(check.drift().cents(), 100);
    }
}
