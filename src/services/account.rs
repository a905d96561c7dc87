//! Account service
//!
//! Account lifecycle outside balance mutation: create, look up, deactivate,
//! and verify the stored balance against the transaction rows.

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, AccountId, BalanceCheck, Money};
use crate::storage::Storage;

/// Service for account management
pub struct AccountService<'a> {
    storage: &'a Storage,
}

impl<'a> AccountService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create an account; its current balance starts at `initial_balance`
    pub fn create(&self, name: &str, initial_balance: Money) -> LedgerResult<Account> {
        let name = name.trim();
        Account::validate_name(name).map_err(|e| LedgerError::Validation(e.to_string()))?;

        let account = self.storage.accounts().insert(name, initial_balance)?;

        self.storage.log_create(
            EntityType::Account,
            account.id.to_string(),
            Some(account.name.clone()),
            &account,
        );

        Ok(account)
    }

    pub fn get(&self, id: AccountId) -> LedgerResult<Option<Account>> {
        self.storage.accounts().get(id)
    }

    /// Find an account by name (case-insensitive) or by id (`acc-3` or `3`)
    pub fn find(&self, identifier: &str) -> LedgerResult<Option<Account>> {
        if let Some(account) = self.storage.accounts().get_by_name(identifier)? {
            return Ok(Some(account));
        }

        if let Ok(id) = identifier.parse::<AccountId>() {
            return self.storage.accounts().get(id);
        }

        Ok(None)
    }

    /// Like [`find`](Self::find) but absence is an error
    pub fn resolve(&self, identifier: &str) -> LedgerResult<Account> {
        self.find(identifier)?
            .ok_or_else(|| LedgerError::account_not_found(identifier))
    }

    pub fn list(&self, include_inactive: bool) -> LedgerResult<Vec<Account>> {
        self.storage.accounts().list(include_inactive)
    }

    /// Mark an account inactive. Its history and balance are kept; new
    /// transactions and imports against it are rejected.
    pub fn deactivate(&self, id: AccountId) -> LedgerResult<Account> {
        let before = self
            .get(id)?
            .ok_or_else(|| LedgerError::account_not_found(id.to_string()))?;

        if !before.is_active {
            return Ok(before);
        }

        self.storage.accounts().set_active(id, false)?;
        let after = self
            .get(id)?
            .ok_or_else(|| LedgerError::account_not_found(id.to_string()))?;

        self.storage.log_update(
            EntityType::Account,
            id.to_string(),
            Some(after.name.clone()),
            &before,
            &after,
        );

        Ok(after)
    }

    /// Recompute the balance from the transaction rows and compare it with
    /// the stored running balance
    pub fn check_balance(&self, id: AccountId) -> LedgerResult<BalanceCheck> {
        let tx = self.storage.begin()?;
        let accounts = crate::storage::AccountRepository::new(&tx);

        let account = accounts
            .get(id)?
            .ok_or_else(|| LedgerError::account_not_found(id.to_string()))?;
        let computed = accounts
            .computed_balance(id)?
            .ok_or_else(|| LedgerError::account_not_found(id.to_string()))?;
        tx.commit()?;

        Ok(BalanceCheck {
            account_id: id,
            stored: account.current_balance,
            computed,
        })
    }

    /// [`check_balance`](Self::check_balance) for every account
    pub fn check_all(&self) -> LedgerResult<Vec<BalanceCheck>> {
        self.list(true)?
            .iter()
            .map(|account| self.check_balance(account.id))
            .collect()
    }
}
