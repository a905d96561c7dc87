//! Transaction service
//!
//! Every mutation runs in one `BEGIN IMMEDIATE` transaction that writes the
//! transaction row(s) and applies the matching relative balance update(s).
//! Any error drops the transaction before commit, which rolls back both.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    AccountId, CategoryId, Money, NewTransaction, Transaction, TransactionId, UpdateTransaction,
};
use crate::storage::{
    AccountRepository, CategoryRepository, DateRange, Storage, Totals, TotalsScope,
    TransactionFilter, TransactionRepository,
};

/// Service for transaction management
pub struct TransactionService<'a> {
    storage: &'a Storage,
}

impl<'a> TransactionService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create a single transaction and apply its amount to the account
    pub fn create(&self, new: NewTransaction) -> LedgerResult<Transaction> {
        let new = new.normalized();
        new.validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        let tx = self.storage.begin()?;
        References::new(&tx).check(
            new.account_id,
            new.category_id,
            new.transfer_account_id,
            true,
        )?;

        let txn = TransactionRepository::new(&tx).insert(&new)?;
        AccountRepository::new(&tx).apply_delta(txn.account_id, txn.amount)?;
        tx.commit()?;

        debug!(id = %txn.id, account = %txn.account_id, amount = txn.amount.cents(), "Created transaction");
        self.storage.log_create(
            EntityType::Transaction,
            txn.id.to_string(),
            Some(txn.label()),
            &txn,
        );

        Ok(txn)
    }

    /// Create many transactions in one database transaction
    ///
    /// Returns the number of rows inserted. See [`create_batch_in`](Self::create_batch_in).
    pub fn create_batch(&self, rows: Vec<NewTransaction>, batch_size: usize) -> LedgerResult<usize> {
        let tx = self.storage.begin()?;
        let inserted = Self::create_batch_in(&tx, rows, batch_size)?;
        tx.commit()?;

        info!(rows = inserted, "Committed transaction batch");
        Ok(inserted)
    }

    /// Insert `rows` and apply one aggregated balance delta per account,
    /// inside a transaction owned by the caller
    ///
    /// Every row is validated before anything is written. Rows are inserted
    /// with multi-row statements of at most `batch_size` rows.
    ///
    /// # Errors
    ///
    /// `Validation` for a zero `batch_size`, a malformed row, an inactive
    /// account or a balance overflow; `NotFound` for a missing reference.
    /// The caller must not commit after an error.
    pub fn create_batch_in(
        conn: &Connection,
        rows: Vec<NewTransaction>,
        batch_size: usize,
    ) -> LedgerResult<usize> {
        if batch_size == 0 {
            return Err(LedgerError::Validation(
                "Batch size must be greater than zero".into(),
            ));
        }
        if rows.is_empty() {
            return Ok(0);
        }

        let mut references = References::new(conn);
        let mut deltas: BTreeMap<AccountId, Money> = BTreeMap::new();
        let mut normalized = Vec::with_capacity(rows.len());

        for (index, row) in rows.into_iter().enumerate() {
            let row = row.normalized();
            row.validate()
                .map_err(|e| LedgerError::Validation(format!("Row {}: {}", index + 1, e)))?;
            references.check(row.account_id, row.category_id, row.transfer_account_id, true)?;

            let delta = deltas.entry(row.account_id).or_insert_with(Money::zero);
            *delta = delta.checked_add(row.amount).ok_or_else(|| {
                LedgerError::Validation(format!("Balance overflow on account {}", row.account_id))
            })?;

            normalized.push(row);
        }

        let inserted = TransactionRepository::new(conn).insert_many(&normalized, batch_size)?;

        let accounts = AccountRepository::new(conn);
        for (account_id, delta) in &deltas {
            accounts.apply_delta(*account_id, *delta)?;
        }

        debug!(rows = inserted, accounts = deltas.len(), "Inserted batch");
        Ok(inserted)
    }

    /// Apply a partial edit and rebalance the affected account(s)
    pub fn update(&self, id: TransactionId, changes: UpdateTransaction) -> LedgerResult<Transaction> {
        let tx = self.storage.begin()?;
        let transactions = TransactionRepository::new(&tx);

        let before = transactions
            .get(id)?
            .ok_or_else(|| LedgerError::transaction_not_found(id.to_string()))?;

        let mut after = before.with_changes(&changes);
        after
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        let account_changed = after.account_id != before.account_id;
        References::new(&tx).check(
            after.account_id,
            after.category_id,
            after.transfer_account_id,
            account_changed,
        )?;

        after.updated_at = Utc::now();
        transactions.update(&after)?;

        let accounts = AccountRepository::new(&tx);
        if account_changed {
            accounts.apply_delta(before.account_id, -before.amount)?;
            accounts.apply_delta(after.account_id, after.amount)?;
        } else {
            let delta = after.amount.checked_sub(before.amount).ok_or_else(|| {
                LedgerError::Validation("Amount change overflows".into())
            })?;
            accounts.apply_delta(after.account_id, delta)?;
        }
        tx.commit()?;

        self.storage.log_update(
            EntityType::Transaction,
            id.to_string(),
            Some(after.label()),
            &before,
            &after,
        );

        Ok(after)
    }

    /// Delete a transaction and reverse its balance contribution
    pub fn delete(&self, id: TransactionId) -> LedgerResult<Transaction> {
        let tx = self.storage.begin()?;
        let transactions = TransactionRepository::new(&tx);

        let txn = transactions
            .get(id)?
            .ok_or_else(|| LedgerError::transaction_not_found(id.to_string()))?;

        transactions.delete(id)?;
        AccountRepository::new(&tx).apply_delta(txn.account_id, -txn.amount)?;
        tx.commit()?;

        self.storage.log_delete(
            EntityType::Transaction,
            id.to_string(),
            Some(txn.label()),
            &txn,
        );

        Ok(txn)
    }

    /// Mark as reconciled; an already reconciled transaction keeps its
    /// original reconciliation time
    pub fn reconcile(&self, id: TransactionId) -> LedgerResult<Transaction> {
        self.set_reconciled(id, true)
    }

    pub fn unreconcile(&self, id: TransactionId) -> LedgerResult<Transaction> {
        self.set_reconciled(id, false)
    }

    fn set_reconciled(&self, id: TransactionId, reconciled: bool) -> LedgerResult<Transaction> {
        let tx = self.storage.begin()?;
        let transactions = TransactionRepository::new(&tx);

        let before = transactions
            .get(id)?
            .ok_or_else(|| LedgerError::transaction_not_found(id.to_string()))?;
        transactions.set_reconciled(id, reconciled)?;
        let after = transactions
            .get(id)?
            .ok_or_else(|| LedgerError::transaction_not_found(id.to_string()))?;
        tx.commit()?;

        if before.is_reconciled != after.is_reconciled {
            self.storage.log_update(
                EntityType::Transaction,
                id.to_string(),
                Some(after.label()),
                &before,
                &after,
            );
        }

        Ok(after)
    }

    pub fn get(&self, id: TransactionId) -> LedgerResult<Option<Transaction>> {
        self.storage.transactions().get(id)
    }

    pub fn list(&self, filter: &TransactionFilter) -> LedgerResult<Vec<Transaction>> {
        self.storage.transactions().list(filter)
    }

    /// Inflow, outflow and net for an account or category over a date range
    pub fn totals(&self, scope: TotalsScope, dates: &DateRange) -> LedgerResult<Totals> {
        match scope {
            TotalsScope::Account(id) => {
                if self.storage.accounts().get(id)?.is_none() {
                    return Err(LedgerError::account_not_found(id.to_string()));
                }
            }
            TotalsScope::Category(id) => {
                if !self.storage.categories().exists(id)? {
                    return Err(LedgerError::category_not_found(id.to_string()));
                }
            }
        }

        self.storage.transactions().totals(scope, dates)
    }
}

/// Referential checks for transaction writes, remembering what has already
/// been verified so batches look each account up once
struct References<'c> {
    accounts: AccountRepository<'c>,
    categories: CategoryRepository<'c>,
    active_accounts: HashSet<AccountId>,
    known_accounts: HashSet<AccountId>,
    known_categories: HashSet<CategoryId>,
}

impl<'c> References<'c> {
    fn new(conn: &'c Connection) -> Self {
        Self {
            accounts: AccountRepository::new(conn),
            categories: CategoryRepository::new(conn),
            active_accounts: HashSet::new(),
            known_accounts: HashSet::new(),
            known_categories: HashSet::new(),
        }
    }

    fn check(
        &mut self,
        account_id: AccountId,
        category_id: Option<CategoryId>,
        transfer_account_id: Option<AccountId>,
        require_active: bool,
    ) -> LedgerResult<()> {
        if !self.active_accounts.contains(&account_id) {
            let account = self
                .accounts
                .get(account_id)?
                .ok_or_else(|| LedgerError::account_not_found(account_id.to_string()))?;
            self.known_accounts.insert(account_id);

            if account.is_active {
                self.active_accounts.insert(account_id);
            } else if require_active {
                return Err(LedgerError::Validation(format!(
                    "Account '{}' is inactive",
                    account.name
                )));
            }
        }

        if let Some(category_id) = category_id {
            if !self.known_categories.contains(&category_id) {
                if !self.categories.exists(category_id)? {
                    return Err(LedgerError::category_not_found(category_id.to_string()));
                }
                self.known_categories.insert(category_id);
            }
        }

        if let Some(other) = transfer_account_id {
            if !self.known_accounts.contains(&other) {
                if self.accounts.get(other)?.is_none() {
                    return Err(LedgerError::account_not_found(other.to_string()));
                }
                self.known_accounts.insert(other);
            }
        }

        Ok(())
    }
}
