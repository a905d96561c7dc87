//! Account repository
//!
//! Balances are only ever changed through [`AccountRepository::apply_delta`],
//! a relative `UPDATE`, so two writers can never lose each other's change.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, AccountId, Money};

const COLUMNS: &str =
    "id, name, initial_balance, current_balance, is_active, created_at, updated_at";

pub struct AccountRepository<'c> {
    conn: &'c Connection,
}

impl<'c> AccountRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Insert a new account whose current balance starts at `initial_balance`
    pub fn insert(&self, name: &str, initial_balance: Money) -> LedgerResult<Account> {
        let now = Utc::now();
        let result = self.conn.execute(
            "INSERT INTO accounts (name, initial_balance, current_balance, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?2, 1, ?3, ?3)",
            params![name, initial_balance, now],
        );

        match result {
            Ok(_) => {}
            Err(e) if super::is_unique_violation(&e) => {
                return Err(LedgerError::Duplicate {
                    entity_type: "Account",
                    identifier: name.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Account {
            id: AccountId::new(self.conn.last_insert_rowid()),
            name: name.to_string(),
            initial_balance,
            current_balance: initial_balance,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get(&self, id: AccountId) -> LedgerResult<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE id = ?1", COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, [id], row_to_account)
            .optional()?)
    }

    /// Case-insensitive lookup by name
    pub fn get_by_name(&self, name: &str) -> LedgerResult<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE name = ?1", COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, [name.trim()], row_to_account)
            .optional()?)
    }

    /// All accounts ordered by name
    pub fn list(&self, include_inactive: bool) -> LedgerResult<Vec<Account>> {
        let sql = if include_inactive {
            format!("SELECT {} FROM accounts ORDER BY name", COLUMNS)
        } else {
            format!(
                "SELECT {} FROM accounts WHERE is_active = 1 ORDER BY name",
                COLUMNS
            )
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let accounts = stmt
            .query_map([], row_to_account)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(accounts)
    }

    /// Returns false if no such account exists
    pub fn set_active(&self, id: AccountId, active: bool) -> LedgerResult<bool> {
        let changed = self.conn.execute(
            "UPDATE accounts SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            params![active, Utc::now(), id],
        )?;
        Ok(changed == 1)
    }

    /// `current_balance = current_balance + delta`
    ///
    /// # Errors
    ///
    /// `NotFound` if the account row does not exist. The caller's
    /// transaction must then be abandoned.
    pub fn apply_delta(&self, id: AccountId, delta: Money) -> LedgerResult<()> {
        if delta.is_zero() {
            return Ok(());
        }

        let changed = self.conn.execute(
            "UPDATE accounts SET current_balance = current_balance + ?1, updated_at = ?2 WHERE id = ?3",
            params![delta, Utc::now(), id],
        )?;

        if changed == 0 {
            return Err(LedgerError::account_not_found(id.to_string()));
        }

        debug!(account = %id, delta = delta.cents(), "Applied balance delta");
        Ok(())
    }

    /// Initial balance plus the sum of every transaction row on the account
    pub fn computed_balance(&self, id: AccountId) -> LedgerResult<Option<Money>> {
        Ok(self
            .conn
            .query_row(
                "SELECT a.initial_balance + COALESCE(
                     (SELECT SUM(t.amount) FROM transactions t WHERE t.account_id = a.id), 0)
                 FROM accounts a WHERE a.id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()?)
    }
}

fn row_to_account(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        initial_balance: row.get(2)?,
        current_balance: row.get(3)?,
        is_active: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
