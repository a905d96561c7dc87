//! Transaction repository
//!
//! Row-level access to the `transactions` table. Nothing here touches account
//! balances; pairing row writes with balance deltas inside one database
//! transaction is the job of `services::transaction`.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{ToSql, Type};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    AccountId, CategoryId, ImportId, Money, NewTransaction, Transaction, TransactionId,
    TransactionType,
};

const SELECT_COLUMNS: &str = "id, account_id, amount, date, type, category_id, \
     transfer_account_id, payee, description, tags, is_reconciled, reconciled_at, import_id, \
     created_at, updated_at";

const INSERT_COLUMNS: &str = "account_id, amount, date, type, category_id, transfer_account_id, \
     payee, description, tags, import_id, created_at, updated_at";

/// Bound parameters per inserted row; must match `INSERT_COLUMNS`
const INSERT_COLUMN_COUNT: usize = 12;

/// SQLite's default `SQLITE_MAX_VARIABLE_NUMBER` for the bundled library
const MAX_BIND_PARAMS: usize = 32_766;

/// Inclusive date range; an open end is unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }
}

/// Filters for listing transactions. Every set field narrows the result.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub account_id: Option<AccountId>,
    pub category_id: Option<CategoryId>,
    pub kind: Option<TransactionType>,
    pub dates: DateRange,
    /// Case-insensitive substring of the payee
    pub payee: Option<String>,
    pub reconciled: Option<bool>,
    pub import_id: Option<ImportId>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl TransactionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn kind(mut self, kind: TransactionType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn date_range(mut self, dates: DateRange) -> Self {
        self.dates = dates;
        self
    }

    pub fn payee(mut self, needle: impl Into<String>) -> Self {
        self.payee = Some(needle.into());
        self
    }

    pub fn reconciled(mut self, reconciled: bool) -> Self {
        self.reconciled = Some(reconciled);
        self
    }

    pub fn import(mut self, import_id: ImportId) -> Self {
        self.import_id = Some(import_id);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// What a totals query aggregates over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalsScope {
    Account(AccountId),
    Category(CategoryId),
}

/// Aggregate sums in minor units. `outflow` is a magnitude (never negative)
/// and `net == inflow - outflow`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub inflow: Money,
    pub outflow: Money,
    pub net: Money,
    pub count: usize,
}

pub struct TransactionRepository<'c> {
    conn: &'c Connection,
}

impl<'c> TransactionRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Insert one row and return it as stored
    pub fn insert(&self, new: &NewTransaction) -> LedgerResult<Transaction> {
        let now = Utc::now();
        let tags = serde_json::to_string(&new.tags)?;
        self.conn.execute(
            &format!(
                "INSERT INTO transactions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
                INSERT_COLUMNS
            ),
            params![
                new.account_id,
                new.amount,
                new.date,
                new.kind,
                new.category_id,
                new.transfer_account_id,
                new.payee,
                new.description,
                tags,
                new.import_id,
                now,
            ],
        )?;

        Ok(materialize(
            TransactionId::new(self.conn.last_insert_rowid()),
            new,
            now,
        ))
    }

    /// Insert many rows using multi-row `INSERT` statements of at most
    /// `batch_size` rows each. Returns the number of rows inserted.
    pub fn insert_many(&self, rows: &[NewTransaction], batch_size: usize) -> LedgerResult<usize> {
        if batch_size == 0 {
            return Err(LedgerError::Validation(
                "Batch size must be greater than zero".into(),
            ));
        }

        let chunk_size = batch_size.min(MAX_BIND_PARAMS / INSERT_COLUMN_COUNT);
        let now = Utc::now();
        let mut inserted = 0;

        for chunk in rows.chunks(chunk_size) {
            let tags = chunk
                .iter()
                .map(|t| serde_json::to_string(&t.tags))
                .collect::<Result<Vec<_>, _>>()?;

            let mut values: Vec<&dyn ToSql> = Vec::with_capacity(chunk.len() * INSERT_COLUMN_COUNT);
            for (txn, tags) in chunk.iter().zip(&tags) {
                let row: [&dyn ToSql; INSERT_COLUMN_COUNT] = [
                    &txn.account_id,
                    &txn.amount,
                    &txn.date,
                    &txn.kind,
                    &txn.category_id,
                    &txn.transfer_account_id,
                    &txn.payee,
                    &txn.description,
                    tags,
                    &txn.import_id,
                    &now,
                    &now,
                ];
                values.extend_from_slice(&row);
            }

            let mut stmt = self.conn.prepare_cached(&multi_insert_sql(chunk.len()))?;
            inserted += stmt.execute(values.as_slice())?;
            debug!(rows = chunk.len(), "Inserted transaction chunk");
        }

        Ok(inserted)
    }

    pub fn get(&self, id: TransactionId) -> LedgerResult<Option<Transaction>> {
        let sql = format!("SELECT {} FROM transactions WHERE id = ?1", SELECT_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, [id], row_to_transaction)
            .optional()?)
    }

    /// Overwrite the editable columns of an existing row
    pub fn update(&self, txn: &Transaction) -> LedgerResult<()> {
        let tags = serde_json::to_string(&txn.tags)?;
        let changed = self.conn.execute(
            "UPDATE transactions SET account_id = ?1, amount = ?2, date = ?3, type = ?4,
                 category_id = ?5, transfer_account_id = ?6, payee = ?7, description = ?8,
                 tags = ?9, updated_at = ?10
             WHERE id = ?11",
            params![
                txn.account_id,
                txn.amount,
                txn.date,
                txn.kind,
                txn.category_id,
                txn.transfer_account_id,
                txn.payee,
                txn.description,
                tags,
                txn.updated_at,
                txn.id,
            ],
        )?;

        if changed == 0 {
            return Err(LedgerError::transaction_not_found(txn.id.to_string()));
        }
        Ok(())
    }

    /// Returns false if the row did not exist
    pub fn delete(&self, id: TransactionId) -> LedgerResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM transactions WHERE id = ?1", [id])?;
        Ok(changed == 1)
    }

    /// Set or clear the reconciled flag. Re-reconciling keeps the first
    /// reconciliation timestamp. Returns false if the row did not exist.
    pub fn set_reconciled(&self, id: TransactionId, reconciled: bool) -> LedgerResult<bool> {
        let now = Utc::now();
        let changed = if reconciled {
            self.conn.execute(
                "UPDATE transactions
                 SET is_reconciled = 1, reconciled_at = COALESCE(reconciled_at, ?1), updated_at = ?1
                 WHERE id = ?2",
                params![now, id],
            )?
        } else {
            self.conn.execute(
                "UPDATE transactions
                 SET is_reconciled = 0, reconciled_at = NULL, updated_at = ?1
                 WHERE id = ?2",
                params![now, id],
            )?
        };
        Ok(changed == 1)
    }

    /// Rows matching `filter`, newest date first, ties broken by id descending
    pub fn list(&self, filter: &TransactionFilter) -> LedgerResult<Vec<Transaction>> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(account_id) = filter.account_id {
            conditions.push("account_id = ?");
            values.push(Box::new(account_id));
        }
        if let Some(category_id) = filter.category_id {
            conditions.push("category_id = ?");
            values.push(Box::new(category_id));
        }
        if let Some(kind) = filter.kind {
            conditions.push("type = ?");
            values.push(Box::new(kind));
        }
        push_date_conditions(&filter.dates, &mut conditions, &mut values);
        if let Some(needle) = &filter.payee {
            conditions.push("instr(lower(COALESCE(payee, '')), lower(?)) > 0");
            values.push(Box::new(needle.clone()));
        }
        if let Some(reconciled) = filter.reconciled {
            conditions.push("is_reconciled = ?");
            values.push(Box::new(reconciled));
        }
        if let Some(import_id) = filter.import_id {
            conditions.push("import_id = ?");
            values.push(Box::new(import_id));
        }

        let mut sql = format!("SELECT {} FROM transactions", SELECT_COLUMNS);
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY date DESC, id DESC");

        if filter.limit.is_some() || filter.offset.is_some() {
            // SQLite needs a LIMIT before OFFSET; -1 means no limit
            sql.push_str(" LIMIT ? OFFSET ?");
            values.push(Box::new(filter.limit.map_or(-1, |l| l as i64)));
            values.push(Box::new(filter.offset.unwrap_or(0) as i64));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(values.iter()), row_to_transaction)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Inflow, outflow and count summed in SQL over integer minor units
    pub fn totals(&self, scope: TotalsScope, dates: &DateRange) -> LedgerResult<Totals> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        match scope {
            TotalsScope::Account(id) => {
                conditions.push("account_id = ?");
                values.push(Box::new(id));
            }
            TotalsScope::Category(id) => {
                conditions.push("category_id = ?");
                values.push(Box::new(id));
            }
        }
        push_date_conditions(dates, &mut conditions, &mut values);

        let sql = format!(
            "SELECT COALESCE(SUM(CASE WHEN amount > 0 THEN amount ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN amount < 0 THEN -amount ELSE 0 END), 0),
                    COUNT(*)
             FROM transactions WHERE {}",
            conditions.join(" AND ")
        );

        let (inflow, outflow, count): (Money, Money, i64) = self.conn.query_row(
            &sql,
            rusqlite::params_from_iter(values.iter()),
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(Totals {
            inflow,
            outflow,
            net: inflow - outflow,
            count: count as usize,
        })
    }

    /// Whether a persisted row on `account_id` has the same date, amount
    /// and description
    pub fn exists_duplicate(
        &self,
        account_id: AccountId,
        date: NaiveDate,
        amount: Money,
        description: Option<&str>,
    ) -> LedgerResult<bool> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT 1 FROM transactions
             WHERE account_id = ?1 AND date = ?2 AND amount = ?3 AND description IS ?4
             LIMIT 1",
        )?;
        Ok(stmt
            .query_row(params![account_id, date, amount, description], |_| Ok(()))
            .optional()?
            .is_some())
    }

    pub fn count(&self) -> LedgerResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn push_date_conditions(
    dates: &DateRange,
    conditions: &mut Vec<&str>,
    values: &mut Vec<Box<dyn ToSql>>,
) {
    if let Some(start) = dates.start {
        conditions.push("date >= ?");
        values.push(Box::new(start));
    }
    if let Some(end) = dates.end {
        conditions.push("date <= ?");
        values.push(Box::new(end));
    }
}

fn multi_insert_sql(rows: usize) -> String {
    let row = format!("({})", vec!["?"; INSERT_COLUMN_COUNT].join(", "));
    format!(
        "INSERT INTO transactions ({}) VALUES {}",
        INSERT_COLUMNS,
        vec![row.as_str(); rows].join(", ")
    )
}

fn materialize(id: TransactionId, new: &NewTransaction, now: DateTime<Utc>) -> Transaction {
    Transaction {
        id,
        account_id: new.account_id,
        amount: new.amount,
        date: new.date,
        kind: new.kind,
        category_id: new.category_id,
        transfer_account_id: new.transfer_account_id,
        payee: new.payee.clone(),
        description: new.description.clone(),
        tags: new.tags.clone(),
        is_reconciled: false,
        reconciled_at: None,
        import_id: new.import_id,
        created_at: now,
        updated_at: now,
    }
}

fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let tags_json: String = row.get(9)?;
    let tags = serde_json::from_str(&tags_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?;

    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        amount: row.get(2)?,
        date: row.get(3)?,
        kind: row.get(4)?,
        category_id: row.get(5)?,
        transfer_account_id: row.get(6)?,
        payee: row.get(7)?,
        description: row.get(8)?,
        tags,
        is_reconciled: row.get(10)?,
        reconciled_at: row.get(11)?,
        import_id: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}
