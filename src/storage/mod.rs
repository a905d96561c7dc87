//! SQLite storage layer
//!
//! `Storage` owns the connection and the optional audit logger. Repositories
//! are thin borrowed views over a `Connection`, so the same repository code
//! runs against the plain connection or against an open
//! `rusqlite::Transaction` (which derefs to `Connection`).

pub mod accounts;
pub mod categories;
pub mod import_history;
pub mod init;
pub mod transactions;

pub use accounts::AccountRepository;
pub use categories::CategoryRepository;
pub use import_history::ImportHistoryRepository;
pub use transactions::{DateRange, Totals, TotalsScope, TransactionFilter, TransactionRepository};

use std::path::Path;

use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use tracing::warn;

use crate::audit::{AuditEntry, AuditLogger, EntityType};
use crate::config::LedgerPaths;
use crate::error::LedgerResult;

pub struct Storage {
    conn: Connection,
    audit: Option<AuditLogger>,
}

impl Storage {
    /// Open (creating if needed) the database under the ledger's base directory,
    /// with the audit log next to it
    pub fn open(paths: &LedgerPaths) -> LedgerResult<Self> {
        paths.ensure_directories()?;
        let mut storage = Self::open_path(paths.database_file())?;
        storage.audit = Some(AuditLogger::new(paths.audit_log()));
        Ok(storage)
    }

    /// Open a database file without an audit log
    pub fn open_path(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        init::initialize_connection(&conn, true)?;
        Ok(Self { conn, audit: None })
    }

    /// A fresh private database; used by tests and dry runs
    pub fn open_in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        init::initialize_connection(&conn, false)?;
        Ok(Self { conn, audit: None })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin an IMMEDIATE transaction. The write lock is taken up front so a
    /// read-then-write sequence inside it cannot interleave with another
    /// writer. Dropping the returned value without `commit` rolls back.
    pub fn begin(&self) -> LedgerResult<rusqlite::Transaction<'_>> {
        Ok(rusqlite::Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    pub fn accounts(&self) -> AccountRepository<'_> {
        AccountRepository::new(&self.conn)
    }

    pub fn categories(&self) -> CategoryRepository<'_> {
        CategoryRepository::new(&self.conn)
    }

    pub fn transactions(&self) -> TransactionRepository<'_> {
        TransactionRepository::new(&self.conn)
    }

    pub fn import_history(&self) -> ImportHistoryRepository<'_> {
        ImportHistoryRepository::new(&self.conn)
    }

    pub fn audit_logger(&self) -> Option<&AuditLogger> {
        self.audit.as_ref()
    }

    pub fn log_create<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) {
        if self.audit.is_some() {
            self.record(&[AuditEntry::create(entity_type, entity_id, entity_name, entity)]);
        }
    }

    pub fn log_update<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        before: &T,
        after: &T,
    ) {
        if self.audit.is_some() {
            self.record(&[AuditEntry::update(
                entity_type,
                entity_id,
                entity_name,
                before,
                after,
            )]);
        }
    }

    pub fn log_delete<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) {
        if self.audit.is_some() {
            self.record(&[AuditEntry::delete(entity_type, entity_id, entity_name, entity)]);
        }
    }

    pub fn log_import<T: Serialize>(
        &self,
        entity_id: impl Into<String>,
        file_name: Option<String>,
        summary: &T,
    ) {
        if self.audit.is_some() {
            self.record(&[AuditEntry::import(entity_id, file_name, summary)]);
        }
    }

    /// Audit entries are written after the database commit; a failed write
    /// cannot undo the commit, so it is reported and swallowed.
    fn record(&self, entries: &[AuditEntry]) {
        if let Some(logger) = &self.audit {
            if let Err(e) = logger.log_batch(entries) {
                warn!(error = %e, path = %logger.path().display(), "Failed to write audit entry");
            }
        }
    }
}

/// True when `err` is a UNIQUE constraint failure
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Money;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_database_and_audit_path() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().join("ledger"));

        let storage = Storage::open(&paths).unwrap();

        assert!(paths.database_file().exists());
        assert_eq!(
            storage.audit_logger().map(|l| l.path().clone()),
            Some(paths.audit_log())
        );
    }

    #[test]
    fn test_in_memory_has_no_audit() {
        let storage = Storage::open_in_memory().unwrap();
        assert!(storage.audit_logger().is_none());
    }

    #[test]
    fn test_dropped_transaction_rolls_back() {
        let storage = Storage::open_in_memory().unwrap();
        {
            let tx = storage.begin().unwrap();
            AccountRepository::new(&tx)
                .insert("Checking", Money::from_cents(100))
                .unwrap();
        }
        assert!(storage.accounts().list(true).unwrap().is_empty());

        let tx = storage.begin().unwrap();
        AccountRepository::new(&tx)
            .insert("Checking", Money::from_cents(100))
            .unwrap();
        tx.commit().unwrap();
        assert_eq!(storage.accounts().list(true).unwrap().len(), 1);
    }

    #[test]
    fn test_data_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());

        {
            let storage = Storage::open(&paths).unwrap();
            storage.accounts().insert("Savings", Money::zero()).unwrap();
        }

        let storage = Storage::open(&paths).unwrap();
        assert!(storage.accounts().get_by_name("savings").unwrap().is_some());
    }
}
