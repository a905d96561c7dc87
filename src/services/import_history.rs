//! Import history service
//!
//! Read-only view over committed imports; rows are written by the importer.

use crate::error::{LedgerError, LedgerResult};
use crate::models::{ImportHistory, ImportId, Transaction};
use crate::storage::{Storage, TransactionFilter};

pub struct ImportHistoryService<'a> {
    storage: &'a Storage,
}

impl<'a> ImportHistoryService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn find_by_hash(&self, file_hash: &str) -> LedgerResult<Option<ImportHistory>> {
        self.storage.import_history().find_by_hash(file_hash.trim())
    }

    pub fn get(&self, id: ImportId) -> LedgerResult<Option<ImportHistory>> {
        self.storage.import_history().get(id)
    }

    /// Newest first
    pub fn list(&self) -> LedgerResult<Vec<ImportHistory>> {
        self.storage.import_history().list()
    }

    /// Transactions created by an import that still exist
    pub fn transactions_for(&self, id: ImportId) -> LedgerResult<Vec<Transaction>> {
        if self.get(id)?.is_none() {
            return Err(LedgerError::import_not_found(id.to_string()));
        }
        self.storage
            .transactions()
            .list(&TransactionFilter::new().import(id))
    }
}
