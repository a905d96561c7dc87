//! Import history repository
//!
//! Rows are insert-only. `file_hash` carries a UNIQUE constraint so a second
//! importer racing on the same content fails at insert time even if its
//! earlier lookup saw nothing.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{ImportHistory, ImportId, NewImportHistory};

const COLUMNS: &str = "id, file_hash, file_name, account_id, total_records, imported_records, \
                       skipped_records, failed_records, imported_at";

pub struct ImportHistoryRepository<'c> {
    conn: &'c Connection,
}

impl<'c> ImportHistoryRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// # Errors
    ///
    /// `AlreadyImported` if a row with the same hash exists.
    pub fn insert(&self, new: &NewImportHistory) -> LedgerResult<ImportHistory> {
        let now = Utc::now();
        let result = self.conn.execute(
            "INSERT INTO import_history (file_hash, file_name, account_id, total_records,
                 imported_records, skipped_records, failed_records, imported_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                new.file_hash,
                new.file_name,
                new.account_id,
                new.total_records as i64,
                new.imported_records as i64,
                new.skipped_records as i64,
                new.failed_records as i64,
                now,
            ],
        );

        match result {
            Ok(_) => {}
            Err(e) if super::is_unique_violation(&e) => {
                let import_id = self
                    .find_by_hash(&new.file_hash)?
                    .map(|existing| existing.id)
                    .unwrap_or(ImportId::new(0));
                return Err(LedgerError::AlreadyImported {
                    hash: new.file_hash.clone(),
                    import_id,
                });
            }
            Err(e) => return Err(e.into()),
        }

        Ok(ImportHistory {
            id: ImportId::new(self.conn.last_insert_rowid()),
            file_hash: new.file_hash.clone(),
            file_name: new.file_name.clone(),
            account_id: new.account_id,
            total_records: new.total_records,
            imported_records: new.imported_records,
            skipped_records: new.skipped_records,
            failed_records: new.failed_records,
            imported_at: now,
        })
    }

    pub fn find_by_hash(&self, file_hash: &str) -> LedgerResult<Option<ImportHistory>> {
        let sql = format!("SELECT {} FROM import_history WHERE file_hash = ?1", COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, [file_hash], row_to_history)
            .optional()?)
    }

    pub fn get(&self, id: ImportId) -> LedgerResult<Option<ImportHistory>> {
        let sql = format!("SELECT {} FROM import_history WHERE id = ?1", COLUMNS);
        Ok(self.conn.query_row(&sql, [id], row_to_history).optional()?)
    }

    /// Newest first
    pub fn list(&self) -> LedgerResult<Vec<ImportHistory>> {
        let sql = format!(
            "SELECT {} FROM import_history ORDER BY imported_at DESC, id DESC",
            COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], row_to_history)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn row_to_history(row: &Row<'_>) -> rusqlite::Result<ImportHistory> {
    Ok(ImportHistory {
        id: row.get(0)?,
        file_hash: row.get(1)?,
        file_name: row.get(2)?,
        account_id: row.get(3)?,
        total_records: row.get::<_, i64>(4)? as usize,
        imported_records: row.get::<_, i64>(5)? as usize,
        skipped_records: row.get::<_, i64>(6)? as usize,
        failed_records: row.get::<_, i64>(7)? as usize,
        imported_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;

    fn new_history(hash: &str) -> NewImportHistory {
        NewImportHistory {
            file_hash: hash.to_string(),
            file_name: Some("bank.csv".into()),
            account_id: None,
            total_records: 3,
            imported_records: 2,
            skipped_records: 0,
            failed_records: 1,
        }
    }

    #[test]
    fn test_insert_and_find() {
        let storage = Storage::open_in_memory().unwrap();
        let repo = storage.import_history();

        let saved = repo.insert(&new_history("abc")).unwrap();
        let found = repo.find_by_hash("abc").unwrap().unwrap();

        assert_eq!(found.id, saved.id);
        assert_eq!(found.failed_records, 1);
        assert!(repo.find_by_hash("def").unwrap().is_none());
        assert_eq!(repo.get(saved.id).unwrap().unwrap().file_hash, "abc");
    }

    #[test]
    fn test_duplicate_hash_is_already_imported() {
        let storage = Storage::open_in_memory().unwrap();
        let repo = storage.import_history();

        let first = repo.insert(&new_history("abc")).unwrap();
        let err = repo.insert(&new_history("abc")).unwrap_err();

        match err {
            LedgerError::AlreadyImported { hash, import_id } => {
                assert_eq!(hash, "abc");
                assert_eq!(import_id, first.id);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_list_newest_first() {
        let storage = Storage::open_in_memory().unwrap();
        let repo = storage.import_history();

        let a = repo.insert(&new_history("a")).unwrap();
        let b = repo.insert(&new_history("b")).unwrap();

        let ids: Vec<_> = repo.list().unwrap().into_iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }
}
