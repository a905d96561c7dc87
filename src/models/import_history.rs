//! Import history model
//!
//! One row per committed CSV import, keyed by the SHA-256 of the file content.
//! Rows are write-once: the presence of a hash blocks importing the same
//! bytes again, whatever the file is called.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AccountId, ImportId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportHistory {
    pub id: ImportId,
    /// Lowercase hex SHA-256 of the imported file's bytes
    pub file_hash: String,
    /// Name the file had when it was imported; informational only
    pub file_name: Option<String>,
    pub account_id: Option<AccountId>,
    pub total_records: usize,
    pub imported_records: usize,
    pub skipped_records: usize,
    pub failed_records: usize,
    pub imported_at: DateTime<Utc>,
}

/// Unsaved import history row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImportHistory {
    pub file_hash: String,
    pub file_name: Option<String>,
    pub account_id: Option<AccountId>,
    pub total_records: usize,
    pub imported_records: usize,
    pub skipped_records: usize,
    pub failed_records: usize,
}

impl ImportHistory {
    /// First 12 hex characters of the hash, for display
    pub fn short_hash(&self) -> &str {
        let end = self.file_hash.len().min(12);
        &self.file_hash[..end]
    }
}
