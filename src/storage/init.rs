//! Schema creation and connection setup
//!
//! The schema version is tracked in `PRAGMA user_version`; a fresh database
//! is at version 0 and is brought to [`SCHEMA_VERSION`] on open.

use std::time::Duration;

use rusqlite::Connection;
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};

pub const SCHEMA_VERSION: i64 = 1;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA_V1: &str = "
CREATE TABLE accounts (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL UNIQUE COLLATE NOCASE,
    initial_balance INTEGER NOT NULL DEFAULT 0,
    current_balance INTEGER NOT NULL DEFAULT 0,
    is_active       INTEGER NOT NULL DEFAULT 1,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE categories (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL UNIQUE COLLATE NOCASE,
    parent_id  INTEGER REFERENCES categories(id),
    created_at TEXT NOT NULL
);

CREATE TABLE import_history (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    file_hash        TEXT NOT NULL UNIQUE,
    file_name        TEXT,
    account_id       INTEGER REFERENCES accounts(id),
    total_records    INTEGER NOT NULL,
    imported_records INTEGER NOT NULL,
    skipped_records  INTEGER NOT NULL,
    failed_records   INTEGER NOT NULL,
    imported_at      TEXT NOT NULL
);

CREATE TABLE transactions (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id          INTEGER NOT NULL REFERENCES accounts(id),
    amount              INTEGER NOT NULL,
    date                TEXT NOT NULL,
    type                TEXT NOT NULL CHECK (type IN ('income', 'expense', 'transfer')),
    category_id         INTEGER REFERENCES categories(id),
    transfer_account_id INTEGER REFERENCES accounts(id),
    payee               TEXT,
    description         TEXT,
    tags                TEXT NOT NULL DEFAULT '[]',
    is_reconciled       INTEGER NOT NULL DEFAULT 0,
    reconciled_at       TEXT,
    import_id           INTEGER REFERENCES import_history(id),
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

CREATE INDEX idx_transactions_account_date ON transactions(account_id, date);
CREATE INDEX idx_transactions_category ON transactions(category_id);
CREATE INDEX idx_transactions_import ON transactions(import_id);
";

/// Apply pragmas and bring the schema up to date
pub fn initialize_connection(conn: &Connection, file_backed: bool) -> LedgerResult<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    if file_backed {
        // WAL returns the resulting mode as a row, so it goes through query_row
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        debug!(journal_mode = %mode, "Opened database");
    }

    migrate(conn)
}

fn migrate(conn: &Connection) -> LedgerResult<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version > SCHEMA_VERSION {
        return Err(LedgerError::Config(format!(
            "Database schema version {} is newer than supported version {}",
            version, SCHEMA_VERSION
        )));
    }

    if version < 1 {
        debug!("Creating schema version 1");
        conn.execute_batch(&format!(
            "BEGIN;\n{}\nPRAGMA user_version = 1;\nCOMMIT;",
            SCHEMA_V1
        ))?;
    }

    Ok(())
}

pub fn schema_version(conn: &Connection) -> LedgerResult<i64> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}
