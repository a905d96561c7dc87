//! ledger-cli - personal ledger with idempotent CSV import
//!
//! Accounts and transactions live in a local SQLite database. Amounts are
//! integer minor units, every balance-affecting write runs in one database
//! transaction, and a CSV file whose exact content was imported before is
//! refused.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Core data models (accounts, transactions, categories, imports)
//! - `storage`: SQLite storage layer and repositories
//! - `services`: Business logic layer, including the CSV importer
//! - `audit`: Audit logging system
//! - `display`: Terminal formatting
//! - `cli`: Command handlers for the `ledger` binary
//!
//! # Example
//!
//! ```rust,no_run
//! use ledger_cli::models::Money;
//! use ledger_cli::services::{AccountService, ImportOptions, ImportService};
//! use ledger_cli::storage::Storage;
//!
//! # fn main() -> ledger_cli::error::LedgerResult<()> {
//! let storage = Storage::open_in_memory()?;
//! let account = AccountService::new(&storage).create("Checking", Money::zero())?;
//!
//! let csv = "date,amount,description\n2024-01-02,-3.50,Coffee\n";
//! let result = ImportService::new(&storage).import_reader(
//!     csv.as_bytes(),
//!     Some("jan.csv"),
//!     &ImportOptions::new(account.id),
//! )?;
//! assert_eq!(result.imported_records, 1);
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

pub use error::LedgerError;
