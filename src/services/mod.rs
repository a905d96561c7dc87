//! Service layer
//!
//! Services borrow a [`Storage`](crate::storage::Storage) and own the
//! business rules: validation, transactional balance maintenance, CSV import
//! and audit logging.

pub mod account;
pub mod category;
pub mod import;
pub mod import_history;
pub mod transaction;

pub use account::AccountService;
pub use category::CategoryService;
pub use import::{
    ColumnMapping, ImportOptions, ImportResult, ImportService, RecordError, SignConvention,
};
pub use import_history::ImportHistoryService;
pub use transaction::TransactionService;
pub use crate::storage::{DateRange, Totals, TotalsScope, TransactionFilter};
