//! Core data models for the ledger
//!
//! Accounts, categories, transactions and import history, plus the `Money`
//! type every amount is expressed in.

pub mod account;
pub mod category;
pub mod ids;
pub mod import_history;
pub mod money;
pub mod transaction;

pub use account::{Account, AccountValidationError, BalanceCheck};
pub use category::Category;
pub use ids::{AccountId, CategoryId, ImportId, TransactionId};
pub use import_history::{ImportHistory, NewImportHistory};
pub use money::{Money, MoneyParseError};
pub use transaction::{
    NewTransaction, Transaction, TransactionType, TransactionValidationError, UpdateTransaction,
};
