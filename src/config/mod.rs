//! Configuration module
//!
//! - Path resolution (`LEDGER_DATA_DIR` override, XDG defaults)
//! - User settings persistence

pub mod paths;
pub mod settings;

pub use paths::LedgerPaths;
pub use settings::{ImportDefaults, Settings};
