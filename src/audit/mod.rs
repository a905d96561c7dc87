//! Audit logging
//!
//! Every committed create, update, delete and import is appended to a
//! line-delimited JSON file. Entries are written only after the database
//! transaction commits, so a rolled-back operation leaves no trace here.

mod entry;
mod logger;

pub use entry::{AuditEntry, EntityType, Operation};
pub use logger::AuditLogger;
