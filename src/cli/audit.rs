//! Audit log CLI command

use clap::Args;

use super::print_json;
use crate::error::LedgerResult;
use crate::storage::Storage;

/// Arguments for `ledger audit`
#[derive(Args)]
pub struct AuditArgs {
    /// Number of most recent entries to show
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
    /// Print raw JSON entries
    #[arg(long)]
    pub json: bool,
}

/// Show the tail of the audit log
pub fn handle_audit_command(storage: &Storage, args: AuditArgs) -> LedgerResult<()> {
    let Some(logger) = storage.audit_logger() else {
        println!("Audit logging is not enabled for this database.");
        return Ok(());
    };

    let entries = logger.read_recent(args.limit)?;
    if args.json {
        return print_json(&entries);
    }

    if entries.is_empty() {
        println!("No audit entries yet.");
        return Ok(());
    }
    for entry in &entries {
        println!("{}", entry.format_human_readable());
    }

    Ok(())
}
