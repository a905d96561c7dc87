//! Import result and history formatting

use super::{truncate, DisplayFormat};
use crate::models::{ImportHistory, Money};
use crate::services::ImportResult;

/// Summary of an import or dry run, followed by any record errors
pub fn format_import_result(result: &ImportResult, fmt: &DisplayFormat) -> String {
    let mut output = String::new();

    if result.dry_run {
        output.push_str("Dry run - nothing was written.\n");
    }
    output.push_str(&format!("Records:  {}\n", result.total_records));
    output.push_str(&format!(
        "{} {}\n",
        if result.dry_run { "Would import:" } else { "Imported:" },
        result.imported_records
    ));
    output.push_str(&format!("Skipped:  {}\n", result.skipped_records));
    output.push_str(&format!("Failed:   {}\n", result.failed_records));

    let net: Money = result.transactions.iter().map(|t| t.amount).sum();
    output.push_str(&format!("Net:      {}\n", fmt.money(net)));

    if let Some(id) = result.import_id {
        output.push_str(&format!("Import:   {}\n", id));
    }
    if let Some(hash) = &result.file_hash {
        output.push_str(&format!("SHA-256:  {}\n", hash));
    }

    if !result.errors.is_empty() {
        output.push_str("\nErrors:\n");
        for error in &result.errors {
            output.push_str(&format!("  line {}: {}\n", error.line, error.message));
            if !error.raw.is_empty() {
                output.push_str(&format!("    {}\n", truncate(&error.raw, 70)));
            }
        }
    }

    output
}

/// Import history table, in the order given
pub fn format_import_history(history: &[ImportHistory]) -> String {
    if history.is_empty() {
        return "No imports yet.\n".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:<8} {:<16} {:<12} {:<24} {:>6} {:>6} {:>6}\n",
        "ID", "When", "Hash", "File", "Added", "Skip", "Fail"
    ));
    output.push_str(&"-".repeat(84));
    output.push('\n');

    for entry in history {
        output.push_str(&format!(
            "{:<8} {:<16} {:<12} {:<24} {:>6} {:>6} {:>6}\n",
            entry.id.to_string(),
            entry.imported_at.format("%Y-%m-%d %H:%M"),
            entry.short_hash(),
            truncate(entry.file_name.as_deref().unwrap_or("-"), 24),
            entry.imported_records,
            entry.skipped_records,
            entry.failed_records,
        ));
    }

    output
}
