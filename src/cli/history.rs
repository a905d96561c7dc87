//! Import history CLI commands

use clap::Subcommand;

use super::print_json;
use crate::config::Settings;
use crate::display::{format_import_history, format_transaction_register, DisplayFormat};
use crate::error::{LedgerError, LedgerResult};
use crate::models::ImportId;
use crate::services::ImportHistoryService;
use crate::storage::Storage;

/// Import history subcommands
#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List committed imports, newest first
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show an import and the transactions it created
    Show {
        /// Import ID (e.g. imp-3) or the file's SHA-256 hash
        import: String,
    },
}

/// Handle a history command
pub fn handle_history_command(
    storage: &Storage,
    settings: &Settings,
    cmd: HistoryCommands,
) -> LedgerResult<()> {
    let service = ImportHistoryService::new(storage);

    match cmd {
        HistoryCommands::List { json } => {
            let history = service.list()?;
            if json {
                print_json(&history)?;
            } else {
                print!("{}", format_import_history(&history));
            }
        }

        HistoryCommands::Show { import } => {
            let entry = match import.parse::<ImportId>() {
                Ok(id) => service.get(id)?,
                Err(_) => service.find_by_hash(&import)?,
            }
            .ok_or_else(|| LedgerError::import_not_found(&import))?;

            print!("{}", format_import_history(std::slice::from_ref(&entry)));
            println!("SHA-256: {}", entry.file_hash);
            println!();

            let transactions = service.transactions_for(entry.id)?;
            print!(
                "{}",
                format_transaction_register(&transactions, &DisplayFormat::from(settings))
            );
        }
    }

    Ok(())
}
