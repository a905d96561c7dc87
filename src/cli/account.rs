//! Account CLI commands
//!
//! Implements CLI commands for account management.

use clap::Subcommand;

use super::{parse_amount, print_json};
use crate::config::Settings;
use crate::display::{
    format_account_details, format_account_list, format_balance_checks, DisplayFormat,
};
use crate::error::LedgerResult;
use crate::services::AccountService;
use crate::storage::Storage;

/// Account subcommands
#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a new account
    #[command(alias = "add")]
    Create {
        /// Account name
        name: String,
        /// Opening balance (e.g., "1000.00" or "-250")
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        balance: String,
    },
    /// List accounts
    List {
        /// Include deactivated accounts
        #[arg(short, long)]
        all: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show account details
    Show {
        /// Account name or ID
        account: String,
    },
    /// Deactivate an account; its history stays, new transactions are refused
    Deactivate {
        /// Account name or ID
        account: String,
    },
    /// Recompute balances from transactions and compare with stored balances
    Check,
}

/// Handle an account command
pub fn handle_account_command(
    storage: &Storage,
    settings: &Settings,
    cmd: AccountCommands,
) -> LedgerResult<()> {
    let service = AccountService::new(storage);
    let fmt = DisplayFormat::from(settings);

    match cmd {
        AccountCommands::Create { name, balance } => {
            let initial = parse_amount(&balance)?;
            let account = service.create(&name, initial)?;

            println!("Created account: {}", account.name);
            println!("  Opening Balance: {}", fmt.money(account.initial_balance));
            println!("  ID: {}", account.id);
        }

        AccountCommands::List { all, json } => {
            let accounts = service.list(all)?;
            if json {
                print_json(&accounts)?;
            } else {
                print!("{}", format_account_list(&accounts, &fmt));
            }
        }

        AccountCommands::Show { account } => {
            let found = service.resolve(&account)?;
            print!("{}", format_account_details(&found, &fmt));

            let check = service.check_balance(found.id)?;
            if !check.is_consistent() {
                println!();
                print!("{}", format_balance_checks(&[(found, check)], &fmt));
            }
        }

        AccountCommands::Deactivate { account } => {
            let found = service.resolve(&account)?;
            let deactivated = service.deactivate(found.id)?;
            println!("Deactivated account: {}", deactivated.name);
        }

        AccountCommands::Check => {
            let accounts = service.list(true)?;
            let checks = service.check_all()?;

            let paired: Vec<_> = accounts
                .into_iter()
                .filter_map(|account| {
                    checks
                        .iter()
                        .find(|c| c.account_id == account.id)
                        .map(|check| (account, *check))
                })
                .collect();
            print!("{}", format_balance_checks(&paired, &fmt));
        }
    }

    Ok(())
}
