//! Transaction CLI commands
//!
//! Implements CLI commands for transaction management.

use chrono::{Local, NaiveDate};
use clap::Subcommand;

use super::{parse_amount, parse_date, parse_tags, print_json};
use crate::config::Settings;
use crate::display::{
    format_totals, format_transaction_details, format_transaction_register, DisplayFormat,
};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    ImportId, NewTransaction, TransactionId, TransactionType, UpdateTransaction,
};
use crate::services::{
    AccountService, CategoryService, DateRange, TotalsScope, TransactionFilter,
    TransactionService,
};
use crate::storage::Storage;

/// Transaction subcommands
#[derive(Subcommand)]
pub enum TransactionCommands {
    /// Add a new transaction
    Add {
        /// Account name or ID
        account: String,
        /// Amount (e.g., "-50.00" for outflow, "100.00" for inflow)
        #[arg(allow_hyphen_values = true)]
        amount: String,
        /// income, expense or transfer; inferred from the sign when omitted
        #[arg(short = 't', long = "type")]
        kind: Option<String>,
        /// Transaction date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,
        /// Payee name
        #[arg(short, long)]
        payee: Option<String>,
        /// Description
        #[arg(short = 'm', long)]
        description: Option<String>,
        /// Category name or ID
        #[arg(short, long)]
        category: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        /// Counter-account for a transfer (name or ID)
        #[arg(long)]
        transfer_to: Option<String>,
    },
    /// List transactions, newest first
    List {
        /// Filter by account name or ID
        #[arg(short, long)]
        account: Option<String>,
        /// Filter by category name or ID
        #[arg(short = 'C', long)]
        category: Option<String>,
        /// Filter by type (income, expense, transfer)
        #[arg(short = 't', long = "type")]
        kind: Option<String>,
        /// Start date (YYYY-MM-DD), inclusive
        #[arg(long)]
        from: Option<String>,
        /// End date (YYYY-MM-DD), inclusive
        #[arg(long)]
        to: Option<String>,
        /// Payee contains this text (case-insensitive)
        #[arg(short, long)]
        payee: Option<String>,
        /// Only reconciled transactions
        #[arg(long, conflicts_with = "unreconciled")]
        reconciled: bool,
        /// Only unreconciled transactions
        #[arg(long)]
        unreconciled: bool,
        /// Only transactions created by this import
        #[arg(long)]
        import: Option<String>,
        /// Number of transactions to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Number of transactions to skip
        #[arg(long, default_value = "0")]
        offset: usize,
        /// Print JSON instead of a register
        #[arg(long)]
        json: bool,
    },
    /// Show transaction details
    Show {
        /// Transaction ID
        id: String,
    },
    /// Edit a transaction
    Edit {
        /// Transaction ID
        id: String,
        /// Move to another account (name or ID)
        #[arg(long)]
        account: Option<String>,
        /// New amount
        #[arg(short, long, allow_hyphen_values = true)]
        amount: Option<String>,
        /// New date
        #[arg(short, long)]
        date: Option<String>,
        /// New type
        #[arg(short = 't', long = "type")]
        kind: Option<String>,
        /// New payee; an empty value clears it
        #[arg(short, long)]
        payee: Option<String>,
        /// New description; an empty value clears it
        #[arg(short = 'm', long)]
        description: Option<String>,
        /// New category
        #[arg(short, long, conflicts_with = "clear_category")]
        category: Option<String>,
        /// Remove the category
        #[arg(long)]
        clear_category: bool,
        /// New comma-separated tags; an empty value clears them
        #[arg(long)]
        tags: Option<String>,
        /// New transfer counter-account
        #[arg(long)]
        transfer_to: Option<String>,
    },
    /// Delete a transaction
    Delete {
        /// Transaction ID
        id: String,
    },
    /// Mark a transaction as reconciled
    Reconcile {
        /// Transaction ID
        id: String,
    },
    /// Clear the reconciled mark
    Unreconcile {
        /// Transaction ID
        id: String,
    },
    /// Inflow, outflow and net for an account or category
    Totals {
        /// Account name or ID
        #[arg(short, long, required_unless_present = "category", conflicts_with = "category")]
        account: Option<String>,
        /// Category name or ID
        #[arg(short = 'C', long)]
        category: Option<String>,
        /// Start date (YYYY-MM-DD), inclusive
        #[arg(long)]
        from: Option<String>,
        /// End date (YYYY-MM-DD), inclusive
        #[arg(long)]
        to: Option<String>,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
}

/// Handle a transaction command
pub fn handle_transaction_command(
    storage: &Storage,
    settings: &Settings,
    cmd: TransactionCommands,
) -> LedgerResult<()> {
    let service = TransactionService::new(storage);
    let account_service = AccountService::new(storage);
    let category_service = CategoryService::new(storage);
    let fmt = DisplayFormat::from(settings);

    match cmd {
        TransactionCommands::Add {
            account,
            amount,
            kind,
            date,
            payee,
            description,
            category,
            tags,
            transfer_to,
        } => {
            let account = account_service.resolve(&account)?;
            let amount = parse_amount(&amount)?;
            let date = match date {
                Some(d) => parse_date(&d)?,
                None => Local::now().date_naive(),
            };
            let kind = match kind {
                Some(k) => parse_kind(&k)?,
                None if transfer_to.is_some() => TransactionType::Transfer,
                None => TransactionType::from_amount(amount),
            };

            let mut new = NewTransaction::new(account.id, date, amount, kind);
            if let Some(payee) = payee {
                new = new.with_payee(payee);
            }
            if let Some(description) = description {
                new = new.with_description(description);
            }
            if let Some(category) = category {
                new = new.with_category(category_service.resolve(&category)?.id);
            }
            if let Some(tags) = tags {
                new = new.with_tags(parse_tags(&tags));
            }
            if let Some(other) = transfer_to {
                new = new.transfer_with(account_service.resolve(&other)?.id);
            }

            let txn = service.create(new)?;
            println!(
                "Added {} {} to {} on {} [{}]",
                txn.kind,
                fmt.money(txn.amount),
                account.name,
                fmt.date(txn.date),
                txn.id
            );
        }

        TransactionCommands::List {
            account,
            category,
            kind,
            from,
            to,
            payee,
            reconciled,
            unreconciled,
            import,
            limit,
            offset,
            json,
        } => {
            let mut filter = TransactionFilter::new()
                .date_range(parse_range(from.as_deref(), to.as_deref())?)
                .limit(limit)
                .offset(offset);

            if let Some(account) = account {
                filter = filter.account(account_service.resolve(&account)?.id);
            }
            if let Some(category) = category {
                filter = filter.category(category_service.resolve(&category)?.id);
            }
            if let Some(kind) = kind {
                filter = filter.kind(parse_kind(&kind)?);
            }
            if let Some(payee) = payee {
                filter = filter.payee(payee);
            }
            if reconciled || unreconciled {
                filter = filter.reconciled(reconciled);
            }
            if let Some(import) = import {
                filter = filter.import(parse_import_id(&import)?);
            }

            let transactions = service.list(&filter)?;
            if json {
                print_json(&transactions)?;
            } else {
                print!("{}", format_transaction_register(&transactions, &fmt));
            }
        }

        TransactionCommands::Show { id } => {
            let id = parse_transaction_id(&id)?;
            let txn = service
                .get(id)?
                .ok_or_else(|| LedgerError::transaction_not_found(id.to_string()))?;

            let account_name = account_service
                .get(txn.account_id)?
                .map(|a| a.name)
                .unwrap_or_else(|| txn.account_id.to_string());
            let category_name = match txn.category_id {
                Some(category_id) => category_service.get(category_id)?.map(|c| c.name),
                None => None,
            };

            print!(
                "{}",
                format_transaction_details(&txn, &account_name, category_name.as_deref(), &fmt)
            );
        }

        TransactionCommands::Edit {
            id,
            account,
            amount,
            date,
            kind,
            payee,
            description,
            category,
            clear_category,
            tags,
            transfer_to,
        } => {
            let id = parse_transaction_id(&id)?;
            let mut changes = UpdateTransaction::new();

            if let Some(account) = account {
                changes = changes.account(account_service.resolve(&account)?.id);
            }
            if let Some(amount) = amount {
                changes = changes.amount(parse_amount(&amount)?);
            }
            if let Some(date) = date {
                changes = changes.date(parse_date(&date)?);
            }
            if let Some(kind) = kind {
                changes = changes.kind(parse_kind(&kind)?);
            }
            if let Some(payee) = payee {
                changes = changes.payee(Some(payee));
            }
            if let Some(description) = description {
                changes = changes.description(Some(description));
            }
            if let Some(category) = category {
                changes = changes.category(Some(category_service.resolve(&category)?.id));
            } else if clear_category {
                changes = changes.category(None);
            }
            if let Some(tags) = tags {
                changes.tags = Some(parse_tags(&tags));
            }
            if let Some(other) = transfer_to {
                changes.transfer_account_id = Some(Some(account_service.resolve(&other)?.id));
                if changes.kind.is_none() {
                    changes = changes.kind(TransactionType::Transfer);
                }
            } else if matches!(
                changes.kind,
                Some(TransactionType::Income | TransactionType::Expense)
            ) {
                changes.transfer_account_id = Some(None);
            }

            if changes.is_empty() {
                println!("No changes specified.");
                return Ok(());
            }

            let updated = service.update(id, changes)?;
            println!("Updated transaction {}", updated.id);
        }

        TransactionCommands::Delete { id } => {
            let id = parse_transaction_id(&id)?;
            let deleted = service.delete(id)?;
            println!(
                "Deleted transaction {} ({} on {})",
                deleted.id,
                fmt.money(deleted.amount),
                fmt.date(deleted.date)
            );
        }

        TransactionCommands::Reconcile { id } => {
            let txn = service.reconcile(parse_transaction_id(&id)?)?;
            println!("Reconciled transaction {}", txn.id);
        }

        TransactionCommands::Unreconcile { id } => {
            let txn = service.unreconcile(parse_transaction_id(&id)?)?;
            println!("Unreconciled transaction {}", txn.id);
        }

        TransactionCommands::Totals {
            account,
            category,
            from,
            to,
            json,
        } => {
            let dates = parse_range(from.as_deref(), to.as_deref())?;
            let (scope, label) = match (account, category) {
                (Some(account), _) => {
                    let account = account_service.resolve(&account)?;
                    (TotalsScope::Account(account.id), account.name)
                }
                (None, Some(category)) => {
                    let category = category_service.resolve(&category)?;
                    (TotalsScope::Category(category.id), category.name)
                }
                (None, None) => {
                    return Err(LedgerError::Validation(
                        "Specify --account or --category".into(),
                    ))
                }
            };

            let totals = service.totals(scope, &dates)?;
            if json {
                print_json(&totals)?;
            } else {
                print!("{}", format_totals(&label, &totals, &fmt));
            }
        }
    }

    Ok(())
}

fn parse_kind(input: &str) -> LedgerResult<TransactionType> {
    input
        .parse()
        .map_err(|e: crate::models::TransactionValidationError| {
            LedgerError::Validation(e.to_string())
        })
}

fn parse_transaction_id(input: &str) -> LedgerResult<TransactionId> {
    input
        .parse()
        .map_err(|_| LedgerError::Validation(format!("Invalid transaction ID: '{}'", input)))
}

fn parse_import_id(input: &str) -> LedgerResult<ImportId> {
    input
        .parse()
        .map_err(|_| LedgerError::Validation(format!("Invalid import ID: '{}'", input)))
}

fn parse_range(from: Option<&str>, to: Option<&str>) -> LedgerResult<DateRange> {
    let start: Option<NaiveDate> = from.map(parse_date).transpose()?;
    let end: Option<NaiveDate> = to.map(parse_date).transpose()?;

    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(LedgerError::Validation(format!(
                "Start date {} is after end date {}",
                start, end
            )));
        }
    }

    Ok(DateRange { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        let range = parse_range(Some("2024-01-01"), None).unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(range.end, None);

        assert!(parse_range(Some("2024-02-01"), Some("2024-01-01"))
            .unwrap_err()
            .is_validation());
    }

    #[test]
    fn test_parse_ids() {
        assert_eq!(parse_transaction_id("txn-7").unwrap(), TransactionId::new(7));
        assert_eq!(parse_import_id("3").unwrap(), ImportId::new(3));
        assert!(parse_transaction_id("abc").is_err());
    }

    #[test]
    fn test_add_and_edit_through_handler() {
        let storage = Storage::open_in_memory().unwrap();
        let settings = Settings::default();
        AccountService::new(&storage)
            .create("Checking", crate::models::Money::zero())
            .unwrap();

        handle_transaction_command(
            &storage,
            &settings,
            TransactionCommands::Add {
                account: "checking".into(),
                amount: "-12.50".into(),
                kind: None,
                date: Some("2024-03-01".into()),
                payee: Some("Cafe".into()),
                description: None,
                category: None,
                tags: Some("food".into()),
                transfer_to: None,
            },
        )
        .unwrap();

        let txns = storage.transactions().list(&TransactionFilter::new()).unwrap();
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].kind, TransactionType::Expense);

        handle_transaction_command(
            &storage,
            &settings,
            TransactionCommands::Edit {
                id: txns[0].id.to_string(),
                account: None,
                amount: Some("-20".into()),
                date: None,
                kind: None,
                payee: Some(String::new()),
                description: None,
                category: None,
                clear_category: false,
                tags: None,
                transfer_to: None,
            },
        )
        .unwrap();

        let edited = storage.transactions().get(txns[0].id).unwrap().unwrap();
        assert_eq!(edited.amount.cents(), -2000);
        assert_eq!(edited.payee, None);
        let account = storage.accounts().get_by_name("Checking").unwrap().unwrap();
        assert_eq!(account.current_balance.cents(), -2000);
    }
}
