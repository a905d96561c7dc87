//! CLI command handler for CSV import
//!
//! Column positions come from a `--preset` or flags when given, otherwise from
//! the file's header row, otherwise from the default layout. Explicit column
//! flags override a preset.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use csv::ReaderBuilder;
use tracing::debug;

use super::print_json;
use crate::config::Settings;
use crate::display::{format_import_result, DisplayFormat};
use crate::error::{LedgerError, LedgerResult};
use crate::services::{
    AccountService, ColumnMapping, ImportOptions, ImportService, SignConvention,
};
use crate::storage::Storage;

/// Arguments for `ledger import`
#[derive(Args)]
pub struct ImportArgs {
    /// Path to the CSV file
    pub file: PathBuf,
    /// Target account name or ID
    #[arg(short, long)]
    pub account: String,
    /// Start from a known export layout instead of header detection
    #[arg(long, value_enum)]
    pub preset: Option<ImportPreset>,
    /// Zero-based column holding the date
    #[arg(long)]
    pub date_col: Option<usize>,
    /// Zero-based column holding the amount
    #[arg(long)]
    pub amount_col: Option<usize>,
    /// Zero-based column holding the description
    #[arg(long)]
    pub description_col: Option<usize>,
    /// Zero-based column holding the payee
    #[arg(long)]
    pub payee_col: Option<usize>,
    /// chrono format of the date column (e.g. "%m/%d/%Y")
    #[arg(long)]
    pub date_format: Option<String>,
    /// Field delimiter
    #[arg(long, default_value = ",")]
    pub delimiter: char,
    /// The first row is data, not a header
    #[arg(long)]
    pub no_header: bool,
    /// Positive amounts are outflows (credit card exports)
    #[arg(long)]
    pub invert_amounts: bool,
    /// Parse and report without writing anything
    #[arg(long)]
    pub dry_run: bool,
    /// Skip records matching an existing transaction (date, amount, description)
    #[arg(long)]
    pub skip_duplicates: bool,
    /// Rows per INSERT statement
    #[arg(long)]
    pub batch_size: Option<usize>,
    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Common export layouts: date, description, amount with US dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImportPreset {
    /// Positive amounts are deposits
    Bank,
    /// Positive amounts are purchases
    CreditCard,
}

impl ImportPreset {
    fn mapping(self) -> ColumnMapping {
        match self {
            Self::Bank => ColumnMapping::simple_bank(),
            Self::CreditCard => ColumnMapping::credit_card(),
        }
    }
}

impl ImportArgs {
    fn has_explicit_columns(&self) -> bool {
        self.date_col.is_some() || self.amount_col.is_some() || self.description_col.is_some()
    }

    /// Build the column mapping from flags, preset or header detection, and settings
    fn mapping(&self, settings: &Settings) -> LedgerResult<ColumnMapping> {
        let base = match self.preset {
            Some(preset) => Some(preset.mapping()),
            None if self.no_header || self.has_explicit_columns() => None,
            None => detect_mapping(&self.file, self.delimiter)?.inspect(|mapping| {
                debug!(?mapping, "Detected column mapping from header");
            }),
        };
        let base_format = base.as_ref().map(|m| m.date_format.clone());

        let mut mapping = base.unwrap_or_default();
        mapping.date_column = self.date_col.unwrap_or(mapping.date_column);
        mapping.amount_column = self.amount_col.unwrap_or(mapping.amount_column);
        mapping.description_column = self.description_col.unwrap_or(mapping.description_column);

        if let Some(payee) = self.payee_col {
            mapping = mapping.with_payee_column(payee);
        }
        // A preset's own date format beats the configured default
        let date_format = match (&self.date_format, &self.preset, &base_format) {
            (Some(format), _, _) => format.as_str(),
            (None, Some(_), Some(format)) => format.as_str(),
            _ => settings.import.date_format.as_str(),
        };
        mapping = mapping
            .with_date_format(date_format)
            .with_header(!self.no_header)
            .with_delimiter(self.delimiter);
        if self.invert_amounts {
            mapping = mapping.with_sign_convention(SignConvention::OutflowPositive);
        }

        Ok(mapping)
    }
}

/// Handle the import command
pub fn handle_import_command(
    storage: &Storage,
    settings: &Settings,
    args: ImportArgs,
) -> LedgerResult<()> {
    let account_service = AccountService::new(storage);
    let import_service = ImportService::new(storage);

    let account = account_service.resolve(&args.account)?;
    if !args.file.exists() {
        return Err(LedgerError::Io(format!(
            "File not found: {}",
            args.file.display()
        )));
    }

    let options = ImportOptions::new(account.id)
        .mapping(args.mapping(settings)?)
        .dry_run(args.dry_run)
        .skip_duplicates(args.skip_duplicates || settings.import.skip_duplicates)
        .batch_size(args.batch_size.unwrap_or(settings.import.batch_size));

    let result = import_service.import_file(&args.file, &options)?;

    if args.json {
        print_json(&result)?;
    } else {
        println!("Import into '{}'", account.name);
        println!("{}", "=".repeat(40));
        print!(
            "{}",
            format_import_result(&result, &DisplayFormat::from(settings))
        );
    }

    Ok(())
}

/// Read only the first record of `path` and try to map its headers
fn detect_mapping(path: &Path, delimiter: char) -> LedgerResult<Option<ColumnMapping>> {
    let delimiter = u8::try_from(delimiter).map_err(|_| {
        LedgerError::Validation(format!(
            "Delimiter must be a single ASCII character, got '{}'",
            delimiter
        ))
    })?;
    let file = File::open(path)
        .map_err(|e| LedgerError::Io(format!("Failed to open {}: {}", path.display(), e)))?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(BufReader::new(file));

    match reader.headers() {
        Ok(headers) => Ok(ColumnMapping::detect_from_headers(headers)),
        // Undecodable header: let the importer report per-record errors
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn args(file: PathBuf) -> ImportArgs {
        ImportArgs {
            file,
            account: "Checking".into(),
            preset: None,
            date_col: None,
            amount_col: None,
            description_col: None,
            payee_col: None,
            date_format: None,
            delimiter: ',',
            no_header: false,
            invert_amounts: false,
            dry_run: false,
            skip_duplicates: false,
            batch_size: None,
            json: false,
        }
    }

    fn write_csv(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("bank.csv");
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_mapping_detected_from_header() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "Posted Date,Description,Amount\n2024-01-02,Coffee,-3.50\n");

        let mapping = args(path).mapping(&Settings::default()).unwrap();
        assert_eq!(mapping.date_column, 0);
        assert_eq!(mapping.description_column, 1);
        assert_eq!(mapping.amount_column, 2);
        assert!(mapping.has_header);
    }

    #[test]
    fn test_explicit_columns_win() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "02/01/2024;-3.50;Coffee\n");

        let mut args = args(path);
        args.no_header = true;
        args.delimiter = ';';
        args.date_col = Some(0);
        args.amount_col = Some(1);
        args.description_col = Some(2);
        args.date_format = Some("%d/%m/%Y".into());
        args.invert_amounts = true;

        let mapping = args.mapping(&Settings::default()).unwrap();
        assert!(!mapping.has_header);
        assert_eq!(mapping.delimiter, ';');
        assert_eq!(mapping.date_format, "%d/%m/%Y");
        assert_eq!(mapping.sign_convention, SignConvention::OutflowPositive);
    }

    #[test]
    fn test_credit_card_preset() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "Date,Description,Amount\n03/01/2024,Restaurant,25.00\n03/02/2024,Payment,-100.00\n",
        );
        let storage = Storage::open_in_memory().unwrap();
        AccountService::new(&storage)
            .create("Checking", crate::models::Money::zero())
            .unwrap();

        let mut args = args(path);
        args.preset = Some(ImportPreset::CreditCard);
        let mapping = args.mapping(&Settings::default()).unwrap();
        assert_eq!(mapping, ColumnMapping::credit_card());

        handle_import_command(&storage, &Settings::default(), args).unwrap();
        let account = storage.accounts().get_by_name("Checking").unwrap().unwrap();
        assert_eq!(account.current_balance.cents(), 7_500);
    }

    #[test]
    fn test_import_through_handler() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "date,amount,description\n2024-01-02,-3.50,Coffee\n2024-01-03,100.00,Pay\n",
        );
        let storage = Storage::open_in_memory().unwrap();
        AccountService::new(&storage)
            .create("Checking", crate::models::Money::zero())
            .unwrap();

        handle_import_command(&storage, &Settings::default(), args(path.clone())).unwrap();
        let account = storage.accounts().get_by_name("Checking").unwrap().unwrap();
        assert_eq!(account.current_balance.cents(), 9650);

        let err = handle_import_command(&storage, &Settings::default(), args(path)).unwrap_err();
        assert!(err.is_already_imported());
    }
}
