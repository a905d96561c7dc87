//! CSV import service
//!
//! Parses bank exports into transactions for one account. A file is
//! identified by the SHA-256 of its bytes; once committed, the same bytes
//! cannot be imported again under any name. Malformed records are collected
//! as [`RecordError`]s and never abort the import. The committed part (the
//! history row, every surviving transaction and the balance delta) is one
//! database transaction, and the re-import and duplicate checks run inside
//! it, so two processes importing overlapping files cannot both insert the
//! same record.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::NaiveDate;
use csv::{ByteRecord, ReaderBuilder, StringRecord};
use rusqlite::Connection;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{AccountId, ImportId, Money, NewImportHistory, NewTransaction, TransactionType};
use crate::services::TransactionService;
use crate::storage::{ImportHistoryRepository, Storage, TransactionRepository};

/// Description used when the description column is blank
pub const BLANK_DESCRIPTION: &str = "(no description)";

/// Rows per INSERT statement when the caller does not choose
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Formats tried, in order, after the mapping's own date format
const FALLBACK_DATE_FORMATS: [&str; 8] = [
    "%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y", "%d/%m/%Y", "%d/%m/%y", "%Y/%m/%d", "%m-%d-%Y", "%d-%m-%Y",
];

/// How the amount column's sign maps onto inflow/outflow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SignConvention {
    /// Positive amounts are money in (most bank exports)
    #[default]
    InflowPositive,
    /// Positive amounts are money out (most credit card exports)
    OutflowPositive,
}

/// Column mapping configuration for CSV import. Column indices are zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub date_column: usize,
    pub amount_column: usize,
    pub description_column: usize,
    pub payee_column: Option<usize>,
    /// strftime format tried before the built-in fallbacks
    pub date_format: String,
    /// Whether the first record is a header
    pub has_header: bool,
    pub delimiter: char,
    pub sign_convention: SignConvention,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            date_column: 0,
            amount_column: 1,
            description_column: 2,
            payee_column: None,
            date_format: "%Y-%m-%d".to_string(),
            has_header: true,
            delimiter: ',',
            sign_convention: SignConvention::InflowPositive,
        }
    }
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Common mapping for bank CSV exports (date, description, amount)
    pub fn simple_bank() -> Self {
        Self {
            date_column: 0,
            description_column: 1,
            amount_column: 2,
            date_format: "%m/%d/%Y".to_string(),
            ..Self::default()
        }
    }

    /// Common mapping for credit card CSV exports, where purchases are positive
    pub fn credit_card() -> Self {
        Self {
            sign_convention: SignConvention::OutflowPositive,
            ..Self::simple_bank()
        }
    }

    pub fn with_date_format(mut self, format: &str) -> Self {
        self.date_format = format.to_string();
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_payee_column(mut self, column: usize) -> Self {
        self.payee_column = Some(column);
        self
    }

    pub fn with_sign_convention(mut self, convention: SignConvention) -> Self {
        self.sign_convention = convention;
        self
    }

    /// Guess a mapping from a header record
    ///
    /// Returns `None` unless both a date and an amount column are found.
    pub fn detect_from_headers(headers: &StringRecord) -> Option<Self> {
        let mut date = None;
        let mut amount = None;
        let mut description = None;
        let mut payee = None;

        for (idx, header) in headers.iter().enumerate() {
            let h = header.trim().to_lowercase();

            if date.is_none() && (h.contains("date") || h.contains("posted")) {
                date = Some(idx);
            } else if amount.is_none() && h.contains("amount") {
                amount = Some(idx);
            } else if description.is_none() && (h.contains("description") || h.contains("memo")) {
                description = Some(idx);
            } else if payee.is_none()
                && (h.contains("payee") || h.contains("merchant") || h.contains("name"))
            {
                payee = Some(idx);
            }
        }

        let date_column = date?;
        let amount_column = amount?;
        // Without a description column, the payee text is the best description
        let description_column = description.or(payee)?;
        let payee_column = payee.filter(|p| *p != description_column);

        Some(Self {
            date_column,
            amount_column,
            description_column,
            payee_column,
            has_header: true,
            ..Self::default()
        })
    }

    fn delimiter_byte(&self) -> LedgerResult<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                LedgerError::Validation(format!(
                    "Delimiter must be a single ASCII character, got '{}'",
                    self.delimiter
                ))
            })
    }

    fn min_columns(&self) -> usize {
        self.date_column
            .max(self.amount_column)
            .max(self.description_column)
            + 1
    }
}

/// Everything an import call needs besides the data itself
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub account_id: AccountId,
    pub mapping: ColumnMapping,
    /// Parse and validate only; nothing is written
    pub dry_run: bool,
    /// Drop records matching an existing transaction on date, amount and description
    pub skip_duplicates: bool,
    pub batch_size: usize,
}

impl ImportOptions {
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            mapping: ColumnMapping::default(),
            dry_run: false,
            skip_duplicates: false,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn mapping(mut self, mapping: ColumnMapping) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn skip_duplicates(mut self, skip: bool) -> Self {
        self.skip_duplicates = skip;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// A record that could not be imported
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordError {
    /// 1-based physical line in the file where the record starts
    pub line: usize,
    pub message: String,
    /// The record's fields re-joined with the delimiter
    pub raw: String,
}

/// Outcome of an import or dry run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportResult {
    /// Data records seen (header excluded)
    pub total_records: usize,
    pub imported_records: usize,
    pub skipped_records: usize,
    pub failed_records: usize,
    pub errors: Vec<RecordError>,
    /// Transactions that were (or, for a dry run, would be) created
    pub transactions: Vec<NewTransaction>,
    /// Content hash; only set once an import has committed
    pub file_hash: Option<String>,
    pub import_id: Option<ImportId>,
    pub dry_run: bool,
}

/// Service for CSV import
pub struct ImportService<'a> {
    storage: &'a Storage,
}

impl<'a> ImportService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Import a CSV file from disk
    pub fn import_file(&self, path: &Path, options: &ImportOptions) -> LedgerResult<ImportResult> {
        let file = File::open(path).map_err(|e| {
            LedgerError::Io(format!("Failed to open {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        self.import_reader(BufReader::new(file), file_name.as_deref(), options)
    }

    /// Import CSV content from any reader; `file_name` is recorded in the
    /// history for display only
    pub fn import_reader<R: Read>(
        &self,
        mut reader: R,
        file_name: Option<&str>,
        options: &ImportOptions,
    ) -> LedgerResult<ImportResult> {
        if options.batch_size == 0 {
            return Err(LedgerError::Validation(
                "Batch size must be greater than zero".into(),
            ));
        }
        let delimiter = options.mapping.delimiter_byte()?;

        let mut content = Vec::new();
        reader
            .read_to_end(&mut content)
            .map_err(|e| LedgerError::Io(format!("Failed to read import data: {}", e)))?;
        let file_hash = content_hash(&content);

        let account = self
            .storage
            .accounts()
            .get(options.account_id)?
            .ok_or_else(|| LedgerError::account_not_found(options.account_id.to_string()))?;
        if !account.is_active {
            return Err(LedgerError::Validation(format!(
                "Account '{}' is inactive",
                account.name
            )));
        }

        if options.dry_run {
            let mut result = Self::parse_records(self.storage.conn(), &content, delimiter, options)?;
            result.dry_run = true;
            debug!(
                total = result.total_records,
                importable = result.imported_records,
                failed = result.failed_records,
                "Dry run complete"
            );
            return Ok(result);
        }

        // The hash check, duplicate lookups and inserts all run under one write lock
        let tx = self.storage.begin()?;
        if let Some(existing) = ImportHistoryRepository::new(&tx).find_by_hash(&file_hash)? {
            warn!(hash = %file_hash, import = %existing.id, "Rejected re-import of file");
            return Err(LedgerError::AlreadyImported {
                hash: file_hash,
                import_id: existing.id,
            });
        }

        let mut result = Self::parse_records(&tx, &content, delimiter, options)?;

        let history = NewImportHistory {
            file_hash: file_hash.clone(),
            file_name: file_name.map(str::to_string),
            account_id: Some(options.account_id),
            total_records: result.total_records,
            imported_records: result.imported_records,
            skipped_records: result.skipped_records,
            failed_records: result.failed_records,
        };

        let history = ImportHistoryRepository::new(&tx).insert(&history)?;
        for txn in &mut result.transactions {
            txn.import_id = Some(history.id);
        }
        TransactionService::create_batch_in(&tx, result.transactions.clone(), options.batch_size)?;
        tx.commit()?;

        info!(
            import = %history.id,
            account = %options.account_id,
            imported = result.imported_records,
            skipped = result.skipped_records,
            failed = result.failed_records,
            "Committed import"
        );
        self.storage
            .log_import(history.id.to_string(), history.file_name.clone(), &history);

        result.file_hash = Some(file_hash);
        result.import_id = Some(history.id);
        Ok(result)
    }

    /// Parse every record, classifying it as importable, duplicate or failed
    fn parse_records(
        conn: &Connection,
        content: &[u8],
        delimiter: u8,
        options: &ImportOptions,
    ) -> LedgerResult<ImportResult> {
        let mapping = &options.mapping;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(content);

        let transactions = TransactionRepository::new(conn);
        let mut result = ImportResult::default();

        for (index, record) in reader.byte_records().enumerate() {
            if index == 0 && mapping.has_header {
                continue;
            }
            result.total_records += 1;

            let parsed = match record {
                Ok(record) => {
                    let line = record.position().map_or(index + 1, |p| p.line() as usize);
                    let raw = raw_text(&record, mapping.delimiter);
                    parse_record(&record, mapping, options.account_id)
                        .map_err(|message| RecordError { line, message, raw })
                }
                Err(e) => Err(RecordError {
                    line: e.position().map_or(index + 1, |p| p.line() as usize),
                    message: format!("Unreadable record: {}", e),
                    raw: String::new(),
                }),
            };

            let txn = match parsed {
                Ok(txn) => txn,
                Err(error) => {
                    warn!(line = error.line, message = %error.message, "Skipping malformed record");
                    result.failed_records += 1;
                    result.errors.push(error);
                    continue;
                }
            };

            if options.skip_duplicates
                && transactions.exists_duplicate(
                    txn.account_id,
                    txn.date,
                    txn.amount,
                    txn.description.as_deref(),
                )?
            {
                debug!(date = %txn.date, amount = txn.amount.cents(), "Skipping duplicate record");
                result.skipped_records += 1;
                continue;
            }

            result.imported_records += 1;
            result.transactions.push(txn);
        }

        Ok(result)
    }
}

/// Lowercase hex SHA-256 of `content`
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Parse a date with the primary format, then the fallbacks
pub fn parse_date(s: &str, primary_format: &str) -> Result<NaiveDate, String> {
    let s = s.trim();
    std::iter::once(primary_format)
        .chain(FALLBACK_DATE_FORMATS)
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .ok_or_else(|| format!("Could not parse date: '{}'", s))
}

fn parse_record(
    record: &ByteRecord,
    mapping: &ColumnMapping,
    account_id: AccountId,
) -> Result<NewTransaction, String> {
    let record = StringRecord::from_byte_record(record.clone())
        .map_err(|e| format!("Record is not valid UTF-8: {}", e))?;

    let needed = mapping.min_columns();
    if record.len() < needed {
        return Err(format!(
            "Too few columns: expected at least {}, found {}",
            needed,
            record.len()
        ));
    }

    let field = |column: usize| record.get(column).map(str::trim).unwrap_or("");

    let date = parse_date(field(mapping.date_column), &mapping.date_format)?;

    let amount_text = field(mapping.amount_column);
    let amount = Money::from_major_str(amount_text)
        .map_err(|e| format!("Invalid amount '{}': {}", amount_text, e))?;
    let amount = match mapping.sign_convention {
        SignConvention::InflowPositive => amount,
        SignConvention::OutflowPositive => -amount,
    };

    let description = match field(mapping.description_column) {
        "" => BLANK_DESCRIPTION,
        text => text,
    };

    let mut txn = NewTransaction::new(account_id, date, amount, TransactionType::from_amount(amount))
        .with_description(description);
    if let Some(payee) = mapping.payee_column.map(field).filter(|p| !p.is_empty()) {
        txn = txn.with_payee(payee);
    }

    Ok(txn)
}

fn raw_text(record: &ByteRecord, delimiter: char) -> String {
    record
        .iter()
        .map(String::from_utf8_lossy)
        .collect::<Vec<_>>()
        .join(&delimiter.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Account;
    use crate::services::{AccountService, ImportHistoryService};
    use tempfile::TempDir;

    const SCENARIO_CSV: &str = "Date,Description,Amount
2024-01-02,Coffee Shop,-50.00
2024-01-03,Book Store,-25.30
2024-01-15,Paycheck,\"2,500.00\"
";

    fn setup(initial: i64) -> (Storage, Account) {
        let storage = Storage::open_in_memory().unwrap();
        let account = AccountService::new(&storage)
            .create("Checking", Money::from_cents(initial))
            .unwrap();
        (storage, account)
    }

    fn options(account: &Account) -> ImportOptions {
        ImportOptions::new(account.id).mapping(ColumnMapping {
            date_column: 0,
            description_column: 1,
            amount_column: 2,
            ..ColumnMapping::default()
        })
    }

    fn import(
        storage: &Storage,
        csv: &str,
        name: &str,
        options: &ImportOptions,
    ) -> LedgerResult<ImportResult> {
        ImportService::new(storage).import_reader(csv.as_bytes(), Some(name), options)
    }

    fn balance(storage: &Storage, account: &Account) -> Money {
        storage
            .accounts()
            .get(account.id)
            .unwrap()
            .unwrap()
            .current_balance
    }

    #[test]
    fn test_import_scenario_and_reimport() {
        let (storage, account) = setup(100_000);
        let opts = options(&account);

        let result = import(&storage, SCENARIO_CSV, "jan.csv", &opts).unwrap();

        assert_eq!(result.total_records, 3);
        assert_eq!(result.imported_records, 3);
        assert_eq!(result.failed_records, 0);
        assert_eq!(result.file_hash.as_deref(), Some(content_hash(SCENARIO_CSV.as_bytes()).as_str()));
        assert_eq!(balance(&storage, &account), Money::from_cents(342_470));

        let err = import(&storage, SCENARIO_CSV, "jan.csv", &opts).unwrap_err();
        assert!(err.is_already_imported());
        assert_eq!(balance(&storage, &account), Money::from_cents(342_470));
        assert_eq!(storage.transactions().count().unwrap(), 3);
    }

    #[test]
    fn test_reimport_under_another_name_is_rejected() {
        let (storage, account) = setup(0);
        let opts = options(&account);

        let first = import(&storage, SCENARIO_CSV, "a.csv", &opts).unwrap();
        let err = import(&storage, SCENARIO_CSV, "renamed.csv", &opts).unwrap_err();

        match err {
            LedgerError::AlreadyImported { import_id, .. } => {
                assert_eq!(Some(import_id), first.import_id)
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(ImportHistoryService::new(&storage).list().unwrap().len(), 1);
        assert_eq!(storage.transactions().count().unwrap(), 3);
    }

    #[test]
    fn test_imported_rows_carry_import_id() {
        let (storage, account) = setup(0);
        let result = import(&storage, SCENARIO_CSV, "a.csv", &options(&account)).unwrap();
        let import_id = result.import_id.unwrap();

        assert!(result.transactions.iter().all(|t| t.import_id == Some(import_id)));
        let rows = ImportHistoryService::new(&storage)
            .transactions_for(import_id)
            .unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_dry_run_is_pure() {
        let (storage, account) = setup(100_000);
        let csv = "Date,Description,Amount
2024-01-02,Coffee,-4.50
bad-date,Broken,-1.00
2024-01-04,Refund,10.00
";
        let dry = import(&storage, csv, "d.csv", &options(&account).dry_run(true)).unwrap();

        assert!(dry.dry_run);
        assert!(dry.file_hash.is_none());
        assert!(dry.import_id.is_none());
        assert_eq!(storage.transactions().count().unwrap(), 0);
        assert!(ImportHistoryService::new(&storage).list().unwrap().is_empty());
        assert_eq!(balance(&storage, &account), Money::from_cents(100_000));

        let real = import(&storage, csv, "d.csv", &options(&account)).unwrap();
        assert_eq!(dry.total_records, real.total_records);
        assert_eq!(dry.imported_records, real.imported_records);
        assert_eq!(dry.failed_records, real.failed_records);
        assert_eq!(dry.errors, real.errors);
    }

    #[test]
    fn test_dry_run_of_imported_file_still_previews() {
        let (storage, account) = setup(0);
        import(&storage, SCENARIO_CSV, "a.csv", &options(&account)).unwrap();

        let preview = import(&storage, SCENARIO_CSV, "a.csv", &options(&account).dry_run(true));
        assert_eq!(preview.unwrap().imported_records, 3);
    }

    #[test]
    fn test_malformed_record_is_not_fatal() {
        let (storage, account) = setup(0);
        let mut csv = String::from("Date,Description,Amount\n");
        for day in 1..=10 {
            if day == 6 {
                csv.push_str("2024-02-06,Mystery,twelve dollars\n");
            } else {
                csv.push_str(&format!("2024-02-{:02},Item {},-1.00\n", day, day));
            }
        }

        let result = import(&storage, &csv, "feb.csv", &options(&account)).unwrap();

        assert_eq!(result.total_records, 10);
        assert_eq!(result.imported_records, 9);
        assert_eq!(result.failed_records, 1);
        assert_eq!(result.errors.len(), 1);
        // Header is line 1, so the sixth data record sits on line 7
        assert_eq!(result.errors[0].line, 7);
        assert!(result.errors[0].message.contains("Invalid amount"));
        assert_eq!(result.errors[0].raw, "2024-02-06,Mystery,twelve dollars");
        assert_eq!(balance(&storage, &account), Money::from_cents(-900));
    }

    #[test]
    fn test_failed_batch_rolls_back_history_and_rows() {
        let (storage, account) = setup(5_000);
        storage
            .conn()
            .execute_batch(
                "CREATE TRIGGER fail_on_boom BEFORE INSERT ON transactions
                 WHEN NEW.description = 'boom'
                 BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
            )
            .unwrap();

        let csv = "Date,Description,Amount
2024-01-01,One,-1.00
2024-01-02,Two,-2.00
2024-01-03,boom,-3.00
2024-01-04,Four,-4.00
";
        let opts = options(&account).batch_size(2);
        let err = import(&storage, csv, "x.csv", &opts).unwrap_err();

        assert!(matches!(err, LedgerError::Persistence(_)));
        assert_eq!(storage.transactions().count().unwrap(), 0);
        assert!(storage
            .import_history()
            .find_by_hash(&content_hash(csv.as_bytes()))
            .unwrap()
            .is_none());
        assert_eq!(balance(&storage, &account), Money::from_cents(5_000));

        // A failed import never blocks a retry
        storage.conn().execute_batch("DROP TRIGGER fail_on_boom").unwrap();
        let result = import(&storage, csv, "x.csv", &opts).unwrap();
        assert_eq!(result.imported_records, 4);
        assert_eq!(balance(&storage, &account), Money::from_cents(4_000));
    }

    #[test]
    fn test_skip_duplicates() {
        let (storage, account) = setup(0);
        import(&storage, SCENARIO_CSV, "jan.csv", &options(&account)).unwrap();

        let overlap = "Date,Description,Amount
2024-01-15,Paycheck,2500.00
2024-01-20,Groceries,-80.00
";
        let result = import(
            &storage,
            overlap,
            "jan-2.csv",
            &options(&account).skip_duplicates(true),
        )
        .unwrap();

        assert_eq!(result.total_records, 2);
        assert_eq!(result.skipped_records, 1);
        assert_eq!(result.imported_records, 1);
        assert_eq!(result.transactions[0].description.as_deref(), Some("Groceries"));
    }

    #[test]
    fn test_concurrent_overlapping_imports_skip_duplicates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.db");
        let storage = Storage::open_path(&path).unwrap();
        let account = AccountService::new(&storage)
            .create("Checking", Money::zero())
            .unwrap();

        let shared: String = (1..=50)
            .map(|day| format!("2024-03-{:02},Shared {},-1.00\n", day % 28 + 1, day))
            .collect();
        let files = [
            format!("Date,Description,Amount\n{}2024-03-30,Only A,-2.00\n", shared),
            format!("Date,Description,Amount\n{}2024-03-31,Only B,-3.00\n", shared),
        ];

        let barrier = std::sync::Arc::new(std::sync::Barrier::new(files.len()));
        let handles: Vec<_> = files
            .into_iter()
            .map(|csv| {
                let path = path.clone();
                let barrier = barrier.clone();
                let opts = options(&account).skip_duplicates(true);
                std::thread::spawn(move || {
                    let storage = Storage::open_path(&path).unwrap();
                    barrier.wait();
                    import(&storage, &csv, "overlap.csv", &opts).unwrap()
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let imported: usize = results.iter().map(|r| r.imported_records).sum();
        let skipped: usize = results.iter().map(|r| r.skipped_records).sum();
        assert_eq!(imported, 52);
        assert_eq!(skipped, 50);
        assert_eq!(storage.transactions().count().unwrap(), 52);
        assert_eq!(balance(&storage, &account), Money::from_cents(-5_500));
    }

    #[test]
    fn test_credit_card_preset() {
        let (storage, account) = setup(0);
        let csv = "Date,Description,Amount
03/01/2024,Restaurant,25.00
03/02/2024,Payment,-100.00
";
        let opts = ImportOptions::new(account.id).mapping(ColumnMapping::credit_card());
        let result = import(&storage, csv, "card.csv", &opts).unwrap();

        let amounts: Vec<i64> = result.transactions.iter().map(|t| t.amount.cents()).collect();
        assert_eq!(amounts, vec![-2_500, 10_000]);
        assert_eq!(result.transactions[0].kind, TransactionType::Expense);
        assert_eq!(result.transactions[1].kind, TransactionType::Income);
        assert_eq!(balance(&storage, &account), Money::from_cents(7_500));
    }

    #[test]
    fn test_amount_formats_and_sign_convention() {
        let (storage, account) = setup(0);
        let csv = "01/31/2024,Card Payment,(42.00)
02/01/2024,Purchase,$19.99
02/02/2024,,5
";
        let mapping = ColumnMapping::simple_bank()
            .with_header(false)
            .with_sign_convention(SignConvention::OutflowPositive);
        let result = import(&storage, csv, "card.csv", &ImportOptions::new(account.id).mapping(mapping))
            .unwrap();

        let amounts: Vec<i64> = result.transactions.iter().map(|t| t.amount.cents()).collect();
        assert_eq!(amounts, vec![4_200, -1_999, -500]);
        assert_eq!(result.transactions[0].kind, TransactionType::Income);
        assert_eq!(result.transactions[1].kind, TransactionType::Expense);
        assert_eq!(
            result.transactions[2].description.as_deref(),
            Some(BLANK_DESCRIPTION)
        );
    }

    #[test]
    fn test_too_few_columns_and_bad_date() {
        let (storage, account) = setup(0);
        let csv = "Date,Description,Amount
2024-01-01,Only two
31.01.2024,Weird date,-1.00
";
        let result = import(&storage, csv, "e.csv", &options(&account)).unwrap();

        assert_eq!(result.failed_records, 2);
        assert!(result.errors[0].message.contains("Too few columns"));
        assert_eq!(result.errors[0].line, 2);
        assert!(result.errors[1].message.contains("Could not parse date"));
        assert_eq!(result.errors[1].line, 3);
    }

    #[test]
    fn test_quoted_fields_and_payee_column() {
        let (storage, account) = setup(0);
        let csv = "Posted Date,Amount,Memo,Merchant
2024-03-01,-12.34,\"Lunch, with team\",Deli
";
        let headers = StringRecord::from(vec!["Posted Date", "Amount", "Memo", "Merchant"]);
        let mapping = ColumnMapping::detect_from_headers(&headers).unwrap();
        assert_eq!(mapping.description_column, 2);
        assert_eq!(mapping.payee_column, Some(3));

        let result = import(&storage, csv, "q.csv", &ImportOptions::new(account.id).mapping(mapping))
            .unwrap();
        let txn = &result.transactions[0];
        assert_eq!(txn.description.as_deref(), Some("Lunch, with team"));
        assert_eq!(txn.payee.as_deref(), Some("Deli"));
    }

    #[test]
    fn test_detect_requires_date_and_amount() {
        let headers = StringRecord::from(vec!["When", "Description", "Value"]);
        assert!(ColumnMapping::detect_from_headers(&headers).is_none());
    }

    #[test]
    fn test_fatal_errors() {
        let (storage, account) = setup(0);

        let err = import(&storage, SCENARIO_CSV, "a.csv", &options(&account).batch_size(0))
            .unwrap_err();
        assert!(err.is_validation());

        let err = import(
            &storage,
            SCENARIO_CSV,
            "a.csv",
            &ImportOptions::new(AccountId::new(99)),
        )
        .unwrap_err();
        assert!(err.is_not_found());

        AccountService::new(&storage).deactivate(account.id).unwrap();
        let err = import(&storage, SCENARIO_CSV, "a.csv", &options(&account)).unwrap_err();
        assert!(err.is_validation());

        let err = ImportService::new(&storage)
            .import_file(Path::new("/definitely/not/here.csv"), &options(&account))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Io(_)));
    }

    #[test]
    fn test_import_file_records_name() {
        let (storage, account) = setup(0);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("statement.csv");
        std::fs::write(&path, SCENARIO_CSV).unwrap();

        let result = ImportService::new(&storage)
            .import_file(&path, &options(&account))
            .unwrap();

        let history = ImportHistoryService::new(&storage)
            .get(result.import_id.unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(history.file_name.as_deref(), Some("statement.csv"));
        assert_eq!(history.imported_records, 3);
    }

    #[test]
    fn test_parse_date_fallbacks() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(parse_date("2024-01-31", "%m/%d/%Y").unwrap(), expected);
        assert_eq!(parse_date("01/31/2024", "%Y-%m-%d").unwrap(), expected);
        assert_eq!(parse_date("31-01-2024", "%Y-%m-%d").unwrap(), expected);
        assert!(parse_date("Jan 31", "%Y-%m-%d").is_err());
    }
}
