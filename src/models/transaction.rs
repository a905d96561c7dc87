//! Transaction model
//!
//! A transaction moves money into (positive amount) or out of (negative
//! amount) exactly one account. `NewTransaction` is the unsaved form used by
//! single adds and CSV imports; `UpdateTransaction` describes a partial edit.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ids::{AccountId, CategoryId, ImportId, TransactionId};
use super::money::Money;

/// Kind of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
    /// Money moved to or from another of the user's accounts
    Transfer,
}

impl TransactionType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }

    /// Infer the kind of an imported record from its (already sign-corrected) amount
    pub fn from_amount(amount: Money) -> Self {
        if amount.is_negative() {
            Self::Expense
        } else {
            Self::Income
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = TransactionValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            other => Err(TransactionValidationError::UnknownType(other.to_string())),
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// A persisted financial transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier
    pub id: TransactionId,

    /// The account this transaction belongs to
    pub account_id: AccountId,

    /// Amount (positive for inflow, negative for outflow)
    pub amount: Money,

    /// Transaction date
    pub date: NaiveDate,

    #[serde(rename = "type")]
    pub kind: TransactionType,

    pub category_id: Option<CategoryId>,

    /// Counter-account for transfers
    pub transfer_account_id: Option<AccountId>,

    pub payee: Option<String>,

    pub description: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    pub is_reconciled: bool,

    pub reconciled_at: Option<DateTime<Utc>>,

    /// Import batch that created this transaction, if any
    pub import_id: Option<ImportId>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_inflow(&self) -> bool {
        self.amount.is_positive()
    }

    pub fn is_outflow(&self) -> bool {
        self.amount.is_negative()
    }

    /// Apply a partial edit, returning the edited copy
    ///
    /// The id, reconciliation state and import provenance are never changed
    /// by an edit.
    pub fn with_changes(&self, changes: &UpdateTransaction) -> Transaction {
        let mut txn = self.clone();

        if let Some(account_id) = changes.account_id {
            txn.account_id = account_id;
        }
        if let Some(amount) = changes.amount {
            txn.amount = amount;
        }
        if let Some(date) = changes.date {
            txn.date = date;
        }
        if let Some(kind) = changes.kind {
            txn.kind = kind;
        }
        if let Some(category_id) = changes.category_id {
            txn.category_id = category_id;
        }
        if let Some(transfer_account_id) = changes.transfer_account_id {
            txn.transfer_account_id = transfer_account_id;
        }
        if let Some(payee) = &changes.payee {
            txn.payee = normalize_text(payee.clone());
        }
        if let Some(description) = &changes.description {
            txn.description = normalize_text(description.clone());
        }
        if let Some(tags) = &changes.tags {
            txn.tags = normalize_tags(tags.clone());
        }

        txn
    }

    /// Validate the shape of the transaction
    pub fn validate(&self) -> Result<(), TransactionValidationError> {
        validate_transfer(self.kind, self.account_id, self.transfer_account_id)
    }

    /// Short human label used in audit entries
    pub fn label(&self) -> String {
        let who = self
            .payee
            .as_deref()
            .or(self.description.as_deref())
            .unwrap_or("");
        format!("{} {}", self.date, who).trim_end().to_string()
    }
}

/// An unsaved transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub account_id: AccountId,
    pub amount: Money,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category_id: Option<CategoryId>,
    pub transfer_account_id: Option<AccountId>,
    pub payee: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub import_id: Option<ImportId>,
}

impl NewTransaction {
    pub fn new(account_id: AccountId, date: NaiveDate, amount: Money, kind: TransactionType) -> Self {
        Self {
            account_id,
            amount,
            date,
            kind,
            category_id: None,
            transfer_account_id: None,
            payee: None,
            description: None,
            tags: Vec::new(),
            import_id: None,
        }
    }

    pub fn with_payee(mut self, payee: impl Into<String>) -> Self {
        self.payee = normalize_text(Some(payee.into()));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = normalize_text(Some(description.into()));
        self
    }

    pub fn with_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = normalize_tags(tags);
        self
    }

    /// Mark as a transfer to or from `other`
    pub fn transfer_with(mut self, other: AccountId) -> Self {
        self.kind = TransactionType::Transfer;
        self.transfer_account_id = Some(other);
        self
    }

    /// Trim free-text fields and drop empty ones
    pub fn normalized(mut self) -> Self {
        self.payee = normalize_text(self.payee);
        self.description = normalize_text(self.description);
        self.tags = normalize_tags(self.tags);
        self
    }

    /// Validate the shape of the transaction
    pub fn validate(&self) -> Result<(), TransactionValidationError> {
        validate_transfer(self.kind, self.account_id, self.transfer_account_id)
    }
}

/// A partial edit of a transaction. `None` leaves a field untouched; for the
/// optional fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTransaction {
    pub account_id: Option<AccountId>,
    pub amount: Option<Money>,
    pub date: Option<NaiveDate>,
    pub kind: Option<TransactionType>,
    pub category_id: Option<Option<CategoryId>>,
    pub transfer_account_id: Option<Option<AccountId>>,
    pub payee: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

impl UpdateTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn kind(mut self, kind: TransactionType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn category(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn payee(mut self, payee: Option<String>) -> Self {
        self.payee = Some(payee);
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn validate_transfer(
    kind: TransactionType,
    account_id: AccountId,
    transfer_account_id: Option<AccountId>,
) -> Result<(), TransactionValidationError> {
    match (kind, transfer_account_id) {
        (TransactionType::Transfer, None) => Err(TransactionValidationError::TransferWithoutTarget),
        (TransactionType::Transfer, Some(other)) if other == account_id => {
            Err(TransactionValidationError::TransferToSelf)
        }
        (TransactionType::Income | TransactionType::Expense, Some(_)) => {
            Err(TransactionValidationError::TargetWithoutTransfer)
        }
        _ => Ok(()),
    }
}

fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !normalized.iter().any(|t| t == tag) {
            normalized.push(tag.to_string());
        }
    }
    normalized
}

/// Validation errors for transactions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionValidationError {
    #[error("Unknown transaction type '{0}' (expected income, expense or transfer)")]
    UnknownType(String),
    #[error("Transfer transactions need a counter-account")]
    TransferWithoutTarget,
    #[error("Cannot transfer to the same account")]
    TransferToSelf,
    #[error("Only transfer transactions may reference a counter-account")]
    TargetWithoutTransfer,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    #[test]
    fn test_type_parse() {
        assert_eq!("income".parse::<TransactionType>(), Ok(TransactionType::Income));
        assert_eq!(" Expense ".parse::<TransactionType>(), Ok(TransactionType::Expense));
        assert_eq!("TRANSFER".parse::<TransactionType>(), Ok(TransactionType::Transfer));
        assert_eq!(
            "refund".parse::<TransactionType>(),
            Err(TransactionValidationError::UnknownType("refund".into()))
        );
    }

    #[test]
    fn test_type_from_amount() {
        assert_eq!(TransactionType::from_amount(Money::from_cents(-1)), TransactionType::Expense);
        assert_eq!(TransactionType::from_amount(Money::from_cents(1)), TransactionType::Income);
        assert_eq!(TransactionType::from_amount(Money::zero()), TransactionType::Income);
    }

    #[test]
    fn test_new_transaction_normalizes_text() {
        let txn = NewTransaction::new(AccountId::new(1), date(), Money::from_cents(-500), TransactionType::Expense)
            .with_payee("  Coffee Shop ")
            .with_description("   ")
            .with_tags(vec![" food".into(), "".into(), "food".into(), "morning".into()]);

        assert_eq!(txn.payee.as_deref(), Some("Coffee Shop"));
        assert_eq!(txn.description, None);
        assert_eq!(txn.tags, vec!["food".to_string(), "morning".to_string()]);
    }

    #[test]
    fn test_transfer_validation() {
        let base = NewTransaction::new(AccountId::new(1), date(), Money::from_cents(-500), TransactionType::Transfer);
        assert_eq!(base.validate(), Err(TransactionValidationError::TransferWithoutTarget));

        let to_self = base.clone().transfer_with(AccountId::new(1));
        assert_eq!(to_self.validate(), Err(TransactionValidationError::TransferToSelf));

        let ok = base.clone().transfer_with(AccountId::new(2));
        assert!(ok.validate().is_ok());

        let mut expense_with_target = ok;
        expense_with_target.kind = TransactionType::Expense;
        assert_eq!(
            expense_with_target.validate(),
            Err(TransactionValidationError::TargetWithoutTransfer)
        );
    }

    #[test]
    fn test_with_changes() {
        let now = Utc::now();
        let txn = Transaction {
            id: TransactionId::new(1),
            account_id: AccountId::new(1),
            amount: Money::from_cents(-500),
            date: date(),
            kind: TransactionType::Expense,
            category_id: Some(CategoryId::new(4)),
            transfer_account_id: None,
            payee: Some("Old".into()),
            description: None,
            tags: vec![],
            is_reconciled: true,
            reconciled_at: Some(now),
            import_id: Some(ImportId::new(9)),
            created_at: now,
            updated_at: now,
        };

        let changes = UpdateTransaction::new()
            .account(AccountId::new(2))
            .amount(Money::from_cents(-750))
            .category(None)
            .payee(Some(" New ".into()));
        let edited = txn.with_changes(&changes);

        assert_eq!(edited.id, txn.id);
        assert_eq!(edited.account_id, AccountId::new(2));
        assert_eq!(edited.amount.cents(), -750);
        assert_eq!(edited.category_id, None);
        assert_eq!(edited.payee.as_deref(), Some("New"));
        assert!(edited.is_reconciled);
        assert_eq!(edited.import_id, Some(ImportId::new(9)));
        assert!(!changes.is_empty());
        assert!(UpdateTransaction::new().is_empty());
    }

    #[test]
    fn test_label() {
        let txn = NewTransaction::new(AccountId::new(1), date(), Money::from_cents(1), TransactionType::Income);
        assert!(txn.validate().is_ok());
        let now = Utc::now();
        let saved = Transaction {
            id: TransactionId::new(1),
            account_id: txn.account_id,
            amount: txn.amount,
            date: txn.date,
            kind: txn.kind,
            category_id: None,
            transfer_account_id: None,
            payee: None,
            description: Some("Paycheck".into()),
            tags: vec![],
            is_reconciled: false,
            reconciled_at: None,
            import_id: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(saved.label(), "2025-01-15 Paycheck");
    }
}
