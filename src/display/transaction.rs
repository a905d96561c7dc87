//! Transaction display formatting
//!
//! Register view, single-transaction details and totals.

use super::{truncate, DisplayFormat};
use crate::models::{Transaction, TransactionType};
use crate::storage::Totals;

/// Format a single transaction for display (register row)
pub fn format_transaction_row(txn: &Transaction, fmt: &DisplayFormat) -> String {
    let status_icon = if txn.is_reconciled { "R" } else { " " };

    let who = txn
        .payee
        .as_deref()
        .or(txn.description.as_deref())
        .unwrap_or("(no payee)");
    let who = match (txn.kind, txn.transfer_account_id) {
        (TransactionType::Transfer, Some(other)) => format!("{} [{}]", who, other),
        _ => who.to_string(),
    };

    format!(
        "{:<8} {} {:<10} {:<8} {:<24} {:>14}",
        txn.id.to_string(),
        status_icon,
        fmt.date(txn.date),
        txn.kind,
        truncate(&who, 24),
        fmt.money(txn.amount)
    )
}

/// Format a list of transactions as a register
pub fn format_transaction_register(transactions: &[Transaction], fmt: &DisplayFormat) -> String {
    if transactions.is_empty() {
        return "No transactions found.\n".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:<8} {} {:<10} {:<8} {:<24} {:>14}\n",
        "ID", "R", "Date", "Type", "Payee", "Amount"
    ));
    output.push_str(&"-".repeat(71));
    output.push('\n');

    for txn in transactions {
        output.push_str(&format_transaction_row(txn, fmt));
        output.push('\n');
    }

    output
}

/// Format transaction details for display
pub fn format_transaction_details(
    txn: &Transaction,
    account_name: &str,
    category_name: Option<&str>,
    fmt: &DisplayFormat,
) -> String {
    let mut output = String::new();

    output.push_str(&format!("Transaction: {}\n", txn.id));
    output.push_str(&format!("Account:     {}\n", account_name));
    output.push_str(&format!("Date:        {}\n", fmt.date(txn.date)));
    output.push_str(&format!("Amount:      {}\n", fmt.money(txn.amount)));
    output.push_str(&format!("Type:        {}\n", txn.kind));

    if let Some(other) = txn.transfer_account_id {
        output.push_str(&format!("Transfer:    {}\n", other));
    }
    if let Some(payee) = &txn.payee {
        output.push_str(&format!("Payee:       {}\n", payee));
    }
    if let Some(description) = &txn.description {
        output.push_str(&format!("Description: {}\n", description));
    }

    output.push_str(&format!(
        "Category:    {}\n",
        category_name.unwrap_or("(uncategorized)")
    ));

    if !txn.tags.is_empty() {
        output.push_str(&format!("Tags:        {}\n", txn.tags.join(", ")));
    }

    match txn.reconciled_at {
        Some(at) if txn.is_reconciled => output.push_str(&format!(
            "Reconciled:  {}\n",
            at.format("%Y-%m-%d %H:%M UTC")
        )),
        _ => output.push_str("Reconciled:  No\n"),
    }

    if let Some(import_id) = txn.import_id {
        output.push_str(&format!("Import:      {}\n", import_id));
    }

    output
}

pub fn format_totals(label: &str, totals: &Totals, fmt: &DisplayFormat) -> String {
    format!(
        "Totals for {}\n  Inflow:  {:>14}\n  Outflow: {:>14}\n  Net:     {:>14}\n  Count:   {:>14}\n",
        label,
        fmt.money(totals.inflow),
        fmt.money(totals.outflow),
        fmt.money(totals.net),
        totals.count
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountId, Money, TransactionId};
    use chrono::{NaiveDate, Utc};

    fn transaction() -> Transaction {
        let now = Utc::now();
        Transaction {
            id: TransactionId::new(12),
            account_id: AccountId::new(1),
            amount: Money::from_cents(-5000),
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            kind: TransactionType::Expense,
            category_id: None,
            transfer_account_id: None,
            payee: Some("Test Store".into()),
            description: None,
            tags: vec!["home".into()],
            is_reconciled: false,
            reconciled_at: None,
            import_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_format_transaction_row() {
        let formatted = format_transaction_row(&transaction(), &DisplayFormat::default());
        assert!(formatted.starts_with("txn-12"));
        assert!(formatted.contains("2025-01-15"));
        assert!(formatted.contains("Test Store"));
        assert!(formatted.contains("-$50.00"));
    }

    #[test]
    fn test_format_empty_register() {
        let formatted = format_transaction_register(&[], &DisplayFormat::default());
        assert!(formatted.contains("No transactions found"));
    }

    #[test]
    fn test_format_transaction_details() {
        let formatted = format_transaction_details(
            &transaction(),
            "Checking",
            Some("Groceries"),
            &DisplayFormat::default(),
        );
        assert!(formatted.contains("Account:     Checking"));
        assert!(formatted.contains("Category:    Groceries"));
        assert!(formatted.contains("Tags:        home"));
        assert!(formatted.contains("Reconciled:  No"));
    }

    #[test]
    fn test_format_totals() {
        let totals = Totals {
            inflow: Money::from_cents(30),
            outflow: Money::from_cents(5),
            net: Money::from_cents(25),
            count: 3,
        };
        let formatted = format_totals("Checking", &totals, &DisplayFormat::default());
        assert!(formatted.contains("$0.25"));
        assert!(formatted.contains("Count:"));
    }
}
