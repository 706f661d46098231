//! Pretty output formatting.

use expensync_core::format::format_currency;
use expensync_core::normalize::NormalizeReport;
use expensync_core::transaction::{ChangeEvent, Summary, Transaction, TransactionChange, TransactionKind};

use crate::client::health::ServerHealth;

const CURRENCY: &str = "$";

fn signed_amount(transaction: &Transaction) -> String {
    let amount = format_currency(transaction.amount, CURRENCY);
    match transaction.kind {
        TransactionKind::Income => format!("+{amount}"),
        TransactionKind::Expense => format!("-{amount}"),
    }
}

/// Format a transaction for display.
pub fn format_transaction(transaction: &Transaction) -> String {
    let mut output = format!(
        "{} {} [{}]\n  ID: {}\n  Amount: {}",
        transaction.date,
        transaction.description,
        transaction.kind.as_str(),
        transaction.id,
        signed_amount(transaction)
    );
    let details = [
        ("Category", &transaction.category),
        ("Account", &transaction.account),
        ("Subaccount", &transaction.subaccount),
        ("Location", &transaction.location),
        ("Payment", &transaction.payment_method),
        ("Merchant", &transaction.merchant),
        ("Notes", &transaction.notes),
    ];
    for (label, value) in details {
        if let Some(value) = value {
            output.push_str(&format!("\n  {label}: {value}"));
        }
    }
    output
}

/// Format transactions for display.
pub fn format_transactions(transactions: &[Transaction]) -> String {
    if transactions.is_empty() {
        return "No transactions found.".to_string();
    }
    let mut output = format!("TRANSACTIONS ({})\n", transactions.len());
    output.push_str(&"-".repeat(40));
    for transaction in transactions {
        output.push_str(&format!("\n{}", format_transaction(transaction)));
        output.push('\n');
    }
    output
}

/// Format totals and the per-category breakdown.
pub fn format_summary(summary: &Summary) -> String {
    let mut output = format!(
        "SUMMARY ({} transactions)\n  Income:   {}\n  Expenses: {}\n  Balance:  {}",
        summary.count,
        format_currency(summary.income, CURRENCY),
        format_currency(summary.expenses, CURRENCY),
        format_currency(summary.balance, CURRENCY),
    );
    if !summary.expenses_by_category.is_empty() {
        output.push_str("\nEXPENSES BY CATEGORY");
        for (category, amount) in &summary.expenses_by_category {
            output.push_str(&format!(
                "\n  {category}: {}",
                format_currency(*amount, CURRENCY)
            ));
        }
    }
    output
}

/// Format what an import had to fix.
pub fn format_report(report: &NormalizeReport) -> String {
    let mut output = format!(
        "IMPORT ({} of {} records normalized)\n  Ids assigned: {}\n  Duplicate ids: {}\n  Amounts parsed from text: {}\n  Amounts set to zero: {}\n  Types fixed: {}\n  Dates converted: {}",
        report.normalized,
        report.total,
        report.ids_assigned,
        report.duplicate_ids,
        report.amounts_from_text,
        report.amounts_defaulted,
        report.kinds_fixed,
        report.dates_converted(),
    );
    for (format, count) in &report.date_formats {
        output.push_str(&format!("\n    {format}: {count}"));
    }
    for rejected in &report.rejected {
        output.push_str(&format!(
            "\n  Rejected #{}: {}",
            rejected.index, rejected.reason
        ));
    }
    output
}

/// Format one change event as a single line.
pub fn format_change(event: &ChangeEvent) -> String {
    match &event.change {
        TransactionChange::Added { transaction } => format!(
            "#{} added {} {} {}",
            event.seq,
            transaction.id,
            transaction.description,
            signed_amount(transaction)
        ),
        TransactionChange::Modified { transaction } => format!(
            "#{} modified {} {} {}",
            event.seq,
            transaction.id,
            transaction.description,
            signed_amount(transaction)
        ),
        TransactionChange::Removed { id } => format!("#{} removed {}", event.seq, id),
    }
}

/// Format the server health check.
pub fn format_health(health: &ServerHealth) -> String {
    format!(
        "Server Health:\n  Healthy: {}\n  Latest event: {}\n  Events retained: {}",
        health.healthy, health.latest_seq, health.event_history_size
    )
}
