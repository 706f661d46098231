//! Transaction arguments.
//!
//! Amounts, dates and types go through the same normalization as imported
//! data, so `"$ 1,200"`, `15/03/2024` and `gasto` are all accepted.

use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;

use expensync_core::normalize::{normalize_kind, parse_amount_str, parse_date_str};
use expensync_core::transaction::{Transaction, TransactionDraft, TransactionKind};

fn parse_amount_arg(raw: &str) -> Result<Decimal, String> {
    parse_amount_str(raw).map_err(|e| e.to_string())
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_date_str(raw)
        .map(|(date, _)| date)
        .map_err(|e| e.to_string())
}

fn parse_kind_arg(raw: &str) -> Result<TransactionKind, String> {
    Ok(normalize_kind(raw))
}

/// Fields of a new transaction.
#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(long)]
    pub description: String,
    #[arg(long, value_parser = parse_amount_arg, allow_hyphen_values = true)]
    pub amount: Decimal,
    #[arg(long, value_parser = parse_date_arg)]
    pub date: NaiveDate,
    /// `ingreso`/`income` or `egreso`/`gasto`/`expense`.
    #[arg(long = "type", value_parser = parse_kind_arg, default_value = "egreso")]
    pub kind: TransactionKind,
    #[command(flatten)]
    pub details: DetailArgs,
}

impl AddArgs {
    pub fn into_draft(self) -> TransactionDraft {
        let mut draft = TransactionDraft::new(self.description, self.amount, self.date, self.kind);
        self.details.apply_to_draft(&mut draft);
        draft
    }
}

/// Fields to change on an existing transaction.
#[derive(Debug, Args)]
pub struct UpdateArgs {
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, value_parser = parse_amount_arg, allow_hyphen_values = true)]
    pub amount: Option<Decimal>,
    #[arg(long, value_parser = parse_date_arg)]
    pub date: Option<NaiveDate>,
    #[arg(long = "type", value_parser = parse_kind_arg)]
    pub kind: Option<TransactionKind>,
    #[command(flatten)]
    pub details: DetailArgs,
}

impl UpdateArgs {
    /// Overlay the given fields on `transaction`.
    pub fn apply(self, transaction: &mut Transaction) {
        if let Some(description) = self.description {
            transaction.description = description;
        }
        if let Some(amount) = self.amount {
            transaction.amount = amount;
        }
        if let Some(date) = self.date {
            transaction.date = date;
        }
        if let Some(kind) = self.kind {
            transaction.kind = kind;
        }
        let mut draft = transaction.to_draft();
        self.details.apply_to_draft(&mut draft);
        *transaction = draft.into_transaction(transaction.id.clone());
    }
}

/// Optional descriptive fields.
#[derive(Debug, Default, Args)]
pub struct DetailArgs {
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub account: Option<String>,
    #[arg(long)]
    pub subaccount: Option<String>,
    #[arg(long)]
    pub payment_method: Option<String>,
    #[arg(long)]
    pub merchant: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

impl DetailArgs {
    fn apply_to_draft(self, draft: &mut TransactionDraft) {
        let fields = [
            (self.category, &mut draft.category),
            (self.location, &mut draft.location),
            (self.account, &mut draft.account),
            (self.subaccount, &mut draft.subaccount),
            (self.payment_method, &mut draft.payment_method),
            (self.merchant, &mut draft.merchant),
            (self.notes, &mut draft.notes),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = Some(value);
            }
        }
    }
}
