//! Coercion of legacy transaction data into the canonical shape.
//!
//! Older exports stored amounts as formatted text, spelled the transaction
//! type in several languages and cases, and wrote dates in half a dozen
//! formats. Everything entering the system through an import or a raw JSON
//! write goes through here first.

mod amount;
mod date;
mod error;
mod kind;
mod record;

pub use amount::{parse_amount, parse_amount_str};
pub use date::{
    excel_serial_to_date, month_from_name, parse_date, parse_date_str, DateFormat,
    TWO_DIGIT_YEAR_PIVOT,
};
pub use error::{NormalizeError, Result};
pub use kind::{is_canonical_kind, normalize_kind};
pub use record::{
    normalize_batch, normalize_document, normalize_record, NormalizeReport, NormalizedRecord,
    RecordFixes, RejectedRecord,
};
