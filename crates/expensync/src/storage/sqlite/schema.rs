//! SQLite schema definitions and SQL query constants.

/// SQL statement to create all tables.
pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
    id TEXT PRIMARY KEY,
    description TEXT NOT NULL,
    amount TEXT NOT NULL,
    date TEXT NOT NULL,
    kind TEXT NOT NULL,
    category TEXT,
    location TEXT,
    account TEXT,
    subaccount TEXT,
    payment_method TEXT,
    invoice TEXT,
    tags TEXT,
    notes TEXT,
    business_purpose TEXT,
    merchant TEXT,
    receipt_number TEXT
);

CREATE INDEX IF NOT EXISTS idx_transactions_date_id ON transactions(date DESC, id DESC);
"#;

const COLUMNS: &str = "id, description, amount, date, kind, category, location, account, \
    subaccount, payment_method, invoice, tags, notes, business_purpose, merchant, receipt_number";

pub const INSERT_TRANSACTION: &str = r#"
INSERT INTO transactions (id, description, amount, date, kind, category, location, account,
    subaccount, payment_method, invoice, tags, notes, business_purpose, merchant, receipt_number)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
"#;

pub const UPDATE_TRANSACTION: &str = r#"
UPDATE transactions
SET description = ?2, amount = ?3, date = ?4, kind = ?5, category = ?6, location = ?7,
    account = ?8, subaccount = ?9, payment_method = ?10, invoice = ?11, tags = ?12,
    notes = ?13, business_purpose = ?14, merchant = ?15, receipt_number = ?16
WHERE id = ?1
"#;

pub const DELETE_TRANSACTION: &str = "DELETE FROM transactions WHERE id = ?1";

/// Select by id.
pub fn select_transaction_by_id() -> String {
    format!("SELECT {COLUMNS} FROM transactions WHERE id = ?1")
}

/// First page: `?1` is the row limit.
pub fn select_first_page() -> String {
    format!("SELECT {COLUMNS} FROM transactions ORDER BY date DESC, id DESC LIMIT ?1")
}

/// Page after a cursor: `?1` cursor date, `?2` cursor id, `?3` row limit.
pub fn select_page_after() -> String {
    format!(
        "SELECT {COLUMNS} FROM transactions \
         WHERE date < ?1 OR (date = ?1 AND id < ?2) \
         ORDER BY date DESC, id DESC LIMIT ?3"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_queries_share_order() {
        assert!(select_first_page().contains("ORDER BY date DESC, id DESC"));
        assert!(select_page_after().contains("ORDER BY date DESC, id DESC"));
    }

    #[test]
    fn test_select_lists_every_inserted_column() {
        let columns = COLUMNS.split(',').count();
        assert_eq!(columns, 16);
        assert!(INSERT_TRANSACTION.contains("?16"));
        assert!(UPDATE_TRANSACTION.contains("?16"));
    }
}
