use serde::Serialize;
use tally_core::Transaction;

/// Where the amount lives in a statement row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AmountColumns {
    /// One signed column
    Single(usize),
    /// Separate unsigned debit and credit columns
    Split { debit: usize, credit: usize },
}

/// Column positions detected from a header row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnMap {
    pub date: usize,
    pub description: usize,
    pub amount: AmountColumns,
    pub reference: Option<usize>,
}

/// Result of parsing one statement export
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatement {
    /// Deduplicated, basic-classified, in file order
    pub transactions: Vec<Transaction>,
    pub duplicate_count: usize,
    /// Rows dropped for a missing/unparseable date or amount
    pub skipped_rows: usize,
    /// `None` when the header was not recognized and positional parsing was used
    pub columns: Option<ColumnMap>,
}
