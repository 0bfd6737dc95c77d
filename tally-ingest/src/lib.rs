//! tally-ingest: CSV statement ingestion and export.
//!
//! Produces deduplicated, keyword-classified transactions for the
//! categorization pipeline.

pub mod dedup;
pub mod export;
pub mod parsers;
pub mod types;

pub use dedup::{dedup_key, new_transactions};
pub use export::{export_csv, export_csv_file, EXPORT_HEADERS};
pub use parsers::generic_csv::{
    detect_columns, normalize_date, parse_amount, parse_csv_file, parse_csv_str,
};
pub use types::{AmountColumns, ColumnMap, ParsedStatement};
