//! Bank/card CSV exports with a header row.
//!
//! Columns are found by header name:
//!   date         -> first header containing "date"
//!   description  -> "description", "merchant" or "name"
//!   amount       -> "amount", else a "debit"/"credit" pair, else either alone
//!   reference id -> "reference", "ref", "transaction id", "confirmation", "check",
//!                   or any other "id" header that is not a card number
//! When the header is not recognized, rows are read positionally: date first,
//! description second, amount in the last numeric column.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;
use tally_core::{classify, Transaction};

use crate::dedup::dedup_key;
use crate::types::{AmountColumns, ColumnMap, ParsedStatement};

static SLASH_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("valid slash-date regex"));
static DASH_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})-(\d{1,2})-(\d{4})$").expect("valid dash-date regex"));
static NON_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.\-]").expect("valid amount regex"));

/// `YYYY-MM-DD`, `M/D/YYYY` or `M-D-YYYY`
pub fn normalize_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    let caps = SLASH_DATE.captures(s).or_else(|| DASH_DATE.captures(s))?;
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse `$1,234.56`-style cells. Parenthesized values are negative.
pub fn parse_amount(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let negative = s.starts_with('(') && s.ends_with(')');
    let value: f64 = NON_NUMERIC.replace_all(s, "").parse().ok()?;
    Some(if negative { -value.abs() } else { value })
}

fn find(headers: &[String], taken: &[usize], pred: impl Fn(&str) -> bool) -> Option<usize> {
    headers
        .iter()
        .enumerate()
        .find(|(i, h)| !taken.contains(i) && pred(h))
        .map(|(i, _)| i)
}

/// Detect column positions from a header row; `None` if date, description
/// or amount cannot be located
pub fn detect_columns(headers: &[String]) -> Option<ColumnMap> {
    let headers: Vec<String> = headers
        .iter()
        .map(|h| h.trim().trim_matches(|c| c == '"' || c == '\'').to_lowercase())
        .collect();

    let date = find(&headers, &[], |h| h.contains("date"))?;
    let description = find(&headers, &[date], |h| {
        h.contains("description") || h.contains("merchant") || h.contains("name")
    })?;
    let taken = [date, description];
    let amount = match find(&headers, &taken, |h| h.contains("amount")) {
        Some(i) => AmountColumns::Single(i),
        None => {
            let debit = find(&headers, &taken, |h| h.contains("debit"));
            let credit = find(&headers, &taken, |h| h.contains("credit"));
            match (debit, credit) {
                (Some(debit), Some(credit)) => AmountColumns::Split { debit, credit },
                (Some(i), None) | (None, Some(i)) => AmountColumns::Single(i),
                (None, None) => return None,
            }
        }
    };

    let mut taken = vec![date, description];
    match amount {
        AmountColumns::Single(i) => taken.push(i),
        AmountColumns::Split { debit, credit } => taken.extend([debit, credit]),
    }
    let reference = find(&headers, &taken, |h| {
        h.contains("reference")
            || h.contains("ref")
            || h.contains("transaction id")
            || h.contains("trans id")
            || h.contains("confirmation")
            || h.contains("check")
            || (h.contains("id") && !h.contains("card"))
    });

    Some(ColumnMap {
        date,
        description,
        amount,
        reference,
    })
}

fn cell(row: &csv::StringRecord, i: usize) -> &str {
    row.get(i).map(str::trim).unwrap_or("")
}

/// (date, description, amount, reference id) of one data row
type Row = (NaiveDate, String, f64, Option<String>);

fn read_row(row: &csv::StringRecord, columns: Option<&ColumnMap>) -> Option<Row> {
    match columns {
        Some(c) => {
            let amount = match c.amount {
                AmountColumns::Single(i) => parse_amount(cell(row, i))?,
                AmountColumns::Split { debit, credit } => {
                    let debit = parse_amount(cell(row, debit));
                    let credit = parse_amount(cell(row, credit));
                    if debit.is_none() && credit.is_none() {
                        return None;
                    }
                    credit.unwrap_or(0.0).abs() - debit.unwrap_or(0.0).abs()
                }
            };
            let reference = c
                .reference
                .map(|i| cell(row, i).to_string())
                .filter(|r| !r.is_empty());
            let date = normalize_date(cell(row, c.date))?;
            Some((date, cell(row, c.description).to_string(), amount, reference))
        }
        None => {
            if row.len() < 3 {
                return None;
            }
            let date = normalize_date(cell(row, 0))?;
            let description = [cell(row, 1), cell(row, 2)]
                .into_iter()
                .find(|s| !s.is_empty())
                .unwrap_or("Unknown")
                .to_string();
            let amount = (0..row.len()).rev().find_map(|i| parse_amount(cell(row, i)))?;
            Some((date, description, amount, None))
        }
    }
}

/// Parse CSV text. `source` is recorded on every transaction.
pub fn parse_csv_str(content: &str, source: &str) -> Result<ParsedStatement> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut records = rdr.records();
    let header = loop {
        match records.next() {
            Some(r) => {
                let r = r.context("reading CSV header")?;
                if r.iter().any(|c| !c.trim().is_empty()) {
                    break r;
                }
            }
            None => bail!("CSV file must have at least a header row and one data row"),
        }
    };
    let headers: Vec<String> = header.iter().map(str::to_string).collect();
    let columns = detect_columns(&headers);
    tracing::debug!(source, ?columns, "detected CSV columns");

    let mut seen: HashSet<String> = HashSet::new();
    let mut transactions = Vec::new();
    let mut duplicate_count = 0;
    let mut skipped_rows = 0;

    for (i, record) in records.enumerate() {
        let row_number = i + 1;
        let record = record.with_context(|| format!("reading CSV row {row_number}"))?;
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let Some((date, description, amount, reference_id)) = read_row(&record, columns.as_ref())
        else {
            skipped_rows += 1;
            continue;
        };
        let description = if description.is_empty() {
            "Unknown Transaction".to_string()
        } else {
            description
        };

        let id = reference_id
            .clone()
            .unwrap_or_else(|| format!("{date}-{description}-{amount}-{row_number}"));
        let basic = classify(&description);
        let mut txn = Transaction::new(id, date, description, amount, source)
            .with_category(basic.category, Some(basic.subcategory));
        txn.reference_id = reference_id;

        if !seen.insert(dedup_key(&txn)) {
            duplicate_count += 1;
            continue;
        }
        transactions.push(txn);
    }

    if duplicate_count > 0 {
        tracing::info!(source, duplicate_count, "skipped duplicate transactions");
    }
    if transactions.is_empty() {
        bail!("No valid transactions found in CSV file");
    }

    Ok(ParsedStatement {
        transactions,
        duplicate_count,
        skipped_rows,
        columns,
    })
}

/// Parse a CSV file; the file name becomes the transactions' source
pub fn parse_csv_file(path: impl AsRef<Path>) -> Result<ParsedStatement> {
    let path = path.as_ref();
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    parse_csv_str(&content, &source).with_context(|| format!("parsing {}", path.display()))
}
