//! Spreadsheet row layout for the remote `Transactions` and `Rules` tabs.
//!
//! Only column order matters to the remote provider. Parsing is tolerant of
//! short rows (trailing empty cells are often omitted by spreadsheet APIs).

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::finance::Transaction;
use crate::rule::{Rule, RuleAuthor, RuleRecord};
use crate::taxonomy::{category_label, Category};

pub const RULE_HEADERS: [&str; 12] = [
    "ID",
    "Name",
    "Type",
    "Pattern",
    "Category",
    "Subcategory",
    "Confidence",
    "Match Count",
    "Examples",
    "Created At",
    "Created By",
    "Enabled",
];

pub const TRANSACTION_HEADERS: [&str; 10] = [
    "Date",
    "Description",
    "Amount",
    "Category",
    "Subcategory",
    "Source",
    "AI Categorized",
    "AI Reason",
    "Reference ID",
    "Rule ID",
];

fn cell(row: &[String], i: usize) -> &str {
    row.get(i).map(|s| s.as_str()).unwrap_or("")
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() { None } else { Some(s.to_string()) }
}

pub fn rule_to_row(rule: &Rule) -> Vec<String> {
    vec![
        rule.id.clone(),
        rule.name.clone(),
        rule.rule_type().as_str().to_string(),
        rule.matcher.pattern_text(),
        rule.category.as_str().to_string(),
        rule.subcategory.clone().unwrap_or_default(),
        rule.confidence.to_string(),
        rule.match_count.to_string(),
        serde_json::to_string(&rule.examples).unwrap_or_else(|_| "[]".to_string()),
        rule.created_at.to_rfc3339(),
        rule.created_by.as_str().to_string(),
        if rule.enabled { "TRUE" } else { "FALSE" }.to_string(),
    ]
}

/// Parse a `Rules` row; `row_number` is only used in error messages
pub fn rule_from_row(row: &[String], row_number: usize) -> Result<Rule> {
    let created_by = match cell(row, 10).trim() {
        "ai" => Some(RuleAuthor::Ai),
        "user" => Some(RuleAuthor::User),
        _ => None,
    };
    let record = RuleRecord {
        id: cell(row, 0).to_string(),
        name: cell(row, 1).to_string(),
        rule_type: cell(row, 2).to_string(),
        pattern: Value::String(cell(row, 3).to_string()),
        category: cell(row, 4).to_string(),
        subcategory: non_empty(cell(row, 5)),
        confidence: cell(row, 6).trim().parse().ok(),
        match_count: cell(row, 7).trim().parse().unwrap_or(0),
        examples: serde_json::from_str(cell(row, 8)).unwrap_or_default(),
        created_at: DateTime::parse_from_rfc3339(cell(row, 9).trim())
            .ok()
            .map(|d| d.with_timezone(&Utc)),
        created_by,
        enabled: cell(row, 11).trim().eq_ignore_ascii_case("TRUE"),
    };
    Rule::try_from(record).map_err(|e| CoreError::InvalidRow {
        table: "Rules",
        row: row_number,
        details: e.to_string(),
    })
}

pub fn transaction_to_row(t: &Transaction) -> Vec<String> {
    vec![
        t.date.format("%Y-%m-%d").to_string(),
        t.description.clone(),
        t.amount.to_string(),
        category_label(t.category).to_string(),
        t.subcategory.clone().unwrap_or_default(),
        t.source.clone(),
        if t.ai_categorized { "Yes" } else { "No" }.to_string(),
        t.ai_reason.clone().unwrap_or_default(),
        t.reference_id.clone().unwrap_or_default(),
        t.rule_id.clone().unwrap_or_default(),
    ]
}

/// Parse a `Transactions` row. The id is the reference id when present,
/// otherwise derived from the row content and position.
pub fn transaction_from_row(row: &[String], row_number: usize) -> Result<Transaction> {
    let invalid = |details: String| CoreError::InvalidRow {
        table: "Transactions",
        row: row_number,
        details,
    };
    let date = NaiveDate::parse_from_str(cell(row, 0).trim(), "%Y-%m-%d")
        .map_err(|e| invalid(format!("date '{}': {e}", cell(row, 0))))?;
    let amount: f64 = cell(row, 2)
        .trim()
        .parse()
        .map_err(|e| invalid(format!("amount '{}': {e}", cell(row, 2))))?;
    let description = cell(row, 1).to_string();
    let reference_id = non_empty(cell(row, 8));
    let id = reference_id
        .clone()
        .unwrap_or_else(|| format!("{date}-{description}-{amount}-{row_number}"));

    let mut t = Transaction::new(id, date, description, amount, cell(row, 5));
    t.reference_id = reference_id;
    t.category = Category::from_name(cell(row, 3));
    t.subcategory = match t.category {
        Some(c) => non_empty(cell(row, 4)).map(|s| c.normalize_subcategory(Some(&s)).to_string()),
        None => None,
    };
    t.ai_categorized = cell(row, 6).trim().eq_ignore_ascii_case("Yes");
    t.ai_reason = non_empty(cell(row, 7));
    t.rule_id = non_empty(cell(row, 9));
    Ok(t)
}
