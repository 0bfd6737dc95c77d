use anyhow::{bail, Context, Result};
use serde_json::json;
use std::path::Path;
use tally_ai::{AiCategorizer, LanguageModel, Orchestrator, Progress, ProgressEvent, ProgressFn};
use tally_core::{
    category_label, ActivityKind, ActivityLogEntry, Category, CategorizedBy, Store, Transaction,
};
use tally_ingest::{new_transactions, parse_csv_file};
use tally_rules::update_rule_stats;

use crate::auth::{anthropic_client, require_anthropic_client};
use crate::config::Config;
use crate::progress::ProgressLog;
use crate::sheets_cmd::{create_sheet, sheet_index};
use crate::state::record_activity;

/// How a batch of transactions ended up categorized
fn provenance_counts(transactions: &[Transaction]) -> serde_json::Value {
    let count = |by: CategorizedBy| {
        transactions
            .iter()
            .filter(|t| t.categorized_by == Some(by))
            .count()
    };
    json!({
        "rules": count(CategorizedBy::Rule),
        "ai": count(CategorizedBy::Ai),
        "basic": transactions.iter().filter(|t| t.categorized_by.is_none()).count(),
    })
}

/// Rules, then the model (or keyword fallback). The activity entry is only
/// written when a model was involved.
async fn orchestrate(
    store: &impl Store,
    cfg: &Config,
    model: Option<&dyn LanguageModel>,
    kind: ActivityKind,
    sheet: &str,
    transactions: &[Transaction],
) -> Result<Vec<Transaction>> {
    let rules = store.load_rules().context("load rules")?;
    let mut log = ProgressLog::default();
    let mut sink = |e: &ProgressEvent| log.record(e);
    let result = Orchestrator::new(model)
        .with_ai_settings(cfg.ai_settings())
        .categorize_logged(transactions, &rules, Progress::from(&mut sink as ProgressFn<'_>))
        .await;
    let events = log.into_events();

    let (categorized, batches) = match result {
        Ok(done) => done,
        Err(e) => {
            tracing::warn!(error = %e, "AI categorization failed, using keyword categories");
            eprintln!("AI categorization failed ({e}); falling back to keyword categories");
            record_activity(
                store,
                ActivityLogEntry::error(
                    kind,
                    json!({ "sheet": sheet, "error": e.to_string(), "progress": events }),
                ),
            )?;
            return Ok(Orchestrator::new(None)
                .categorize(transactions, &rules, Progress::none())
                .await?);
        }
    };

    if let Some(model) = model {
        record_activity(
            store,
            ActivityLogEntry::success(
                kind,
                json!({
                    "sheet": sheet,
                    "model": model.model(),
                    "transactionCount": transactions.len(),
                    "categorizedBy": provenance_counts(&categorized),
                    "batches": batches,
                    "progress": events,
                }),
            ),
        )?;
    }
    Ok(categorized)
}

/// Persist rule statistics recomputed over every sheet
fn refresh_rule_stats(store: &impl Store, sheets: &[tally_core::Sheet]) -> Result<()> {
    let rules = store.load_rules().context("load rules")?;
    if rules.is_empty() {
        return Ok(());
    }
    let all: Vec<Transaction> = sheets
        .iter()
        .flat_map(|s| s.transactions.iter().cloned())
        .collect();
    store.save_rules(&update_rule_stats(&rules, &all)).context("save rules")?;
    Ok(())
}

pub async fn import(
    store: &impl Store,
    cfg: &Config,
    csv: &Path,
    sheet: &str,
    no_ai: bool,
) -> Result<()> {
    let parsed = parse_csv_file(csv).with_context(|| format!("importing {}", csv.display()))?;
    let mut sheets = store.load_sheets().context("load sheets")?;
    let idx = match sheet_index(&sheets, sheet) {
        Ok(i) => i,
        Err(_) => {
            println!("Created sheet '{sheet}'");
            create_sheet(&mut sheets, sheet)?
        }
    };

    let (fresh, already_present) = new_transactions(&sheets[idx].transactions, parsed.transactions);
    println!(
        "Parsed {} new transactions from {} \
         ({} duplicates in file, {} already in sheet, {} rows skipped)",
        fresh.len(),
        csv.display(),
        parsed.duplicate_count,
        already_present,
        parsed.skipped_rows
    );
    if fresh.is_empty() {
        return Ok(());
    }

    let client = if no_ai { None } else { anthropic_client(cfg)? };
    if client.is_none() && !no_ai {
        println!("No Anthropic API key; unmatched transactions keep keyword categories");
    }
    let model = client.as_ref().map(|c| c as &dyn LanguageModel);
    let categorized =
        orchestrate(store, cfg, model, ActivityKind::Categorization, sheet, &fresh).await?;

    let added = categorized.len();
    sheets[idx].transactions.extend(categorized);
    store.save_sheets(&sheets).context("save sheets")?;
    refresh_rule_stats(store, &sheets)?;
    println!("Added {added} transactions to '{sheet}'");
    Ok(())
}

pub async fn recategorize(
    store: &impl Store,
    cfg: &Config,
    sheet: &str,
    ai_only: bool,
) -> Result<()> {
    let mut sheets = store.load_sheets().context("load sheets")?;
    let idx = sheet_index(&sheets, sheet)?;
    let transactions = sheets[idx].transactions.clone();
    if transactions.is_empty() {
        println!("Sheet '{sheet}' has no transactions");
        return Ok(());
    }

    let updated = if ai_only {
        let client = require_anthropic_client(cfg)?;
        ai_pass(store, cfg, &client, sheet, transactions).await?
    } else {
        let client = anthropic_client(cfg)?;
        let model = client.as_ref().map(|c| c as &dyn LanguageModel);
        orchestrate(store, cfg, model, ActivityKind::Recategorization, sheet, &transactions).await?
    };

    let counts = provenance_counts(&updated);
    sheets[idx].transactions = updated;
    store.save_sheets(&sheets).context("save sheets")?;
    refresh_rule_stats(store, &sheets)?;
    println!("Re-categorized '{sheet}': {counts}");
    Ok(())
}

/// Every transaction through the model, ignoring rules. Nothing is saved on
/// failure.
async fn ai_pass(
    store: &impl Store,
    cfg: &Config,
    model: &dyn LanguageModel,
    sheet: &str,
    mut transactions: Vec<Transaction>,
) -> Result<Vec<Transaction>> {
    let mut log = ProgressLog::default();
    let mut sink = |e: &ProgressEvent| log.record(e);
    let result = AiCategorizer::new(model)
        .with_settings(cfg.ai_settings())
        .categorize_in_place(&mut transactions, Progress::from(&mut sink as ProgressFn<'_>))
        .await;
    let events = log.into_events();

    match result {
        Ok(report) => {
            record_activity(
                store,
                ActivityLogEntry::success(
                    ActivityKind::Recategorization,
                    json!({
                        "sheet": sheet,
                        "model": model.model(),
                        "transactionCount": transactions.len(),
                        "applied": report.applied,
                        "batches": report.batches,
                    }),
                ),
            )?;
            Ok(transactions)
        }
        Err(e) => {
            record_activity(
                store,
                ActivityLogEntry::error(
                    ActivityKind::Recategorization,
                    json!({ "sheet": sheet, "error": e.to_string(), "progress": events }),
                ),
            )?;
            Err(e).context("AI re-categorization failed; sheet left unchanged")
        }
    }
}

/// Apply a manual category to one transaction
pub fn set_category(
    transactions: &mut [Transaction],
    id: &str,
    category: &str,
    subcategory: Option<&str>,
) -> Result<()> {
    let Some(category) = Category::from_name(category) else {
        bail!("unknown category '{}'", category);
    };
    let Some(txn) = transactions.iter_mut().find(|t| t.id == id) else {
        bail!("transaction '{}' not found", id);
    };
    txn.set_category(category, subcategory);
    Ok(())
}

pub fn set_category_cmd(
    store: &impl Store,
    sheet: &str,
    id: &str,
    category: &str,
    subcategory: Option<&str>,
) -> Result<()> {
    let mut sheets = store.load_sheets().context("load sheets")?;
    let idx = sheet_index(&sheets, sheet)?;
    set_category(&mut sheets[idx].transactions, id, category, subcategory)?;
    store.save_sheets(&sheets).context("save sheets")?;
    refresh_rule_stats(store, &sheets)?;
    if let Some(t) = sheets[idx].transactions.iter().find(|t| t.id == id) {
        println!(
            "{} -> {} / {}",
            t.description,
            category_label(t.category),
            t.subcategory.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_provenance_counts() {
        let d = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let mut by_rule = Transaction::new("1", d, "NETFLIX", -15.0, "s")
            .with_category(Category::Entertainment, None);
        by_rule.categorized_by = Some(CategorizedBy::Rule);
        let mut by_ai =
            Transaction::new("2", d, "CAFE", -4.0, "s").with_category(Category::Dining, None);
        by_ai.categorized_by = Some(CategorizedBy::Ai);
        let basic = Transaction::new("3", d, "SHELL", -40.0, "s");

        assert_eq!(
            provenance_counts(&[by_rule, by_ai, basic]),
            json!({"rules": 1, "ai": 1, "basic": 1})
        );
    }

    #[test]
    fn test_set_category_overrides_ai_result() {
        let d = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let mut ai = Transaction::new("t1", d, "BLUE BOTTLE", -6.0, "s")
            .with_category(Category::Shopping, None);
        ai.ai_categorized = true;
        ai.categorized_by = Some(CategorizedBy::Ai);
        let mut txns = vec![ai];

        set_category(&mut txns, "t1", "Dining", Some("coffee shops")).unwrap();
        assert_eq!(txns[0].category, Some(Category::Dining));
        assert_eq!(txns[0].subcategory.as_deref(), Some("Coffee Shops"));
        assert!(!txns[0].ai_categorized);
        assert_eq!(txns[0].categorized_by, None);

        assert!(set_category(&mut txns, "t1", "Pets", None).is_err());
        assert!(set_category(&mut txns, "nope", "Dining", None).is_err());
    }
}
