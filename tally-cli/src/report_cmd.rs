use anyhow::{bail, Context, Result};
use serde_json::json;
use tally_ai::{generate_insights, LanguageModel};
use tally_core::{
    monthly_category_totals, subcategory_totals, ActivityKind, ActivityLogEntry, ActivityStatus,
    Category, SpendingSummary, Store,
};

use crate::auth::require_anthropic_client;
use crate::config::Config;
use crate::sheets_cmd::sheet_index;
use crate::state::record_activity;

pub fn summary(store: &impl Store, sheet: &str, category: Option<&str>) -> Result<()> {
    let sheets = store.load_sheets().context("load sheets")?;
    let transactions = &sheets[sheet_index(&sheets, sheet)?].transactions;

    if let Some(name) = category {
        let Some(category) = Category::from_name(name) else {
            bail!("unknown category '{}'", name);
        };
        for (sub, total) in subcategory_totals(transactions, category) {
            println!("{sub:<24} ${total:>10.2}");
        }
        return Ok(());
    }

    let s = SpendingSummary::from_transactions(transactions);
    println!("Transactions: {}", s.transaction_count);
    println!("Income:   ${:>10.2}", s.total_income);
    println!("Expenses: ${:>10.2}", s.total_expenses);
    println!("Net:      ${:>10.2}\n", s.net);
    for c in &s.by_category {
        println!("{:<16} ${:>10.2} {:>5.1}%  ({})", c.category, c.total, c.percent, c.count);
    }
    Ok(())
}

pub fn trends(store: &impl Store, sheet: &str) -> Result<()> {
    let sheets = store.load_sheets().context("load sheets")?;
    let trends = monthly_category_totals(&sheets[sheet_index(&sheets, sheet)?].transactions);
    if trends.months.is_empty() {
        println!("No spending in '{sheet}'");
        return Ok(());
    }

    for m in &trends.months {
        let parts: Vec<String> = m
            .totals
            .iter()
            .filter(|(_, total)| **total > 0.0)
            .map(|(category, total)| format!("{category} ${total:.2}"))
            .collect();
        println!("{}  {}", m.month, parts.join(", "));
    }
    println!("\nMonthly average over {} months:", trends.months.len());
    for a in &trends.averages {
        println!(
            "{:<16} ${:>10.2}  (total ${:.2}, {} transactions)",
            a.category, a.average, a.total, a.count
        );
    }
    Ok(())
}

pub async fn insights(store: &impl Store, cfg: &Config, sheet: &str) -> Result<()> {
    let client = require_anthropic_client(cfg)?;
    let sheets = store.load_sheets().context("load sheets")?;
    let transactions = &sheets[sheet_index(&sheets, sheet)?].transactions;
    if transactions.is_empty() {
        bail!("sheet '{}' has no transactions", sheet);
    }

    match generate_insights(&client, transactions).await {
        Ok(text) => {
            record_activity(
                store,
                ActivityLogEntry::success(
                    ActivityKind::Insights,
                    json!({ "sheet": sheet, "model": client.model(), "insights": text }),
                ),
            )?;
            println!("{text}");
            Ok(())
        }
        Err(e) => {
            record_activity(
                store,
                ActivityLogEntry::error(
                    ActivityKind::Insights,
                    json!({ "sheet": sheet, "error": e.to_string() }),
                ),
            )?;
            Err(e).context("generating insights")
        }
    }
}

pub fn activity(store: &impl Store, clear: bool, details: bool) -> Result<()> {
    let mut log = store.load_activity().context("load activity log")?;
    if clear {
        log.clear();
        store.save_activity(&log).context("save activity log")?;
        println!("Cleared activity log");
        return Ok(());
    }
    if log.is_empty() {
        println!("No activity yet.");
    }
    for e in log.entries() {
        let status = match e.status {
            ActivityStatus::Success => "ok",
            ActivityStatus::Error => "error",
        };
        println!("{} {:<18} {}", e.timestamp.format("%Y-%m-%d %H:%M:%S"), e.kind.label(), status);
        if details {
            println!("{}", serde_json::to_string_pretty(&e.details)?);
        } else if let Some(err) = e.details.get("error").and_then(|v| v.as_str()) {
            println!("    {err}");
        }
    }
    Ok(())
}
