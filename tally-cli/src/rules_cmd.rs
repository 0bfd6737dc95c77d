use anyhow::{bail, Context, Result};
use clap::Subcommand;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tally_ai::{Progress, ProgressEvent, ProgressFn, RuleGenerator};
use tally_core::{
    category_label, ActivityKind, ActivityLogEntry, Rule, RuleAuthor, RuleRecord, Store,
    Transaction,
};
use tally_rules::{
    add_rule, apply_accepted_rules, detect_conflicts, export_rules_json, import_rules_json,
    preview_rule, remove_rule, replace_rule, rule_set_stats, toggle_rule, update_rule_stats,
    validate_rule, ConflictReport,
};

use crate::auth::require_anthropic_client;
use crate::config::Config;
use crate::progress::ProgressLog;
use crate::sheets_cmd::{select_transactions, sheet_index};
use crate::state::record_activity;

#[derive(Subcommand, Debug)]
pub enum RulesCommand {
    /// List rules in evaluation order
    List,

    /// Add a user rule
    Add {
        #[arg(long)]
        name: String,

        /// description_contains | description_starts_with | description_regex |
        /// amount_range | merchant
        #[arg(long = "type")]
        rule_type: String,

        /// Text pattern, or {"min":..,"max":..} for amount_range
        #[arg(long)]
        pattern: String,

        #[arg(long)]
        category: String,

        #[arg(long)]
        subcategory: Option<String>,

        #[arg(long, default_value_t = 1.0)]
        confidence: f64,

        /// Check conflicts against this sheet only (default: all sheets)
        #[arg(long)]
        sheet: Option<String>,
    },

    /// Enable or disable a rule
    Toggle {
        id: String,
    },

    /// Delete a rule
    Delete {
        id: String,
    },

    /// Rule counts, coverage and conflicts
    Stats {
        #[arg(long)]
        sheet: Option<String>,
    },

    /// Transactions matched by more than one rule
    Conflicts {
        #[arg(long)]
        sheet: Option<String>,
    },

    /// Show which transactions a rule would match
    Test {
        id: String,

        #[arg(long)]
        sheet: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Ask the model for rules learned from a sheet's categories
    Generate {
        #[arg(long)]
        sheet: String,

        /// Save the proposed rules and apply them to the sheet
        #[arg(long, default_value_t = false)]
        accept: bool,
    },

    /// Re-run rules over a sheet
    Apply {
        #[arg(long)]
        sheet: String,

        /// Also re-evaluate transactions already matched by a rule
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Write rules to a JSON file
    Export {
        file: PathBuf,
    },

    /// Merge rules from a JSON file (same id replaces)
    Import {
        file: PathBuf,
    },
}

pub async fn run(store: &impl Store, cfg: &Config, command: RulesCommand) -> Result<()> {
    match command {
        RulesCommand::List => {
            let rules = store.load_rules().context("load rules")?;
            if rules.is_empty() {
                println!("No rules yet.");
            }
            for r in &rules {
                print_rule(r);
            }
        }

        RulesCommand::Add {
            name,
            rule_type,
            pattern,
            category,
            subcategory,
            confidence,
            sheet,
        } => {
            let record =
                user_rule_record(name, rule_type, &pattern, category, subcategory, confidence);
            let errors = validate_rule(&record);
            if !errors.is_empty() {
                bail!("invalid rule: {}", errors.join("; "));
            }
            let rule = Rule::try_from(record)?;
            let transactions = load_transactions(store, sheet.as_deref())?;
            let mut rules = store.load_rules().context("load rules")?;
            let id = rule.id.clone();
            let report = add_rule(&mut rules, rule, &transactions);
            store.save_rules(&rules).context("save rules")?;
            println!("Added rule {id}");
            warn_conflicts(&report, &id);
        }

        RulesCommand::Toggle { id } => {
            let mut rules = store.load_rules().context("load rules")?;
            let enabled = toggle_rule(&mut rules, &id)?;
            let transactions = load_transactions(store, None)?;
            let (rules, report) = refresh_after_edit(&rules, &transactions);
            store.save_rules(&rules).context("save rules")?;
            println!("Rule {id} {}", if enabled { "enabled" } else { "disabled" });
            warn_conflicts(&report, &id);
        }

        RulesCommand::Delete { id } => {
            let mut rules = store.load_rules().context("load rules")?;
            let removed = remove_rule(&mut rules, &id)?;
            let transactions = load_transactions(store, None)?;
            let (rules, _) = refresh_after_edit(&rules, &transactions);
            store.save_rules(&rules).context("save rules")?;
            println!("Deleted rule {} ({})", removed.id, removed.name);
        }

        RulesCommand::Stats { sheet } => {
            let rules = store.load_rules().context("load rules")?;
            let transactions = load_transactions(store, sheet.as_deref())?;
            let stats = rule_set_stats(&rules, &transactions);
            println!(
                "Rules: {} ({} enabled, {} disabled)",
                stats.total_rules, stats.enabled_rules, stats.disabled_rules
            );
            println!("Transactions matched: {} of {}", stats.total_matches, transactions.len());
            for (rule_type, count) in &stats.rules_by_type {
                println!("  {rule_type}: {count}");
            }
            println!("Rules in conflict: {}", stats.conflicts.conflicts.len());
        }

        RulesCommand::Conflicts { sheet } => {
            let rules = store.load_rules().context("load rules")?;
            let transactions = load_transactions(store, sheet.as_deref())?;
            let report = detect_conflicts(&rules, &transactions);
            if report.is_empty() {
                println!("No conflicts.");
            }
            for c in &report.conflicts {
                println!(
                    "{} ({}): {} transactions, also matched by {}",
                    c.rule_id,
                    c.rule_name,
                    c.conflict_count,
                    c.conflicts_with.iter().cloned().collect::<Vec<_>>().join(", ")
                );
            }
            for t in &report.transactions {
                println!("  {} {} <- {}", t.transaction_id, t.description, t.rule_ids.join(", "));
            }
        }

        RulesCommand::Test { id, sheet, limit } => {
            let rules = store.load_rules().context("load rules")?;
            let Some(rule) = rules.iter().find(|r| r.id == id) else {
                bail!("rule '{}' not found", id);
            };
            let transactions = load_transactions(store, sheet.as_deref())?;
            let matched = preview_rule(rule, &transactions);
            println!(
                "{} matches {} of {} transactions",
                rule.name,
                matched.len(),
                transactions.len()
            );
            for t in matched.iter().take(limit) {
                println!(
                    "  {} | {} | {:.2} | {}",
                    t.date,
                    t.description,
                    t.amount,
                    category_label(t.category)
                );
            }
        }

        RulesCommand::Generate { sheet, accept } => generate(store, cfg, &sheet, accept).await?,

        RulesCommand::Apply { sheet, force } => {
            let mut sheets = store.load_sheets().context("load sheets")?;
            let idx = sheet_index(&sheets, &sheet)?;
            let rules = store.load_rules().context("load rules")?;
            let outcome =
                apply_accepted_rules(&rules, Vec::new(), &sheets[idx].transactions, force);
            sheets[idx].transactions = outcome.transactions;
            store.save_sheets(&sheets).context("save sheets")?;
            store.save_rules(&outcome.rules).context("save rules")?;
            println!("Rules categorized {} transactions in '{sheet}'", outcome.recategorized);
        }

        RulesCommand::Export { file } => {
            let rules = store.load_rules().context("load rules")?;
            let text = export_rules_json(&rules)?;
            fs::write(&file, text).with_context(|| format!("write {}", file.display()))?;
            println!("Exported {} rules to {}", rules.len(), file.display());
        }

        RulesCommand::Import { file } => {
            let text =
                fs::read_to_string(&file).with_context(|| format!("read {}", file.display()))?;
            let report = import_rules_json(&text);
            for issue in &report.issues {
                match issue.index {
                    Some(i) => eprintln!("skipped rule #{}: {}", i + 1, issue.errors.join("; ")),
                    None => eprintln!("{}", issue.errors.join("; ")),
                }
            }
            let transactions = load_transactions(store, None)?;
            let mut rules = store.load_rules().context("load rules")?;
            let imported = report.rules.len();
            let mut report_conflicts = ConflictReport::default();
            for rule in report.rules {
                report_conflicts = if rules.iter().any(|r| r.id == rule.id) {
                    replace_rule(&mut rules, rule, &transactions)?
                } else {
                    add_rule(&mut rules, rule, &transactions)
                };
            }
            store.save_rules(&rules).context("save rules")?;
            println!("Imported {imported} rules ({} rejected)", report.issues.len());
            if !report_conflicts.is_empty() {
                println!(
                    "{} rules now conflict; see `tally rules conflicts`",
                    report_conflicts.conflicts.len()
                );
            }
        }
    }
    Ok(())
}

fn user_rule_record(
    name: String,
    rule_type: String,
    pattern: &str,
    category: String,
    subcategory: Option<String>,
    confidence: f64,
) -> RuleRecord {
    RuleRecord {
        id: String::new(),
        name,
        rule_type,
        // amount_range accepts its bounds JSON-encoded in a string
        pattern: Value::String(pattern.to_string()),
        category,
        subcategory,
        confidence: Some(confidence),
        match_count: 0,
        examples: Vec::new(),
        created_at: None,
        created_by: Some(RuleAuthor::User),
        enabled: true,
    }
}

fn print_rule(r: &Rule) {
    println!(
        "{} [{}{}] {} | {} {:?} -> {} / {} | conf {:.2} | {} matches",
        r.id,
        r.created_by.as_str(),
        if r.enabled { "" } else { ", disabled" },
        r.name,
        r.rule_type(),
        r.matcher.pattern_text(),
        r.category,
        r.subcategory.as_deref().unwrap_or("-"),
        r.confidence,
        r.match_count
    );
}

/// Rule statistics and conflicts recomputed after an enable/disable/delete
fn load_transactions(store: &impl Store, sheet: Option<&str>) -> Result<Vec<Transaction>> {
    select_transactions(&store.load_sheets().context("load sheets")?, sheet)
}

fn refresh_after_edit(rules: &[Rule], transactions: &[Transaction]) -> (Vec<Rule>, ConflictReport) {
    (update_rule_stats(rules, transactions), detect_conflicts(rules, transactions))
}

fn warn_conflicts(report: &ConflictReport, rule_id: &str) {
    if let Some(c) = report.for_rule(rule_id) {
        eprintln!(
            "warning: rule {} co-matches {} transactions with {}",
            rule_id,
            c.conflict_count,
            c.conflicts_with.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }
}

async fn generate(store: &impl Store, cfg: &Config, sheet: &str, accept: bool) -> Result<()> {
    let client = require_anthropic_client(cfg)?;
    let mut sheets = store.load_sheets().context("load sheets")?;
    let idx = sheet_index(&sheets, sheet)?;
    let existing = store.load_rules().context("load rules")?;

    let mut log = ProgressLog::default();
    let mut sink = |e: &ProgressEvent| log.record(e);
    let result = RuleGenerator::new(&client)
        .with_settings(cfg.rule_gen_settings())
        .generate(&sheets[idx].transactions, &existing, Progress::from(&mut sink as ProgressFn<'_>))
        .await;
    let events = log.into_events();

    let generated = match result {
        Ok(g) => g,
        Err(e) => {
            record_activity(
                store,
                ActivityLogEntry::error(
                    ActivityKind::RuleGeneration,
                    json!({ "sheet": sheet, "error": e.to_string(), "progress": events }),
                ),
            )?;
            return Err(e).context("rule generation failed");
        }
    };
    record_activity(
        store,
        ActivityLogEntry::success(
            ActivityKind::RuleGeneration,
            json!({
                "sheet": sheet,
                "rulesGenerated": generated.rules.len(),
                "apiCalls": generated.api_calls,
            }),
        ),
    )?;

    let skipped = generated.api_calls.iter().filter(|c| c.skipped()).count();
    println!(
        "Proposed {} rules ({} of {} batches skipped)",
        generated.rules.len(),
        skipped,
        generated.api_calls.len()
    );
    for r in &generated.rules {
        print_rule(r);
    }
    if !accept || generated.rules.is_empty() {
        if !generated.rules.is_empty() {
            println!("Re-run with --accept to save these rules and apply them.");
        }
        return Ok(());
    }

    let outcome =
        apply_accepted_rules(&existing, generated.rules, &sheets[idx].transactions, false);
    sheets[idx].transactions = outcome.transactions;
    store.save_sheets(&sheets).context("save sheets")?;
    store.save_rules(&outcome.rules).context("save rules")?;
    println!("Saved rules; {} transactions categorized by them", outcome.recategorized);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{Category, RuleMatcher};

    #[test]
    fn test_user_rule_record_builds_amount_range() {
        let record = user_rule_record(
            "Rent".into(),
            "amount_range".into(),
            r#"{"min": 1500, "max": 1600}"#,
            "Other".into(),
            None,
            0.8,
        );
        assert!(validate_rule(&record).is_empty());
        let rule = Rule::try_from(record).unwrap();
        assert_eq!(rule.created_by, RuleAuthor::User);
        assert_eq!(rule.category, Category::Other);
        assert!(matches!(
            rule.matcher,
            RuleMatcher::AmountRange(r) if r.min == 1500.0 && r.max == 1600.0
        ));
    }

    #[test]
    fn test_reenabling_a_rule_reports_its_conflicts() {
        let d = chrono::NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let txns = vec![
            Transaction::new("t1", d, "NETFLIX.COM", -15.99, "s"),
            Transaction::new("t2", d, "NETFLIX.COM", -15.99, "s"),
        ];
        let mut rules = vec![
            Rule::new(
                "Netflix",
                RuleMatcher::DescriptionContains("NETFLIX".into()),
                Category::Entertainment,
                Some("Streaming"),
                0.9,
                RuleAuthor::User,
            )
            .with_id("a"),
            Rule::new(
                "Streaming",
                RuleMatcher::DescriptionStartsWith("NETFLIX".into()),
                Category::Entertainment,
                None,
                0.7,
                RuleAuthor::Ai,
            )
            .with_id("b")
            .disabled(),
        ];

        let (refreshed, report) = refresh_after_edit(&rules, &txns);
        assert!(report.is_empty());
        assert_eq!(refreshed[1].match_count, 0);

        assert!(toggle_rule(&mut rules, "b").unwrap());
        let (refreshed, report) = refresh_after_edit(&rules, &txns);
        assert_eq!(report.for_rule("b").map(|c| c.conflict_count), Some(2));
        assert_eq!(refreshed[1].match_count, 2);
    }

    #[test]
    fn test_user_rule_record_reports_errors() {
        let record = user_rule_record("".into(), "fuzzy".into(), "x", "Pets".into(), None, 2.0);
        assert_eq!(validate_rule(&record).len(), 4);
    }
}
