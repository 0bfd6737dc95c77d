//! Rule-set edits: accepting generated rules, user edits, toggles, deletes.
//!
//! Every edit that can change match results hands back fresh conflict
//! information or statistics so callers never persist stale derived fields.

use tally_core::{Rule, Transaction};

use crate::conflicts::{detect_conflicts, ConflictReport};
use crate::engine::{apply_match, categorize_with_rules, update_rule_stats};
use crate::error::{Result, RuleError};

#[derive(Debug, Clone, PartialEq)]
pub struct AcceptOutcome {
    pub rules: Vec<Rule>,
    pub transactions: Vec<Transaction>,
    /// Transactions whose category was set by this pass
    pub recategorized: usize,
}

/// Merge `accepted` into the rule set and re-run rules over the sheet.
///
/// Only transactions without a `rule_id` are revisited unless `force` is set,
/// in which case every transaction is re-evaluated against the merged set.
pub fn apply_accepted_rules(
    existing: &[Rule],
    accepted: Vec<Rule>,
    transactions: &[Transaction],
    force: bool,
) -> AcceptOutcome {
    let mut merged = existing.to_vec();
    for rule in accepted {
        match merged.iter_mut().find(|r| r.id == rule.id) {
            Some(slot) => *slot = rule,
            None => merged.push(rule),
        }
    }

    let mut recategorized = 0;
    let transactions: Vec<Transaction> = transactions
        .iter()
        .map(|t| {
            let mut out = t.clone();
            if force || t.rule_id.is_none() {
                if let Some(m) = categorize_with_rules(t, &merged) {
                    apply_match(&mut out, m);
                    recategorized += 1;
                }
            }
            out
        })
        .collect();

    tracing::debug!(rules = merged.len(), recategorized, force, "accepted rules applied");
    AcceptOutcome {
        rules: update_rule_stats(&merged, &transactions),
        transactions,
        recategorized,
    }
}

/// Append a user-created rule; returns the conflicts it introduces
pub fn add_rule(rules: &mut Vec<Rule>, rule: Rule, transactions: &[Transaction]) -> ConflictReport {
    rules.push(rule);
    detect_conflicts(rules, transactions)
}

/// Replace the rule with the same id. Edits re-trigger conflict detection.
pub fn replace_rule(
    rules: &mut [Rule],
    rule: Rule,
    transactions: &[Transaction],
) -> Result<ConflictReport> {
    let slot = rules
        .iter_mut()
        .find(|r| r.id == rule.id)
        .ok_or_else(|| RuleError::NotFound(rule.id.clone()))?;
    *slot = rule;
    Ok(detect_conflicts(rules, transactions))
}

pub fn set_enabled(rules: &mut [Rule], id: &str, enabled: bool) -> Result<()> {
    let rule = rules
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| RuleError::NotFound(id.to_string()))?;
    rule.enabled = enabled;
    Ok(())
}

/// Flip `enabled`; returns the new state
pub fn toggle_rule(rules: &mut [Rule], id: &str) -> Result<bool> {
    let enabled = !rules
        .iter()
        .find(|r| r.id == id)
        .ok_or_else(|| RuleError::NotFound(id.to_string()))?
        .enabled;
    set_enabled(rules, id, enabled)?;
    Ok(enabled)
}

pub fn remove_rule(rules: &mut Vec<Rule>, id: &str) -> Result<Rule> {
    let pos = rules
        .iter()
        .position(|r| r.id == id)
        .ok_or_else(|| RuleError::NotFound(id.to_string()))?;
    Ok(rules.remove(pos))
}
