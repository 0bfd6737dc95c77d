//! Rule evaluation.
//!
//! Precedence when several rules match one transaction: user-authored rules
//! always beat AI-authored ones; within the same author tier the higher
//! confidence wins; remaining ties keep rule-set order.

use regex::RegexBuilder;
use std::cmp::Ordering;
use tally_core::{CategorizedBy, Rule, RuleAuthor, RuleMatch, RuleMatcher, Transaction};

use crate::merchant::extract_merchant_name;

/// Most example descriptions kept per rule
pub const MAX_RULE_EXAMPLES: usize = 5;

/// Evaluate one rule against one transaction. Disabled rules never match.
pub fn apply_rule(txn: &Transaction, rule: &Rule) -> Option<RuleMatch> {
    if !rule.enabled {
        return None;
    }
    matches(txn, rule).then(|| to_match(rule))
}

/// Pattern test alone, ignoring `enabled`
pub(crate) fn matches(txn: &Transaction, rule: &Rule) -> bool {
    match &rule.matcher {
        RuleMatcher::DescriptionContains(p) => {
            txn.description.to_uppercase().contains(&p.to_uppercase())
        }
        RuleMatcher::DescriptionStartsWith(p) => {
            txn.description.to_uppercase().starts_with(&p.to_uppercase())
        }
        RuleMatcher::DescriptionRegex(p) => {
            match RegexBuilder::new(p).case_insensitive(true).build() {
                Ok(re) => re.is_match(&txn.description),
                Err(e) => {
                    tracing::warn!(
                        rule_id = %rule.id,
                        pattern = %p,
                        error = %e,
                        "invalid regex pattern; treating as non-match"
                    );
                    false
                }
            }
        }
        RuleMatcher::AmountRange(range) => range.contains(txn.amount),
        RuleMatcher::Merchant(p) => {
            let merchant = extract_merchant_name(&txn.description);
            !merchant.is_empty() && merchant.to_uppercase().contains(&p.to_uppercase())
        }
    }
}

fn to_match(rule: &Rule) -> RuleMatch {
    RuleMatch {
        category: rule.category,
        subcategory: rule
            .subcategory
            .as_deref()
            .map(|s| rule.category.normalize_subcategory(Some(s)).to_string()),
        confidence: rule.confidence,
        rule_id: rule.id.clone(),
        rule_name: rule.name.clone(),
        created_by: rule.created_by,
    }
}

fn precedence(a: &RuleMatch, b: &RuleMatch) -> Ordering {
    match (a.created_by, b.created_by) {
        (RuleAuthor::User, RuleAuthor::Ai) => Ordering::Less,
        (RuleAuthor::Ai, RuleAuthor::User) => Ordering::Greater,
        _ => b.confidence.total_cmp(&a.confidence),
    }
}

/// Every matching rule, highest precedence first
pub fn all_matches(txn: &Transaction, rules: &[Rule]) -> Vec<RuleMatch> {
    let mut found: Vec<RuleMatch> = rules.iter().filter_map(|r| apply_rule(txn, r)).collect();
    found.sort_by(precedence);
    found
}

/// The single winning rule match for a transaction, if any
pub fn categorize_with_rules(txn: &Transaction, rules: &[Rule]) -> Option<RuleMatch> {
    all_matches(txn, rules).into_iter().next()
}

/// Write a rule match onto a transaction. The rule now owns the categorization,
/// so any earlier AI provenance is dropped.
pub fn apply_match(txn: &mut Transaction, m: RuleMatch) {
    txn.category = Some(m.category);
    txn.subcategory = m.subcategory;
    txn.rule_id = Some(m.rule_id);
    txn.rule_name = Some(m.rule_name);
    txn.confidence = Some(m.confidence);
    txn.categorized_by = Some(CategorizedBy::Rule);
    txn.ai_categorized = false;
    txn.ai_reason = None;
}

/// Map every transaction through [`categorize_with_rules`]. Unmatched
/// transactions come back unchanged, prior categorization included.
pub fn categorize_transactions_with_rules(
    transactions: &[Transaction],
    rules: &[Rule],
) -> Vec<Transaction> {
    transactions
        .iter()
        .map(|t| {
            let mut out = t.clone();
            if let Some(m) = categorize_with_rules(t, rules) {
                apply_match(&mut out, m);
            }
            out
        })
        .collect()
}

/// Recompute `match_count` and `examples` for every rule from scratch
pub fn update_rule_stats(rules: &[Rule], transactions: &[Transaction]) -> Vec<Rule> {
    rules
        .iter()
        .map(|rule| {
            let mut out = rule.clone();
            out.match_count = 0;
            out.examples.clear();
            for t in transactions.iter().filter(|t| apply_rule(t, rule).is_some()) {
                out.match_count += 1;
                if out.examples.len() < MAX_RULE_EXAMPLES {
                    out.examples.push(t.description.clone());
                }
            }
            out
        })
        .collect()
}

/// Transactions a rule would match if it were enabled, for review before saving
pub fn preview_rule<'a>(rule: &Rule, transactions: &'a [Transaction]) -> Vec<&'a Transaction> {
    transactions.iter().filter(|t| matches(t, rule)).collect()
}
