//! Conflict detection and rule-set statistics.
//!
//! A conflict is two or more enabled rules independently matching the same
//! transaction. Conflicts never block categorization; precedence still picks
//! one winner. They are surfaced as warnings for review.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tally_core::{Rule, RuleType, Transaction};

use crate::engine::apply_rule;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConflict {
    pub rule_id: String,
    pub rule_name: String,
    /// Ids of every other rule that co-matched at least one transaction
    pub conflicts_with: BTreeSet<String>,
    /// Number of transactions on which this rule co-matched
    pub conflict_count: usize,
    /// Descriptions of those transactions
    pub conflicting_transactions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictingTransaction {
    pub transaction_id: String,
    pub description: String,
    pub rule_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConflictReport {
    /// Ordered as the rules appear in the rule set
    pub conflicts: Vec<RuleConflict>,
    pub transactions: Vec<ConflictingTransaction>,
}

impl ConflictReport {
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn for_rule(&self, rule_id: &str) -> Option<&RuleConflict> {
        self.conflicts.iter().find(|c| c.rule_id == rule_id)
    }
}

pub fn detect_conflicts(rules: &[Rule], transactions: &[Transaction]) -> ConflictReport {
    let mut by_rule: BTreeMap<usize, RuleConflict> = BTreeMap::new();
    let mut conflicting = Vec::new();

    for txn in transactions {
        let matched: Vec<usize> = rules
            .iter()
            .enumerate()
            .filter(|(_, r)| apply_rule(txn, r).is_some())
            .map(|(i, _)| i)
            .collect();
        if matched.len() < 2 {
            continue;
        }

        for &i in &matched {
            let rule = &rules[i];
            let entry = by_rule.entry(i).or_insert_with(|| RuleConflict {
                rule_id: rule.id.clone(),
                rule_name: rule.name.clone(),
                conflicts_with: BTreeSet::new(),
                conflict_count: 0,
                conflicting_transactions: Vec::new(),
            });
            entry
                .conflicts_with
                .extend(matched.iter().filter(|&&j| j != i).map(|&j| rules[j].id.clone()));
            entry.conflict_count += 1;
            entry.conflicting_transactions.push(txn.description.clone());
        }

        conflicting.push(ConflictingTransaction {
            transaction_id: txn.id.clone(),
            description: txn.description.clone(),
            rule_ids: matched.iter().map(|&i| rules[i].id.clone()).collect(),
        });
    }

    if !conflicting.is_empty() {
        tracing::debug!(
            transactions = conflicting.len(),
            rules = by_rule.len(),
            "rule conflicts detected"
        );
    }

    ConflictReport {
        conflicts: by_rule.into_values().collect(),
        transactions: conflicting,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSetStats {
    pub total_rules: usize,
    pub enabled_rules: usize,
    pub disabled_rules: usize,
    /// Distinct transactions matched by at least one enabled rule
    pub total_matches: usize,
    pub rules_by_type: BTreeMap<RuleType, usize>,
    pub conflicts: ConflictReport,
}

pub fn rule_set_stats(rules: &[Rule], transactions: &[Transaction]) -> RuleSetStats {
    let enabled_rules = rules.iter().filter(|r| r.enabled).count();

    let mut matched: HashSet<&str> = HashSet::new();
    for txn in transactions {
        if rules.iter().any(|r| apply_rule(txn, r).is_some()) {
            matched.insert(txn.id.as_str());
        }
    }

    let mut rules_by_type = BTreeMap::new();
    for rule in rules {
        *rules_by_type.entry(rule.rule_type()).or_insert(0) += 1;
    }

    RuleSetStats {
        total_rules: rules.len(),
        enabled_rules,
        disabled_rules: rules.len() - enabled_rules,
        total_matches: matched.len(),
        rules_by_type,
        conflicts: detect_conflicts(rules, transactions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_core::{Category, RuleAuthor, RuleMatcher};

    fn txn(id: &str, desc: &str) -> Transaction {
        Transaction::new(id, NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(), desc, -10.0, "test")
    }

    fn contains(id: &str, p: &str, by: RuleAuthor) -> Rule {
        let matcher = RuleMatcher::DescriptionContains(p.into());
        Rule::new(p, matcher, Category::Shopping, None, 0.8, by).with_id(id)
    }

    #[test]
    fn test_detects_overlapping_rules() {
        let rules = vec![
            contains("a", "AMAZON", RuleAuthor::Ai),
            contains("b", "AMAZON PRIME", RuleAuthor::User),
            contains("c", "NETFLIX", RuleAuthor::User),
        ];
        let txns = vec![
            txn("t1", "AMAZON PRIME VIDEO"),
            txn("t2", "AMAZON MKTPL"),
            txn("t3", "NETFLIX.COM"),
            txn("t4", "AMAZON PRIME ANNUAL"),
        ];
        let report = detect_conflicts(&rules, &txns);

        assert_eq!(report.conflicts.len(), 2);
        let a = report.for_rule("a").unwrap();
        assert_eq!(a.conflict_count, 2);
        assert_eq!(a.conflicts_with, BTreeSet::from(["b".to_string()]));
        assert_eq!(a.conflicting_transactions, vec!["AMAZON PRIME VIDEO", "AMAZON PRIME ANNUAL"]);
        assert!(report.for_rule("c").is_none());

        assert_eq!(report.transactions.len(), 2);
        assert_eq!(report.transactions[0].rule_ids, vec!["a", "b"]);
    }

    #[test]
    fn test_disabled_rules_do_not_conflict() {
        let rules = vec![
            contains("a", "AMAZON", RuleAuthor::Ai),
            contains("b", "AMAZON PRIME", RuleAuthor::User).disabled(),
        ];
        assert!(detect_conflicts(&rules, &[txn("t1", "AMAZON PRIME VIDEO")]).is_empty());
    }

    #[test]
    fn test_rule_set_stats() {
        let rules = vec![
            contains("a", "AMAZON", RuleAuthor::Ai),
            contains("b", "AMAZON PRIME", RuleAuthor::User),
            Rule::new(
                "Rent",
                RuleMatcher::AmountRange(tally_core::AmountRange { min: 1500.0, max: 2500.0 }),
                Category::Transfer,
                None,
                0.5,
                RuleAuthor::User,
            )
            .disabled(),
        ];
        let txns = vec![
            txn("t1", "AMAZON PRIME VIDEO"),
            txn("t2", "AMAZON MKTPL"),
            txn("t3", "CAFE"),
        ];
        let stats = rule_set_stats(&rules, &txns);
        assert_eq!(stats.total_rules, 3);
        assert_eq!(stats.enabled_rules, 2);
        assert_eq!(stats.disabled_rules, 1);
        assert_eq!(stats.total_matches, 2);
        assert_eq!(stats.rules_by_type[&RuleType::DescriptionContains], 2);
        assert_eq!(stats.rules_by_type[&RuleType::AmountRange], 1);
        assert_eq!(stats.conflicts.transactions.len(), 1);
    }
}
