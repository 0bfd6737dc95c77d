//! Rule validation and JSON import/export

use serde_json::Value;
use tally_core::{Rule, RuleRecord};

use crate::error::Result;

/// Every problem with a candidate rule; empty when valid
pub fn validate_rule(record: &RuleRecord) -> Vec<String> {
    record.validate()
}

/// One rejected entry of an import. `index` is `None` when the document
/// itself could not be read.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportIssue {
    pub index: Option<usize>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub rules: Vec<Rule>,
    pub issues: Vec<ImportIssue>,
}

pub fn export_rules_json(rules: &[Rule]) -> Result<String> {
    Ok(serde_json::to_string_pretty(rules)?)
}

/// Parse a JSON array of rules, keeping the valid entries
pub fn import_rules_json(text: &str) -> ImportReport {
    let document = match serde_json::from_str::<Value>(text) {
        Ok(v) => v,
        Err(e) => return ImportReport::rejected(format!("Invalid JSON: {e}")),
    };
    let Value::Array(entries) = document else {
        return ImportReport::rejected("Expected a JSON array of rules".to_string());
    };

    let mut report = ImportReport::default();
    for (index, entry) in entries.into_iter().enumerate() {
        let record = match serde_json::from_value::<RuleRecord>(entry) {
            Ok(r) => r,
            Err(e) => {
                report.issues.push(ImportIssue {
                    index: Some(index),
                    errors: vec![e.to_string()],
                });
                continue;
            }
        };
        let errors = validate_rule(&record);
        if !errors.is_empty() {
            report.issues.push(ImportIssue { index: Some(index), errors });
            continue;
        }
        match Rule::try_from(record) {
            Ok(rule) => report.rules.push(rule),
            Err(e) => report.issues.push(ImportIssue {
                index: Some(index),
                errors: vec![e.to_string()],
            }),
        }
    }
    tracing::debug!(
        imported = report.rules.len(),
        rejected = report.issues.len(),
        "rule import parsed"
    );
    report
}

impl ImportReport {
    fn rejected(message: String) -> Self {
        ImportReport {
            rules: Vec::new(),
            issues: vec![ImportIssue {
                index: None,
                errors: vec![message],
            }],
        }
    }
}
