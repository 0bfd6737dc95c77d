//! Categorization rule types.
//!
//! A [`Rule`] pairs a typed [`RuleMatcher`] with the category it assigns. The
//! persisted shape (`type` + loosely typed `pattern`) lives in [`RuleRecord`];
//! conversion between the two validates the pattern against the rule type so a
//! `Rule` value can never carry a mismatched pattern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::CoreError;
use crate::taxonomy::Category;

/// Rule type names as persisted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    DescriptionContains,
    DescriptionStartsWith,
    DescriptionRegex,
    AmountRange,
    Merchant,
}

impl RuleType {
    pub const ALL: [RuleType; 5] = [
        RuleType::DescriptionContains,
        RuleType::DescriptionStartsWith,
        RuleType::DescriptionRegex,
        RuleType::AmountRange,
        RuleType::Merchant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::DescriptionContains => "description_contains",
            RuleType::DescriptionStartsWith => "description_starts_with",
            RuleType::DescriptionRegex => "description_regex",
            RuleType::AmountRange => "amount_range",
            RuleType::Merchant => "merchant",
        }
    }

    pub fn from_name(name: &str) -> Option<RuleType> {
        RuleType::ALL.into_iter().find(|t| t.as_str() == name.trim())
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive absolute-amount bounds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
}

impl AmountRange {
    /// True when `|amount|` lies within `[min, max]`
    pub fn contains(&self, amount: f64) -> bool {
        let a = amount.abs();
        a >= self.min && a <= self.max
    }
}

/// What a rule tests, with the pattern payload typed per variant
#[derive(Debug, Clone, PartialEq)]
pub enum RuleMatcher {
    DescriptionContains(String),
    DescriptionStartsWith(String),
    DescriptionRegex(String),
    AmountRange(AmountRange),
    Merchant(String),
}

impl RuleMatcher {
    pub fn rule_type(&self) -> RuleType {
        match self {
            RuleMatcher::DescriptionContains(_) => RuleType::DescriptionContains,
            RuleMatcher::DescriptionStartsWith(_) => RuleType::DescriptionStartsWith,
            RuleMatcher::DescriptionRegex(_) => RuleType::DescriptionRegex,
            RuleMatcher::AmountRange(_) => RuleType::AmountRange,
            RuleMatcher::Merchant(_) => RuleType::Merchant,
        }
    }

    /// Pattern as JSON: a string, or `{min, max}` for amount ranges
    pub fn pattern_value(&self) -> Value {
        match self {
            RuleMatcher::AmountRange(r) => json!({ "min": r.min, "max": r.max }),
            RuleMatcher::DescriptionContains(p)
            | RuleMatcher::DescriptionStartsWith(p)
            | RuleMatcher::DescriptionRegex(p)
            | RuleMatcher::Merchant(p) => Value::String(p.clone()),
        }
    }

    /// Pattern as a single cell of text (amount ranges JSON-encoded)
    pub fn pattern_text(&self) -> String {
        match self.pattern_value() {
            Value::String(s) => s,
            other => other.to_string(),
        }
    }

    /// Build a matcher from a persisted type name and pattern.
    /// Returns every shape problem found.
    pub fn from_parts(rule_type: &str, pattern: &Value) -> Result<RuleMatcher, Vec<String>> {
        let Some(rule_type) = RuleType::from_name(rule_type) else {
            return Err(vec!["Invalid rule type".to_string()]);
        };

        if rule_type == RuleType::AmountRange {
            let bounds = match pattern {
                // Spreadsheet cells hold the range JSON-encoded.
                Value::String(s) => serde_json::from_str::<Value>(s).ok(),
                other => Some(other.clone()),
            };
            let min = bounds.as_ref().and_then(|b| b.get("min")).and_then(Value::as_f64);
            let max = bounds.as_ref().and_then(|b| b.get("max")).and_then(Value::as_f64);
            return match (min, max) {
                (Some(min), Some(max)) if min <= max => {
                    Ok(RuleMatcher::AmountRange(AmountRange { min, max }))
                }
                (Some(_), Some(_)) => Err(vec![
                    "amount_range pattern.min must not exceed pattern.max".to_string(),
                ]),
                _ => Err(vec![
                    "amount_range rules must have pattern.min and pattern.max".to_string(),
                ]),
            };
        }

        let text = match pattern.as_str() {
            Some(s) if !s.trim().is_empty() => s.to_string(),
            _ => return Err(vec!["Rule must have a pattern".to_string()]),
        };
        Ok(match rule_type {
            RuleType::DescriptionContains => RuleMatcher::DescriptionContains(text),
            RuleType::DescriptionStartsWith => RuleMatcher::DescriptionStartsWith(text),
            RuleType::DescriptionRegex => RuleMatcher::DescriptionRegex(text),
            RuleType::Merchant => RuleMatcher::Merchant(text),
            RuleType::AmountRange => unreachable!("handled above"),
        })
    }
}

/// Who authored a rule
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RuleAuthor {
    User,
    Ai,
}

impl RuleAuthor {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAuthor::User => "user",
            RuleAuthor::Ai => "ai",
        }
    }
}

/// A user- or AI-authored categorization rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RuleRecord", into = "RuleRecord")]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub matcher: RuleMatcher,
    pub category: Category,
    pub subcategory: Option<String>,
    /// 0.0 - 1.0
    pub confidence: f64,
    /// Derived; see `update_rule_stats`
    pub match_count: usize,
    /// Derived; at most 5 descriptions
    pub examples: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: RuleAuthor,
    pub enabled: bool,
}

static RULE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Fresh rule id, unique within this process
pub fn next_rule_id(now: DateTime<Utc>) -> String {
    let seq = RULE_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("rule_{}_{}", now.timestamp_millis(), seq)
}

impl Rule {
    /// Create an enabled rule with a fresh id and empty statistics
    pub fn new(
        name: impl Into<String>,
        matcher: RuleMatcher,
        category: Category,
        subcategory: Option<&str>,
        confidence: f64,
        created_by: RuleAuthor,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: next_rule_id(now),
            name: name.into(),
            matcher,
            category,
            subcategory: subcategory.map(|s| category.normalize_subcategory(Some(s)).to_string()),
            confidence: confidence.clamp(0.0, 1.0),
            match_count: 0,
            examples: Vec::new(),
            created_at: now,
            created_by,
            enabled: true,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn rule_type(&self) -> RuleType {
        self.matcher.rule_type()
    }
}

/// The result of one rule matching one transaction. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub category: Category,
    pub subcategory: Option<String>,
    pub confidence: f64,
    pub rule_id: String,
    pub rule_name: String,
    pub created_by: RuleAuthor,
}

/// Persisted (and AI-proposed) rule shape, loosely typed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub rule_type: String,
    #[serde(default)]
    pub pattern: Value,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub match_count: usize,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<RuleAuthor>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl RuleRecord {
    /// Every structural problem with this record; empty when valid
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("Rule must have a name".to_string());
        }
        if let Err(e) = RuleMatcher::from_parts(&self.rule_type, &self.pattern) {
            errors.extend(e);
        }
        if Category::from_name(&self.category).is_none() {
            errors.push("Rule must have a category".to_string());
        }
        match self.confidence {
            Some(c) if (0.0..=1.0).contains(&c) => {}
            _ => errors.push("Confidence must be a number between 0 and 1".to_string()),
        }
        errors
    }
}

impl TryFrom<RuleRecord> for Rule {
    type Error = CoreError;

    fn try_from(r: RuleRecord) -> Result<Self, Self::Error> {
        let errors = r.validate();
        let invalid = |errors: Vec<String>| CoreError::InvalidRule {
            name: r.name.clone(),
            errors,
        };
        if !errors.is_empty() {
            return Err(invalid(errors));
        }
        let matcher = RuleMatcher::from_parts(&r.rule_type, &r.pattern).map_err(invalid)?;
        let category = Category::from_name(&r.category)
            .ok_or_else(|| invalid(vec!["Rule must have a category".to_string()]))?;
        let created_at = r.created_at.unwrap_or_else(Utc::now);
        let id = if r.id.trim().is_empty() {
            next_rule_id(created_at)
        } else {
            r.id.clone()
        };

        Ok(Rule {
            id,
            name: r.name.trim().to_string(),
            matcher,
            category,
            subcategory: r
                .subcategory
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(|s| category.normalize_subcategory(Some(s)).to_string()),
            confidence: r.confidence.unwrap_or_default(),
            match_count: r.match_count,
            examples: r.examples,
            created_at,
            created_by: r.created_by.unwrap_or(RuleAuthor::User),
            enabled: r.enabled,
        })
    }
}

impl From<Rule> for RuleRecord {
    fn from(r: Rule) -> Self {
        RuleRecord {
            id: r.id,
            name: r.name,
            rule_type: r.matcher.rule_type().as_str().to_string(),
            pattern: r.matcher.pattern_value(),
            category: r.category.as_str().to_string(),
            subcategory: r.subcategory,
            confidence: Some(r.confidence),
            match_count: r.match_count,
            examples: r.examples,
            created_at: Some(r.created_at),
            created_by: Some(r.created_by),
            enabled: r.enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(rule_type: &str, pattern: Value) -> RuleRecord {
        RuleRecord {
            id: "r1".to_string(),
            name: "Test".to_string(),
            rule_type: rule_type.to_string(),
            pattern,
            category: "Transfer".to_string(),
            subcategory: None,
            confidence: Some(0.9),
            match_count: 0,
            examples: vec![],
            created_at: None,
            created_by: Some(RuleAuthor::User),
            enabled: true,
        }
    }

    #[test]
    fn test_amount_range_pattern_is_object() {
        let rule =
            Rule::try_from(record("amount_range", json!({"min": 1000, "max": 5000}))).unwrap();
        assert_eq!(
            rule.matcher,
            RuleMatcher::AmountRange(AmountRange {
                min: 1000.0,
                max: 5000.0
            })
        );
        assert_eq!(rule.matcher.pattern_value(), json!({"min": 1000.0, "max": 5000.0}));
    }

    #[test]
    fn test_amount_range_accepts_encoded_cell() {
        let rule = Rule::try_from(record("amount_range", json!("{\"min\":1,\"max\":2}"))).unwrap();
        assert_eq!(rule.rule_type(), RuleType::AmountRange);
    }

    #[test]
    fn test_string_pattern_rejected_for_amount_range() {
        let errors = record("amount_range", json!("NETFLIX")).validate();
        assert_eq!(errors, vec!["amount_range rules must have pattern.min and pattern.max"]);
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut r = record("fuzzy", Value::Null);
        r.name = String::new();
        r.category = "Pets".to_string();
        r.confidence = Some(1.5);
        let errors = r.validate();
        assert_eq!(errors.len(), 4, "{errors:?}");
    }

    #[test]
    fn test_json_round_trip_keeps_type_and_pattern() {
        let rule = Rule::new(
            "Netflix",
            RuleMatcher::DescriptionContains("NETFLIX".to_string()),
            Category::Entertainment,
            Some("streaming"),
            0.95,
            RuleAuthor::User,
        );
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["type"], "description_contains");
        assert_eq!(json["pattern"], "NETFLIX");
        assert_eq!(json["subcategory"], "Streaming");
        assert_eq!(json["createdBy"], "user");
        let back: Rule = serde_json::from_value(json).unwrap();
        assert_eq!(back, rule);
    }
}
