//! Transaction and sheet types shared by every stage of the pipeline

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::taxonomy::{optional_category, Category};

/// Which pipeline stage last set a transaction's category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CategorizedBy {
    Rule,
    Ai,
}

/// A single bank/card transaction.
///
/// Loading normalizes the subcategory against the category: an unlisted
/// subcategory becomes `Other`, and an uncategorized transaction has none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "StoredTransaction")]
pub struct Transaction {
    /// Unique within a sheet
    pub id: String,
    /// External reference id from the statement, when the export carries one
    #[serde(default)]
    pub reference_id: Option<String>,
    pub date: NaiveDate,
    pub description: String,
    /// Positive = income, negative = expense
    pub amount: f64,
    /// `None` means uncategorized
    #[serde(default, with = "optional_category")]
    pub category: Option<Category>,
    #[serde(default)]
    pub subcategory: Option<String>,
    /// Origin file or label
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub ai_categorized: bool,
    #[serde(default)]
    pub ai_reason: Option<String>,
    #[serde(default)]
    pub rule_id: Option<String>,
    #[serde(default)]
    pub rule_name: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub categorized_by: Option<CategorizedBy>,
    /// Include in rule generation even if an existing rule already matches
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub force_rule_generation: bool,
}

/// Persisted shape of [`Transaction`], before subcategory normalization
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTransaction {
    id: String,
    #[serde(default)]
    reference_id: Option<String>,
    date: NaiveDate,
    description: String,
    amount: f64,
    #[serde(default, with = "optional_category")]
    category: Option<Category>,
    #[serde(default)]
    subcategory: Option<String>,
    #[serde(default)]
    source: String,
    #[serde(default)]
    ai_categorized: bool,
    #[serde(default)]
    ai_reason: Option<String>,
    #[serde(default)]
    rule_id: Option<String>,
    #[serde(default)]
    rule_name: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    categorized_by: Option<CategorizedBy>,
    #[serde(default)]
    force_rule_generation: bool,
}

impl From<StoredTransaction> for Transaction {
    fn from(t: StoredTransaction) -> Self {
        let subcategory = match (t.category, t.subcategory.as_deref()) {
            (Some(category), Some(sub)) if !sub.trim().is_empty() => {
                Some(category.normalize_subcategory(Some(sub)).to_string())
            }
            _ => None,
        };
        Transaction {
            id: t.id,
            reference_id: t.reference_id,
            date: t.date,
            description: t.description,
            amount: t.amount,
            category: t.category,
            subcategory,
            source: t.source,
            ai_categorized: t.ai_categorized,
            ai_reason: t.ai_reason,
            rule_id: t.rule_id,
            rule_name: t.rule_name,
            confidence: t.confidence,
            categorized_by: t.categorized_by,
            force_rule_generation: t.force_rule_generation,
        }
    }
}

impl Transaction {
    /// Create an uncategorized transaction
    pub fn new(
        id: impl Into<String>,
        date: NaiveDate,
        description: impl Into<String>,
        amount: f64,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            reference_id: None,
            date,
            description: description.into(),
            amount,
            category: None,
            subcategory: None,
            source: source.into(),
            ai_categorized: false,
            ai_reason: None,
            rule_id: None,
            rule_name: None,
            confidence: None,
            categorized_by: None,
            force_rule_generation: false,
        }
    }

    /// Builder-style category setter; the subcategory is normalized
    pub fn with_category(mut self, category: Category, subcategory: Option<&str>) -> Self {
        self.category = Some(category);
        self.subcategory = Some(category.normalize_subcategory(subcategory).to_string());
        self
    }

    /// Manual correction: the user's category replaces any rule or AI result
    pub fn set_category(&mut self, category: Category, subcategory: Option<&str>) {
        self.clear_provenance();
        self.category = Some(category);
        self.subcategory = Some(category.normalize_subcategory(subcategory).to_string());
    }

    pub fn is_expense(&self) -> bool {
        self.amount < 0.0
    }

    pub fn is_income(&self) -> bool {
        self.amount > 0.0
    }

    pub fn abs_amount(&self) -> f64 {
        self.amount.abs()
    }

    /// Drop rule/AI provenance, leaving category fields untouched
    pub fn clear_provenance(&mut self) {
        self.ai_categorized = false;
        self.ai_reason = None;
        self.rule_id = None;
        self.rule_name = None;
        self.confidence = None;
        self.categorized_by = None;
    }
}

/// A named collection of transactions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sheet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Sheet {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            transactions: Vec::new(),
        }
    }
}

/// Find a sheet by case-insensitive name
pub fn find_sheet<'a>(sheets: &'a [Sheet], name: &str) -> Option<&'a Sheet> {
    sheets.iter().find(|s| s.name.eq_ignore_ascii_case(name))
}

/// Mutable variant of [`find_sheet`]
pub fn find_sheet_mut<'a>(sheets: &'a mut [Sheet], name: &str) -> Option<&'a mut Sheet> {
    sheets.iter_mut().find(|s| s.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[test]
    fn test_transaction_creation() {
        let t = Transaction::new("t-1", date(), "NETFLIX.COM", -15.99, "chase.csv");
        assert!(t.is_expense());
        assert_eq!(t.abs_amount(), 15.99);
        assert_eq!(t.category, None);
    }

    #[test]
    fn test_serde_uses_camel_case_and_uncategorized_label() {
        let t = Transaction::new("t-1", date(), "NETFLIX.COM", -15.99, "chase.csv");
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["category"], "Uncategorized");
        assert_eq!(json["aiCategorized"], false);
        assert!(json.get("forceRuleGeneration").is_none());
    }

    /// A stored row with `fields` appended to the required ones
    fn load(fields: &str) -> Transaction {
        let json = format!(
            r#"{{"id":"a","date":"2025-03-14","description":"X","amount":-1.0,{fields}}}"#
        );
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_unknown_category_loads_as_none() {
        let t = load(r#""category":"Pets""#);
        assert_eq!(t.category, None);

        let t = load(r#""category":"Dining","categorizedBy":"rule""#);
        assert_eq!(t.category, Some(Category::Dining));
        assert_eq!(t.categorized_by, Some(CategorizedBy::Rule));
    }

    #[test]
    fn test_loading_repairs_stray_subcategories() {
        let t = load(r#""category":"Dining","subcategory":"Streaming""#);
        assert_eq!(t.subcategory.as_deref(), Some("Other"));

        let t = load(r#""category":"Pets","subcategory":"Food""#);
        assert_eq!(t.category, None);
        assert_eq!(t.subcategory, None);

        let t = load(r#""category":"Dining","subcategory":"coffee shops""#);
        assert_eq!(t.subcategory.as_deref(), Some("Coffee Shops"));
    }

    #[test]
    fn test_set_category_clears_provenance() {
        let mut t = Transaction::new("t-1", date(), "CORNER BISTRO", -30.0, "s")
            .with_category(Category::Shopping, None);
        t.ai_categorized = true;
        t.ai_reason = Some("Looks like a store".into());
        t.categorized_by = Some(CategorizedBy::Ai);

        t.set_category(Category::Dining, Some("restaurants"));
        assert_eq!(t.category, Some(Category::Dining));
        assert_eq!(t.subcategory.as_deref(), Some("Restaurants"));
        assert!(!t.ai_categorized);
        assert_eq!(t.ai_reason, None);
        assert_eq!(t.categorized_by, None);

        t.set_category(Category::Travel, None);
        assert_eq!(t.subcategory.as_deref(), Some("Other"));
    }

    #[test]
    fn test_with_category_normalizes_subcategory() {
        let t = Transaction::new("t-1", date(), "X", -1.0, "s")
            .with_category(Category::Dining, Some("Gym"));
        assert_eq!(t.subcategory.as_deref(), Some("Other"));
    }
}
