//! AI rule generation.
//!
//! Categorized transactions not already covered by an existing rule are
//! grouped by category and sent to the model a few categories at a time. Each
//! batch sees every pattern known so far (existing rules plus rules parsed from
//! earlier batches) so it does not propose duplicates. Batches run strictly in
//! order. A malformed batch answer is logged and skipped; transport and API
//! errors abort the remaining batches.

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tally_core::{next_rule_id, Category, Rule, RuleAuthor, RuleRecord, Transaction};
use tally_rules::apply_rule;

use crate::error::{AiError, Result};
use crate::json::parse_json_array;
use crate::llm::{AnthropicClient, LanguageModel, TokenUsage, DEFAULT_MAX_TOKENS};
use crate::progress::{Progress, ProgressEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleGenSettings {
    pub categories_per_batch: usize,
    pub examples_per_category: usize,
    /// Suggested rules per category in the prompt
    pub rules_per_category: usize,
    pub max_tokens: u32,
}

impl Default for RuleGenSettings {
    fn default() -> Self {
        Self {
            categories_per_batch: 4,
            examples_per_category: 20,
            rules_per_category: 8,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequestLog {
    pub model: String,
    pub max_tokens: u32,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponseLog {
    pub full_text: String,
    pub rules_generated: usize,
    pub usage: Option<TokenUsage>,
    /// Set when the batch answer could not be parsed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One rule-generation request and its answer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCallLog {
    pub batch_number: usize,
    pub categories: Vec<String>,
    pub request: ApiRequestLog,
    pub response: ApiResponseLog,
}

impl ApiCallLog {
    pub fn skipped(&self) -> bool {
        self.response.error.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub rules: Vec<Rule>,
    pub api_calls: Vec<ApiCallLog>,
}

/// `{type, pattern, category}` of every rule the model should not repeat
#[derive(Debug, Clone, Default)]
struct KnownPatterns(Vec<Value>);

impl KnownPatterns {
    fn from_rules(rules: &[Rule]) -> Self {
        let mut known = KnownPatterns::default();
        for r in rules {
            known.push(r);
        }
        known
    }

    fn push(&mut self, r: &Rule) {
        self.0.push(json!({
            "type": r.rule_type().as_str(),
            "pattern": r.matcher.pattern_value(),
            "category": r.category.as_str(),
        }));
    }

    fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "[]".to_string())
    }
}

type CategoryGroup<'t> = (Category, Vec<&'t Transaction>);

/// Group by category in first-appearance order, skipping uncategorized
fn group_by_category(transactions: &[Transaction]) -> Vec<CategoryGroup<'_>> {
    let mut groups: Vec<CategoryGroup<'_>> = Vec::new();
    for t in transactions {
        let Some(category) = t.category else { continue };
        match groups.iter_mut().find(|(c, _)| *c == category) {
            Some((_, txns)) => txns.push(t),
            None => groups.push((category, vec![t])),
        }
    }
    groups
}

pub struct RuleGenerator<'m> {
    model: &'m dyn LanguageModel,
    settings: RuleGenSettings,
}

impl<'m> RuleGenerator<'m> {
    pub fn new(model: &'m dyn LanguageModel) -> Self {
        Self {
            model,
            settings: RuleGenSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: RuleGenSettings) -> Self {
        self.settings = settings;
        self
    }

    pub async fn generate(
        &self,
        transactions: &[Transaction],
        existing: &[Rule],
        mut progress: Progress<'_>,
    ) -> Result<GenerationResult> {
        let groups = group_by_category(transactions);
        if groups.is_empty() {
            return Err(AiError::NoCategorizedData);
        }

        let mut ignored = 0;
        let groups: Vec<CategoryGroup<'_>> = groups
            .into_iter()
            .filter_map(|(category, txns)| {
                let before = txns.len();
                let unmatched: Vec<&Transaction> = txns
                    .into_iter()
                    .filter(|t| {
                        let covered = existing.iter().any(|r| apply_rule(t, r).is_some());
                        t.force_rule_generation || !covered
                    })
                    .collect();
                ignored += before - unmatched.len();
                (!unmatched.is_empty()).then_some((category, unmatched))
            })
            .collect();
        tracing::debug!(categories = groups.len(), ignored, "rule generation input filtered");
        if groups.is_empty() {
            return Ok(GenerationResult::default());
        }

        let per_batch = self.settings.categories_per_batch.max(1);
        let batches: Vec<&[CategoryGroup<'_>]> = groups.chunks(per_batch).collect();
        let total_batches = batches.len();
        progress.emit(ProgressEvent::RuleGenStarted {
            categories: groups.len(),
            total_batches,
        });

        let mut known = KnownPatterns::from_rules(existing);
        let mut result = GenerationResult::default();

        for (i, batch) in batches.into_iter().enumerate() {
            let batch_number = i + 1;
            let categories: Vec<String> = batch.iter().map(|(c, _)| c.to_string()).collect();
            progress.emit(ProgressEvent::RuleGenBatch {
                batch: batch_number,
                total_batches,
                categories: categories.clone(),
            });

            let prompt = self.build_prompt(batch, &known);
            let completion = self
                .model
                .complete("rule generation", &prompt, self.settings.max_tokens)
                .await?;
            let request = ApiRequestLog {
                model: self.model.model().to_string(),
                max_tokens: self.settings.max_tokens,
                prompt,
            };

            let entries: Vec<Value> = match parse_json_array(&completion.text) {
                Ok(entries) => entries,
                Err(reason) => {
                    tracing::warn!(
                        batch = batch_number,
                        %reason,
                        "skipping rule batch with malformed response"
                    );
                    progress.emit(ProgressEvent::RuleGenBatchSkipped {
                        batch: batch_number,
                        reason: reason.clone(),
                    });
                    result.api_calls.push(ApiCallLog {
                        batch_number,
                        categories,
                        request,
                        response: ApiResponseLog {
                            full_text: completion.text,
                            rules_generated: 0,
                            usage: completion.usage,
                            error: Some(reason),
                        },
                    });
                    continue;
                }
            };

            let mut generated = 0;
            for entry in entries {
                match proposal_to_rule(entry) {
                    Ok(rule) => {
                        known.push(&rule);
                        result.rules.push(rule);
                        generated += 1;
                    }
                    Err((name, errors)) => {
                        tracing::debug!(
                            batch = batch_number,
                            %name,
                            ?errors,
                            "dropping invalid rule proposal"
                        );
                        progress.emit(ProgressEvent::RuleDropped {
                            batch: batch_number,
                            name,
                            errors,
                        });
                    }
                }
            }

            progress.emit(ProgressEvent::RuleGenBatchDone {
                batch: batch_number,
                rules: generated,
            });
            result.api_calls.push(ApiCallLog {
                batch_number,
                categories,
                request,
                response: ApiResponseLog {
                    full_text: completion.text,
                    rules_generated: generated,
                    usage: completion.usage,
                    error: None,
                },
            });
        }

        tracing::info!(
            rules = result.rules.len(),
            batches = total_batches,
            "rule generation complete"
        );
        Ok(result)
    }

    fn build_prompt(&self, batch: &[CategoryGroup<'_>], known: &KnownPatterns) -> String {
        let examples: Vec<Value> = batch
            .iter()
            .map(|(category, txns)| {
                let sample: Vec<Value> = txns
                    .iter()
                    .take(self.settings.examples_per_category)
                    .map(|t| {
                        json!({
                            "description": t.description,
                            "amount": t.amount,
                            "subcategory": t.subcategory,
                        })
                    })
                    .collect();
                json!({
                    "category": category.as_str(),
                    "count": txns.len(),
                    "examples": sample,
                })
            })
            .collect();
        let examples = serde_json::to_string_pretty(&examples).unwrap_or_else(|_| "[]".to_string());
        let names = batch.iter().map(|(c, _)| c.as_str()).collect::<Vec<_>>().join(", ");
        let rule_count = batch.len() * self.settings.rules_per_category;
        let taxonomy = batch
            .iter()
            .map(|(c, _)| format!("- {}: {}", c, c.subcategories().join(", ")))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are a financial transaction categorization expert. Analyze these categorized \
transactions and generate precise categorization rules.\n\n\
EXISTING RULES (don't duplicate these):\n{known}\n\n\
CATEGORIZED TRANSACTIONS:\n{examples}\n\n\
ALLOWED SUBCATEGORIES:\n{taxonomy}\n\n\
Your task: Generate rules that can automatically categorize future transactions. Each rule \
should:\n\
1. Match a clear pattern in transaction descriptions\n\
2. Be specific enough to avoid false matches\n\
3. Cover common merchants/patterns\n\
4. Include confidence score (0-1)\n\n\
Rule types you can use:\n\
- \"description_contains\": Simple substring match (e.g., \"STARBUCKS\" -> Dining/Coffee Shops)\n\
- \"description_starts_with\": Prefix match (e.g., \"TST* \")\n\
- \"description_regex\": Regex pattern for complex matching\n\
- \"merchant\": Extract and match merchant name\n\n\
Return ONLY a JSON array of rules in this exact format:\n\
[\n  {{\n    \"name\": \"Starbucks Coffee\",\n    \"type\": \"description_contains\",\n    \
\"pattern\": \"STARBUCKS\",\n    \"category\": \"Dining\",\n    \"subcategory\": \"Coffee \
Shops\",\n    \"confidence\": 0.95\n  }}\n]\n\n\
Generate {rule_count} high-quality rules that cover the most common patterns in THESE CATEGORIES \
ONLY: {names}. Try to generate multiple rules per category to capture different merchants and \
patterns. Focus on precision over coverage.",
            known = known.to_json(),
        )
    }
}

/// Turn one proposed rule into an enabled AI rule with fresh metadata
fn proposal_to_rule(entry: Value) -> std::result::Result<Rule, (String, Vec<String>)> {
    let name = entry
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("<unnamed>")
        .to_string();
    let mut record: RuleRecord =
        serde_json::from_value(entry).map_err(|e| (name.clone(), vec![e.to_string()]))?;

    let now = Utc::now();
    record.id = next_rule_id(now);
    record.match_count = 0;
    record.examples.clear();
    record.created_at = Some(now);
    record.created_by = Some(RuleAuthor::Ai);
    record.enabled = true;

    let errors = record.validate();
    if !errors.is_empty() {
        return Err((name, errors));
    }
    Rule::try_from(record).map_err(|e| (name, vec![e.to_string()]))
}

/// Generate rules with the Anthropic API using default settings
pub async fn generate_rules(
    transactions: &[Transaction],
    api_key: Option<&str>,
    existing: &[Rule],
    progress: Progress<'_>,
) -> Result<GenerationResult> {
    let client = AnthropicClient::new(api_key.unwrap_or_default())?;
    RuleGenerator::new(&client).generate(transactions, existing, progress).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn txn(desc: &str, category: Option<Category>) -> Transaction {
        let date = NaiveDate::from_ymd_opt(2025, 8, 9).unwrap();
        let mut t = Transaction::new(desc, date, desc, -9.0, "test");
        t.category = category;
        t
    }

    #[test]
    fn test_groups_keep_first_appearance_order() {
        let txns = vec![
            txn("SHELL", Some(Category::Transportation)),
            txn("CAFE", Some(Category::Dining)),
            txn("MYSTERY", None),
            txn("BP", Some(Category::Transportation)),
        ];
        let groups = group_by_category(&txns);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, Category::Transportation);
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, Category::Dining);
    }

    #[test]
    fn test_proposal_gets_ai_metadata() {
        let rule = proposal_to_rule(json!({
            "id": "model-chosen", "name": "Shell", "type": "merchant", "pattern": "SHELL",
            "category": "Transportation", "subcategory": "GAS STATIONS", "confidence": 0.9,
            "matchCount": 12, "createdBy": "user", "enabled": false
        }))
        .unwrap();
        assert!(rule.id.starts_with("rule_"));
        assert_eq!(rule.created_by, RuleAuthor::Ai);
        assert!(rule.enabled);
        assert_eq!(rule.match_count, 0);
        assert_eq!(rule.subcategory.as_deref(), Some("Other"));
    }

    #[test]
    fn test_invalid_proposal_reports_name() {
        let (name, errors) = proposal_to_rule(json!({
            "name": "Bad", "type": "amount_range", "pattern": "lots",
            "category": "Transfer", "confidence": 0.5
        }))
        .unwrap_err();
        assert_eq!(name, "Bad");
        assert_eq!(errors, vec!["amount_range rules must have pattern.min and pattern.max"]);

        let (_, errors) = proposal_to_rule(json!({
            "name": "Typed", "type": "merchant", "pattern": "X",
            "category": "Dining", "confidence": "high"
        }))
        .unwrap_err();
        assert_eq!(errors.len(), 1);
    }
}
