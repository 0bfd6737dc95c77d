//! Batched AI categorization.
//!
//! Each batch prompt lists transactions by 1-based position; the model answers
//! with a JSON array of `{index, category, subcategory, reason}`. A batch whose
//! answer cannot be parsed fails the whole call. Entries with an unknown
//! category are ignored; unknown subcategories become `Other`.

use serde::Serialize;
use serde_json::Value;
use tally_core::{Category, CategorizedBy, Transaction};

use crate::error::{AiError, Result};
use crate::json::{parse_json_array, preview};
use crate::llm::{AnthropicClient, LanguageModel, TokenUsage, DEFAULT_MAX_TOKENS};
use crate::progress::{Progress, ProgressEvent};

pub const DEFAULT_BATCH_SIZE: usize = 50;
const PLACEHOLDER_REASON: &str = "Categorized by AI";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiSettings {
    pub batch_size: usize,
    pub max_tokens: u32,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// One request/response pair, kept for the activity log
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchLog {
    pub batch_number: usize,
    pub transaction_count: usize,
    pub prompt: String,
    pub response: String,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategorizeReport {
    pub applied: usize,
    pub batches: Vec<BatchLog>,
}

pub struct AiCategorizer<'m> {
    model: &'m dyn LanguageModel,
    settings: AiSettings,
}

impl<'m> AiCategorizer<'m> {
    pub fn new(model: &'m dyn LanguageModel) -> Self {
        Self {
            model,
            settings: AiSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: AiSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Categorize a copy of `transactions`
    pub async fn categorize(
        &self,
        transactions: &[Transaction],
        progress: Progress<'_>,
    ) -> Result<Vec<Transaction>> {
        let mut out = transactions.to_vec();
        self.categorize_in_place(&mut out, progress).await?;
        Ok(out)
    }

    /// Categorize in place, batch by batch. On error, batches before the
    /// failing one stay applied; the caller decides whether to keep them.
    pub async fn categorize_in_place(
        &self,
        transactions: &mut [Transaction],
        mut progress: Progress<'_>,
    ) -> Result<CategorizeReport> {
        let batch_size = self.settings.batch_size.max(1);
        let total_batches = transactions.len().div_ceil(batch_size);
        let mut report = CategorizeReport::default();

        for (i, batch) in transactions.chunks_mut(batch_size).enumerate() {
            let batch_number = i + 1;
            progress.emit(ProgressEvent::CategorizationBatch {
                batch: batch_number,
                total_batches,
                size: batch.len(),
            });

            let prompt = build_prompt(batch);
            let completion = self
                .model
                .complete("categorization", &prompt, self.settings.max_tokens)
                .await?;
            let entries: Vec<Value> = parse_json_array(&completion.text).map_err(|reason| {
                tracing::warn!(
                    batch = batch_number,
                    %reason,
                    "unparseable categorization response"
                );
                AiError::InvalidAiResponse {
                    operation: "categorization",
                    reason,
                    preview: preview(&completion.text),
                }
            })?;

            let applied = apply_entries(batch, &entries);
            tracing::debug!(
                batch = batch_number,
                size = batch.len(),
                applied,
                "categorization batch applied"
            );
            progress.emit(ProgressEvent::CategorizationBatchDone {
                batch: batch_number,
                applied,
            });

            report.applied += applied;
            report.batches.push(BatchLog {
                batch_number,
                transaction_count: batch.len(),
                prompt,
                response: completion.text,
                usage: completion.usage,
            });
        }
        Ok(report)
    }
}

fn taxonomy_listing() -> String {
    Category::ALL
        .iter()
        .map(|c| format!("- {}: {}", c, c.subcategories().join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn build_prompt(batch: &[Transaction]) -> String {
    let list = batch
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {} - ${}", i + 1, t.description, t.abs_amount()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a financial categorization expert. Categorize each transaction into EXACTLY ONE \
category and ONE subcategory from this list:\n\n{}\n\nTransactions:\n{list}\n\n\
IMPORTANT: Respond ONLY with a valid JSON array containing one item per transaction. Each item \
must have \"index\" (the transaction number), \"category\" (from the list above), \"subcategory\" \
(from that category's list) and \"reason\" (a short explanation). DO NOT include any text outside \
the JSON array.\n\n\
Example format:\n[{{\"index\": 1, \"category\": \"Groceries\", \"subcategory\": \"Supermarket\", \
\"reason\": \"Grocery chain\"}}]",
        taxonomy_listing()
    )
}

fn entry_index(entry: &Value) -> Option<usize> {
    match entry.get("index")? {
        Value::Number(n) => n.as_u64().map(|n| n as usize).or_else(|| whole_index(n.as_f64()?)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `1.0` counts as index 1
fn whole_index(f: f64) -> Option<usize> {
    (f.fract() == 0.0 && f >= 0.0).then_some(f as usize)
}

fn entry_str<'a>(entry: &'a Value, key: &str) -> Option<&'a str> {
    entry.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

/// Returns how many transactions were updated
fn apply_entries(batch: &mut [Transaction], entries: &[Value]) -> usize {
    let mut applied = 0;
    for (i, txn) in batch.iter_mut().enumerate() {
        let Some(entry) = entries.iter().find(|e| entry_index(e) == Some(i + 1)) else {
            continue;
        };
        let Some(category) = entry_str(entry, "category").and_then(Category::from_name) else {
            continue;
        };

        txn.clear_provenance();
        txn.category = Some(category);
        let subcategory = category.normalize_subcategory(entry_str(entry, "subcategory"));
        txn.subcategory = Some(subcategory.to_string());
        txn.ai_categorized = true;
        txn.ai_reason = Some(entry_str(entry, "reason").unwrap_or(PLACEHOLDER_REASON).to_string());
        txn.categorized_by = Some(CategorizedBy::Ai);
        applied += 1;
    }
    applied
}

/// Categorize with the Anthropic API using default settings.
/// Fails with [`AiError::MissingApiKey`] when no key is given.
pub async fn categorize_with_ai(
    transactions: &[Transaction],
    api_key: Option<&str>,
) -> Result<Vec<Transaction>> {
    let client = AnthropicClient::new(api_key.unwrap_or_default())?;
    AiCategorizer::new(&client).categorize(transactions, Progress::none()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn txn(desc: &str, amount: f64) -> Transaction {
        Transaction::new(desc, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(), desc, amount, "test")
    }

    #[test]
    fn test_prompt_lists_positions_and_absolute_amounts() {
        let prompt = build_prompt(&[txn("NETFLIX.COM", -15.99), txn("PAYROLL", 2000.0)]);
        assert!(prompt.contains("1. NETFLIX.COM - $15.99"));
        assert!(prompt.contains("2. PAYROLL - $2000"));
        assert!(prompt.contains("- Dining: Restaurants, Fast Food"));
    }

    #[test]
    fn test_entry_index_accepts_whole_floats() {
        assert_eq!(entry_index(&json!({"index": 2})), Some(2));
        assert_eq!(entry_index(&json!({"index": 2.0})), Some(2));
        assert_eq!(entry_index(&json!({"index": " 3 "})), Some(3));
        assert_eq!(entry_index(&json!({"index": 2.5})), None);
        assert_eq!(entry_index(&json!({"index": -1})), None);

        let mut batch = vec![txn("A", -1.0)];
        assert_eq!(apply_entries(&mut batch, &[json!({"index": 1.0, "category": "Dining"})]), 1);
        assert_eq!(batch[0].category, Some(Category::Dining));
    }

    #[test]
    fn test_apply_entries_validates_category_and_subcategory() {
        let mut batch = vec![txn("A", -1.0), txn("B", -2.0), txn("C", -3.0), txn("D", -4.0)];
        batch[0].rule_id = Some("stale".into());
        let entries = vec![
            json!({
                "index": 1, "category": "Dining", "subcategory": "coffee shops", "reason": "Cafe"
            }),
            json!({"index": "2", "category": "Pets", "subcategory": "Food"}),
            json!({"index": 3, "category": "Travel", "subcategory": "Spaceflight"}),
            json!({"index": 1, "category": "Shopping"}),
        ];
        assert_eq!(apply_entries(&mut batch, &entries), 2);

        assert_eq!(batch[0].category, Some(Category::Dining));
        assert_eq!(batch[0].subcategory.as_deref(), Some("Coffee Shops"));
        assert_eq!(batch[0].ai_reason.as_deref(), Some("Cafe"));
        assert_eq!(batch[0].rule_id, None);
        assert_eq!(batch[0].categorized_by, Some(CategorizedBy::Ai));

        assert_eq!(batch[1].category, None);
        assert!(!batch[1].ai_categorized);

        assert_eq!(batch[2].subcategory.as_deref(), Some("Other"));
        assert_eq!(batch[2].ai_reason.as_deref(), Some(PLACEHOLDER_REASON));
        assert_eq!(batch[3].category, None);
    }
}
