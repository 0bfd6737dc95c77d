//! End-to-end categorization policy: rules first, then the language model
//! for whatever rules did not match, with the keyword classifier standing in
//! when no model is configured.
//!
//! AI errors propagate. Falling back to keyword categorization after an AI
//! failure is the caller's decision (see [`apply_basic`]).

use tally_core::{classify, Rule, Transaction};
use tally_rules::{apply_match, categorize_with_rules};

use crate::categorize::{AiCategorizer, AiSettings, BatchLog};
use crate::error::Result;
use crate::llm::{AnthropicClient, LanguageModel};
use crate::progress::{Progress, ProgressEvent};

/// Overwrite a transaction with the keyword classifier's answer
pub fn apply_basic(txn: &mut Transaction) {
    let basic = classify(&txn.description);
    txn.clear_provenance();
    txn.category = Some(basic.category);
    txn.subcategory = Some(basic.subcategory.to_string());
}

pub struct Orchestrator<'m> {
    model: Option<&'m dyn LanguageModel>,
    ai: AiSettings,
}

impl<'m> Orchestrator<'m> {
    /// `None` means no API key: unmatched transactions get keyword categories
    pub fn new(model: Option<&'m dyn LanguageModel>) -> Self {
        Self {
            model,
            ai: AiSettings::default(),
        }
    }

    pub fn with_ai_settings(mut self, ai: AiSettings) -> Self {
        self.ai = ai;
        self
    }

    /// Output has the same length and order as `transactions`
    pub async fn categorize(
        &self,
        transactions: &[Transaction],
        rules: &[Rule],
        progress: Progress<'_>,
    ) -> Result<Vec<Transaction>> {
        Ok(self.categorize_logged(transactions, rules, progress).await?.0)
    }

    /// [`Orchestrator::categorize`] plus the AI batch logs, empty when no
    /// model was called
    pub async fn categorize_logged(
        &self,
        transactions: &[Transaction],
        rules: &[Rule],
        mut progress: Progress<'_>,
    ) -> Result<(Vec<Transaction>, Vec<BatchLog>)> {
        let mut out = transactions.to_vec();
        let mut unmatched: Vec<usize> = Vec::new();
        for (i, txn) in out.iter_mut().enumerate() {
            match categorize_with_rules(txn, rules) {
                Some(m) => apply_match(txn, m),
                None => {
                    // tags from an earlier pass no longer hold
                    txn.clear_provenance();
                    unmatched.push(i);
                }
            }
        }
        progress.emit(ProgressEvent::RulesApplied {
            matched: out.len() - unmatched.len(),
            remaining: unmatched.len(),
        });
        if unmatched.is_empty() {
            return Ok((out, Vec::new()));
        }

        let Some(model) = self.model else {
            progress.emit(ProgressEvent::BasicFallback { count: unmatched.len() });
            for i in unmatched {
                apply_basic(&mut out[i]);
            }
            return Ok((out, Vec::new()));
        };

        let mut pending: Vec<Transaction> = unmatched.iter().map(|&i| out[i].clone()).collect();
        let report = AiCategorizer::new(model)
            .with_settings(self.ai)
            .categorize_in_place(&mut pending, progress.reborrow())
            .await?;
        for (i, txn) in unmatched.into_iter().zip(pending) {
            out[i] = txn;
        }
        Ok((out, report.batches))
    }
}

/// Orchestrate with the Anthropic API when `api_key` is present and non-blank
pub async fn categorize_with_rules_and_ai(
    transactions: &[Transaction],
    rules: &[Rule],
    api_key: Option<&str>,
    progress: Progress<'_>,
) -> Result<Vec<Transaction>> {
    let client = match api_key.map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => Some(AnthropicClient::new(key)?),
        None => None,
    };
    Orchestrator::new(client.as_ref().map(|c| c as &dyn LanguageModel))
        .categorize(transactions, rules, progress)
        .await
}
