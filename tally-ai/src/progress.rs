//! Structured progress events for multi-batch operations.
//!
//! Callers pass an optional callback; it is invoked synchronously between
//! steps. This is the only progress channel the pipeline uses.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Orchestrator split the input
    RulesApplied { matched: usize, remaining: usize },
    /// No API key, remaining transactions go to the keyword classifier
    BasicFallback { count: usize },
    CategorizationBatch { batch: usize, total_batches: usize, size: usize },
    CategorizationBatchDone { batch: usize, applied: usize },
    RuleGenStarted { categories: usize, total_batches: usize },
    RuleGenBatch { batch: usize, total_batches: usize, categories: Vec<String> },
    RuleGenBatchDone { batch: usize, rules: usize },
    RuleGenBatchSkipped { batch: usize, reason: String },
    RuleDropped { batch: usize, name: String, errors: Vec<String> },
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::RulesApplied { matched, remaining } => {
                write!(f, "rules matched {matched} transactions, {remaining} remaining")
            }
            ProgressEvent::BasicFallback { count } => {
                write!(f, "no API key; {count} transactions use keyword categorization")
            }
            ProgressEvent::CategorizationBatch { batch, total_batches, size } => {
                write!(f, "categorizing batch {batch}/{total_batches} ({size} transactions)")
            }
            ProgressEvent::CategorizationBatchDone { batch, applied } => {
                write!(f, "batch {batch} done, {applied} categorized")
            }
            ProgressEvent::RuleGenStarted { categories, total_batches } => {
                write!(f, "generating rules for {categories} categories in {total_batches} batches")
            }
            ProgressEvent::RuleGenBatch { batch, total_batches, categories } => {
                write!(f, "rule batch {batch}/{total_batches}: {}", categories.join(", "))
            }
            ProgressEvent::RuleGenBatchDone { batch, rules } => {
                write!(f, "rule batch {batch}: {rules} rules")
            }
            ProgressEvent::RuleGenBatchSkipped { batch, reason } => {
                write!(f, "rule batch {batch} skipped: {reason}")
            }
            ProgressEvent::RuleDropped { batch, name, errors } => {
                write!(f, "rule batch {batch}: dropped '{name}': {}", errors.join("; "))
            }
        }
    }
}

pub type ProgressFn<'a> = &'a mut (dyn FnMut(&ProgressEvent) + Send);

/// Optional progress sink
pub struct Progress<'a>(Option<ProgressFn<'a>>);

impl<'a> Progress<'a> {
    pub fn new(sink: Option<ProgressFn<'a>>) -> Self {
        Progress(sink)
    }

    pub fn none() -> Self {
        Progress(None)
    }

    pub fn emit(&mut self, event: ProgressEvent) {
        if let Some(f) = self.0.as_mut() {
            (*f)(&event);
        }
    }

    /// Borrow for a nested call without giving up the sink
    pub fn reborrow(&mut self) -> Progress<'_> {
        Progress(self.0.as_mut().map(|f| &mut **f as ProgressFn<'_>))
    }
}

impl<'a> From<ProgressFn<'a>> for Progress<'a> {
    fn from(f: ProgressFn<'a>) -> Self {
        Progress(Some(f))
    }
}
