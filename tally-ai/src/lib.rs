//! tally-ai: language-model stages of the categorization pipeline.
//!
//! - [`categorize`]: batched AI categorization
//! - [`rule_gen`]: learning rules from already categorized transactions
//! - [`pipeline`]: rules, then AI, then keyword fallback
//! - [`insights`]: free-text spending insights

pub mod categorize;
pub mod error;
pub mod insights;
pub mod json;
pub mod llm;
pub mod pipeline;
pub mod progress;
pub mod rule_gen;

pub use categorize::{
    categorize_with_ai, AiCategorizer, AiSettings, BatchLog, CategorizeReport, DEFAULT_BATCH_SIZE,
};
pub use error::{AiError, Result};
pub use insights::generate_insights;
pub use llm::{
    AnthropicClient, Completion, LanguageModel, TokenUsage, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS,
    DEFAULT_MODEL,
};
pub use pipeline::{apply_basic, categorize_with_rules_and_ai, Orchestrator};
pub use progress::{Progress, ProgressEvent, ProgressFn};
pub use rule_gen::{
    generate_rules, ApiCallLog, ApiRequestLog, ApiResponseLog, GenerationResult, RuleGenSettings,
    RuleGenerator,
};
