//! tally-rules: the user-editable rule layer of the categorization pipeline.
//!
//! Rules are evaluated against caller-supplied snapshots; every function here
//! returns new values and owns no state.

pub mod conflicts;
pub mod edit;
pub mod engine;
pub mod error;
pub mod merchant;
pub mod validate;

pub use conflicts::{
    detect_conflicts, rule_set_stats, ConflictReport, ConflictingTransaction, RuleConflict,
    RuleSetStats,
};
pub use edit::{
    add_rule, apply_accepted_rules, remove_rule, replace_rule, set_enabled, toggle_rule,
    AcceptOutcome,
};
pub use engine::{
    all_matches, apply_match, apply_rule, categorize_transactions_with_rules,
    categorize_with_rules, preview_rule, update_rule_stats, MAX_RULE_EXAMPLES,
};
pub use error::{Result, RuleError};
pub use merchant::extract_merchant_name;
pub use validate::{export_rules_json, import_rules_json, validate_rule, ImportIssue, ImportReport};
