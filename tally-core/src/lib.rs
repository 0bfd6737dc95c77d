//! tally-core: domain types for the categorization pipeline, the basic keyword
//! classifier, and the storage boundary the pipeline's callers persist through.

pub mod activity;
pub mod classifier;
pub mod error;
pub mod finance;
pub mod rows;
pub mod rule;
pub mod session;
pub mod store;
pub mod summary;
pub mod taxonomy;

pub use activity::{
    ActivityKind, ActivityLog, ActivityLogEntry, ActivityStatus, ACTIVITY_LOG_CAPACITY,
};
pub use classifier::{classify, BasicCategory};
pub use error::{CoreError, Result};
pub use finance::{find_sheet, find_sheet_mut, CategorizedBy, Sheet, Transaction};
pub use rule::{
    next_rule_id, AmountRange, Rule, RuleAuthor, RuleMatch, RuleMatcher, RuleRecord, RuleType,
};
pub use session::Session;
pub use store::{JsonFileStore, Store};
pub use summary::{
    monthly_category_totals, subcategory_totals, CategoryAverage, CategoryTotal, MonthTotals,
    MonthlyTrends, SpendingSummary,
};
pub use taxonomy::{category_label, Category, DEFAULT_SUBCATEGORY, UNCATEGORIZED};
