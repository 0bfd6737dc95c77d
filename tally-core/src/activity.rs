//! Append-only audit trail of language-model interactions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Entries kept after eviction
pub const ACTIVITY_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Categorization,
    Recategorization,
    Insights,
    RuleGeneration,
}

impl ActivityKind {
    pub fn label(&self) -> &'static str {
        match self {
            ActivityKind::Categorization => "Categorization",
            ActivityKind::Recategorization => "Re-categorization",
            ActivityKind::Insights => "Generate Insights",
            ActivityKind::RuleGeneration => "Rule Generation",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub status: ActivityStatus,
    /// Structured diagnostics: batch prompts/responses, token usage, errors
    pub details: Value,
}

impl ActivityLogEntry {
    pub fn success(kind: ActivityKind, details: Value) -> Self {
        Self::at(Utc::now(), kind, ActivityStatus::Success, details)
    }

    pub fn error(kind: ActivityKind, details: Value) -> Self {
        Self::at(Utc::now(), kind, ActivityStatus::Error, details)
    }

    pub fn at(
        timestamp: DateTime<Utc>,
        kind: ActivityKind,
        status: ActivityStatus,
        details: Value,
    ) -> Self {
        Self {
            id: format!("log_{}", timestamp.timestamp_nanos_opt().unwrap_or_default()),
            timestamp,
            kind,
            status,
            details,
        }
    }
}

/// Newest-first log capped at [`ACTIVITY_LOG_CAPACITY`]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ActivityLog {
    entries: Vec<ActivityLogEntry>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from persisted entries, re-applying the cap
    pub fn from_entries(mut entries: Vec<ActivityLogEntry>) -> Self {
        entries.truncate(ACTIVITY_LOG_CAPACITY);
        Self { entries }
    }

    /// Record an entry; the oldest entry is evicted once the log is full
    pub fn push(&mut self, entry: ActivityLogEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(ACTIVITY_LOG_CAPACITY);
    }

    pub fn entries(&self) -> &[ActivityLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_push_evicts_oldest() {
        let mut log = ActivityLog::new();
        for i in 0..105 {
            let ts = Utc.timestamp_opt(1_700_000_000 + i, 0).unwrap();
            log.push(ActivityLogEntry::at(
                ts,
                ActivityKind::Categorization,
                ActivityStatus::Success,
                json!({ "n": i }),
            ));
        }
        assert_eq!(log.len(), ACTIVITY_LOG_CAPACITY);
        assert_eq!(log.entries()[0].details["n"], 104);
        assert_eq!(log.entries()[99].details["n"], 5);
    }

    #[test]
    fn test_entry_serializes_type_field() {
        let e = ActivityLogEntry::error(ActivityKind::RuleGeneration, json!({ "error": "boom" }));
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["type"], "rule_generation");
        assert_eq!(v["status"], "error");
    }
}
