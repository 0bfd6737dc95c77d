//! Load/save boundary for sheets, rules and the activity log.
//!
//! The categorization pipeline never touches storage; callers load a snapshot,
//! run the pipeline, and save what comes back.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::activity::ActivityLog;
use crate::error::{CoreError, Result};
use crate::finance::Sheet;
use crate::rule::Rule;

pub trait Store {
    fn load_sheets(&self) -> Result<Vec<Sheet>>;
    fn save_sheets(&self, sheets: &[Sheet]) -> Result<()>;
    fn load_rules(&self) -> Result<Vec<Rule>>;
    fn save_rules(&self, rules: &[Rule]) -> Result<()>;
    fn load_activity(&self) -> Result<ActivityLog>;
    fn save_activity(&self, log: &ActivityLog) -> Result<()>;
}

/// One pretty-printed JSON file per collection under a directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T> {
        let p = self.dir.join(file);
        if !p.exists() {
            return Ok(T::default());
        }
        let s = fs::read_to_string(&p).map_err(|source| io_error(&p, source))?;
        if s.trim().is_empty() {
            return Ok(T::default());
        }
        Ok(serde_json::from_str(&s)?)
    }

    fn write<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|source| io_error(&self.dir, source))?;
        let p = self.dir.join(file);
        let s = serde_json::to_string_pretty(value)?;
        fs::write(&p, s).map_err(|source| io_error(&p, source))?;
        tracing::debug!(path = %p.display(), "saved");
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl Store for JsonFileStore {
    fn load_sheets(&self) -> Result<Vec<Sheet>> {
        self.read("sheets.json")
    }

    fn save_sheets(&self, sheets: &[Sheet]) -> Result<()> {
        self.write("sheets.json", sheets)
    }

    fn load_rules(&self) -> Result<Vec<Rule>> {
        self.read("rules.json")
    }

    fn save_rules(&self, rules: &[Rule]) -> Result<()> {
        self.write("rules.json", rules)
    }

    fn load_activity(&self) -> Result<ActivityLog> {
        let log: ActivityLog = self.read("activity.json")?;
        Ok(ActivityLog::from_entries(log.entries().to_vec()))
    }

    fn save_activity(&self, log: &ActivityLog) -> Result<()> {
        self.write("activity.json", log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ActivityKind, ActivityLogEntry};
    use crate::rule::{RuleAuthor, RuleMatcher};
    use crate::taxonomy::Category;

    #[test]
    fn test_missing_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.load_sheets().unwrap().is_empty());
        assert!(store.load_rules().unwrap().is_empty());
        assert!(store.load_activity().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested"));

        let sheets = vec![Sheet::new("s1", "Household")];
        store.save_sheets(&sheets).unwrap();
        assert_eq!(store.load_sheets().unwrap(), sheets);

        let rules = vec![Rule::new(
            "Netflix",
            RuleMatcher::DescriptionContains("NETFLIX".to_string()),
            Category::Entertainment,
            Some("Streaming"),
            0.95,
            RuleAuthor::User,
        )];
        store.save_rules(&rules).unwrap();
        assert_eq!(store.load_rules().unwrap(), rules);

        let mut log = ActivityLog::new();
        log.push(ActivityLogEntry::success(ActivityKind::Insights, serde_json::json!({})));
        store.save_activity(&log).unwrap();
        assert_eq!(store.load_activity().unwrap().len(), 1);
    }
}
