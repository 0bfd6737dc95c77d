use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tally_core::{ActivityLogEntry, JsonFileStore, Store};

/// `$TALLY_HOME`, else `~/.tally`
pub fn tally_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("TALLY_HOME").filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".tally"))
}

pub fn ensure_tally_home() -> Result<PathBuf> {
    let dir = tally_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// Local JSON store holding sheets, rules and the activity log
pub fn open_store() -> Result<JsonFileStore> {
    Ok(JsonFileStore::new(ensure_tally_home()?.join("data")))
}

/// Append one entry to the persisted activity log
pub fn record_activity(store: &impl Store, entry: ActivityLogEntry) -> Result<()> {
    let mut log = store.load_activity().context("load activity log")?;
    log.push(entry);
    store.save_activity(&log).context("save activity log")?;
    Ok(())
}
