use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Subcommand;
use std::path::Path;
use tally_core::{find_sheet, Sheet, Store, Transaction};
use tally_ingest::export_csv_file;

#[derive(Subcommand, Debug)]
pub enum SheetsCommand {
    /// List sheets with their transaction counts
    List,

    /// Create an empty sheet
    Create {
        name: String,
    },

    /// Delete a sheet and its transactions (the last sheet is kept)
    Delete {
        name: String,
    },
}

pub fn run(store: &impl Store, command: SheetsCommand) -> Result<()> {
    match command {
        SheetsCommand::List => {
            let sheets = store.load_sheets().context("load sheets")?;
            if sheets.is_empty() {
                println!("No sheets yet. Create one with `tally sheets create <name>`.");
            }
            for s in &sheets {
                println!("{}  {}  ({} transactions)", s.id, s.name, s.transactions.len());
            }
        }
        SheetsCommand::Create { name } => {
            let mut sheets = store.load_sheets().context("load sheets")?;
            create_sheet(&mut sheets, &name)?;
            store.save_sheets(&sheets).context("save sheets")?;
            println!("Created sheet '{}'", name.trim());
        }
        SheetsCommand::Delete { name } => {
            let mut sheets = store.load_sheets().context("load sheets")?;
            let removed = delete_sheet(&mut sheets, &name)?;
            store.save_sheets(&sheets).context("save sheets")?;
            println!(
                "Deleted sheet '{}' ({} transactions)",
                removed.name,
                removed.transactions.len()
            );
        }
    }
    Ok(())
}

/// Append a new empty sheet; names are unique
pub fn create_sheet(sheets: &mut Vec<Sheet>, name: &str) -> Result<usize> {
    let name = name.trim();
    if name.is_empty() {
        bail!("sheet name must not be empty");
    }
    if find_sheet(sheets, name).is_some() {
        bail!("sheet '{}' already exists", name);
    }
    let id = format!("sheet_{}_{}", Utc::now().timestamp_millis(), sheets.len());
    sheets.push(Sheet::new(id, name));
    Ok(sheets.len() - 1)
}

/// Remove the sheet named `name`; refuses to remove the only sheet
pub fn delete_sheet(sheets: &mut Vec<Sheet>, name: &str) -> Result<Sheet> {
    let idx = sheet_index(sheets, name)?;
    if sheets.len() == 1 {
        bail!("cannot delete the last sheet");
    }
    Ok(sheets.remove(idx))
}

/// Index of the sheet named `name`
pub fn sheet_index(sheets: &[Sheet], name: &str) -> Result<usize> {
    match sheets.iter().position(|s| s.name == name) {
        Some(i) => Ok(i),
        None => bail!("sheet '{}' not found (see `tally sheets list`)", name),
    }
}

/// Transactions of one sheet, or of every sheet when `name` is `None`
pub fn select_transactions(sheets: &[Sheet], name: Option<&str>) -> Result<Vec<Transaction>> {
    match name {
        Some(name) => Ok(sheets[sheet_index(sheets, name)?].transactions.clone()),
        None => Ok(sheets.iter().flat_map(|s| s.transactions.iter().cloned()).collect()),
    }
}

pub fn export_sheet(store: &impl Store, sheet: &str, file: &Path) -> Result<()> {
    let sheets = store.load_sheets().context("load sheets")?;
    let sheet = &sheets[sheet_index(&sheets, sheet)?];
    export_csv_file(file, &sheet.transactions)?;
    println!("Exported {} transactions to {}", sheet.transactions.len(), file.display());
    Ok(())
}
