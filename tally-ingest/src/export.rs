//! CSV export of a sheet's transactions

use anyhow::{Context, Result};
use std::path::Path;
use tally_core::{category_label, Transaction};

pub const EXPORT_HEADERS: [&str; 9] = [
    "Date",
    "Description",
    "Amount",
    "Category",
    "Subcategory",
    "Source",
    "AI Categorized",
    "AI Reason",
    "Reference ID",
];

fn write_rows<W: std::io::Write>(
    wtr: &mut csv::Writer<W>,
    transactions: &[Transaction],
) -> Result<()> {
    wtr.write_record(EXPORT_HEADERS)?;
    for t in transactions {
        wtr.write_record([
            t.date.format("%Y-%m-%d").to_string(),
            t.description.clone(),
            t.amount.to_string(),
            category_label(t.category).to_string(),
            t.subcategory.clone().unwrap_or_default(),
            t.source.clone(),
            if t.ai_categorized { "Yes" } else { "No" }.to_string(),
            t.ai_reason.clone().unwrap_or_default(),
            t.reference_id.clone().unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_csv(transactions: &[Transaction]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    write_rows(&mut wtr, transactions)?;
    let bytes = wtr.into_inner().context("finishing CSV export")?;
    String::from_utf8(bytes).context("CSV export is not UTF-8")
}

pub fn export_csv_file(path: impl AsRef<Path>, transactions: &[Transaction]) -> Result<()> {
    let path = path.as_ref();
    let mut wtr =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    write_rows(&mut wtr, transactions).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_core::Category;

    #[test]
    fn test_export_quotes_and_labels() {
        let d = NaiveDate::from_ymd_opt(2025, 5, 5).unwrap();
        let mut ai = Transaction::new("a", d, "SHELL OIL, MAIN ST", -40.0, "card.csv")
            .with_category(Category::Transportation, Some("Fuel"));
        ai.ai_categorized = true;
        ai.ai_reason = Some("Gas \"station\"".into());
        let plain = Transaction::new("b", d, "MYSTERY", -1.5, "card.csv");

        let out = export_csv(&[ai, plain]).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], EXPORT_HEADERS.join(","));
        assert_eq!(
            lines[1],
            r#"2025-05-05,"SHELL OIL, MAIN ST",-40,Transportation,Fuel,card.csv,Yes,"Gas ""station""","#
        );
        assert_eq!(lines[2], "2025-05-05,MYSTERY,-1.5,Uncategorized,,card.csv,No,,");
    }
}
