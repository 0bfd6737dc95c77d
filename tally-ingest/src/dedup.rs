//! Content-hash deduplication across imports

use std::collections::HashSet;
use tally_core::Transaction;

/// `ref:<id>` when the statement carries a reference id, otherwise
/// `YYYY-MM-DD|lowercased description|absolute amount to cents`
pub fn dedup_key(t: &Transaction) -> String {
    match t.reference_id.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) => format!("ref:{r}"),
        None => format!(
            "{}|{}|{:.2}",
            t.date.format("%Y-%m-%d"),
            t.description.trim().to_lowercase(),
            t.amount.abs()
        ),
    }
}

/// Split `incoming` into transactions not already in `existing` and a
/// duplicate count
pub fn new_transactions(
    existing: &[Transaction],
    incoming: Vec<Transaction>,
) -> (Vec<Transaction>, usize) {
    let mut seen: HashSet<String> = existing.iter().map(dedup_key).collect();
    let before = incoming.len();
    let fresh: Vec<Transaction> = incoming
        .into_iter()
        .filter(|t| seen.insert(dedup_key(t)))
        .collect();
    let duplicates = before - fresh.len();
    (fresh, duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn txn(desc: &str, amount: f64) -> Transaction {
        Transaction::new(desc, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(), desc, amount, "a.csv")
    }

    #[test]
    fn test_key_shapes() {
        assert_eq!(dedup_key(&txn("  Coffee ", -3.5)), "2025-01-02|coffee|3.50");
        let mut t = txn("Coffee", -3.5);
        t.reference_id = Some("XYZ".into());
        assert_eq!(dedup_key(&t), "ref:XYZ");
    }

    #[test]
    fn test_new_transactions_skips_existing() {
        let existing = vec![txn("COFFEE", -3.5)];
        let incoming = vec![txn("coffee", 3.5), txn("TEA", -2.0), txn("TEA", -2.0)];
        let (fresh, dups) = new_transactions(&existing, incoming);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].description, "TEA");
        assert_eq!(dups, 2);
    }
}
