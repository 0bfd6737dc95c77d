//! Spending totals over a set of transactions

use serde::Serialize;
use std::collections::BTreeMap;

use crate::finance::Transaction;
use crate::taxonomy::{category_label, Category, DEFAULT_SUBCATEGORY};

/// Expense total for one category
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    /// Share of all expenses, 0.0 - 100.0
    pub percent: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SpendingSummary {
    pub total_income: f64,
    pub total_expenses: f64,
    pub net: f64,
    pub transaction_count: usize,
    /// Sorted by total, largest first
    pub by_category: Vec<CategoryTotal>,
}

impl SpendingSummary {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let mut totals: BTreeMap<&'static str, (f64, usize)> = BTreeMap::new();
        let mut total_income = 0.0;
        let mut total_expenses = 0.0;

        for t in transactions {
            if t.is_expense() {
                let entry = totals.entry(category_label(t.category)).or_default();
                entry.0 += t.abs_amount();
                entry.1 += 1;
                total_expenses += t.abs_amount();
            } else if t.is_income() {
                total_income += t.amount;
            }
        }

        let mut by_category: Vec<CategoryTotal> = totals
            .into_iter()
            .map(|(category, (total, count))| CategoryTotal {
                category: category.to_string(),
                total,
                percent: if total_expenses > 0.0 {
                    total / total_expenses * 100.0
                } else {
                    0.0
                },
                count,
            })
            .collect();
        by_category.sort_by(|a, b| b.total.total_cmp(&a.total));

        Self {
            total_income,
            total_expenses,
            net: total_income - total_expenses,
            transaction_count: transactions.len(),
            by_category,
        }
    }
}

/// Expense totals per subcategory within one category, largest first
pub fn subcategory_totals(transactions: &[Transaction], category: Category) -> Vec<(String, f64)> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for t in transactions
        .iter()
        .filter(|t| t.category == Some(category) && t.is_expense())
    {
        let sub = t.subcategory.clone().unwrap_or_else(|| DEFAULT_SUBCATEGORY.to_string());
        *totals.entry(sub).or_default() += t.abs_amount();
    }
    let mut out: Vec<(String, f64)> = totals.into_iter().collect();
    out.sort_by(|a, b| b.1.total_cmp(&a.1));
    out
}

/// Spending per category in one calendar month
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthTotals {
    /// `YYYY-MM`
    pub month: String,
    /// Every category seen in any month, zero when absent from this one
    pub totals: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryAverage {
    pub category: String,
    /// Total divided by the number of months in the trend
    pub average: f64,
    pub total: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct MonthlyTrends {
    /// Oldest month first
    pub months: Vec<MonthTotals>,
    /// Largest average first
    pub averages: Vec<CategoryAverage>,
}

/// Month-by-month spending per category. Income and transfers are left
/// out; every other amount counts by its absolute value.
pub fn monthly_category_totals(transactions: &[Transaction]) -> MonthlyTrends {
    let mut by_month: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    let mut sums: BTreeMap<&'static str, (f64, usize)> = BTreeMap::new();

    for t in transactions {
        if matches!(t.category, Some(Category::Income | Category::Transfer)) {
            continue;
        }
        let label = category_label(t.category);
        let month = t.date.format("%Y-%m").to_string();
        *by_month.entry(month).or_default().entry(label.to_string()).or_default() += t.abs_amount();
        let entry = sums.entry(label).or_default();
        entry.0 += t.abs_amount();
        entry.1 += 1;
    }

    let month_count = by_month.len().max(1) as f64;
    let months = by_month
        .into_iter()
        .map(|(month, mut totals)| {
            for label in sums.keys() {
                totals.entry(label.to_string()).or_default();
            }
            MonthTotals { month, totals }
        })
        .collect();

    let mut averages: Vec<CategoryAverage> = sums
        .into_iter()
        .map(|(category, (total, count))| CategoryAverage {
            category: category.to_string(),
            average: total / month_count,
            total,
            count,
        })
        .collect();
    averages.sort_by(|a, b| b.average.total_cmp(&a.average));

    MonthlyTrends { months, averages }
}
