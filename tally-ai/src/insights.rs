//! Free-text spending insights

use tally_core::{SpendingSummary, Transaction};

use crate::error::Result;
use crate::llm::LanguageModel;

pub const INSIGHTS_MAX_TOKENS: u32 = 1500;

pub(crate) fn build_prompt(summary: &SpendingSummary) -> String {
    let by_category = summary
        .by_category
        .iter()
        .map(|c| format!("- {}: ${:.2} ({:.1}%)", c.category, c.total, c.percent))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Analyze this spending data and provide 3-4 actionable insights:\n\n\
Total Income: ${:.2}\nTotal Expenses: ${:.2}\nTransaction Count: {}\n\n\
Spending by Category:\n{by_category}\n\n\
Provide insights about:\n1. Spending patterns and trends\n2. Potential savings opportunities\n\
3. Budget recommendations\n4. Any concerning patterns\n\n\
Keep each insight concise (1-2 sentences) and actionable.",
        summary.total_income, summary.total_expenses, summary.transaction_count
    )
}

/// Ask the model for insights on a sheet's spending
pub async fn generate_insights(
    model: &dyn LanguageModel,
    transactions: &[Transaction],
) -> Result<String> {
    let summary = SpendingSummary::from_transactions(transactions);
    let completion = model
        .complete("insights", &build_prompt(&summary), INSIGHTS_MAX_TOKENS)
        .await?;
    Ok(completion.text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_core::Category;

    #[test]
    fn test_prompt_carries_totals() {
        let d = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        let txns = vec![
            Transaction::new("a", d, "PAYROLL", 1000.0, "s")
                .with_category(Category::Income, Some("Salary")),
            Transaction::new("b", d, "CAFE", -25.0, "s").with_category(Category::Dining, None),
            Transaction::new("c", d, "SHELL", -75.0, "s")
                .with_category(Category::Transportation, Some("Fuel")),
        ];
        let prompt = build_prompt(&SpendingSummary::from_transactions(&txns));
        assert!(prompt.contains("Total Income: $1000.00"));
        assert!(prompt.contains("Total Expenses: $100.00"));
        assert!(prompt.contains("- Transportation: $75.00 (75.0%)"));
    }
}
