//! Basic keyword classifier: the last-resort categorization when neither
//! rules nor a language model are available.

use crate::taxonomy::{Category, DEFAULT_SUBCATEGORY};

/// Basic classification result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicCategory {
    pub category: Category,
    pub subcategory: &'static str,
}

/// Ordered keyword table. Earlier entries win on ambiguous descriptions.
const KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Groceries,
        &[
            "grocery", "supermarket", "whole foods", "trader joe", "safeway", "kroger", "walmart",
            "target", "costco", "market", "food lion", "publix",
        ],
    ),
    (
        Category::Dining,
        &[
            "restaurant", "cafe", "coffee", "starbucks", "chipotle", "mcdonalds", "pizza",
            "burger", "food", "doordash", "uber eats", "grubhub", "panera", "subway",
        ],
    ),
    (
        Category::Transportation,
        &[
            "uber", "lyft", "gas", "fuel", "parking", "transit", "metro", "bus", "train",
            "airline", "flight", "shell", "chevron", "exxon",
        ],
    ),
    (
        Category::Shopping,
        &[
            "amazon", "store", "shop", "retail", "clothing", "apparel", "best buy", "apple store",
            "ebay", "etsy",
        ],
    ),
    (
        Category::Entertainment,
        &[
            "netflix", "spotify", "hulu", "disney", "movie", "theater", "concert", "game", "gym",
            "fitness", "hbo", "playstation", "xbox",
        ],
    ),
    (
        Category::Utilities,
        &[
            "electric", "water", "gas bill", "internet", "phone", "utility", "verizon", "at&t",
            "comcast", "t-mobile", "sprint",
        ],
    ),
    (
        Category::Healthcare,
        &[
            "pharmacy", "doctor", "hospital", "medical", "health", "dental", "cvs", "walgreens",
            "rite aid",
        ],
    ),
    (
        Category::Travel,
        &["hotel", "airbnb", "booking", "expedia", "resort", "vacation", "marriott", "hilton"],
    ),
    (
        Category::Income,
        &["payroll", "salary", "deposit", "payment received", "venmo transfer", "paycheck"],
    ),
    (Category::Transfer, &["transfer", "withdrawal", "atm", "zelle"]),
];

/// Classify a description by keyword. Total: never fails.
pub fn classify(description: &str) -> BasicCategory {
    let desc = description.to_lowercase();

    for (category, keywords) in KEYWORDS {
        if keywords.iter().any(|k| desc.contains(k)) {
            return BasicCategory {
                category: *category,
                subcategory: DEFAULT_SUBCATEGORY,
            };
        }
    }

    BasicCategory {
        category: Category::Other,
        subcategory: "Miscellaneous",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_starbucks_is_dining() {
        let result = classify("STARBUCKS #4521 SEATTLE");
        assert_eq!(result.category, Category::Dining);
        assert_eq!(result.subcategory, "Other");
    }

    #[test]
    fn test_table_order_breaks_ties() {
        // "market" (Groceries) is tested before "restaurant" (Dining)
        let result = classify("Market Street Restaurant");
        assert_eq!(result.category, Category::Groceries);
    }

    #[test]
    fn test_no_match_is_miscellaneous() {
        assert_eq!(
            classify("ZQX 0042"),
            BasicCategory {
                category: Category::Other,
                subcategory: "Miscellaneous",
            }
        );
        assert_eq!(classify("").category, Category::Other);
    }

    #[test]
    fn test_outputs_stay_in_taxonomy() {
        for desc in ["", "NETFLIX.COM", "Shell Oil 123", "Zelle to Sam", "???", "payroll acme"] {
            let r = classify(desc);
            assert!(Category::ALL.contains(&r.category));
            assert!(r.category.subcategory(r.subcategory).is_some(), "{desc}");
        }
    }

    #[test]
    fn test_categorize_income() {
        assert_eq!(classify("ACME PAYROLL DIRECT DEP").category, Category::Income);
    }
}
