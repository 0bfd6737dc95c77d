//! The fixed two-level spending taxonomy.
//!
//! Every transaction category is one of [`Category::ALL`]; every subcategory
//! that gets stored belongs to that category's list in [`Category::subcategories`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Label written for transactions that have no category yet.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Subcategory used whenever a proposed one is missing or not in the list.
pub const DEFAULT_SUBCATEGORY: &str = "Other";

/// Spending categories
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Groceries,
    Dining,
    Transportation,
    Shopping,
    Entertainment,
    Utilities,
    Healthcare,
    Travel,
    Income,
    Transfer,
    Other,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Groceries,
        Category::Dining,
        Category::Transportation,
        Category::Shopping,
        Category::Entertainment,
        Category::Utilities,
        Category::Healthcare,
        Category::Travel,
        Category::Income,
        Category::Transfer,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Groceries => "Groceries",
            Category::Dining => "Dining",
            Category::Transportation => "Transportation",
            Category::Shopping => "Shopping",
            Category::Entertainment => "Entertainment",
            Category::Utilities => "Utilities",
            Category::Healthcare => "Healthcare",
            Category::Travel => "Travel",
            Category::Income => "Income",
            Category::Transfer => "Transfer",
            Category::Other => "Other",
        }
    }

    /// Exact name lookup. Surrounding whitespace is ignored, case is not.
    pub fn from_name(name: &str) -> Option<Category> {
        let name = name.trim();
        Category::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Allowed subcategories, in display order.
    pub fn subcategories(&self) -> &'static [&'static str] {
        match self {
            Category::Groceries => &[
                "Supermarket",
                "Warehouse Club",
                "Specialty Foods",
                "Convenience Store",
                "Other",
            ],
            Category::Dining => &[
                "Restaurants",
                "Fast Food",
                "Coffee Shops",
                "Food Delivery",
                "Bars",
                "Other",
            ],
            Category::Transportation => &[
                "Fuel",
                "Rideshare",
                "Public Transit",
                "Parking",
                "Tolls",
                "Auto Maintenance",
                "Other",
            ],
            Category::Shopping => &[
                "Online Retail",
                "Clothing",
                "Electronics",
                "Home Goods",
                "Department Stores",
                "Other",
            ],
            Category::Entertainment => &[
                "Streaming",
                "Music",
                "Movies & Events",
                "Gaming",
                "Fitness",
                "Hobbies",
                "Other",
            ],
            Category::Utilities => &["Electricity", "Water", "Gas", "Internet", "Phone", "Other"],
            Category::Healthcare => &[
                "Pharmacy",
                "Doctor",
                "Dental",
                "Vision",
                "Insurance",
                "Other",
            ],
            Category::Travel => &["Lodging", "Airfare", "Car Rental", "Vacation Rentals", "Other"],
            Category::Income => &["Salary", "Freelance", "Refund", "Interest", "Other"],
            Category::Transfer => &[
                "Bank Transfer",
                "Credit Card Payment",
                "ATM Withdrawal",
                "Peer to Peer",
                "Savings",
                "Other",
            ],
            Category::Other => &["Miscellaneous", "Fees", "Charity", "Gifts", "Other"],
        }
    }

    /// Canonical spelling of `name` if it belongs to this category.
    pub fn subcategory(&self, name: &str) -> Option<&'static str> {
        let name = name.trim();
        self.subcategories()
            .iter()
            .copied()
            .find(|s| s.eq_ignore_ascii_case(name))
    }

    /// Map a proposed subcategory onto this category's list, defaulting to `Other`.
    pub fn normalize_subcategory(&self, proposed: Option<&str>) -> &'static str {
        proposed
            .and_then(|s| self.subcategory(s))
            .unwrap_or(DEFAULT_SUBCATEGORY)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category label for an optional category (`Uncategorized` when absent).
pub fn category_label(category: Option<Category>) -> &'static str {
    category.map(|c| c.as_str()).unwrap_or(UNCATEGORIZED)
}

/// Serde adapter for `Option<Category>` fields.
///
/// Absent, empty, `Uncategorized` and out-of-enumeration labels all load as `None`.
pub mod optional_category {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<Category>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(category_label(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Category>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.as_deref().and_then(Category::from_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_allows_other() {
        for c in Category::ALL {
            assert!(c.subcategories().contains(&DEFAULT_SUBCATEGORY), "{c} lacks Other");
        }
    }

    #[test]
    fn test_from_name_is_exact() {
        assert_eq!(Category::from_name("Dining"), Some(Category::Dining));
        assert_eq!(Category::from_name(" Travel "), Some(Category::Travel));
        assert_eq!(Category::from_name("dining"), None);
        assert_eq!(Category::from_name("Uncategorized"), None);
    }

    #[test]
    fn test_normalize_subcategory() {
        assert_eq!(Category::Dining.normalize_subcategory(Some("coffee shops")), "Coffee Shops");
        assert_eq!(Category::Dining.normalize_subcategory(Some("Streaming")), "Other");
        assert_eq!(Category::Other.normalize_subcategory(None), "Other");
        assert_eq!(Category::Other.normalize_subcategory(Some("Miscellaneous")), "Miscellaneous");
    }
}
