//! Merchant-name extraction for `merchant` rules.
//!
//! Statement descriptions usually look like
//! `POS DEBIT STARBUCKS #4521 SEATTLE WA 00012345` or `SHELL OIL 5744 AT MAIN ST`.

use regex::Regex;
use std::sync::LazyLock;

static LEADING_TOKENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:POS|DEBIT|CREDIT|CARD|ATM)\s+)+").expect("valid leading-token regex")
});

/// `#1234` store/terminal numbers and masked card numbers like `XXXX1234` or `*1234`
static CARD_NUMBERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:#\d+|[X*]{2,}\d{2,}|\*\d{2,})").expect("valid card-number regex")
});

static REFERENCE_BLOCKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\d{4,}").expect("valid reference-block regex"));

static LOCATION_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:IN|AT|ON)\s+").expect("valid location regex"));

/// Best-effort merchant name from a raw description
pub fn extract_merchant_name(description: &str) -> String {
    let trimmed = description.trim();
    let merchant = LEADING_TOKENS.replace(trimmed, "");
    let merchant = CARD_NUMBERS.replace_all(&merchant, "");
    let merchant = REFERENCE_BLOCKS.replace_all(&merchant, "");
    let merchant = merchant.trim();

    LOCATION_SPLIT
        .split(merchant)
        .next()
        .unwrap_or(merchant)
        .trim()
        .to_string()
}
