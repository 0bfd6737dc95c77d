//! Pulling the JSON payload out of free-form model text

use serde::de::DeserializeOwned;

/// Characters of raw model text kept in error messages
pub const PREVIEW_CHARS: usize = 200;

/// The span from the first `[` to the last `]`, if both exist in that order.
/// Models often wrap the array in prose or a fenced code block.
pub fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

/// First [`PREVIEW_CHARS`] characters of `text`
pub fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Parse the embedded array as `Vec<T>`, describing the failure on error
pub fn parse_json_array<T: DeserializeOwned>(text: &str) -> Result<Vec<T>, String> {
    let raw = extract_json_array(text).ok_or_else(|| "no JSON array found".to_string())?;
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))?;
    if !value.is_array() {
        return Err("expected a JSON array".to_string());
    }
    serde_json::from_value(value).map_err(|e| format!("unexpected entry shape: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_array_from_prose() {
        let text = "Here are the results:\n```json\n[{\"index\": 1}]\n```\nLet me know!";
        assert_eq!(extract_json_array(text), Some("[{\"index\": 1}]"));
        assert_eq!(extract_json_array("no array here"), None);
        assert_eq!(extract_json_array("] backwards ["), None);
    }

    #[test]
    fn test_parse_reports_reason() {
        let ok: Vec<u32> = parse_json_array("nums: [1, 2, 3]").unwrap();
        assert_eq!(ok, vec![1, 2, 3]);
        assert!(parse_json_array::<u32>("[1, 2,").unwrap_err().contains("no JSON array"));
        assert!(parse_json_array::<u32>("[1, 2,]").unwrap_err().contains("invalid JSON"));
    }

    #[test]
    fn test_preview_is_char_bounded() {
        let long = "é".repeat(500);
        assert_eq!(preview(&long).chars().count(), PREVIEW_CHARS);
        assert_eq!(preview("short"), "short");
    }
}
