// 🧹 Category Line Parsing - one normalization path for both category shapes
//
// API responses carry categories either as numbered-line text
// ("1. Foo\n2. Bar") or as arrays of {content, sources}. Everything that
// displays, counts, or exports a category goes through this module.

use crate::record::{CategoryField, CategoryItem};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

static NUMBERING_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\s*").expect("numbering prefix pattern is valid"));

// ============================================================================
// DISPLAY LINE
// ============================================================================

/// One display line of a category, with its source link when known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryLine<'a> {
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<&'a str>,
}

// ============================================================================
// PARSING
// ============================================================================

/// Strip a leading "12. " numbering prefix and surrounding whitespace
pub fn strip_numbering(line: &str) -> &str {
    let trimmed = line.trim();
    match NUMBERING_PREFIX.find(trimmed) {
        Some(m) => trimmed[m.end()..].trim(),
        None => trimmed,
    }
}

/// Split numbered-line text into clean lines.
///
/// Blank lines, and lines that are only a numbering prefix ("2. "), are
/// dropped.
pub fn parse_numbered_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(strip_numbering)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalize a raw JSON category value into the canonical field.
///
/// Strings become `Lines`, arrays become `Items`. Any other shape is
/// unsupported and yields an empty field.
pub fn normalize_value(value: &Value) -> CategoryField {
    match value {
        Value::Null => CategoryField::default(),
        Value::String(text) => CategoryField::from_text(text),
        Value::Array(elements) => {
            CategoryField::from_items(elements.iter().filter_map(item_from_value).collect())
        }
        other => {
            debug!(shape = %shape_name(other), "skipping unsupported category shape");
            CategoryField::default()
        }
    }
}

fn item_from_value(value: &Value) -> Option<CategoryItem> {
    match value {
        Value::String(text) => Some(CategoryItem::new(strip_numbering(text), "")),
        Value::Object(map) => {
            let content = map.get("content").and_then(Value::as_str)?;
            let source = map
                .get("sources")
                .or_else(|| map.get("source"))
                .map(source_text)
                .unwrap_or_default();
            Some(CategoryItem::new(content.trim(), source))
        }
        other => {
            debug!(shape = %shape_name(other), "skipping unsupported category item");
            None
        }
    }
}

// "sources" is a string on most endpoints, a list of URLs on a few
fn source_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(urls) => urls
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    }
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Display lines of a field, in order, never blank
pub fn display_lines(field: &CategoryField) -> Vec<CategoryLine<'_>> {
    match field {
        CategoryField::Lines(lines) => lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(|text| CategoryLine { text, source: None })
            .collect(),
        CategoryField::Items(items) => items
            .iter()
            .filter(|item| !item.content.trim().is_empty())
            .map(|item| CategoryLine {
                text: item.content.trim(),
                source: Some(item.source.as_str()).filter(|s| !s.is_empty()),
            })
            .collect(),
    }
}

/// Number of display lines in a field
pub fn category_line_count(field: &CategoryField) -> usize {
    display_lines(field).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_numbered_lines_strips_prefix_and_blanks() {
        let lines = parse_numbered_lines("1. Card issuance\n2. \n3. API launch");
        assert_eq!(lines, vec!["Card issuance", "API launch"]);
    }

    #[test]
    fn test_parse_handles_whitespace_and_unnumbered_lines() {
        let lines = parse_numbered_lines("\n   \n10.   UPI Lite rollout  \nPlain line\r\n\t\n");
        assert_eq!(lines, vec!["UPI Lite rollout", "Plain line"]);
    }

    #[test]
    fn test_strip_numbering_requires_dot() {
        assert_eq!(strip_numbering("2024 roadmap"), "2024 roadmap");
        assert_eq!(strip_numbering("3.Launch"), "Launch");
        assert_eq!(strip_numbering("v1. beta"), "v1. beta");
    }

    #[test]
    fn test_strip_numbering_removes_only_leading_prefix() {
        assert_eq!(strip_numbering("1. 2. nested"), "2. nested");
        assert_eq!(strip_numbering("  12.\tTokenised deposits"), "Tokenised deposits");
    }

    #[test]
    fn test_normalize_string_value() {
        let field = normalize_value(&json!("1. Alpha\n2. Beta"));
        assert_eq!(field, CategoryField::Lines(vec!["Alpha".into(), "Beta".into()]));
        assert_eq!(category_line_count(&field), 2);
    }

    #[test]
    fn test_normalize_item_array_preserves_order_and_sources() {
        let field = normalize_value(&json!([
            {"content": "Launched BNPL", "sources": "https://a.example"},
            {"content": "   ", "sources": "https://blank.example"},
            {"content": "New KYC flow", "sources": ["https://b.example", "https://c.example"]},
        ]));

        let lines = field.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Launched BNPL");
        assert_eq!(lines[0].source, Some("https://a.example"));
        assert_eq!(lines[1].text, "New KYC flow");
        assert_eq!(lines[1].source, Some("https://b.example, https://c.example"));
    }

    #[test]
    fn test_empty_shapes_yield_no_lines() {
        for value in [json!(""), json!("  \n \n"), json!([]), json!(null)] {
            assert!(normalize_value(&value).is_empty(), "{:?}", value);
        }
    }

    #[test]
    fn test_unsupported_shapes_are_skipped() {
        assert!(normalize_value(&json!(42)).is_empty());
        assert!(normalize_value(&json!({"content": "x"})).is_empty());

        let field = normalize_value(&json!([7, {"content": "Kept"}, {"no_content": true}]));
        assert_eq!(category_line_count(&field), 1);
    }

    #[test]
    fn test_lines_variant_filters_blank_entries() {
        let field = CategoryField::Lines(vec!["A".into(), "  ".into(), "".into()]);
        assert_eq!(category_line_count(&field), 1);
    }
}
