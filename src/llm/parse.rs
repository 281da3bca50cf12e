use crate::furnish::{validate_items, FurnishingItem, ValidationIssue};
use serde_json::Value;

/// Strip one leading code fence (optionally tagged `json`) and one trailing fence.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = match rest.get(..4) {
                Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
                _ => rest,
            };
            rest.trim_start()
        }
        None => trimmed,
    };
    let without_close = without_open.strip_suffix("```").unwrap_or(without_open);
    without_close.trim()
}

/// Extract a JSON fragment from the first `open` to the last `close`
fn extract_json_fragment(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

/// Locate the most likely JSON payload in free-form model output.
///
/// Arrays are preferred over objects; slicing is greedy (first opener to last
/// closer) so nested brackets inside the payload survive.
pub fn extract_json_candidate(text: &str) -> &str {
    let stripped = strip_code_fences(text);
    extract_json_fragment(stripped, '[', ']')
        .or_else(|| extract_json_fragment(stripped, '{', '}'))
        .unwrap_or(stripped)
}

/// Unwrap `{"items": [...]}`; anything else passes through unchanged.
pub fn normalize_items_value(value: Value) -> Value {
    match value {
        Value::Object(mut obj) if obj.get("items").is_some_and(Value::is_array) => {
            obj.remove("items").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Run candidate extraction, JSON parsing and schema validation on raw reply text.
///
/// Text that is not JSON at all becomes a root-level issue so the caller can
/// treat it like any other validation failure.
pub fn parse_furnishing_items(raw: &str) -> Result<Vec<FurnishingItem>, Vec<ValidationIssue>> {
    let candidate = extract_json_candidate(raw);
    let value = serde_json::from_str::<Value>(candidate).map_err(|e| {
        vec![ValidationIssue::root(format!(
            "reply did not contain valid JSON: {}",
            e
        ))]
    })?;
    validate_items(&normalize_items_value(value))
}
