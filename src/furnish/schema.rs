//! Strict validation of model output against the furnishing item schema.
//!
//! Validation never fails fast: every violated field is reported so the caller
//! (or the repair prompt) sees the whole picture at once.

use super::{Category, FurnishingItem, SearchTerms};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// One step in the path to an offending value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

/// A single field-level violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub path: Vec<PathSegment>,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: Vec<PathSegment>, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }

    pub fn root(message: impl Into<String>) -> Self {
        Self::new(Vec::new(), message)
    }

    /// Whether the last path segment is the named field
    pub fn is_field(&self, name: &str) -> bool {
        matches!(self.path.last(), Some(PathSegment::Key(k)) if k == name)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return write!(f, "(root): {}", self.message);
        }
        let path = self
            .path
            .iter()
            .map(|segment| match segment {
                PathSegment::Index(i) => i.to_string(),
                PathSegment::Key(k) => k.clone(),
            })
            .collect::<Vec<_>>()
            .join(".");
        write!(f, "{}: {}", path, self.message)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn child(path: &[PathSegment], segment: impl Into<PathSegment>) -> Vec<PathSegment> {
    let mut next = path.to_vec();
    next.push(segment.into());
    next
}

/// Validate a candidate furnishing list.
pub fn validate_items(value: &Value) -> Result<Vec<FurnishingItem>, Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    let Some(entries) = value.as_array() else {
        issues.push(ValidationIssue::root(format!(
            "expected an array of items, received {}",
            kind_of(value)
        )));
        return Err(issues);
    };

    if entries.is_empty() {
        issues.push(ValidationIssue::root("expected at least 1 item"));
    }

    let mut items = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        if let Some(item) = validate_item(entry, &[PathSegment::Index(index)], &mut issues) {
            items.push(item);
        }
    }

    if issues.is_empty() {
        Ok(items)
    } else {
        Err(issues)
    }
}

fn validate_item(
    value: &Value,
    path: &[PathSegment],
    issues: &mut Vec<ValidationIssue>,
) -> Option<FurnishingItem> {
    let Some(obj) = value.as_object() else {
        issues.push(ValidationIssue::new(
            path.to_vec(),
            format!("expected an object, received {}", kind_of(value)),
        ));
        return None;
    };

    let category = validate_category(obj, path, issues);
    let title = required_text(obj, "title", path, issues);
    let spec = required_text(obj, "spec", path, issues);
    let tips = required_text(obj, "tips", path, issues);
    let search_terms = validate_search_terms(obj, path, issues);

    Some(FurnishingItem {
        category: category?,
        title: title?,
        spec: spec?,
        tips: tips?,
        search_terms: search_terms?,
    })
}

fn validate_category(
    obj: &Map<String, Value>,
    path: &[PathSegment],
    issues: &mut Vec<ValidationIssue>,
) -> Option<Category> {
    let field_path = child(path, "category");
    match obj.get("category") {
        None | Some(Value::Null) => {
            issues.push(ValidationIssue::new(field_path, "required"));
            None
        }
        Some(Value::String(tag)) => {
            let category = Category::parse(tag);
            if category.is_none() {
                let expected = Category::ALL
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(" | ");
                issues.push(ValidationIssue::new(
                    field_path,
                    format!("invalid category `{}`; expected one of {}", tag, expected),
                ));
            }
            category
        }
        Some(other) => {
            issues.push(ValidationIssue::new(
                field_path,
                format!("expected string, received {}", kind_of(other)),
            ));
            None
        }
    }
}

fn validate_search_terms(
    obj: &Map<String, Value>,
    path: &[PathSegment],
    issues: &mut Vec<ValidationIssue>,
) -> Option<SearchTerms> {
    let field_path = child(path, "search_terms");
    match obj.get("search_terms") {
        None | Some(Value::Null) => {
            issues.push(ValidationIssue::new(field_path, "required"));
            None
        }
        Some(Value::Object(terms)) => {
            let tmall = required_text(terms, "tmall", &field_path, issues);
            let jd = required_text(terms, "jd", &field_path, issues);
            let pdd = required_text(terms, "pdd", &field_path, issues);
            Some(SearchTerms {
                tmall: tmall?,
                jd: jd?,
                pdd: pdd?,
            })
        }
        Some(other) => {
            issues.push(ValidationIssue::new(
                field_path,
                format!("expected object, received {}", kind_of(other)),
            ));
            None
        }
    }
}

fn required_text(
    obj: &Map<String, Value>,
    field: &str,
    path: &[PathSegment],
    issues: &mut Vec<ValidationIssue>,
) -> Option<String> {
    let field_path = child(path, field);
    match obj.get(field) {
        None | Some(Value::Null) => {
            issues.push(ValidationIssue::new(field_path, "required"));
            None
        }
        Some(Value::String(s)) if s.is_empty() => {
            issues.push(ValidationIssue::new(field_path, "must not be empty"));
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            issues.push(ValidationIssue::new(
                field_path,
                format!("expected string, received {}", kind_of(other)),
            ));
            None
        }
    }
}
