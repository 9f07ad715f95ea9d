// this_file: src/row.rs

//! Row data and occurrence-suffixed field lookup.
//!
//! A row is one record of the content form: field name to scalar or null.
//! When one series repeats a slide type, its columns repeat with pandas-style
//! suffixes (`point`, `point.1`, `point.2`); the [`FieldContext`] of a slide
//! carries the suffix of its occurrence.

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Column suffix for the `occurrence`-th repetition of a field.
pub fn occurrence_suffix(occurrence: usize) -> String {
    if occurrence == 0 {
        String::new()
    } else {
        format!(".{}", occurrence)
    }
}

/// One record of named values.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value (builder style).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Resolved value of `key`; null, missing and blank values are absent.
    pub fn get(&self, key: &str) -> Option<String> {
        let text = match self.0.get(key)? {
            Value::Null => return None,
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                warn!("Field '{}' holds a non-scalar value {}; treating as absent", key, other);
                return None;
            }
        };
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// A row viewed through one occurrence suffix.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    row: &'a Row,
    occurrence: usize,
}

impl<'a> FieldContext<'a> {
    pub fn new(row: &'a Row, occurrence: usize) -> Self {
        Self { row, occurrence }
    }

    /// Column name of `field` for this occurrence.
    pub fn key(&self, field: &str) -> String {
        format!("{}{}", field, occurrence_suffix(self.occurrence))
    }

    pub fn get(&self, field: &str) -> Option<String> {
        self.row.get(&self.key(field))
    }

    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn suffixes_follow_occurrence() {
        assert_eq!(occurrence_suffix(0), "");
        assert_eq!(occurrence_suffix(1), ".1");
        assert_eq!(occurrence_suffix(12), ".12");
    }

    #[test]
    fn null_missing_and_blank_are_absent() {
        let row: Row = serde_json::from_value(json!({
            "a": "Hello", "b": null, "c": "   ", "n": 3, "f": 2.5, "list": [1, 2]
        }))
        .unwrap();
        assert_eq!(row.get("a").as_deref(), Some("Hello"));
        assert_eq!(row.get("b"), None);
        assert_eq!(row.get("c"), None);
        assert_eq!(row.get("zzz"), None);
        assert_eq!(row.get("n").as_deref(), Some("3"));
        assert_eq!(row.get("f").as_deref(), Some("2.5"));
        assert_eq!(row.get("list"), None);
    }

    #[test]
    fn field_context_addresses_repeated_columns() {
        let row = Row::new()
            .with("point", "first")
            .with("point.1", "second")
            .with("point.2", Value::Null);

        assert_eq!(FieldContext::new(&row, 0).get("point").as_deref(), Some("first"));
        assert_eq!(FieldContext::new(&row, 1).get("point").as_deref(), Some("second"));
        assert!(!FieldContext::new(&row, 2).has("point"));
        assert_eq!(FieldContext::new(&row, 2).key("point"), "point.2");
    }
}
