//! JSON extraction utilities
//!
//! Language models rarely return bare JSON even when asked to. This module
//! pulls the first usable JSON value out of free text, trying in order:
//!
//! 1. a fenced code block (```json ... ```)
//! 2. an inline array `[...]` or object `{...}`
//! 3. the raw text, if it already looks like JSON

use crate::types::*;
use regex::Regex;
use lazy_static::lazy_static;

lazy_static! {
    static ref CODE_BLOCK_REGEX: Regex = Regex::new(r"```(?:json)?\s*\n?([\s\S]*?)\n?```").unwrap();
    static ref JSON_ARRAY_REGEX: Regex = Regex::new(r"\[[\s\S]*\]").unwrap();
    static ref JSON_OBJECT_REGEX: Regex = Regex::new(r"\{[\s\S]*\}").unwrap();
}

/// Extract a JSON fragment from model output
pub fn extract_json(text: &str) -> DashboardResult<String> {
    find_json(text)
        .ok_or_else(|| DashboardError::simple_parse_error("No JSON content found in response"))
}

/// The first JSON fragment in `text`, if any. Never logs.
pub fn find_json(text: &str) -> Option<String> {
    from_code_block(text)
        .or_else(|| inline(text))
        .or_else(|| raw_text(text))
}

/// Extract and parse a JSON array of strings.
///
/// Accepts either a bare array or an object holding one array field
/// (e.g. `{"categories": [...]}`).
pub fn extract_string_array(text: &str) -> DashboardResult<Vec<String>> {
    let json = extract_json(text)?;
    let value: serde_json::Value = serde_json::from_str(&json).map_err(|e| {
        DashboardError::parse_error(
            format!("invalid JSON: {}", e),
            Some(json.clone()),
            Some(e),
            Some(concat!(file!(), ":", line!())),
        )
    })?;
    string_items(value).ok_or_else(|| DashboardError::simple_parse_error("expected a JSON array of strings"))
}

/// Quiet variant of [`extract_string_array`] for callers that have a fallback
pub fn find_string_array(text: &str) -> Option<Vec<String>> {
    let json = find_json(text)?;
    serde_json::from_str::<serde_json::Value>(&json)
        .ok()
        .and_then(string_items)
}

fn string_items(value: serde_json::Value) -> Option<Vec<String>> {
    let array = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(map) => map.into_iter().find_map(|(_, v)| match v {
            serde_json::Value::Array(items) => Some(items),
            _ => None,
        })?,
        _ => return None,
    };

    Some(
        array
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
    )
}

fn from_code_block(text: &str) -> Option<String> {
    CODE_BLOCK_REGEX
        .captures(text)
        .map(|captures| captures[1].trim().to_string())
        .filter(|inner| !inner.is_empty())
}

// Arrays first: that is what the risk prompt asks for
fn inline(text: &str) -> Option<String> {
    JSON_ARRAY_REGEX
        .find(text)
        .or_else(|| JSON_OBJECT_REGEX.find(text))
        .map(|m| m.as_str().to_string())
}

fn raw_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        Some(trimmed.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_from_code_block() {
        let text = "Here you go:\n```json\n[\"Gambling\", \"Violence\"]\n```";
        assert_eq!(extract_json(text).unwrap(), "[\"Gambling\", \"Violence\"]");
        assert_eq!(
            extract_string_array(text).unwrap(),
            vec!["Gambling".to_string(), "Violence".to_string()]
        );
    }

    #[test]
    fn extracts_inline_array_and_wrapped_object() {
        assert_eq!(
            extract_string_array("Categories: [\"Scam/Phishing\"] found.").unwrap(),
            vec!["Scam/Phishing".to_string()]
        );
        assert_eq!(
            extract_string_array("{\"categories\": [\"Self-harm\"]}").unwrap(),
            vec!["Self-harm".to_string()]
        );
        assert!(extract_string_array("[]").unwrap().is_empty());
    }

    #[test]
    fn quiet_lookup_returns_none() {
        assert_eq!(find_json("No categories apply."), None);
        assert_eq!(find_string_array("None"), None);
        assert_eq!(find_string_array("{\"count\": 3}"), None);
        assert_eq!(find_string_array("[\"Gambling\"]"), Some(vec!["Gambling".to_string()]));
    }

    #[test]
    fn fails_without_json() {
        assert!(extract_json("No categories apply.").is_err());
        assert!(extract_string_array("[not json").is_err());
        assert!(extract_string_array("{\"count\": 3}").is_err());
    }
}
