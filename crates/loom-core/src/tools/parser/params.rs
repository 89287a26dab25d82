//! Parameter extraction from the inner text of a tool tag
//!
//! Inner content is either a JSON object or a sequence of
//! `<param>value</param>` pairs. JSON goes through a staged cleanup before
//! it is rejected, since models routinely emit almost-JSON.

use std::borrow::Cow;

use serde_json::{Map, Value};
use tracing::debug;

use crate::grammar::{self, BARE_KEY, TRAILING_COMMA, WHITESPACE_RUN};
use crate::tools::errors::ToolParseError;
use crate::tools::types::{ParamType, ToolDefinition};

/// Parse the inner text of a tool tag into a parameter object
pub(super) fn parse_parameters(
    tool: &ToolDefinition,
    inner: &str,
) -> Result<Map<String, Value>, ToolParseError> {
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        return Ok(Map::new());
    }

    if looks_like_json(trimmed) {
        return match parse_json_lenient(trimmed) {
            Some(Value::Object(map)) => Ok(map),
            Some(other) => Err(ToolParseError::SchemaValidation {
                tool: tool.name.clone(),
                message: format!("parameters must be a JSON object, got {}", json_kind(&other)),
                example: tool.usage_example(),
            }),
            None => Err(ToolParseError::MalformedXml {
                message: format!("could not parse JSON parameters for '{}'", tool.name),
                example: Some(tool.usage_example()),
            }),
        };
    }

    let pairs = grammar::tag_pairs(trimmed);
    if pairs.is_empty() {
        return Err(ToolParseError::MalformedXml {
            message: format!(
                "parameters for '{}' must be a JSON object or <param>value</param> pairs",
                tool.name
            ),
            example: Some(tool.usage_example()),
        });
    }

    let mut params = Map::new();
    for pair in pairs {
        let value = parse_xml_value(pair.inner.trim(), tool.param_type(pair.name));
        params.insert(pair.name.to_string(), value);
    }
    Ok(params)
}

fn looks_like_json(text: &str) -> bool {
    text.starts_with('{') || text.starts_with('[')
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Value of a `<param>` tag
///
/// JSON-looking values are parsed opportunistically; plain text is coerced
/// to the declared primitive type when it parses cleanly.
fn parse_xml_value(raw: &str, declared: Option<ParamType>) -> Value {
    if looks_like_json(raw) {
        if let Ok(value) = serde_json::from_str::<Value>(raw) {
            return value;
        }
    }

    match declared {
        Some(ParamType::Integer) => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        Some(ParamType::Number) => match raw.parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(raw.to_string())),
        },
        Some(ParamType::Boolean) => match raw.to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
        _ => Value::String(raw.to_string()),
    }
}

/// Parse JSON, applying progressively more invasive cleanups on failure
fn parse_json_lenient(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }

    let mut candidate = normalize_quotes(text).into_owned();
    let stages: [fn(&str) -> String; 3] = [
        |s| BARE_KEY.replace_all(s, "$1\"$2\":").into_owned(),
        |s| TRAILING_COMMA.replace_all(s, "$1").into_owned(),
        |s| WHITESPACE_RUN.replace_all(s, " ").into_owned(),
    ];

    if let Ok(value) = serde_json::from_str(&candidate) {
        debug!("JSON parameters recovered after quote normalization");
        return Some(value);
    }
    for stage in stages {
        candidate = stage(&candidate);
        if let Ok(value) = serde_json::from_str(&candidate) {
            debug!("JSON parameters recovered after cleanup");
            return Some(value);
        }
    }

    let span = largest_balanced_object(&candidate)?;
    serde_json::from_str(span).ok()
}

/// Replace typographic quotes; single quotes become double quotes only
/// when the text has no double quotes at all
fn normalize_quotes(text: &str) -> Cow<'_, str> {
    let has_smart = text.contains(['\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}']);
    let single_only = !text.contains('"') && text.contains('\'');
    if !has_smart && !single_only {
        return Cow::Borrowed(text);
    }

    let mut out: String = text
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect();
    if !out.contains('"') {
        out = out.replace('\'', "\"");
    }
    Cow::Owned(out)
}

/// Longest `{...}` span with balanced braces, ignoring braces in strings
fn largest_balanced_object(text: &str) -> Option<&str> {
    let mut best: Option<(usize, usize)> = None;
    let mut stack: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push(idx),
            '}' => {
                if let Some(start) = stack.pop() {
                    let end = idx + 1;
                    let longer = best.map_or(true, |(s, e)| end - start > e - s);
                    if longer {
                        best = Some((start, end));
                    }
                }
            }
            _ => {}
        }
    }

    best.map(|(start, end)| &text[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lenient_json_stages() {
        assert_eq!(parse_json_lenient(r#"{"a": 1}"#), Some(json!({"a": 1})));
        assert_eq!(parse_json_lenient("{'a': 'x'}"), Some(json!({"a": "x"})));
        assert_eq!(
            parse_json_lenient("{\u{201C}a\u{201D}: \u{201C}x\u{201D}}"),
            Some(json!({"a": "x"}))
        );
        assert_eq!(parse_json_lenient("{a: 1, b: true}"), Some(json!({"a": 1, "b": true})));
        assert_eq!(parse_json_lenient(r#"{"a": [1, 2,],}"#), Some(json!({"a": [1, 2]})));
        assert_eq!(
            parse_json_lenient("{\"text\": \"line one\nline two\"}"),
            Some(json!({"text": "line one line two"}))
        );
    }

    #[test]
    fn test_largest_balanced_object() {
        assert_eq!(
            parse_json_lenient(r#"{ here you go: {"a": {"b": 1}} trailing"#),
            Some(json!({"a": {"b": 1}}))
        );
        assert_eq!(largest_balanced_object(r#"{"k": "}"}"#), Some(r#"{"k": "}"}"#));
        assert_eq!(parse_json_lenient("{not json at all"), None);
    }

    #[test]
    fn test_xml_value_coercion() {
        assert_eq!(parse_xml_value("42", Some(ParamType::Number)), json!(42));
        assert_eq!(parse_xml_value("1.5", Some(ParamType::Number)), json!(1.5));
        assert_eq!(parse_xml_value("TRUE", Some(ParamType::Boolean)), json!(true));
        assert_eq!(parse_xml_value("42", Some(ParamType::String)), json!("42"));
        assert_eq!(parse_xml_value("[1, 2]", None), json!([1, 2]));
        assert_eq!(parse_xml_value("[not json", None), json!("[not json"));
    }
}
