//! Turns free-form model output into a complete [`AnalysisResult`].
//!
//! Three stages, each with its own failure: locate the structured span, parse it,
//! then fill whatever the model left out with fixed defaults. The last stage
//! never fails.

use crate::types::{AnalysisResult, DEFAULT_CONFIDENCE};
use designscope_common::{AnalysisError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Greedy `{...}` span: first opening brace to last closing brace, so commentary
/// before and after the object is ignored.
pub fn locate_json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

pub fn parse_span(span: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(AnalysisError::MalformedResponse(format!(
            "expected an object, got {}",
            type_name(&other)
        ))),
        Err(e) => Err(AnalysisError::MalformedResponse(e.to_string())),
    }
}

/// Builds a full result from a parsed object. Returns the names of the top-level
/// fields that were missing or unusable and got their default.
pub fn complete_result(map: &Map<String, Value>) -> (AnalysisResult, Vec<&'static str>) {
    let mut defaulted = Vec::new();
    let defaults = AnalysisResult::default();

    let result = AnalysisResult {
        feasibility: section(map, "feasibility", &mut defaulted).unwrap_or(defaults.feasibility),
        effort: section(map, "effort", &mut defaulted).unwrap_or(defaults.effort),
        coordination: section(map, "coordination", &mut defaulted).unwrap_or(defaults.coordination),
        recommendations: list(map, "recommendations", &mut defaulted).unwrap_or(defaults.recommendations),
        risks: list(map, "risks", &mut defaulted).unwrap_or(defaults.risks),
        confidence: confidence(map, &mut defaulted),
    };
    (result, defaulted)
}

/// Full pipeline over raw response text.
pub fn validate_response(text: &str) -> Result<AnalysisResult> {
    let span = locate_json_span(text).ok_or(AnalysisError::NoStructuredContent)?;
    let map = parse_span(span)?;
    let (result, defaulted) = complete_result(&map);

    if defaulted.is_empty() {
        debug!("Model response complete, no defaults needed");
    } else {
        warn!("Model response missing {:?}; filled with defaults", defaulted);
    }
    Ok(result)
}

fn section<T: DeserializeOwned + Serialize + Default>(
    map: &Map<String, Value>,
    key: &'static str,
    defaulted: &mut Vec<&'static str>,
) -> Option<T> {
    let parsed = map.get(key).and_then(lenient::<T>);
    if parsed.is_none() {
        defaulted.push(key);
    }
    parsed
}

fn list<T: DeserializeOwned + Serialize + Default>(
    map: &Map<String, Value>,
    key: &'static str,
    defaulted: &mut Vec<&'static str>,
) -> Option<Vec<T>> {
    let parsed = map
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(lenient::<T>).collect());
    if parsed.is_none() {
        defaulted.push(key);
    }
    parsed
}

/// Deserializes an object one key at a time on top of `T::default()`, so a null
/// or mistyped sub-field keeps its default without discarding its siblings.
/// Non-objects must deserialize as a whole.
fn lenient<T: DeserializeOwned + Serialize + Default>(value: &Value) -> Option<T> {
    let Value::Object(given) = value else {
        return serde_json::from_value(value.clone()).ok();
    };
    let Ok(Value::Object(mut merged)) = serde_json::to_value(T::default()) else {
        return serde_json::from_value(value.clone()).ok();
    };

    for (key, v) in given {
        let previous = merged.insert(key.clone(), v.clone());
        if serde_json::from_value::<T>(Value::Object(merged.clone())).is_err() {
            debug!("Dropping unusable sub-field {:?}", key);
            match previous {
                Some(p) => merged.insert(key.clone(), p),
                None => merged.remove(key),
            };
        }
    }
    serde_json::from_value(Value::Object(merged)).ok()
}

fn confidence(map: &Map<String, Value>, defaulted: &mut Vec<&'static str>) -> f64 {
    match map.get("confidence").and_then(Value::as_f64) {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => {
            defaulted.push("confidence");
            DEFAULT_CONFIDENCE
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
