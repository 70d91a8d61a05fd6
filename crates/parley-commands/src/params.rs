// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Positional parameter parsing and validation.

use parley_core::JsonMap;
use regex::Regex;
use serde_json::Value;

use crate::definition::{ParameterKind, ParameterSpec};

const TRUTHY: &[&str] = &["true", "1", "yes", "on"];

/// Maps `args[i]` onto `specs[i]`, converting by declared kind.
///
/// Unsupplied optional parameters take their default when one is declared.
/// Arguments beyond the declared parameters are ignored here; handlers still
/// see them through the raw argument list.
pub fn parse_parameters(specs: &[ParameterSpec], args: &[String]) -> JsonMap {
    let mut params = JsonMap::new();
    for (i, spec) in specs.iter().enumerate() {
        match args.get(i) {
            Some(raw) => {
                params.insert(spec.name.clone(), convert(spec.kind, raw));
            }
            None if !spec.required => {
                if let Some(default) = &spec.default {
                    params.insert(spec.name.clone(), default.clone());
                }
            }
            None => {}
        }
    }
    params
}

fn convert(kind: ParameterKind, raw: &str) -> Value {
    match kind {
        ParameterKind::String => Value::String(raw.to_string()),
        ParameterKind::Number => parse_number(raw),
        ParameterKind::Boolean => {
            Value::Bool(TRUTHY.iter().any(|t| t.eq_ignore_ascii_case(raw)))
        }
    }
}

/// Integer first, then float; anything else stays a string.
fn parse_number(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    raw.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

/// Checks required presence and declared patterns. Returns every violation.
///
/// `patterns` is aligned with `specs`; a `None` slot means no pattern.
pub fn validate_parameters(
    specs: &[ParameterSpec],
    patterns: &[Option<Regex>],
    params: &JsonMap,
) -> Vec<String> {
    let mut violations = Vec::new();
    for (i, spec) in specs.iter().enumerate() {
        let Some(value) = params.get(&spec.name) else {
            if spec.required {
                violations.push(format!("missing required parameter `{}`", spec.name));
            }
            continue;
        };
        if let Some(Some(pattern)) = patterns.get(i) {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if !pattern.is_match(&text) {
                violations.push(format!(
                    "parameter `{}` value `{text}` does not match `{}`",
                    spec.name,
                    pattern.as_str()
                ));
            }
        }
    }
    violations
}
