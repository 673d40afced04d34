//! Request-to-rule matching.
//!
//! The matcher walks a session's rules in stored order and consumes the first
//! eligible rule whose predicate is satisfied. Callers must hold the session's
//! lock for the whole call so that match and decrement are one atomic step.

use super::extract::extract_input;
use super::types::{EngineError, PatternMatch, Predicate, ResponsePayload, Rule, StructuralMatch};
use serde_json::Value;

/// The request fields the matcher looks at
#[derive(Debug, Clone, Default)]
pub struct MatchRequest {
    pub method: String,
    pub path: String,
    /// Parsed request body, `None` for empty or non-JSON bodies
    pub body: Option<Value>,
}

impl MatchRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            body,
        }
    }
}

/// Find, consume and return the first matching rule's response.
pub fn match_rules(
    rules: &mut [Rule],
    request: &MatchRequest,
) -> Result<ResponsePayload, EngineError> {
    let input = extract_input(request.body.as_ref());

    let matched = rules
        .iter_mut()
        .filter(|rule| rule.is_eligible())
        .find(|rule| predicate_matches(&rule.predicate, request, &input));

    match matched {
        Some(rule) => {
            rule.consume();
            Ok(rule.response.clone())
        }
        None => Err(EngineError::NoMatchingRule { input }),
    }
}

/// Check a single predicate against a request and its extracted input
pub fn predicate_matches(predicate: &Predicate, request: &MatchRequest, input: &str) -> bool {
    match predicate {
        Predicate::Structural(s) => structural_matches(s, request),
        Predicate::Pattern(p) => pattern_matches(p, input),
    }
}

fn structural_matches(predicate: &StructuralMatch, request: &MatchRequest) -> bool {
    if let Some(method) = &predicate.method {
        if method != &request.method {
            return false;
        }
    }

    if let Some(path) = &predicate.path {
        if path != &request.path {
            return false;
        }
    }

    match predicate.json.as_ref().and_then(Value::as_object) {
        None => true,
        Some(subset) if subset.is_empty() => true,
        Some(_) => match (&predicate.json, &request.body) {
            (Some(subset), Some(body)) => json_contains(body, subset),
            _ => false,
        },
    }
}

/// Pattern matching: precompiled case-insensitive regex, or exact equality when
/// the source is not a valid expression. An empty input never matches.
pub fn pattern_matches(predicate: &PatternMatch, input: &str) -> bool {
    if predicate.source.is_empty() || input.is_empty() {
        return false;
    }
    match &predicate.regex {
        Some(regex) => regex.is_match(input),
        None => predicate.source == input,
    }
}

/// Deep containment: every key of `subset` must exist in `target`; nested objects
/// are contained recursively, everything else (arrays included) must be equal.
pub fn json_contains(target: &Value, subset: &Value) -> bool {
    match (target, subset) {
        (Value::Object(target), Value::Object(subset)) => {
            subset.iter().all(|(key, expected)| {
                target.get(key).is_some_and(|actual| match expected {
                    Value::Object(_) => json_contains(actual, expected),
                    _ => json_equals(actual, expected),
                })
            })
        }
        _ => json_equals(target, subset),
    }
}

/// Deep equality where numbers compare by value, so `1` equals `1.0`
pub fn json_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| json_equals(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, value)| y.get(key).is_some_and(|other| json_equals(value, other)))
        }
        _ => a == b,
    }
}
