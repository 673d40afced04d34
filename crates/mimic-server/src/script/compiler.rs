//! Script compilation: turns a posted script document into an ordered rule list.
//!
//! The `responses` shorthand is classified exactly once into [`Responses`] and
//! each variant has its own compile function. Advanced rules always come first
//! in the compiled batch so that explicitly authored rules win over shorthand.

use super::types::{
    EngineError, PatternMatch, Predicate, RawResponse, RawRule, ResponsePayload, Responses, Rule,
    ScriptDocument, ShorthandEntry, StructuralMatch, UNLIMITED,
};
use serde_json::Value;

/// Result of compiling a script document
#[derive(Debug, Clone)]
pub struct CompiledScript {
    pub reset: bool,
    pub rules: Vec<Rule>,
    pub models: Vec<String>,
}

/// Parse and compile a raw script document.
pub fn compile_document(raw: &Value) -> Result<CompiledScript, EngineError> {
    if !raw.is_object() {
        return Err(EngineError::ScriptFormat(
            "script must be a JSON object".to_string(),
        ));
    }
    let doc: ScriptDocument = serde_json::from_value(raw.clone())
        .map_err(|e| EngineError::ScriptFormat(e.to_string()))?;
    compile_script(&doc)
}

/// Compile an already-decoded script document.
pub fn compile_script(doc: &ScriptDocument) -> Result<CompiledScript, EngineError> {
    let mut rules = compile_advanced_rules(&doc.rules)?;

    if let Some(value) = &doc.responses {
        let responses = classify_responses(value)?;
        rules.extend(compile_responses(&responses));
    }

    Ok(CompiledScript {
        reset: doc.reset,
        rules,
        models: doc.models.clone(),
    })
}

/// Decide the shorthand shape once.
pub fn classify_responses(value: &Value) -> Result<Responses, EngineError> {
    match value {
        Value::String(s) => Ok(Responses::Single(s.clone())),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| parse_list_entry(idx, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Responses::Sequential),
        Value::Object(map) => map
            .iter()
            .map(|(pattern, item)| {
                parse_map_entry(pattern, item).map(|entry| (pattern.clone(), entry))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Responses::PatternMap),
        other => Err(EngineError::ScriptFormat(format!(
            "unsupported responses format: expected string, array or object, got {}",
            json_type_name(other)
        ))),
    }
}

/// Compile a classified shorthand into rules
pub fn compile_responses(responses: &Responses) -> Vec<Rule> {
    match responses {
        Responses::Single(text) => compile_single(text),
        Responses::Sequential(entries) => compile_sequential(entries),
        Responses::PatternMap(entries) => compile_pattern_map(entries),
    }
}

fn compile_single(text: &str) -> Vec<Rule> {
    vec![Rule::new(
        Predicate::anything(),
        ResponsePayload::text(text),
        1,
    )]
}

fn compile_sequential(entries: &[ShorthandEntry]) -> Vec<Rule> {
    entries
        .iter()
        .map(|entry| {
            Rule::new(
                shorthand_predicate(entry.pattern.as_deref()),
                entry_payload(entry),
                normalize_times(entry.times.unwrap_or(1)),
            )
        })
        .collect()
}

fn compile_pattern_map(entries: &[(String, ShorthandEntry)]) -> Vec<Rule> {
    entries
        .iter()
        .map(|(pattern, entry)| {
            Rule::new(
                shorthand_predicate(Some(pattern.as_str())),
                entry_payload(entry),
                entry.times.map(normalize_times).unwrap_or(UNLIMITED),
            )
        })
        .collect()
}

/// An absent or empty pattern matches anything
fn shorthand_predicate(pattern: Option<&str>) -> Predicate {
    match pattern.filter(|p| !p.is_empty()) {
        Some(pattern) => Predicate::Pattern(PatternMatch::compile(pattern)),
        None => Predicate::anything(),
    }
}

/// Compile explicit advanced rules, preserving authored order
pub fn compile_advanced_rules(raw: &[RawRule]) -> Result<Vec<Rule>, EngineError> {
    raw.iter()
        .enumerate()
        .map(|(idx, rule)| compile_advanced_rule(idx, rule))
        .collect()
}

fn compile_advanced_rule(idx: usize, raw: &RawRule) -> Result<Rule, EngineError> {
    let m = &raw.match_rule;
    let predicate = match m.pattern.as_deref().filter(|p| !p.is_empty()) {
        Some(pattern) => Predicate::Pattern(PatternMatch::compile(pattern)),
        None => {
            if let Some(json) = &m.json {
                if !json.is_object() {
                    return Err(EngineError::ScriptFormat(format!(
                        "rules[{idx}].match.json must be an object"
                    )));
                }
            }
            Predicate::Structural(StructuralMatch {
                method: m.method.clone().filter(|s| !s.is_empty()),
                path: m.path.clone().filter(|s| !s.is_empty()),
                json: m.json.clone(),
            })
        }
    };

    Ok(Rule::new(
        predicate,
        advanced_payload(&raw.response),
        normalize_times(raw.times),
    ))
}

fn advanced_payload(raw: &RawResponse) -> ResponsePayload {
    let status = raw.status.unwrap_or(200);
    if !raw.sse.is_empty() {
        ResponsePayload::Events {
            events: raw.sse.clone(),
            status,
        }
    } else if let Some(body) = &raw.json {
        ResponsePayload::Json {
            body: body.clone(),
            status,
        }
    } else {
        ResponsePayload::Text {
            content: raw.content.clone().unwrap_or_default(),
            status,
        }
    }
}

fn entry_payload(entry: &ShorthandEntry) -> ResponsePayload {
    ResponsePayload::Text {
        content: entry.text.clone(),
        status: entry.status,
    }
}

/// Any negative count is unlimited; zero means a single use
fn normalize_times(times: i64) -> i64 {
    match times {
        t if t < 0 => UNLIMITED,
        0 => 1,
        t => t,
    }
}

fn parse_list_entry(idx: usize, item: &Value) -> Result<ShorthandEntry, EngineError> {
    match item {
        Value::String(s) => Ok(ShorthandEntry::text(s.as_str())),
        Value::Object(_) => parse_override(item, true)
            .map_err(|msg| EngineError::ScriptFormat(format!("responses[{idx}]: {msg}"))),
        other => Err(EngineError::ScriptFormat(format!(
            "responses[{idx}] must be a string or object, got {}",
            json_type_name(other)
        ))),
    }
}

fn parse_map_entry(pattern: &str, item: &Value) -> Result<ShorthandEntry, EngineError> {
    match item {
        Value::String(s) => Ok(ShorthandEntry::text(s.as_str())),
        Value::Object(_) => parse_override(item, false)
            .map_err(|msg| EngineError::ScriptFormat(format!("responses[{pattern:?}]: {msg}"))),
        other => Err(EngineError::ScriptFormat(format!(
            "responses[{pattern:?}] must be a string or object, got {}",
            json_type_name(other)
        ))),
    }
}

/// Parse an override object: `{match?, response?, error?, status?, times?}`.
/// `match` is only meaningful inside sequential lists.
fn parse_override(item: &Value, allow_match: bool) -> Result<ShorthandEntry, String> {
    let pattern = match item.get("match") {
        None | Some(Value::Null) => None,
        Some(Value::String(p)) if allow_match => Some(p.clone()),
        Some(Value::String(_)) => return Err("`match` is not allowed in a pattern map".into()),
        Some(other) => return Err(format!("`match` must be a string, got {}", json_type_name(other))),
    };

    let status = match item.get("status") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            v.as_u64()
                .filter(|s| (100..=599).contains(s))
                .map(|s| s as u16)
                .ok_or_else(|| format!("invalid status {v}"))?,
        ),
    };

    let times = match item.get("times") {
        None | Some(Value::Null) => None,
        Some(v) => Some(v.as_i64().ok_or_else(|| format!("invalid times {v}"))?),
    };

    let (text, status) = match (item.get("error"), item.get("response")) {
        (Some(Value::String(err)), _) => (err.clone(), status.unwrap_or(500)),
        (Some(other), _) if !other.is_null() => {
            return Err(format!("`error` must be a string, got {}", json_type_name(other)))
        }
        (_, Some(Value::String(resp))) => (resp.clone(), status.unwrap_or(200)),
        (_, None) | (_, Some(Value::Null)) => (String::new(), status.unwrap_or(200)),
        (_, Some(other)) => {
            return Err(format!(
                "`response` must be a string, got {}",
                json_type_name(other)
            ))
        }
    };

    Ok(ShorthandEntry {
        pattern,
        text,
        status,
        times,
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
