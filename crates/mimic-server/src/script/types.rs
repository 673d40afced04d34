//! Type definitions for the response-scripting engine.
//!
//! This module contains the wire shapes accepted by the script endpoint, the
//! compiled rule model the matcher walks, and the engine error type.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Remaining-use counter value meaning "never exhausts".
pub const UNLIMITED: i64 = -1;

// ============================================================================
// Script Document (wire format)
// ============================================================================

/// A script document as posted to `/_emulator/script`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScriptDocument {
    /// Replace the session's rules instead of appending to them
    #[serde(default)]
    pub reset: bool,
    /// Explicit advanced rules, placed ahead of shorthand rules
    #[serde(default)]
    pub rules: Vec<RawRule>,
    /// Shorthand responses (string, list, or pattern map). Shape is decided by the compiler.
    #[serde(default)]
    pub responses: Option<serde_json::Value>,
    /// Extra model ids accepted for this session
    #[serde(default)]
    pub models: Vec<String>,
}

/// Explicit advanced rule as authored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRule {
    #[serde(default, rename = "match")]
    pub match_rule: RawMatch,
    /// Authored use count. Absent or 0 means one use, negative means unlimited.
    #[serde(default)]
    pub times: i64,
    #[serde(default)]
    pub response: RawResponse,
}

/// Match block of an advanced rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Response block of an advanced rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sse: Vec<serde_json::Value>,
}

/// Shorthand `responses` field, decided once from the decoded JSON shape.
#[derive(Debug, Clone)]
pub enum Responses {
    /// `"responses": "text"`
    Single(String),
    /// `"responses": ["a", {"match": "...", "response": "b"}]`
    Sequential(Vec<ShorthandEntry>),
    /// `"responses": {"pattern": "text"}` (author order preserved)
    PatternMap(Vec<(String, ShorthandEntry)>),
}

/// One element of a sequential list or one value of a pattern map.
#[derive(Debug, Clone, PartialEq)]
pub struct ShorthandEntry {
    /// Regex the element is restricted to (sequential override objects only)
    pub pattern: Option<String>,
    pub text: String,
    pub status: u16,
    pub times: Option<i64>,
}

impl ShorthandEntry {
    /// Plain text entry with a 200 status
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            pattern: None,
            text: text.into(),
            status: 200,
            times: None,
        }
    }
}

// ============================================================================
// Compiled Rule Model
// ============================================================================

/// A compiled rule: predicate, response payload and remaining-use counter.
#[derive(Debug, Clone)]
pub struct Rule {
    pub predicate: Predicate,
    pub response: ResponsePayload,
    /// `-1` unlimited, `0` exhausted, `>0` uses left
    pub remaining: i64,
}

impl Rule {
    pub fn new(predicate: Predicate, response: ResponsePayload, remaining: i64) -> Self {
        Self {
            predicate,
            response,
            remaining,
        }
    }

    /// A rule is eligible for matching iff it is not exhausted
    pub fn is_eligible(&self) -> bool {
        self.remaining != 0
    }

    /// Record one successful match
    pub fn consume(&mut self) {
        if self.remaining > 0 {
            self.remaining -= 1;
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.remaining < 0
    }
}

/// Match predicate of a compiled rule.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Method/path equality plus JSON-subset containment. `None` fields match anything.
    Structural(StructuralMatch),
    /// Case-insensitive regex against the extracted input string.
    Pattern(PatternMatch),
}

impl Predicate {
    /// A structural predicate with no constraints
    pub fn anything() -> Self {
        Predicate::Structural(StructuralMatch::default())
    }

    /// Whether this predicate accepts every request
    pub fn is_anything(&self) -> bool {
        match self {
            Predicate::Structural(s) => {
                s.method.is_none()
                    && s.path.is_none()
                    && s.json
                        .as_ref()
                        .map_or(true, |j| j.as_object().is_some_and(|o| o.is_empty()))
            }
            Predicate::Pattern(_) => false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StructuralMatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<serde_json::Value>,
}

/// Pattern predicate. The regex is compiled once when the script is compiled;
/// `regex` is `None` when the source is not a valid expression, in which case
/// matching falls back to exact string equality.
#[derive(Debug, Clone)]
pub struct PatternMatch {
    pub source: String,
    pub regex: Option<Arc<Regex>>,
}

impl PatternMatch {
    pub fn compile(source: impl Into<String>) -> Self {
        let source = source.into();
        let regex = Regex::new(&format!("(?i){source}")).ok().map(Arc::new);
        Self { source, regex }
    }

    pub fn is_valid_regex(&self) -> bool {
        self.regex.is_some()
    }
}

/// Response returned by a matched rule.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    /// Plain text, wrapped into the endpoint's envelope by the transport
    Text { content: String, status: u16 },
    /// Raw JSON document returned verbatim
    Json { body: serde_json::Value, status: u16 },
    /// Pre-built stream events emitted verbatim
    Events {
        events: Vec<serde_json::Value>,
        status: u16,
    },
}

impl ResponsePayload {
    pub fn text(content: impl Into<String>) -> Self {
        ResponsePayload::Text {
            content: content.into(),
            status: 200,
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            ResponsePayload::Text { status, .. }
            | ResponsePayload::Json { status, .. }
            | ResponsePayload::Events { status, .. } => *status,
        }
    }

    /// Short label used in snapshots and logs
    pub fn kind(&self) -> &'static str {
        match self {
            ResponsePayload::Text { .. } => "text",
            ResponsePayload::Json { .. } => "json",
            ResponsePayload::Events { .. } => "sse",
        }
    }
}

// ============================================================================
// Snapshot Types (diagnostics)
// ============================================================================

/// Serializable view of a rule for the state endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSnapshot {
    pub index: usize,
    /// "structural" or "pattern"
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structural: Option<StructuralMatch>,
    pub remaining: i64,
    pub response_type: &'static str,
    pub status: u16,
    /// Truncated text preview (first 200 chars)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl RuleSnapshot {
    pub fn from_rule(index: usize, rule: &Rule) -> Self {
        let (kind, pattern, structural) = match &rule.predicate {
            Predicate::Structural(s) => ("structural", None, Some(s.clone())),
            Predicate::Pattern(p) => ("pattern", Some(p.source.clone()), None),
        };
        let preview = match &rule.response {
            ResponsePayload::Text { content, .. } => Some(content.chars().take(200).collect()),
            ResponsePayload::Json { body, .. } => {
                Some(body.to_string().chars().take(200).collect())
            }
            ResponsePayload::Events { events, .. } => Some(format!("{} event(s)", events.len())),
        };
        Self {
            index,
            kind,
            pattern,
            structural,
            remaining: rule.remaining,
            response_type: rule.response.kind(),
            status: rule.response.status(),
            preview,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors surfaced by the scripting engine
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid script: {0}")]
    ScriptFormat(String),
    #[error("No script loaded for token")]
    NoSession(String),
    #[error("No matching rule found for input {input:?}")]
    NoMatchingRule { input: String },
}
