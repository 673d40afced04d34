//! Response scripting: rule model, script compiler and matcher.
//!
//! ## Module Structure
//!
//! - `types`: wire format of script documents, compiled rules, engine errors
//! - `compiler`: shorthand classification and compilation into ordered rules
//! - `extract`: extraction of the text pattern rules test against
//! - `matcher`: first-match rule selection and consumption

mod compiler;
mod extract;
mod matcher;
mod types;

pub use compiler::{
    classify_responses, compile_advanced_rules, compile_document, compile_responses,
    compile_script, CompiledScript,
};
pub use extract::extract_input;
pub use matcher::{json_contains, json_equals, match_rules, pattern_matches, predicate_matches, MatchRequest};
pub use types::{
    EngineError, PatternMatch, Predicate, RawMatch, RawResponse, RawRule, ResponsePayload,
    Responses, Rule, RuleSnapshot, ScriptDocument, ShorthandEntry, StructuralMatch, UNLIMITED,
};
