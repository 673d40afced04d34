//! Script validation built on the server's own compiler.
//!
//! A script that fails to compile gets one `E003`. A script that compiles is
//! checked for the mistakes the server accepts silently:
//! - `W001` pattern that is not a valid regex (compared literally instead)
//! - `W002` no rules at all
//! - `W003` rule shadowed by an earlier unlimited match-anything rule
//! - `W004` unknown top-level field

use crate::types::{LintIssue, LintOptions, LintResult};
use mimic_server::script::{compile_document, EngineError, Predicate, Rule};
use serde_json::Value;
use std::path::Path;

const KNOWN_FIELDS: &[&str] = &["reset", "rules", "responses", "models"];

/// Validate a parsed script document.
pub fn validate_script(file: &Path, script: &Value, result: &mut LintResult, options: &LintOptions) {
    let compiled = match compile_document(script) {
        Ok(compiled) => compiled,
        Err(EngineError::ScriptFormat(message)) => {
            result.add_issue(
                LintIssue::error("E003", format!("Script rejected: {message}"), file)
                    .with_suggestion(
                        "`responses` must be a string, a list or an object of pattern -> response",
                    ),
            );
            return;
        }
        Err(other) => {
            result.add_issue(LintIssue::error("E003", other.to_string(), file));
            return;
        }
    };

    check_unknown_fields(file, script, result);

    if compiled.rules.is_empty() {
        let mut issue = LintIssue::warning("W002", "Script defines no rules", file);
        if compiled.reset {
            issue = issue.with_suggestion("Use POST /_emulator/reset to clear a session instead");
        }
        result.add_issue(issue);
        return;
    }

    check_patterns(file, script, &compiled.rules, result);
    check_shadowed_rules(file, script, &compiled.rules, result);

    if options.verbose {
        result.add_issue(LintIssue::info(
            "I001",
            format!(
                "{} rule(s) compiled (reset={})",
                compiled.rules.len(),
                compiled.reset
            ),
            file,
        ));
    }
}

fn check_unknown_fields(file: &Path, script: &Value, result: &mut LintResult) {
    let Some(fields) = script.as_object() else {
        return;
    };
    for key in fields.keys() {
        if !KNOWN_FIELDS.contains(&key.as_str()) {
            result.add_issue(
                LintIssue::warning("W004", format!("Unknown field `{key}` is ignored"), file)
                    .with_location(key.clone())
                    .with_suggestion(format!("Known fields: {}", KNOWN_FIELDS.join(", "))),
            );
        }
    }
}

fn check_patterns(file: &Path, script: &Value, rules: &[Rule], result: &mut LintResult) {
    for (idx, rule) in rules.iter().enumerate() {
        if let Predicate::Pattern(pattern) = &rule.predicate {
            if !pattern.is_valid_regex() {
                result.add_issue(
                    LintIssue::warning(
                        "W001",
                        format!(
                            "Pattern `{}` is not a valid regex and will only match the exact text",
                            pattern.source
                        ),
                        file,
                    )
                    .with_location(rule_location(script, idx))
                    .with_suggestion("Escape regex metacharacters such as ( [ { * + ?"),
                );
            }
        }
    }
}

fn check_shadowed_rules(file: &Path, script: &Value, rules: &[Rule], result: &mut LintResult) {
    let Some(catch_all) = rules
        .iter()
        .position(|r| r.is_unlimited() && r.predicate.is_anything())
    else {
        return;
    };
    let shadowing = rule_location(script, catch_all);
    for idx in catch_all + 1..rules.len() {
        result.add_issue(
            LintIssue::warning(
                "W003",
                format!("Rule is unreachable: {shadowing} matches every request and never runs out"),
                file,
            )
            .with_location(rule_location(script, idx))
            .with_suggestion(format!("Move it before {shadowing} or give {shadowing} a finite `times`")),
        );
    }
}

/// Map a compiled rule index back to where it was written.
///
/// Advanced rules are compiled first, shorthand entries after them.
pub fn rule_location(script: &Value, idx: usize) -> String {
    let advanced = script
        .get("rules")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    if idx < advanced {
        return format!("rules[{idx}]");
    }
    let offset = idx - advanced;
    match script.get("responses") {
        Some(Value::Array(_)) => format!("responses[{offset}]"),
        Some(Value::Object(map)) => match map.keys().nth(offset) {
            Some(key) => format!("responses.{key}"),
            None => "responses".to_string(),
        },
        _ => "responses".to_string(),
    }
}
