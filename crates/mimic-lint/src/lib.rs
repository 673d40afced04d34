//! Script linting library for the Mimic emulator.
//!
//! Scripts are checked with the same compiler the server uses, so anything
//! reported as an error here would also be rejected by `POST /_emulator/script`.
//!
//! # Example
//!
//! ```no_run
//! use mimic_lint::{lint_file, LintOptions};
//! use std::path::Path;
//!
//! let result = lint_file(Path::new("script.json"), &LintOptions::default());
//! if result.has_errors() {
//!     eprintln!("Found {} errors", result.errors);
//! }
//! ```

mod types;
mod validator;

use std::path::Path;

pub use types::{LintIssue, LintOptions, LintResult, Severity};
pub use validator::{rule_location, validate_script};

/// Lint a single script file.
pub fn lint_file(path: &Path, options: &LintOptions) -> LintResult {
    match std::fs::read_to_string(path) {
        Ok(content) => lint_json(&content, path, options),
        Err(e) => {
            let mut result = LintResult::new();
            result.files_checked = 1;
            result.add_issue(LintIssue::error(
                "E001",
                format!("Failed to read file: {e}"),
                path,
            ));
            result
        }
    }
}

/// Lint every `.json` file in a directory (non-recursive), in name order.
pub fn lint_directory(path: &Path, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();

    let entries = match std::fs::read_dir(path) {
        Ok(e) => e,
        Err(e) => {
            result.add_issue(LintIssue::error(
                "E001",
                format!("Failed to read directory: {e}"),
                path,
            ));
            return result;
        }
    };

    let mut files: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "json"))
        .collect();
    files.sort();

    for file in files {
        result.merge(lint_file(&file, options));
    }
    result
}

/// Lint a JSON string; `source` names it in reported issues.
pub fn lint_json(json: &str, source: &Path, options: &LintOptions) -> LintResult {
    match serde_json::from_str::<serde_json::Value>(json) {
        Ok(value) => lint_value(&value, source, options),
        Err(e) => {
            let mut result = LintResult::new();
            result.files_checked = 1;
            result.add_issue(
                LintIssue::error("E002", format!("Invalid JSON: {e}"), source)
                    .with_suggestion("Check for JSON syntax errors"),
            );
            result
        }
    }
}

/// Lint an already parsed script.
pub fn lint_value(value: &serde_json::Value, source: &Path, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();
    result.files_checked = 1;
    validate_script(source, value, &mut result, options);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_lint_file_missing() {
        let result = lint_file(Path::new("/nonexistent/script.json"), &LintOptions::default());
        assert_eq!(result.with_code("E001").count(), 1);
        assert_eq!(result.files_checked, 1);
    }

    #[test]
    fn test_lint_json_invalid() {
        let result = lint_json("{oops", Path::new("inline"), &LintOptions::default());
        assert_eq!(result.with_code("E002").count(), 1);
    }

    #[test]
    fn test_lint_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.json"), r#"{"responses": "hello"}"#).unwrap();
        fs::write(dir.path().join("bad.json"), r#"{"responses": true}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a script").unwrap();

        let result = lint_directory(dir.path(), &LintOptions::default());
        assert_eq!(result.files_checked, 2);
        assert_eq!(result.errors, 1);
        let bad = result.with_code("E003").next().unwrap();
        assert!(bad.file.ends_with("bad.json"));
    }

    #[test]
    fn test_lint_directory_missing() {
        let result = lint_directory(Path::new("/nonexistent/dir"), &LintOptions::default());
        assert!(result.has_errors());
    }
}
