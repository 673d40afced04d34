//! Issue and result types reported by the script linter.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The server would reject the script
    Error,
    /// The script loads but probably does not do what the author meant
    Warning,
    Info,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One finding in one script file.
#[derive(Debug, Clone, Serialize)]
pub struct LintIssue {
    pub severity: Severity,
    /// Stable code such as `E003` or `W001`
    pub code: &'static str,
    pub message: String,
    #[serde(serialize_with = "serialize_path")]
    pub file: PathBuf,
    /// Where in the document, e.g. `rules[2]` or `responses.weather`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

fn serialize_path<S>(path: &Path, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&path.to_string_lossy())
}

impl LintIssue {
    fn new(severity: Severity, code: &'static str, message: impl Into<String>, file: &Path) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            file: file.to_path_buf(),
            location: None,
            suggestion: None,
        }
    }

    pub fn error(code: &'static str, message: impl Into<String>, file: &Path) -> Self {
        Self::new(Severity::Error, code, message, file)
    }

    pub fn warning(code: &'static str, message: impl Into<String>, file: &Path) -> Self {
        Self::new(Severity::Warning, code, message, file)
    }

    pub fn info(code: &'static str, message: impl Into<String>, file: &Path) -> Self {
        Self::new(Severity::Info, code, message, file)
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Aggregated findings over one or more files.
#[derive(Debug, Default, Serialize)]
pub struct LintResult {
    pub issues: Vec<LintIssue>,
    pub files_checked: usize,
    pub errors: usize,
    pub warnings: usize,
}

impl LintResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issue(&mut self, issue: LintIssue) {
        match issue.severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Info => {}
        }
        self.issues.push(issue);
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings > 0
    }

    /// Whether the run should fail; `strict` promotes warnings to failures
    pub fn fails(&self, strict: bool) -> bool {
        self.has_errors() || (strict && self.has_warnings())
    }

    pub fn merge(&mut self, other: LintResult) {
        self.issues.extend(other.issues);
        self.files_checked += other.files_checked;
        self.errors += other.errors;
        self.warnings += other.warnings;
    }

    /// Issues with the given code, mostly useful in tests
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a LintIssue> + 'a {
        self.issues.iter().filter(move |i| i.code == code)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LintOptions {
    /// Also report informational findings (compiled rule counts)
    pub verbose: bool,
}
