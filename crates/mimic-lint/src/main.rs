//! Mimic script linter CLI
//!
//! Validates emulator script files before they are posted to a server.
//!
//! Usage:
//!   mimic-lint <directory_or_file> [OPTIONS]

use clap::{Parser, ValueEnum};
use mimic_lint::{lint_directory, lint_file, LintIssue, LintOptions, LintResult, Severity};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Mimic script linter
#[derive(Parser, Debug)]
#[command(name = "mimic-lint")]
#[command(author, version, about = "Validate Mimic emulator script files")]
struct Args {
    /// Script file or directory of script files
    #[arg(required = true)]
    path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Only show errors (hide warnings)
    #[arg(short = 'e', long)]
    errors_only: bool,

    /// Also report compiled rule counts
    #[arg(short, long)]
    verbose: bool,

    /// Treat warnings as errors
    #[arg(short, long)]
    strict: bool,
}

fn main() {
    let args = Args::parse();
    let options = LintOptions {
        verbose: args.verbose,
    };

    let result = if args.path.is_dir() {
        lint_directory(&args.path, &options)
    } else {
        lint_file(&args.path, &options)
    };

    match args.output {
        OutputFormat::Json => print_results_json(&result),
        OutputFormat::Text => print_results(&result, &args),
    }

    std::process::exit(if result.fails(args.strict) { 1 } else { 0 });
}

fn print_results_json(result: &LintResult) {
    match serde_json::to_string_pretty(result) {
        Ok(output) => println!("{output}"),
        Err(e) => eprintln!("Failed to serialize results: {e}"),
    }
}

fn print_results(result: &LintResult, args: &Args) {
    println!("{BOLD}{CYAN}Mimic Script Linter{RESET}");
    println!("{DIM}Scanning:{RESET} {CYAN}{}{RESET}\n", args.path.display());

    let mut by_file: BTreeMap<&Path, Vec<&LintIssue>> = BTreeMap::new();
    for issue in &result.issues {
        if args.errors_only && issue.severity != Severity::Error {
            continue;
        }
        by_file.entry(issue.file.as_path()).or_default().push(issue);
    }

    if by_file.is_empty() {
        println!("{GREEN}{BOLD}No issues found!{RESET}");
    }

    for (file, issues) in &by_file {
        let failed = issues.iter().any(|i| i.severity == Severity::Error);
        let status = if failed {
            format!("{RED}FAIL{RESET}")
        } else {
            format!("{YELLOW}WARN{RESET}")
        };
        let name = file.file_name().unwrap_or_default().to_string_lossy();
        println!("{status} {BOLD}{CYAN}{name}{RESET}");

        for issue in issues {
            let color = severity_color(issue.severity);
            let location = issue
                .location
                .as_ref()
                .map(|l| format!("{DIM}[{RESET}{CYAN}{l}{RESET}{DIM}]{RESET} "))
                .unwrap_or_default();
            println!(
                "  {color}|{RESET} {location}{BOLD}{color}{}{RESET}: {} {DIM}({}){RESET}",
                issue.severity, issue.message, issue.code
            );
            if let Some(suggestion) = &issue.suggestion {
                println!("  {color}|{RESET}   {GREEN}-> {suggestion}{RESET}");
            }
        }
        println!();
    }

    println!(
        "{DIM}Files checked:{RESET} {BOLD}{}{RESET}  {RED}Errors:{RESET} {BOLD}{}{RESET}  {YELLOW}Warnings:{RESET} {BOLD}{}{RESET}",
        result.files_checked, result.errors, result.warnings
    );

    if result.fails(args.strict) {
        println!("{RED}{BOLD}Linting failed{RESET}");
    } else if result.has_warnings() {
        println!("{YELLOW}{BOLD}Passed with warnings{RESET}");
    } else {
        println!("{GREEN}{BOLD}All checks passed!{RESET}");
    }
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => RED,
        Severity::Warning => YELLOW,
        Severity::Info => CYAN,
    }
}
