//! Plain-text rendering of run results.

use std::fmt::Write as _;

use trellis_model::{Summary, Test, TestKind, TestSuiteResults};
use trellis_tree::{build_report, Verbosity};

use crate::orchestrator::PlannedUnit;

/// When captured stdout is printed under a test.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ShowStdout {
    Never,
    #[default]
    OnFailure,
    Always,
}

impl ShowStdout {
    /// `never`, `on-failure` or `always`, case-insensitive.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "never" => Some(ShowStdout::Never),
            "onfailure" => Some(ShowStdout::OnFailure),
            "always" => Some(ShowStdout::Always),
            _ => None,
        }
    }

    fn shows(self, test: &Test) -> bool {
        match self {
            ShowStdout::Never => false,
            ShowStdout::OnFailure => test.failed,
            ShowStdout::Always => true,
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct ReportOptions {
    pub show_passed: bool,
    pub show_stdout: ShowStdout,
    /// Overrides the level implied by `show_passed`.
    pub verbosity: Option<u8>,
}

impl ReportOptions {
    pub fn verbosity(&self) -> Verbosity {
        match self.verbosity {
            Some(level) => Verbosity::from_level(level),
            None if self.show_passed => Verbosity::Full,
            None => Verbosity::FailuresOnly,
        }
    }
}

/// Report tree, summary line and final verdict.
pub fn render_report(results: &TestSuiteResults, options: &ReportOptions) -> String {
    let tests: Vec<Test> = results.all_tests().into_iter().cloned().collect();
    let roots = build_report(&tests, options.verbosity());

    let mut out = String::new();
    for root in &roots {
        render_node(&mut out, root, 0, options);
    }
    if !roots.is_empty() {
        out.push('\n');
    }

    let summary = results.summary();
    let _ = writeln!(
        out,
        "{} tests: {} passed, {} failed, {} skipped ({:.2?})",
        summary.total, summary.passed, summary.failed, summary.skipped, summary.duration
    );
    out.push_str(if summary.has_failures() { "FAILED\n" } else { "OK\n" });
    out
}

/// One line per planned command, then a count.
pub fn render_plan(units: &[PlannedUnit]) -> String {
    let mut out = String::new();
    for unit in units {
        let _ = writeln!(out, "{unit}");
    }
    let _ = writeln!(out, "\n{} units planned", units.len());
    out
}

fn render_node(out: &mut String, node: &Test, depth: usize, options: &ReportOptions) {
    let indent = "  ".repeat(depth);
    if node.is_leaf() {
        let marker = if node.failed {
            "FAIL"
        } else if node.skipped {
            "SKIP"
        } else {
            "PASS"
        };
        let _ = writeln!(out, "{indent}{marker} {} ({:.2?})", node.name, node.duration);
        if node.failed || node.skipped {
            write_block(out, &indent, &node.message);
        }
        let stdout = node.stdout.trim_end();
        if options.show_stdout.shows(node) && !stdout.is_empty() && stdout != node.message {
            let _ = writeln!(out, "{indent}    stdout:");
            write_block(out, &format!("{indent}  "), stdout);
        }
        return;
    }

    let suffix = if node.kind == TestKind::Directory { "/" } else { "" };
    let _ = writeln!(out, "{indent}{}{suffix} {}", node.name, counts(&node.summary()));
    for child in &node.children {
        render_node(out, child, depth + 1, options);
    }
}

fn counts(summary: &Summary) -> String {
    let mut text = format!("({} passed, {} failed", summary.passed, summary.failed);
    if summary.skipped > 0 {
        let _ = write!(text, ", {} skipped", summary.skipped);
    }
    text.push(')');
    text
}

/// `text` indented four spaces past `indent`, trailing blank lines dropped.
fn write_block(out: &mut String, indent: &str, text: &str) {
    for line in text.trim_end().lines() {
        let _ = writeln!(out, "{indent}    {line}");
    }
}
