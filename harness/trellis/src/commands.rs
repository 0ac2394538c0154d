//! Command handlers for the trellis CLI.
//!
//! Argument parsing for each command lives next to its handler so it can be
//! tested without spawning the binary. `main.rs` only dispatches.

mod report;
mod run;

pub use report::{render_plan, render_report, ReportOptions, ShowStdout};
pub use run::{parse_run_args, run_tests, OutputFormat, RunOptions};

/// Every test passed (or the dry run was planned).
pub const EXIT_OK: i32 = 0;
/// At least one test failed.
pub const EXIT_FAILURES: i32 = 1;
/// Pre-flight failure or usage error; nothing (or not everything) ran.
pub const EXIT_FATAL: i32 = 2;
