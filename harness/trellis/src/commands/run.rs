//! The `run` command: orchestrate a run and print the report.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use trellis_model::{Summary, Test};

use super::report::{render_plan, render_report, ReportOptions, ShowStdout};
use super::{EXIT_FATAL, EXIT_OK};
use crate::orchestrator::{parse_timeout, Orchestrator, RunConfig, RunOutcome};
use crate::registry::Registry;
use crate::todo::ChecklistTodoSync;

/// File written under the root by `--sync-todos`.
pub const TODO_FILE: &str = "TODO.md";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Parsed `run` arguments.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub config: RunConfig,
    pub report: ReportOptions,
    pub format: OutputFormat,
}

/// Parse the arguments following `run`.
///
/// Everything after `--` is passed through to the framework commands.
pub fn parse_run_args(args: &[String]) -> Result<RunOptions, String> {
    let mut root = None;
    let mut timeout = None;
    let mut paths = Vec::new();
    let mut extra_args = Vec::new();
    let mut options = RunOptions::default();
    let mut config = RunConfig::default();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--" {
            extra_args.extend(iter.by_ref().cloned());
            break;
        } else if arg == "--sync-todos" {
            config.sync_todos = true;
        } else if arg == "--show-passed" {
            options.report.show_passed = true;
        } else if arg == "--dry-run" {
            config.dry_run = true;
        } else if let Some(value) = arg.strip_prefix("--show-stdout=") {
            options.report.show_stdout = ShowStdout::parse(value)
                .ok_or_else(|| format!("invalid --show-stdout value `{value}`"))?;
        } else if let Some(value) = arg.strip_prefix("--verbosity=") {
            let level = value
                .parse::<u8>()
                .map_err(|_| format!("invalid --verbosity value `{value}`"))?;
            options.report.verbosity = Some(level);
        } else if let Some(value) = arg.strip_prefix("--format=") {
            options.format = match value {
                "text" => OutputFormat::Text,
                "json" => OutputFormat::Json,
                _ => return Err(format!("invalid --format value `{value}`")),
            };
        } else if let Some(value) = arg.strip_prefix("--timeout=") {
            timeout = Some(
                parse_timeout(value).ok_or_else(|| format!("invalid --timeout value `{value}`"))?,
            );
        } else if let Some(value) = arg.strip_prefix("--jobs=") {
            let jobs = value
                .parse::<NonZeroUsize>()
                .map_err(|_| format!("invalid --jobs value `{value}`"))?;
            config.jobs = Some(jobs);
        } else if let Some(value) = arg.strip_prefix("--root=") {
            root = Some(PathBuf::from(value));
        } else if arg.starts_with('-') {
            return Err(format!("unknown option `{arg}`"));
        } else {
            paths.push(PathBuf::from(arg));
        }
    }

    // Environment first, then flags.
    let env = RunConfig::from_env(root.unwrap_or_else(|| PathBuf::from(".")));
    options.config = RunConfig {
        root: env.root,
        paths,
        extra_args,
        timeout: timeout.unwrap_or(env.timeout),
        ..config
    };
    Ok(options)
}

/// Run and print; returns the process exit code.
pub fn run_tests(options: &RunOptions) -> i32 {
    let scratch = match tempfile::Builder::new().prefix("trellis-").tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("error: cannot create scratch directory: {e}");
            return EXIT_FATAL;
        }
    };

    let mut orchestrator = Orchestrator::new(Registry::standard(scratch.path()));
    if options.config.sync_todos {
        let path = options.config.root.join(TODO_FILE);
        orchestrator = orchestrator.with_todo_sync(Arc::new(ChecklistTodoSync::new(path)));
    }
    if options.format == OutputFormat::Text {
        orchestrator = orchestrator.with_progress(Arc::new(print_progress));
    }

    let outcome = match orchestrator.run(&options.config) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_FATAL;
        }
    };

    match (outcome, options.format) {
        (RunOutcome::Planned(units), OutputFormat::Text) => {
            print!("{}", render_plan(&units));
            EXIT_OK
        }
        (RunOutcome::Planned(units), OutputFormat::Json) => print_json(&units).unwrap_or(EXIT_FATAL),
        (RunOutcome::Completed(results), OutputFormat::Text) => {
            print!("{}", render_report(&results, &options.report));
            results.exit_code()
        }
        (RunOutcome::Completed(results), OutputFormat::Json) => {
            print_json(&results).map_or(EXIT_FATAL, |_| results.exit_code())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Option<i32> {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            Some(EXIT_OK)
        }
        Err(e) => {
            eprintln!("error: cannot serialize results: {e}");
            None
        }
    }
}

/// Failures as they happen, with running totals.
fn print_progress(test: &Test, totals: &Summary) {
    if test.failed {
        eprintln!(
            "FAIL {} [{}] ({} passed, {} failed so far)",
            test.full_name(),
            test.package,
            totals.passed,
            totals.failed
        );
    }
}
