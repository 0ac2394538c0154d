//! Run orchestration: pre-flight, scheduling, fallback synthesis.
//!
//! A run goes through three stages:
//!
//! 1. Pre-flight: detect frameworks, validate start paths, discover
//!    packages. Any problem here is a [`RunError`] and nothing executes.
//! 2. Execution: one independent unit per (framework, package) on a scoped
//!    rayon pool. A unit never fails; command, spawn, timeout and parse
//!    problems become one synthetic failing test named after the framework.
//! 3. Aggregation: units are collected once they finish, sorted, and failures
//!    are optionally handed to a [`TodoSync`].

mod config;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;
use trellis_locate::{GoResolver, LocationIndex, LocationResolver};
use trellis_model::paths::{normalize_file, package_dir, package_path, relative_dir};
use trellis_model::{Framework, Summary, Test, TestResults, TestSuiteResults};
use trellis_parse::{ParseError, ResultParser, StreamCounts};

use crate::exec::{self, Execution};
use crate::registry::Registry;
use crate::runner::{CommandSpec, Runner, RunnerError};
use crate::todo::{TodoSync, TodoSyncError};

pub use config::{parse_timeout, RunConfig, DEFAULT_TIMEOUT, TIMEOUT_ENV};

/// Pre-flight and post-processing failures. Per-unit problems never show
/// up here.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("no supported test framework detected in {}", .0.display())]
    NoFrameworks(PathBuf),
    #[error("invalid path {}: {reason}", path.display())]
    InvalidPath { path: PathBuf, reason: String },
    #[error("no test packages found")]
    NoPackages,
    #[error("framework detection failed: {0}")]
    Detection(#[source] RunnerError),
    #[error("{framework} package discovery failed: {source}")]
    Discovery {
        framework: Framework,
        #[source]
        source: RunnerError,
    },
    #[error("TODO sync failed: {0}")]
    TodoSync(#[from] TodoSyncError),
}

/// One (framework, package) pair a dry run would execute.
#[derive(Clone, Debug, Serialize)]
pub struct PlannedUnit {
    pub framework: Framework,
    pub package: String,
    pub command: Option<CommandSpec>,
    /// Why no command could be built.
    pub error: Option<String>,
}

impl fmt::Display for PlannedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.command, &self.error) {
            (Some(command), _) => write!(f, "[{}] {}", self.framework, command),
            (None, Some(error)) => write!(f, "[{}] {}: {}", self.framework, self.package, error),
            (None, None) => write!(f, "[{}] {}", self.framework, self.package),
        }
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    /// Dry run: what would have executed.
    Planned(Vec<PlannedUnit>),
    Completed(TestSuiteResults),
}

/// Live progress callback: each finished test plus running totals.
pub type ProgressFn = dyn Fn(&Test, &Summary) + Send + Sync;

#[derive(Clone)]
struct Unit {
    framework: Framework,
    package: String,
    runner: Arc<dyn Runner>,
}

/// Drives a whole run. Cheap to share across the worker pool.
pub struct Orchestrator {
    registry: Registry,
    resolver: Arc<dyn LocationResolver>,
    todo_sync: Option<Arc<dyn TodoSync>>,
    progress: Option<Arc<ProgressFn>>,
    totals: Mutex<Summary>,
}

impl Orchestrator {
    pub fn new(registry: Registry) -> Self {
        Orchestrator {
            registry,
            resolver: Arc::new(GoResolver::new()),
            todo_sync: None,
            progress: None,
            totals: Mutex::new(Summary::new()),
        }
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn LocationResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn with_todo_sync(mut self, sync: Arc<dyn TodoSync>) -> Self {
        self.todo_sync = Some(sync);
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<ProgressFn>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn run(&self, config: &RunConfig) -> Result<RunOutcome, RunError> {
        let root = fs::canonicalize(&config.root).map_err(|e| RunError::InvalidPath {
            path: config.root.clone(),
            reason: e.to_string(),
        })?;

        let frameworks = self.registry.detect_all(&root).map_err(RunError::Detection)?;
        if frameworks.is_empty() {
            return Err(RunError::NoFrameworks(root));
        }

        let prefixes = start_prefixes(&root, &config.paths)?;
        let units = self.discover(&root, &frameworks, &prefixes)?;
        if units.is_empty() {
            return Err(RunError::NoPackages);
        }
        tracing::info!(
            frameworks = frameworks.len(),
            units = units.len(),
            "discovered test packages"
        );

        if config.dry_run {
            return Ok(RunOutcome::Planned(plan(&root, &units, &config.extra_args)));
        }

        let mut locations = LocationIndex::new();
        for prefix in &prefixes {
            locations.merge(self.resolver.resolve(&root, &root.join(prefix)));
        }
        let locations = Arc::new(locations);

        *self.totals.lock() = Summary::new();
        let mut suite: TestSuiteResults = self
            .execute_units(&root, &units, &locations, config)
            .into_iter()
            .collect();
        suite.sort();

        if config.sync_todos && suite.has_failures() {
            match &self.todo_sync {
                Some(sync) => {
                    let path = sync.sync(&suite.failed_tests())?;
                    tracing::info!(path = %path.display(), "synced failing tests");
                }
                None => tracing::warn!("TODO sync requested but no sync is configured"),
            }
        }

        Ok(RunOutcome::Completed(suite))
    }

    /// Packages per detected framework, restricted to `prefixes`.
    fn discover(
        &self,
        root: &Path,
        frameworks: &[Framework],
        prefixes: &[String],
    ) -> Result<Vec<Unit>, RunError> {
        let mut units = Vec::new();
        for &framework in frameworks {
            let Some(runner) = self.registry.runner(framework) else {
                continue;
            };
            let packages = runner
                .discover_packages(root)
                .map_err(|source| RunError::Discovery { framework, source })?;

            let mut selected: Vec<String> = packages
                .into_iter()
                .filter(|package| prefixes.iter().any(|p| under_prefix(package, p)))
                .map(|package| package_path(&package))
                .collect();
            selected.sort();
            selected.dedup();
            tracing::debug!(%framework, packages = selected.len(), "discovered packages");

            units.extend(selected.into_iter().map(|package| Unit {
                framework,
                package,
                runner: Arc::clone(runner),
            }));
        }
        Ok(units)
    }

    fn execute_units(
        &self,
        root: &Path,
        units: &[Unit],
        locations: &Arc<LocationIndex>,
        config: &RunConfig,
    ) -> Vec<TestResults> {
        // build_scoped tears the pool down before returning, so no worker
        // outlives the run.
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.effective_jobs())
            .build_scoped(rayon::ThreadBuilder::run, |pool| {
                pool.install(|| {
                    units
                        .par_iter()
                        .map(|unit| self.run_unit(root, unit, locations, config))
                        .collect::<Vec<_>>()
                })
            })
            .unwrap_or_else(|e| {
                tracing::warn!("failed to create thread pool ({e}), running sequentially");
                units
                    .iter()
                    .map(|unit| self.run_unit(root, unit, locations, config))
                    .collect()
            })
    }

    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(framework = %unit.framework, package = %unit.package)
    )]
    fn run_unit(
        &self,
        root: &Path,
        unit: &Unit,
        locations: &Arc<LocationIndex>,
        config: &RunConfig,
    ) -> TestResults {
        let spec = match unit.runner.build_command(root, &unit.package, &config.extra_args) {
            Ok(spec) => spec,
            Err(e) => {
                let mut results = TestResults::new(unit.framework, &unit.package, "");
                results.exit_code = -1;
                let message = format!("failed to build command: {e}");
                self.push_synthetic(&mut results, unit, message, &Execution::default());
                return results;
            }
        };

        let mut results = TestResults::new(unit.framework, &unit.package, spec.to_string());
        if let Some(report) = &spec.report_file {
            if let Err(e) = prepare_report_file(report) {
                results.exit_code = -1;
                let message = format!("cannot prepare report file {}: {e}", report.display());
                self.push_synthetic(&mut results, unit, message, &Execution::default());
                return results;
            }
        }

        let parser = Registry::parser(unit.framework, locations, &unit.package);
        let mut tests = Vec::new();
        let streaming = spec.report_file.is_none();
        let run = exec::execute(&spec, config.timeout, |stdout| {
            streaming.then(|| {
                parser.parse_stream(stdout, &mut |test: Test| tests.push(test), &mut |test: &Test| {
                    self.report_progress(test);
                })
            })
        });

        let (execution, streamed) = match run {
            Ok(run) => run,
            Err(e) => {
                results.exit_code = -1;
                let message = format!("failed to start `{spec}`: {e}");
                self.push_synthetic(&mut results, unit, message, &Execution::default());
                return results;
            }
        };

        let parsed = match (streamed, &spec.report_file) {
            (Some(parsed), _) => parsed,
            (None, Some(report)) => self.parse_report(&*parser, report, &mut tests),
            (None, None) => Ok(StreamCounts::default()),
        };

        results.stdout.clone_from(&execution.stdout);
        results.stderr.clone_from(&execution.stderr);
        results.exit_code = execution.reported_exit_code();
        results.timed_out = execution.timed_out;

        let package_path = package_path(&unit.package);
        for test in &mut tests {
            if test.package.is_empty() {
                test.package.clone_from(&unit.package);
            }
            test.package_path.clone_from(&package_path);
            if test.stderr.is_empty() {
                test.stderr.clone_from(&execution.stderr);
            }
            test.file = normalize_file(root, &test.file);
        }
        results.tests = tests;

        let reason = fallback_reason(
            &results,
            &execution,
            parsed.as_ref().err(),
            spec.non_zero_exit_expected,
            config,
        );
        if let Some(reason) = reason {
            self.push_synthetic(&mut results, unit, reason, &execution);
        }

        tracing::debug!(
            tests = results.tests.len(),
            failed = results.summary().failed,
            "unit finished"
        );
        results
    }

    fn parse_report(
        &self,
        parser: &dyn ResultParser,
        report: &Path,
        tests: &mut Vec<Test>,
    ) -> Result<StreamCounts, ParseError> {
        let raw = fs::read(report)?;
        parser.parse_stream(&mut raw.as_slice(), &mut |test: Test| tests.push(test), &mut |test: &Test| {
            self.report_progress(test);
        })
    }

    /// Append the unit's single synthetic failure.
    fn push_synthetic(
        &self,
        results: &mut TestResults,
        unit: &Unit,
        reason: String,
        execution: &Execution,
    ) {
        tracing::warn!(
            framework = %unit.framework,
            package = %unit.package,
            "{reason}"
        );
        let mut message = reason;
        let output = if execution.stderr.trim().is_empty() {
            execution.stdout.trim()
        } else {
            execution.stderr.trim()
        };
        if !output.is_empty() {
            message.push_str("\n\n");
            message.push_str(output);
        }

        let mut test = Test::failed(
            unit.framework,
            unit.framework.execution_test_name(),
            message,
            execution.elapsed,
        );
        test.package.clone_from(&unit.package);
        test.package_path = package_path(&unit.package);
        test.stdout.clone_from(&execution.stdout);
        test.stderr.clone_from(&execution.stderr);
        self.report_progress(&test);
        results.tests.push(test);
    }

    fn report_progress(&self, test: &Test) {
        let totals = {
            let mut totals = self.totals.lock();
            *totals += test.summary();
            *totals
        };
        if let Some(progress) = &self.progress {
            progress(test, &totals);
        }
    }
}

/// Why a finished unit needs a synthetic failure, if it does.
fn fallback_reason(
    results: &TestResults,
    execution: &Execution,
    parse_error: Option<&ParseError>,
    non_zero_exit_expected: bool,
    config: &RunConfig,
) -> Option<String> {
    let framework = results.framework;
    if execution.timed_out {
        return Some(format!("{framework} timed out after {:?}", config.timeout));
    }
    if let Some(e) = parse_error {
        return Some(format!("failed to parse {framework} output: {e}"));
    }
    let exit = match execution.exit_code {
        Some(code) => format!("exit code {code}"),
        None => "killed by a signal".to_string(),
    };
    if results.tests.is_empty() {
        return Some(format!("{framework} reported no test results ({exit})"));
    }
    if execution.success() {
        return None;
    }
    if !non_zero_exit_expected {
        return Some(format!("{framework} failed ({exit})"));
    }
    if !results.has_failures() {
        return Some(format!("{framework} failed ({exit}) but no test failure was reported"));
    }
    None
}

/// Root-relative directory keys for the start paths; `.` when none given.
fn start_prefixes(root: &Path, paths: &[PathBuf]) -> Result<Vec<String>, RunError> {
    if paths.is_empty() {
        return Ok(vec![".".to_string()]);
    }
    let mut prefixes = Vec::with_capacity(paths.len());
    for path in paths {
        let candidate = if path.is_absolute() {
            path.clone()
        } else {
            root.join(path)
        };
        let invalid = |reason: &str| RunError::InvalidPath {
            path: path.clone(),
            reason: reason.to_string(),
        };
        let resolved = fs::canonicalize(&candidate).map_err(|e| invalid(&e.to_string()))?;
        if !resolved.is_dir() {
            return Err(invalid("not a directory"));
        }
        let key = relative_dir(root, &resolved).ok_or_else(|| invalid("outside the root"))?;
        prefixes.push(key);
    }
    prefixes.sort();
    prefixes.dedup();
    Ok(prefixes)
}

/// Whether `package` lies at or below the directory key `prefix`.
fn under_prefix(package: &str, prefix: &str) -> bool {
    if prefix == "." {
        return true;
    }
    let dir = package_dir(package);
    dir == prefix
        || dir
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn plan(root: &Path, units: &[Unit], extra_args: &[String]) -> Vec<PlannedUnit> {
    units
        .iter()
        .map(|unit| {
            let (command, error) = match unit.runner.build_command(root, &unit.package, extra_args) {
                Ok(command) => (Some(command), None),
                Err(e) => (None, Some(e.to_string())),
            };
            PlannedUnit {
                framework: unit.framework,
                package: unit.package.clone(),
                command,
                error,
            }
        })
        .collect()
}

/// Make sure the report's directory exists and no stale report survives
/// from an earlier run.
fn prepare_report_file(report: &Path) -> io::Result<()> {
    if let Some(parent) = report.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::remove_file(report) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
