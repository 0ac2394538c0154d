//! Streaming parser for `go test -json` events.
//!
//! Each line is one event. Test-scoped events accumulate into a provisional
//! [`Test`] per (package, name) that is updated in place as `run`, `output`
//! and terminal (`pass`/`fail`/`skip`) events arrive. Package-scoped events
//! produce synthetic tests so a package never disappears from the report:
//!
//! - `build-output`* then `build-fail` → one failing [`BUILD_FAILED`] test
//! - package `skip` with no tests → one skipped [`NO_TEST_FILES`] test
//! - package `fail` with no failing test → one failing [`PACKAGE_FAILED`] test

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use trellis_locate::LocationIndex;
use trellis_model::paths::package_dir;
use trellis_model::{Framework, Test};

use crate::{ParseError, ResultParser, StreamCounts};

/// Name of the synthetic test for a package that failed to compile.
pub const BUILD_FAILED: &str = "Build Failed";
/// Name of the synthetic test for a package without test files.
pub const NO_TEST_FILES: &str = "No test files";
/// Name of the synthetic test for a package failure outside any test.
pub const PACKAGE_FAILED: &str = "Package Failed";

const NO_RESULT: &str = "test did not report a result";

/// Framework banner lines that carry no information beyond the events.
const BANNERS: [&str; 7] = [
    "=== RUN",
    "=== PAUSE",
    "=== CONT",
    "=== NAME",
    "--- PASS:",
    "--- FAIL:",
    "--- SKIP:",
];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum Action {
    Start,
    Run,
    Pause,
    Cont,
    Pass,
    Fail,
    Skip,
    Output,
    Bench,
    BuildOutput,
    BuildFail,
    #[serde(other)]
    Unknown,
}

/// One line of `go test -json` output.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Event {
    action: Action,
    #[serde(default)]
    package: String,
    /// Set instead of `Package` on build events.
    #[serde(default)]
    import_path: String,
    #[serde(default)]
    test: String,
    #[serde(default)]
    elapsed: Option<f64>,
    #[serde(default)]
    output: String,
    #[serde(default)]
    failed_build: String,
}

/// Whether a line of test output is a framework banner.
pub fn is_banner_line(output: &str) -> bool {
    let line = output.trim_start();
    BANNERS.iter().any(|banner| line.starts_with(banner))
}

/// Parser for `go test -json` output of one package.
#[derive(Clone, Debug)]
pub struct GoTestParser {
    locations: Arc<LocationIndex>,
    package_dir: String,
}

impl GoTestParser {
    /// Parser resolving locations from `locations` within `package`.
    pub fn new(locations: Arc<LocationIndex>, package: &str) -> Self {
        GoTestParser {
            locations,
            package_dir: package_dir(package).to_string(),
        }
    }

    pub fn without_locations() -> Self {
        GoTestParser::new(Arc::new(LocationIndex::new()), ".")
    }
}

impl ResultParser for GoTestParser {
    fn framework(&self) -> Framework {
        Framework::GoTest
    }

    fn parse_stream(
        &self,
        input: &mut dyn BufRead,
        sink: &mut dyn FnMut(Test),
        progress: &mut dyn FnMut(&Test),
    ) -> Result<StreamCounts, ParseError> {
        let mut state = StreamState::new(self);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            state.handle_line(line.trim(), progress);
        }

        let tests = state.finish(progress);
        let counts = StreamCounts::of(&tests);
        for test in tests {
            sink(test);
        }
        Ok(counts)
    }
}

struct Entry {
    test: Test,
    output: String,
    finished: bool,
}

struct StreamState<'p> {
    parser: &'p GoTestParser,
    entries: Vec<Entry>,
    by_name: FxHashMap<(String, String), usize>,
    build_output: FxHashMap<String, String>,
    package_output: FxHashMap<String, String>,
    packages_with_tests: FxHashSet<String>,
    packages_with_failures: FxHashSet<String>,
    failed_builds: FxHashSet<String>,
}

impl<'p> StreamState<'p> {
    fn new(parser: &'p GoTestParser) -> Self {
        StreamState {
            parser,
            entries: Vec::new(),
            by_name: FxHashMap::default(),
            build_output: FxHashMap::default(),
            package_output: FxHashMap::default(),
            packages_with_tests: FxHashSet::default(),
            packages_with_failures: FxHashSet::default(),
            failed_builds: FxHashSet::default(),
        }
    }

    fn handle_line(&mut self, line: &str, progress: &mut dyn FnMut(&Test)) {
        if line.is_empty() {
            return;
        }
        if !line.starts_with('{') {
            tracing::debug!(line, "ignoring non-JSON output");
            return;
        }
        match serde_json::from_str::<Event>(line) {
            Ok(event) => self.handle(event, progress),
            Err(e) => tracing::warn!("skipping malformed test event: {e}"),
        }
    }

    fn handle(&mut self, event: Event, progress: &mut dyn FnMut(&Test)) {
        let package = if event.package.is_empty() {
            event.import_path.clone()
        } else {
            event.package.clone()
        };

        match event.action {
            Action::BuildOutput => self
                .build_output
                .entry(package)
                .or_default()
                .push_str(&event.output),
            Action::BuildFail => self.record_build_failure(package, progress),
            _ if event.test.is_empty() => self.handle_package_event(package, event, progress),
            _ => self.handle_test_event(package, &event, progress),
        }
    }

    fn handle_package_event(
        &mut self,
        package: String,
        event: Event,
        progress: &mut dyn FnMut(&Test),
    ) {
        match event.action {
            Action::Output => {
                if !is_banner_line(&event.output) {
                    self.package_output
                        .entry(package)
                        .or_default()
                        .push_str(&event.output);
                }
            }
            Action::Skip => {
                if self.packages_with_tests.contains(&package) {
                    return;
                }
                let output = self.package_output.remove(&package).unwrap_or_default();
                let mut test = Test::skipped(Framework::GoTest, NO_TEST_FILES, output.trim_end());
                test.package = package;
                self.push_finished(test, progress);
            }
            Action::Fail => {
                if self.failed_builds.contains(&package)
                    || self.failed_builds.contains(&event.failed_build)
                {
                    return;
                }
                if !event.failed_build.is_empty() {
                    // Build failure announced only on the package event.
                    let output = self.package_output.remove(&package).unwrap_or_default();
                    self.build_output
                        .entry(package.clone())
                        .or_default()
                        .push_str(&output);
                    self.record_build_failure(package, progress);
                    return;
                }
                if self.packages_with_failures.contains(&package) {
                    return;
                }
                let output = self.package_output.remove(&package).unwrap_or_default();
                let mut test = Test::failed(
                    Framework::GoTest,
                    PACKAGE_FAILED,
                    output.trim_end(),
                    elapsed(event.elapsed),
                );
                test.package.clone_from(&package);
                self.packages_with_failures.insert(package);
                self.push_finished(test, progress);
            }
            _ => {}
        }
    }

    fn handle_test_event(&mut self, package: String, event: &Event, progress: &mut dyn FnMut(&Test)) {
        let index = self.entry_index(&package, &event.test);
        let entry = &mut self.entries[index];

        match event.action {
            Action::Output => {
                if !is_banner_line(&event.output) {
                    entry.output.push_str(&event.output);
                }
            }
            Action::Pass | Action::Fail | Action::Skip => {
                let test = &mut entry.test;
                match event.action {
                    Action::Pass => test.mark_passed(),
                    Action::Fail => test.mark_failed(),
                    _ => test.mark_skipped(),
                }
                test.duration = elapsed(event.elapsed);
                test.stdout.clone_from(&entry.output);
                if !test.passed {
                    test.message = entry.output.trim_end().to_string();
                }
                entry.finished = true;
                if test.failed {
                    self.packages_with_failures.insert(package);
                }
                progress(test);
            }
            _ => {}
        }
    }

    fn entry_index(&mut self, package: &str, name: &str) -> usize {
        let key = (package.to_string(), name.to_string());
        if let Some(&index) = self.by_name.get(&key) {
            return index;
        }

        let mut test = Test::case(Framework::GoTest, name);
        test.package = package.to_string();
        if let Some((parents, _)) = name.rsplit_once('/') {
            test.suite = parents.split('/').map(str::to_string).collect();
        }
        if let Some(location) = self.parser.locations.lookup(&self.parser.package_dir, name) {
            test.apply_location(location);
        }

        self.packages_with_tests.insert(package.to_string());
        self.entries.push(Entry {
            test,
            output: String::new(),
            finished: false,
        });
        let index = self.entries.len() - 1;
        self.by_name.insert(key, index);
        index
    }

    fn record_build_failure(&mut self, package: String, progress: &mut dyn FnMut(&Test)) {
        if !self.failed_builds.insert(package.clone()) {
            return;
        }
        let output = self.build_output.remove(&package).unwrap_or_default();
        let mut test = Test::failed(Framework::GoTest, BUILD_FAILED, output, Duration::ZERO);
        test.package = package;
        self.push_finished(test, progress);
    }

    fn push_finished(&mut self, test: Test, progress: &mut dyn FnMut(&Test)) {
        progress(&test);
        self.entries.push(Entry {
            test,
            output: String::new(),
            finished: true,
        });
    }

    /// Close out the stream: fail tests that never finished and drop
    /// bootstrap entry points.
    fn finish(self, progress: &mut dyn FnMut(&Test)) -> Vec<Test> {
        let StreamState {
            parser,
            entries,
            build_output,
            ..
        } = self;

        let mut tests = Vec::with_capacity(entries.len());
        for mut entry in entries {
            if !entry.finished {
                let mut message = entry.output.trim_end().to_string();
                if !message.is_empty() {
                    message.push('\n');
                }
                message.push_str(NO_RESULT);
                entry.test.message = message;
                entry.test.stdout = entry.output;
                entry.test.mark_failed();
                progress(&entry.test);
            }
            if parser
                .locations
                .is_bootstrap(&parser.package_dir, &entry.test.name)
            {
                tracing::debug!(test = %entry.test.name, "dropping bootstrap test");
                continue;
            }
            tests.push(entry.test);
        }

        // Successful builds can emit build output too (cgo warnings,
        // `-gcflags=-m`); without a `build-fail` it is not a failure.
        for (package, output) in &build_output {
            if !output.trim().is_empty() {
                tracing::debug!(%package, "discarding build output of a successful build");
            }
        }

        tests
    }
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "finite, positive and rounded before the cast"
)]
fn elapsed(seconds: Option<f64>) -> Duration {
    match seconds {
        Some(s) if s.is_finite() && s > 0.0 => Duration::from_nanos((s * 1e9).round() as u64),
        _ => Duration::ZERO,
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
