//! Per-execution and whole-run result collections.

use serde::Serialize;

use crate::{Framework, Summary, Test};

/// Results of one subprocess execution: one framework on one package.
#[derive(Clone, Debug, Serialize)]
pub struct TestResults {
    /// The command line that was run (or would have been).
    pub command: String,
    pub framework: Framework,
    /// Root-relative package directory the execution covered.
    pub package_path: String,
    pub tests: Vec<Test>,
    pub stdout: String,
    pub stderr: String,
    /// Process exit code, `-1` when the process never exited normally.
    pub exit_code: i32,
    pub timed_out: bool,
}

impl TestResults {
    pub fn new(
        framework: Framework,
        package_path: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        TestResults {
            command: command.into(),
            framework,
            package_path: package_path.into(),
            tests: Vec::new(),
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 0,
            timed_out: false,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.tests.iter().any(|t| t.failed)
    }

    pub fn summary(&self) -> Summary {
        self.tests.iter().map(Test::summary).sum()
    }
}

/// All executions of a run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TestSuiteResults {
    pub results: Vec<TestResults>,
}

impl TestSuiteResults {
    pub fn new() -> Self {
        TestSuiteResults::default()
    }

    pub fn push(&mut self, results: TestResults) {
        self.results.push(results);
    }

    /// Deterministic ordering: executions by package then framework, tests
    /// within each execution by [`Test::report_order`].
    pub fn sort(&mut self) {
        self.results.sort_by(|a, b| {
            a.package_path
                .cmp(&b.package_path)
                .then_with(|| a.framework.cmp(&b.framework))
        });
        for results in &mut self.results {
            results.tests.sort_by(Test::report_order);
        }
    }

    /// Every test of every execution, globally sorted.
    pub fn all_tests(&self) -> Vec<&Test> {
        let mut tests: Vec<&Test> = self.results.iter().flat_map(|r| r.tests.iter()).collect();
        tests.sort_by(|a, b| a.report_order(b));
        tests
    }

    /// Failing tests only, globally sorted.
    pub fn failed_tests(&self) -> Vec<&Test> {
        let mut tests = self.all_tests();
        tests.retain(|t| t.failed);
        tests
    }

    pub fn summary(&self) -> Summary {
        self.results.iter().map(TestResults::summary).sum()
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(TestResults::has_failures)
    }

    /// Process exit status for the run: 0 = all passed, 1 = failures.
    pub fn exit_code(&self) -> i32 {
        i32::from(self.has_failures())
    }
}

impl FromIterator<TestResults> for TestSuiteResults {
    fn from_iter<I: IntoIterator<Item = TestResults>>(iter: I) -> Self {
        TestSuiteResults {
            results: iter.into_iter().collect(),
        }
    }
}
