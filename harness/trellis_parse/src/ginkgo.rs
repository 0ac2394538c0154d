//! Ginkgo `--json-report` decoding.

use std::io::BufRead;
use std::time::Duration;

use serde::Deserialize;
use trellis_model::{Framework, Test};

use crate::{ParseError, ResultParser, StreamCounts};

const IT: &str = "It";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SuiteReport {
    #[serde(default)]
    suite_path: String,
    #[serde(default)]
    suite_description: String,
    #[serde(default)]
    spec_reports: Vec<SpecReport>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct SpecReport {
    container_hierarchy_texts: Vec<String>,
    leaf_node_text: String,
    leaf_node_type: String,
    leaf_node_location: Location,
    state: String,
    /// Nanoseconds.
    run_time: i64,
    failure: Option<Failure>,
    captured_ginkgo_writer_output: String,
    captured_std_out_err: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct Location {
    file_name: String,
    line_number: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct Failure {
    message: String,
    forwarded_panic: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Outcome {
    Passed,
    Skipped,
    Failed,
}

impl Outcome {
    fn from_state(state: &str) -> Self {
        match state {
            "passed" => Outcome::Passed,
            "skipped" | "pending" => Outcome::Skipped,
            // failed, aborted, panicked, interrupted, timedout, ...
            _ => Outcome::Failed,
        }
    }
}

/// Parser for the JSON report Ginkgo writes when the suite exits.
#[derive(Copy, Clone, Debug, Default)]
pub struct GinkgoReportParser;

impl GinkgoReportParser {
    pub fn new() -> Self {
        GinkgoReportParser
    }

    fn decode(raw: &[u8]) -> Result<Vec<Test>, ParseError> {
        let suites: Vec<SuiteReport> = serde_json::from_slice(raw)?;
        let mut tests = Vec::new();
        for suite in suites {
            tracing::debug!(
                suite = %suite.suite_description,
                specs = suite.spec_reports.len(),
                "decoded suite report"
            );
            for spec in suite.spec_reports {
                if let Some(test) = spec_to_test(&suite.suite_path, spec) {
                    tests.push(test);
                }
            }
        }
        Ok(tests)
    }
}

fn spec_to_test(suite_path: &str, spec: SpecReport) -> Option<Test> {
    let outcome = Outcome::from_state(&spec.state);
    let is_spec = spec.leaf_node_type.is_empty() || spec.leaf_node_type == IT;
    if !is_spec && outcome == Outcome::Passed {
        return None;
    }

    let name = if spec.leaf_node_text.is_empty() && !is_spec {
        format!("[{}]", spec.leaf_node_type)
    } else {
        spec.leaf_node_text
    };

    let mut test = Test::case(Framework::Ginkgo, name);
    test.package = suite_path.to_string();
    test.suite = spec.container_hierarchy_texts;
    // `Failure.Location` is shared by every entry of a table; only the
    // declaration site tells entries apart.
    test.file = spec.leaf_node_location.file_name;
    test.line = spec.leaf_node_location.line_number;
    test.duration = Duration::from_nanos(u64::try_from(spec.run_time).unwrap_or(0));

    let mut stdout = spec.captured_ginkgo_writer_output;
    stdout.push_str(&spec.captured_std_out_err);
    test.stdout = stdout;

    if let Some(failure) = spec.failure {
        test.message = failure.message;
        if !failure.forwarded_panic.is_empty() {
            if !test.message.is_empty() {
                test.message.push('\n');
            }
            test.message.push_str(&failure.forwarded_panic);
        }
    }

    match outcome {
        Outcome::Passed => test.mark_passed(),
        Outcome::Skipped => test.mark_skipped(),
        Outcome::Failed => test.mark_failed(),
    }
    Some(test)
}

impl ResultParser for GinkgoReportParser {
    fn framework(&self) -> Framework {
        Framework::Ginkgo
    }

    fn parse(&self, raw: &[u8]) -> Result<Vec<Test>, ParseError> {
        GinkgoReportParser::decode(raw)
    }

    /// The report is only complete once written, so "streaming" reads it
    /// whole and then reports every spec.
    fn parse_stream(
        &self,
        input: &mut dyn BufRead,
        sink: &mut dyn FnMut(Test),
        progress: &mut dyn FnMut(&Test),
    ) -> Result<StreamCounts, ParseError> {
        let mut raw = Vec::new();
        input.read_to_end(&mut raw)?;
        let tests = GinkgoReportParser::decode(&raw)?;
        let counts = StreamCounts::of(&tests);
        for test in tests {
            progress(&test);
            sink(test);
        }
        Ok(counts)
    }
}
