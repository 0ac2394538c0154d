//! Result parsers.
//!
//! Two wire shapes are supported:
//! - [`GoTestParser`]: one JSON event per line, consumed while the process
//!   runs. Malformed lines are logged and skipped.
//! - [`GinkgoReportParser`]: one JSON document written at exit. A malformed
//!   document fails the whole batch.

mod ginkgo;
mod go_json;

use std::io::BufRead;

use trellis_model::{Framework, Test};

pub use ginkgo::GinkgoReportParser;
pub use go_json::{is_banner_line, GoTestParser, BUILD_FAILED, NO_TEST_FILES, PACKAGE_FAILED};

/// Errors that invalidate a whole parse.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read test output: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Pass/fail tallies of a streamed parse.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamCounts {
    pub passed: usize,
    pub failed: usize,
}

impl StreamCounts {
    /// Tally the final test list.
    pub fn of(tests: &[Test]) -> Self {
        StreamCounts {
            passed: tests.iter().filter(|t| t.passed).count(),
            failed: tests.iter().filter(|t| t.failed).count(),
        }
    }
}

/// Converts raw framework output into flat test leaves.
pub trait ResultParser: Send {
    fn framework(&self) -> Framework;

    /// Parse a complete output buffer.
    fn parse(&self, raw: &[u8]) -> Result<Vec<Test>, ParseError> {
        let mut reader = raw;
        let mut tests = Vec::new();
        self.parse_stream(&mut reader, &mut |test| tests.push(test), &mut |_| {})?;
        Ok(tests)
    }

    /// Parse incrementally from `input`.
    ///
    /// `progress` sees each test as it reaches a terminal state; `sink`
    /// receives the final tests once the input is exhausted.
    fn parse_stream(
        &self,
        input: &mut dyn BufRead,
        sink: &mut dyn FnMut(Test),
        progress: &mut dyn FnMut(&Test),
    ) -> Result<StreamCounts, ParseError>;
}
