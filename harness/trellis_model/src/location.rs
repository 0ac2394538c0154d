//! Source locations of test entry points.

use serde::Serialize;

/// Where a test function is declared.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TestLocation {
    /// Root-relative path with `/` separators.
    pub file: String,
    /// 1-based line of the declaration.
    pub line: u32,
    /// The function only hands control to another framework's runner.
    ///
    /// Bootstrap functions never appear as test results.
    pub is_bootstrap: bool,
}

impl TestLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        TestLocation {
            file: file.into(),
            line,
            is_bootstrap: false,
        }
    }

    #[must_use]
    pub fn bootstrap(mut self) -> Self {
        self.is_bootstrap = true;
        self
    }
}
