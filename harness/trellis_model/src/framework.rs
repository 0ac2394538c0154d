//! Supported test frameworks.

use std::fmt;

use serde::Serialize;

/// A test framework trellis knows how to drive.
///
/// Command building and parser selection match on it exhaustively.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Framework {
    /// `go test -json`, streamed line by line.
    #[serde(rename = "gotest")]
    GoTest,
    /// Ginkgo with a JSON report written at exit.
    #[serde(rename = "ginkgo")]
    Ginkgo,
}

impl Framework {
    /// Every framework, in detection order.
    pub const ALL: [Framework; 2] = [Framework::GoTest, Framework::Ginkgo];

    /// Stable lowercase tag used in wire payloads and CLI flags.
    pub fn tag(self) -> &'static str {
        match self {
            Framework::GoTest => "gotest",
            Framework::Ginkgo => "ginkgo",
        }
    }

    /// Look a framework up by its tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Framework::ALL.into_iter().find(|f| f.tag() == tag)
    }

    /// Human-readable name.
    pub fn display_name(self) -> &'static str {
        match self {
            Framework::GoTest => "go test",
            Framework::Ginkgo => "ginkgo",
        }
    }

    /// Name of the synthetic test reported when an execution produces no
    /// usable results.
    pub fn execution_test_name(self) -> &'static str {
        match self {
            Framework::GoTest => "Go Execution",
            Framework::Ginkgo => "Ginkgo Execution",
        }
    }

    /// Whether results arrive incrementally on stdout while the process runs.
    ///
    /// Non-streaming frameworks write a report file that is read after exit.
    pub fn is_streaming(self) -> bool {
        match self {
            Framework::GoTest => true,
            Framework::Ginkgo => false,
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
