//! Test result data model.
//!
//! Every framework adapter produces the same shapes:
//!
//! ```text
//! Parser ──► Vec<Test> (flat leaves)
//!               │
//!               ▼
//!        TestResults (one subprocess)
//!               │
//!               ▼
//!      TestSuiteResults (whole run) ──► tree builder ──► container Tests
//! ```
//!
//! Leaves carry exactly one of `failed`/`skipped`/`passed`. Containers
//! (`Directory`, `File`, `Suite`) are only introduced by the tree builder.

mod framework;
mod location;
pub mod paths;
mod results;
mod summary;

pub use framework::Framework;
pub use location::TestLocation;
pub use results::{TestResults, TestSuiteResults};
pub use summary::Summary;
pub use test::{Test, TestKind};
