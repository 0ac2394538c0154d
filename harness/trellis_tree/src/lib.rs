//! Report tree construction.
//!
//! Turns the flat, globally sorted test list into nested containers:
//!
//! ```text
//! Directory (one per path segment)
//!   File (relative to its directory)
//!     Suite (one per Suite segment)
//!       Case
//! ```
//!
//! Construction is a pure function of its input. Containers are new values;
//! leaves are cloned, so the caller's results stay untouched. Verbosity and
//! empty-section pruning are separate passes over the built tree.

mod build;
mod prune;

use trellis_model::{Summary, Test};

pub use build::{build_tree, flatten_leaves};
pub use prune::{apply_verbosity, prune_empty_sections, Verbosity};

/// Build, prune to `verbosity`, then drop empty sections.
pub fn build_report(tests: &[Test], verbosity: Verbosity) -> Vec<Test> {
    let roots = build_tree(tests);
    let roots = apply_verbosity(roots, verbosity);
    prune_empty_sections(roots)
}

/// Aggregate of every root.
pub fn tree_summary(roots: &[Test]) -> Summary {
    roots.iter().map(Test::summary).sum()
}
