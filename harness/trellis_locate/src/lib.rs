//! Test source location resolution.
//!
//! Maps test names to the file and line that declare them, and flags
//! bootstrap functions (entry points that only hand control to another
//! framework's runner). Resolution is best-effort enrichment: a file that
//! cannot be read or parsed is skipped, never reported as an error.
//!
//! The scanning itself is language-specific and sits behind
//! [`LocationResolver`]; [`GoResolver`] handles Go sources.

mod go;
mod index;
pub mod walk;

use std::path::Path;

pub use go::{is_test_entry, GoResolver, SPEC_RUNNER};
pub use index::LocationIndex;

/// Builds a [`LocationIndex`] by scanning test sources.
pub trait LocationResolver: Send + Sync {
    /// Scan every test package at or below `dir`.
    ///
    /// Directory keys and file paths in the result are relative to `root`.
    fn resolve(&self, root: &Path, dir: &Path) -> LocationIndex;

    /// Scan the test sources of the single package directory `dir`.
    fn resolve_package(&self, root: &Path, dir: &Path) -> LocationIndex;
}
