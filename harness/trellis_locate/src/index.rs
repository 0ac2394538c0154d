//! Name → location lookup table.

use rustc_hash::FxHashMap;
use trellis_model::paths::package_dir;
use trellis_model::TestLocation;

/// Test locations keyed by package directory and function name.
///
/// Built once before execution and shared read-only between parsers.
#[derive(Clone, Debug, Default)]
pub struct LocationIndex {
    by_dir: FxHashMap<String, FxHashMap<String, TestLocation>>,
}

impl LocationIndex {
    pub fn new() -> Self {
        LocationIndex::default()
    }

    /// Record a location. `dir` may be a package path or directory key.
    pub fn insert(&mut self, dir: &str, name: impl Into<String>, location: TestLocation) {
        self.by_dir
            .entry(package_dir(dir).to_string())
            .or_default()
            .insert(name.into(), location);
    }

    /// Exact lookup.
    pub fn get(&self, dir: &str, name: &str) -> Option<&TestLocation> {
        self.by_dir.get(package_dir(dir))?.get(name)
    }

    /// Lookup with subtest fallback: `TestA/case` resolves to `TestA` when it
    /// has no entry of its own.
    pub fn lookup(&self, dir: &str, name: &str) -> Option<&TestLocation> {
        self.get(dir, name).or_else(|| {
            let (parent, _) = name.split_once('/')?;
            self.get(dir, parent)
        })
    }

    pub fn is_bootstrap(&self, dir: &str, name: &str) -> bool {
        self.lookup(dir, name).is_some_and(|l| l.is_bootstrap)
    }

    /// Whether `dir` declares at least one test that is not a bootstrap.
    pub fn has_runnable_tests(&self, dir: &str) -> bool {
        self.by_dir
            .get(package_dir(dir))
            .is_some_and(|names| names.values().any(|l| !l.is_bootstrap))
    }

    /// Entries of one directory, sorted by name.
    pub fn entries(&self, dir: &str) -> Vec<(&str, &TestLocation)> {
        let mut entries: Vec<_> = self
            .by_dir
            .get(package_dir(dir))
            .map(|names| names.iter().map(|(n, l)| (n.as_str(), l)).collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Fold another index into this one; entries of `other` win.
    pub fn merge(&mut self, other: LocationIndex) {
        for (dir, names) in other.by_dir {
            self.by_dir.entry(dir).or_default().extend(names);
        }
    }

    pub fn len(&self) -> usize {
        self.by_dir.values().map(FxHashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
