//! Framework → runner and framework → parser tables.
//!
//! The registry is an ordinary value built by the caller, so tests can
//! assemble isolated registries with fake runners.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use trellis_locate::LocationIndex;
use trellis_model::Framework;
use trellis_parse::{GinkgoReportParser, GoTestParser, ResultParser};

use crate::runner::{GinkgoRunner, GoRunner, Runner, RunnerError};

/// Registered runners, iterated in [`Framework`] order.
#[derive(Clone, Default)]
pub struct Registry {
    runners: BTreeMap<Framework, Arc<dyn Runner>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Registry::default()
    }

    /// Every built-in runner. Ginkgo reports go below `report_dir`.
    pub fn standard(report_dir: &Path) -> Self {
        let mut registry = Registry::new();
        registry.register(Arc::new(GoRunner::new()));
        registry.register(Arc::new(GinkgoRunner::new(report_dir)));
        registry
    }

    /// Add or replace the runner for its framework.
    pub fn register(&mut self, runner: Arc<dyn Runner>) {
        self.runners.insert(runner.framework(), runner);
    }

    pub fn runner(&self, framework: Framework) -> Option<&Arc<dyn Runner>> {
        self.runners.get(&framework)
    }

    pub fn frameworks(&self) -> impl Iterator<Item = Framework> + '_ {
        self.runners.keys().copied()
    }

    /// Frameworks whose runner detects itself under `root`.
    ///
    /// Detection is cheap and all-or-nothing: the first error aborts.
    pub fn detect_all(&self, root: &Path) -> Result<Vec<Framework>, RunnerError> {
        let mut detected = Vec::new();
        for (&framework, runner) in &self.runners {
            if runner.detect(root)? {
                tracing::debug!(%framework, "framework detected");
                detected.push(framework);
            }
        }
        Ok(detected)
    }

    /// Parser for one unit of `framework` output.
    pub fn parser(
        framework: Framework,
        locations: &Arc<LocationIndex>,
        package: &str,
    ) -> Box<dyn ResultParser> {
        match framework {
            Framework::GoTest => Box::new(GoTestParser::new(Arc::clone(locations), package)),
            Framework::Ginkgo => Box::new(GinkgoReportParser::new()),
        }
    }

    /// Parser looked up by wire tag (`gotest`, `ginkgo`).
    pub fn parser_by_name(
        tag: &str,
        locations: &Arc<LocationIndex>,
        package: &str,
    ) -> Option<Box<dyn ResultParser>> {
        Framework::from_tag(tag).map(|framework| Registry::parser(framework, locations, package))
    }
}
