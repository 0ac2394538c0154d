//! Plain `go test`.

use std::path::Path;

use trellis_locate::{GoResolver, LocationResolver};
use trellis_model::paths::package_path;
use trellis_model::Framework;

use super::{package_root, read_go_mod, CommandSpec, Runner, RunnerError};

/// Runs packages with `go test -json`.
#[derive(Clone, Copy, Debug, Default)]
pub struct GoRunner {
    resolver: GoResolver,
}

impl GoRunner {
    pub fn new() -> Self {
        GoRunner::default()
    }
}

impl Runner for GoRunner {
    fn framework(&self) -> Framework {
        Framework::GoTest
    }

    fn detect(&self, root: &Path) -> Result<bool, RunnerError> {
        Ok(read_go_mod(root)?.is_some())
    }

    /// A package counts only if it declares a test that is not a Ginkgo
    /// bootstrap; suites made of specs alone belong to the Ginkgo runner.
    fn package_has_tests(&self, root: &Path, package: &str) -> Result<bool, RunnerError> {
        let dir = package_root(root, package)?;
        let index = self.resolver.resolve_package(root, &dir);
        Ok(index.has_runnable_tests(package))
    }

    fn build_command(
        &self,
        root: &Path,
        package: &str,
        extra_args: &[String],
    ) -> Result<CommandSpec, RunnerError> {
        package_root(root, package)?;
        Ok(CommandSpec::new("go", root)
            .args(["test", "-json"])
            .args(extra_args.iter().cloned())
            .arg(package_path(package))
            .non_zero_exit_expected(true))
    }
}
