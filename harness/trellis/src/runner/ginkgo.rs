//! Ginkgo suites.

use std::fs;
use std::path::{Path, PathBuf};

use trellis_locate::walk::test_source_files;
use trellis_model::paths::{package_dir, package_path};
use trellis_model::Framework;

use super::{package_root, read_go_mod, CommandSpec, Runner, RunnerError};

/// Module path shared by Ginkgo v1 and v2 imports.
const GINKGO_MODULE: &str = "github.com/onsi/ginkgo";

/// Name of the JSON report inside each package's output directory.
pub const REPORT_FILE: &str = "report.json";

/// Runs packages with the `ginkgo` CLI and reads its JSON report.
#[derive(Clone, Debug)]
pub struct GinkgoRunner {
    report_dir: PathBuf,
}

impl GinkgoRunner {
    /// Reports are written to one subdirectory of `report_dir` per package.
    pub fn new(report_dir: impl Into<PathBuf>) -> Self {
        GinkgoRunner {
            report_dir: report_dir.into(),
        }
    }

    /// Output directory for `package`: `pkg/api` → `<report_dir>/pkg%2Fapi`.
    ///
    /// Injective: two packages never share a report directory.
    pub fn output_dir(&self, package: &str) -> PathBuf {
        self.report_dir.join(escape_dir_name(package_dir(package)))
    }
}

/// Percent-escape a directory key into a single path component. The root
/// key `.` becomes `%2E`.
fn escape_dir_name(dir: &str) -> String {
    if dir == "." {
        return "%2E".to_string();
    }
    let mut name = String::with_capacity(dir.len());
    for c in dir.chars() {
        match c {
            '%' => name.push_str("%25"),
            '/' => name.push_str("%2F"),
            '\\' => name.push_str("%5C"),
            c => name.push(c),
        }
    }
    name
}

impl Runner for GinkgoRunner {
    fn framework(&self) -> Framework {
        Framework::Ginkgo
    }

    fn detect(&self, root: &Path) -> Result<bool, RunnerError> {
        Ok(read_go_mod(root)?.is_some_and(|contents| contents.contains(GINKGO_MODULE)))
    }

    fn package_has_tests(&self, root: &Path, package: &str) -> Result<bool, RunnerError> {
        let dir = package_root(root, package)?;
        let import = format!("\"{GINKGO_MODULE}");
        for file in test_source_files(&dir) {
            let source = fs::read_to_string(&file).map_err(|e| RunnerError::io(&file, e))?;
            if source.contains(&import) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn build_command(
        &self,
        root: &Path,
        package: &str,
        extra_args: &[String],
    ) -> Result<CommandSpec, RunnerError> {
        package_root(root, package)?;
        let output_dir = self.output_dir(package);
        Ok(CommandSpec::new("ginkgo", root)
            .arg("--no-color")
            .arg(format!("--json-report={REPORT_FILE}"))
            .arg(format!("--output-dir={}", output_dir.display()))
            .args(extra_args.iter().cloned())
            .arg(package_path(package))
            .report_file(output_dir.join(REPORT_FILE))
            .non_zero_exit_expected(true))
    }
}
