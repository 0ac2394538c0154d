//! Per-framework runners.
//!
//! A [`Runner`] knows how to recognize its framework in a source tree, which
//! package directories belong to it, and how to invoke it for one package.
//! It never executes anything itself; [`Runner::build_command`] returns an
//! unexecuted [`CommandSpec`].

mod ginkgo;
mod go;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use trellis_locate::walk::test_package_dirs;
use trellis_model::paths::{package_dir, package_path, relative_dir};
use trellis_model::Framework;

pub use ginkgo::GinkgoRunner;
pub use go::GoRunner;

/// Errors raised by runner queries.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid package path `{0}`")]
    InvalidPackage(String),
}

impl RunnerError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        RunnerError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A command ready to run, plus how to interpret its outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Report file written by batch frameworks; parsed instead of stdout.
    pub report_file: Option<PathBuf>,
    /// A non-zero exit is the framework's normal way of saying "tests failed".
    pub non_zero_exit_expected: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            report_file: None,
            non_zero_exit_expected: false,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn report_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn non_zero_exit_expected(mut self, expected: bool) -> Self {
        self.non_zero_exit_expected = expected;
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Capability contract of one test framework.
pub trait Runner: Send + Sync {
    fn framework(&self) -> Framework;

    /// Whether the tree at `root` uses this framework.
    fn detect(&self, root: &Path) -> Result<bool, RunnerError>;

    /// `./`-prefixed, `/`-separated package paths under `root` that this
    /// framework should run, sorted.
    fn discover_packages(&self, root: &Path) -> Result<Vec<String>, RunnerError> {
        let mut packages = Vec::new();
        for dir in test_package_dirs(root) {
            let Some(key) = relative_dir(root, &dir) else {
                continue;
            };
            let package = package_path(&key);
            if self.package_has_tests(root, &package)? {
                packages.push(package);
            }
        }
        Ok(packages)
    }

    /// Whether `package` holds tests this framework owns. Keeps one
    /// framework's packages out of another's discovery.
    fn package_has_tests(&self, root: &Path, package: &str) -> Result<bool, RunnerError>;

    fn build_command(
        &self,
        root: &Path,
        package: &str,
        extra_args: &[String],
    ) -> Result<CommandSpec, RunnerError>;
}

/// Filesystem directory of `package` under `root`.
///
/// Rejects absolute paths and `..` so a package can never point outside the
/// tree.
pub fn package_root(root: &Path, package: &str) -> Result<PathBuf, RunnerError> {
    let dir = package_dir(package);
    if dir == "." {
        return Ok(root.to_path_buf());
    }
    let relative = Path::new(dir);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(RunnerError::InvalidPackage(package.to_string()));
    }
    Ok(root.join(relative))
}

/// Contents of `root/go.mod`, or `None` when there is none.
pub(crate) fn read_go_mod(root: &Path) -> Result<Option<String>, RunnerError> {
    let path = root.join("go.mod");
    match fs::read_to_string(&path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(RunnerError::io(&path, e)),
    }
}
