//! Run configuration.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

/// Default wall-clock bound for one package's subprocess.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Environment variable overriding the timeout, in seconds.
pub const TIMEOUT_ENV: &str = "TRELLIS_TIMEOUT";

/// What to run and how.
#[derive(Clone, Debug)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "Config struct: each bool controls an independent flag"
)]
pub struct RunConfig {
    /// Source tree root. Package paths are relative to it.
    pub root: PathBuf,
    /// Starting directories; empty means the whole tree.
    pub paths: Vec<PathBuf>,
    /// Passed to every framework command before the package argument.
    pub extra_args: Vec<String>,
    pub timeout: Duration,
    /// Worker threads; `None` uses the available parallelism.
    pub jobs: Option<NonZeroUsize>,
    /// Stop after discovery and report the planned commands.
    pub dry_run: bool,
    /// Hand failures to the configured TODO sync.
    pub sync_todos: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            root: PathBuf::from("."),
            paths: Vec::new(),
            extra_args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            jobs: None,
            dry_run: false,
            sync_todos: false,
        }
    }
}

impl RunConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        RunConfig {
            root: root.into(),
            ..RunConfig::default()
        }
    }

    /// Default config with the timeout taken from [`TIMEOUT_ENV`] when it
    /// holds a positive number of seconds.
    pub fn from_env(root: impl Into<PathBuf>) -> Self {
        let mut config = RunConfig::new(root);
        if let Ok(value) = std::env::var(TIMEOUT_ENV) {
            match parse_timeout(&value) {
                Some(timeout) => config.timeout = timeout,
                None => tracing::warn!(value, "ignoring invalid {TIMEOUT_ENV}"),
            }
        }
        config
    }

    pub fn effective_jobs(&self) -> usize {
        self.jobs
            .or_else(|| thread::available_parallelism().ok())
            .map_or(1, NonZeroUsize::get)
    }
}

/// Positive whole seconds.
pub fn parse_timeout(value: &str) -> Option<Duration> {
    match value.trim().parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(seconds) => Some(Duration::from_secs(seconds)),
    }
}
