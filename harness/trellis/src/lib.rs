//! Multi-framework test orchestration.
//!
//! [`Orchestrator::run`] detects which frameworks a source tree uses,
//! discovers their packages, runs one subprocess per (framework, package)
//! on a scoped thread pool, parses each unit's output and folds everything
//! into one sorted [`TestSuiteResults`]. Every execution failure ends up as
//! a named failing test; only pre-flight problems abort a run.
//!
//! [`TestSuiteResults`]: trellis_model::TestSuiteResults

pub mod commands;
pub mod exec;
pub mod orchestrator;
pub mod registry;
pub mod runner;
pub mod todo;

use std::sync::Once;

pub use orchestrator::{Orchestrator, PlannedUnit, ProgressFn, RunConfig, RunError, RunOutcome};
pub use registry::Registry;
pub use runner::{CommandSpec, Runner, RunnerError};
pub use todo::{ChecklistTodoSync, TodoSync, TodoSyncError};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing from `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset. Output goes to stderr as an
/// indented span tree so per-unit events stay grouped.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_writer(std::io::stderr)
                        .with_targets(true)
                        .with_bracketed_fields(true),
                )
                .with(filter)
                .init();
        }
    });
}
