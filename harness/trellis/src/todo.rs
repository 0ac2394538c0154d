//! Hand-off of failing tests to a TODO list.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::PathBuf;

use trellis_model::Test;

#[derive(Debug, thiserror::Error)]
pub enum TodoSyncError {
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Receives the flat list of failing tests after a run.
pub trait TodoSync: Send + Sync {
    /// Record `failures` and return the file that was written.
    fn sync(&self, failures: &[&Test]) -> Result<PathBuf, TodoSyncError>;
}

/// Writes one markdown checkbox per failing test, replacing the file.
#[derive(Clone, Debug)]
pub struct ChecklistTodoSync {
    path: PathBuf,
    title: String,
}

impl ChecklistTodoSync {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ChecklistTodoSync {
            path: path.into(),
            title: "Failing tests".to_string(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// The checklist for `failures`.
    pub fn render(&self, failures: &[&Test]) -> String {
        let mut out = format!("# {}\n\n", self.title);
        for test in failures {
            let _ = write!(out, "- [ ] `{}` ({})", test.full_name(), test.framework.tag());
            if !test.file.is_empty() {
                let _ = write!(out, " {}", test.file);
                if test.line > 0 {
                    let _ = write!(out, ":{}", test.line);
                }
            }
            if let Some(first) = test.message.lines().map(str::trim).find(|l| !l.is_empty()) {
                let _ = write!(out, ": {first}");
            }
            out.push('\n');
        }
        out
    }
}

impl TodoSync for ChecklistTodoSync {
    fn sync(&self, failures: &[&Test]) -> Result<PathBuf, TodoSyncError> {
        fs::write(&self.path, self.render(failures)).map_err(|source| TodoSyncError::Write {
            path: self.path.clone(),
            source,
        })?;
        Ok(self.path.clone())
    }
}
