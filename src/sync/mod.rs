//! Change-event translation and file copying.
//!
//! A [`ChangeEvent`](crate::watcher::ChangeEvent) is translated into one
//! [`CopyTask`] per (changed file, destination) pair of the matching watch
//! entry, then the tasks are executed concurrently.
//!
//! # Structure
//!
//! - `executor` - Translation and copy execution
//! - `subscribe` - Registering watcher subscriptions for a watch plan

mod executor;
mod subscribe;

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

pub use executor::SyncExecutor;
pub use subscribe::subscribe_watch_plan;

/// Copy one source file over one destination file.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CopyTask {
    pub from: PathBuf,
    pub to: PathBuf,
}

impl fmt::Display for CopyTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from.display(), self.to.display())
    }
}

/// A copy that did not complete.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CopyFailure {
    pub task: CopyTask,
    pub error: String,
    pub from_exists: bool,
    pub to_exists: bool,
}

/// Outcome of executing the copy tasks of one event.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub copied: Vec<CopyTask>,
    /// Tasks whose destination resolves to the source file itself.
    pub skipped: Vec<CopyTask>,
    pub failed: Vec<CopyFailure>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}
