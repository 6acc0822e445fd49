//! File-change watcher.
//!
//! The sync executor consumes [`ChangeEvent`]s from a channel and never talks to
//! the watching backend directly. Setting up watches goes through the
//! [`ChangeWatcher`] trait, implemented by [`NotifyWatcher`].
//!
//! # Structure
//!
//! - `subscription` - Subscription names that carry the watched source folder
//! - `config` - Per-folder `.watchmanconfig` file
//! - `native` - `notify`-backed implementation

mod config;
mod native;
mod subscription;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use config::{WATCHMAN_CONFIG_FILE, WatchmanConfig, ensure_watchman_config};
pub use native::{NotifyWatcher, collect_changes};
pub use subscription::{SUBSCRIPTION_PREFIX, SubscriptionName};

/// Capability every subscription of this tool depends on.
pub const RELATIVE_ROOT_CAPABILITY: &str = "relative_root";

/// Glob matched against the base name of every changed file.
pub const DEFAULT_MATCH_PATTERN: &str = "*.*";

/// Fields requested for every changed file.
pub const DEFAULT_FIELDS: [&str; 5] = ["name", "size", "mtime_ms", "exists", "type"];

/// Kind of a changed directory entry.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileKind {
    #[serde(rename = "f")]
    #[default]
    File,
    #[serde(rename = "d")]
    Directory,
    #[serde(rename = "l")]
    Symlink,
    #[serde(other)]
    Other,
}

/// One changed file, named relative to the subscription's folder.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct FileChange {
    pub name: String,
    pub size: u64,
    pub mtime_ms: i64,
    pub exists: bool,
    #[serde(rename = "type")]
    pub kind: FileKind,
}

impl FileChange {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exists: true,
            ..Default::default()
        }
    }
}

/// A batch of changes delivered for one subscription.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub subscription: String,
    pub root: PathBuf,
    pub files: Vec<FileChange>,
}

/// Capabilities reported by a watcher backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub supported: Vec<String>,
}

impl Capabilities {
    pub fn has(&self, name: &str) -> bool {
        self.supported.iter().any(|c| c == name)
    }
}

/// Where a folder is actually watched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRoot {
    /// Root the backend watches.
    pub watch: PathBuf,
    /// The requested folder relative to `watch`, when an existing root was reused.
    pub relative_path: Option<PathBuf>,
    pub warning: Option<String>,
}

/// What a subscription reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    pub pattern: String,
    pub fields: Vec<String>,
    /// Limits the subscription to this folder below the watch root.
    pub relative_root: Option<PathBuf>,
}

impl SubscriptionRequest {
    pub fn for_root(root: &WatchRoot) -> Self {
        Self {
            pattern: DEFAULT_MATCH_PATTERN.to_string(),
            fields: DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
            relative_root: root.relative_path.clone(),
        }
    }

    /// Query expression in watchman syntax.
    pub fn expression(&self) -> serde_json::Value {
        serde_json::json!(["allof", ["match", self.pattern]])
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait ChangeWatcher: Send {
    /// Fail unless every capability in `required` is supported.
    fn capability_check(&self, required: &[String]) -> Result<Capabilities>;

    /// Start (or reuse) a watch covering `path`.
    fn watch_root(&mut self, path: &Path) -> Result<WatchRoot>;

    /// Register a named subscription on a watch root. Events are tagged with `name`.
    fn subscribe(&mut self, root: &Path, name: &str, request: &SubscriptionRequest) -> Result<()>;
}
