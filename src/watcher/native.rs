use anyhow::{Context, Result, bail};
use log::{debug, warn};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;
use tokio::sync::mpsc::UnboundedSender;

use super::{
    Capabilities, ChangeEvent, ChangeWatcher, FileChange, FileKind, RELATIVE_ROOT_CAPABILITY,
    SubscriptionRequest, WatchRoot,
};
use crate::runtime::{is_path_under, relative_path_from_dir};

/// Recursive `notify` watches feeding [`ChangeEvent`]s into a channel.
///
/// Watching a folder below an existing watch root reuses that root, and the
/// folder is reported as a path relative to it.
pub struct NotifyWatcher {
    sender: UnboundedSender<ChangeEvent>,
    ignore_dirs: Vec<String>,
    roots: Vec<PathBuf>,
    watchers: Vec<RecommendedWatcher>,
}

impl NotifyWatcher {
    pub fn new(sender: UnboundedSender<ChangeEvent>, ignore_dirs: Vec<String>) -> Self {
        Self {
            sender,
            ignore_dirs,
            roots: Vec::new(),
            watchers: Vec::new(),
        }
    }
}

impl ChangeWatcher for NotifyWatcher {
    fn capability_check(&self, required: &[String]) -> Result<Capabilities> {
        let capabilities = Capabilities {
            supported: vec![RELATIVE_ROOT_CAPABILITY.to_string()],
        };
        let missing: Vec<&String> = required.iter().filter(|r| !capabilities.has(r)).collect();
        if !missing.is_empty() {
            bail!("Unsupported watcher capabilities: {:?}", missing);
        }
        Ok(capabilities)
    }

    fn watch_root(&mut self, path: &Path) -> Result<WatchRoot> {
        if !path.is_dir() {
            bail!("Cannot watch {:?}: not a directory", path);
        }

        if let Some(root) = self.roots.iter().find(|r| is_path_under(path, r)) {
            let relative = relative_path_from_dir(root, path)
                .filter(|r| !r.as_os_str().is_empty());
            return Ok(WatchRoot {
                watch: root.clone(),
                relative_path: relative,
                warning: None,
            });
        }

        let warning = self
            .roots
            .iter()
            .any(|r| is_path_under(r, path))
            .then(|| format!("{:?} contains an existing watch root", path));

        self.roots.push(path.to_path_buf());
        Ok(WatchRoot {
            watch: path.to_path_buf(),
            relative_path: None,
            warning,
        })
    }

    #[tracing::instrument(skip(self, request))]
    fn subscribe(&mut self, root: &Path, name: &str, request: &SubscriptionRequest) -> Result<()> {
        let base = match &request.relative_root {
            Some(relative) => root.join(relative),
            None => root.to_path_buf(),
        };
        let pattern = glob::Pattern::new(&request.pattern)
            .with_context(|| format!("Invalid match pattern {:?}", request.pattern))?;

        let sender = self.sender.clone();
        let ignore_dirs = self.ignore_dirs.clone();
        let subscription = name.to_string();
        let event_root = root.to_path_buf();
        let event_base = base.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    warn!("Watch error on {:?}: {}", event_base, e);
                    return;
                }
            };
            if matches!(event.kind, EventKind::Access(_)) {
                return;
            }

            let files = collect_changes(&event_base, &ignore_dirs, &pattern, &event.paths);
            if files.is_empty() {
                return;
            }
            let _ = sender.send(ChangeEvent {
                subscription: subscription.clone(),
                root: event_root.clone(),
                files,
            });
        })
        .context("Failed to create file watcher")?;

        watcher
            .watch(&base, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {:?}", base))?;

        debug!("Subscribed {} on {:?}", name, base);
        self.watchers.push(watcher);
        Ok(())
    }
}

/// Describe the `paths` of one raw notification as changes relative to `base`.
///
/// Paths outside `base`, below an ignored directory, or whose base name does not
/// match `pattern` are dropped. Each file is reported once.
pub fn collect_changes(
    base: &Path,
    ignore_dirs: &[String],
    pattern: &glob::Pattern,
    paths: &[PathBuf],
) -> Vec<FileChange> {
    let mut changes: Vec<FileChange> = Vec::new();

    for path in paths {
        let Some(relative) = relative_path_from_dir(base, path) else {
            continue;
        };
        if relative.as_os_str().is_empty() || !is_path_under(path, base) {
            continue;
        }
        if relative.components().any(|c| is_ignored(c, ignore_dirs)) {
            continue;
        }
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| pattern.matches(n));
        if !matches {
            continue;
        }

        let name = relative.to_string_lossy().replace('\\', "/");
        if changes.iter().any(|c| c.name == name) {
            continue;
        }
        changes.push(describe(path, name));
    }

    changes
}

fn is_ignored(component: Component<'_>, ignore_dirs: &[String]) -> bool {
    match component {
        Component::Normal(part) => ignore_dirs.iter().any(|d| part == d.as_str()),
        _ => false,
    }
}

fn describe(path: &Path, name: String) -> FileChange {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return FileChange {
            name,
            exists: false,
            ..Default::default()
        };
    };

    let kind = if metadata.is_dir() {
        FileKind::Directory
    } else if metadata.file_type().is_symlink() {
        FileKind::Symlink
    } else if metadata.is_file() {
        FileKind::File
    } else {
        FileKind::Other
    };

    let mtime_ms = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default();

    FileChange {
        name,
        size: metadata.len(),
        mtime_ms,
        exists: true,
        kind,
    }
}
