use anyhow::Result;
use futures_util::future::join_all;
use log::{debug, error, info, warn};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use super::{CopyFailure, CopyTask, SyncReport};
use crate::plan::WatchEntry;
use crate::runtime::{INSTALL_DIR, Runtime, has_component};
use crate::watcher::{ChangeEvent, FileChange, FileKind, SubscriptionName};

/// Turns change events into copies for the watch plan it was built with.
pub struct SyncExecutor<R: Runtime + 'static> {
    runtime: Arc<R>,
    watch_plan: Vec<WatchEntry>,
}

impl<R: Runtime + 'static> SyncExecutor<R> {
    pub fn new(runtime: Arc<R>, watch_plan: Vec<WatchEntry>) -> Self {
        Self {
            runtime,
            watch_plan,
        }
    }

    /// Compute the copies an event requires.
    ///
    /// The subscription name identifies the source folder. Files inside an
    /// install directory, directories and deleted entries are not copied.
    pub fn translate(&self, event: &ChangeEvent) -> Vec<CopyTask> {
        let name = match event.subscription.parse::<SubscriptionName>() {
            Ok(name) => name,
            Err(e) => {
                warn!("Ignoring event: {:#}", e);
                return Vec::new();
            }
        };
        if !name.is_rooted_at(&event.root) {
            warn!(
                "Subscription {} reported root {:?}, expected {:?}",
                event.subscription, event.root, name.watch
            );
        }

        let source_folder = name.full_path();
        let Some(entry) = self
            .watch_plan
            .iter()
            .find(|w| w.source_folder == source_folder)
        else {
            warn!("No watch entry for {:?}", source_folder);
            return Vec::new();
        };

        let files: Vec<&FileChange> = event.files.iter().filter(|f| is_copyable(f)).collect();
        if files.is_empty() {
            debug!("Nothing to copy for {:?}", source_folder);
            return Vec::new();
        }

        info!(
            "Copying {} file(s) to {} destination(s)",
            files.len(),
            entry.destinations.len()
        );

        files
            .iter()
            .flat_map(|file| {
                let from = source_folder.join(&file.name);
                entry.destinations.iter().map(move |destination| CopyTask {
                    from: from.clone(),
                    to: destination.install_dir().join(&file.name),
                })
            })
            .collect()
    }

    /// Run every task, each on the blocking pool. A failed task does not stop
    /// the others.
    #[tracing::instrument(skip(self, tasks))]
    pub async fn execute(&self, tasks: Vec<CopyTask>) -> SyncReport {
        let handles = tasks.into_iter().map(|task| {
            let runtime = Arc::clone(&self.runtime);
            tokio::task::spawn_blocking(move || run_task(runtime.as_ref(), task))
        });

        let mut report = SyncReport::default();
        for joined in join_all(handles).await {
            match joined {
                Ok(Ok(CopyOutcome::Copied(task))) => {
                    debug!("Copied {}", task);
                    report.copied.push(task);
                }
                Ok(Ok(CopyOutcome::SameFile(task))) => {
                    debug!("Skipping {}: both paths resolve to the same file", task);
                    report.skipped.push(task);
                }
                Ok(Err(failure)) => {
                    error!(
                        "Failed to copy {} (source exists: {}, destination exists: {}): {}",
                        failure.task, failure.from_exists, failure.to_exists, failure.error
                    );
                    report.failed.push(failure);
                }
                Err(e) => error!("Copy task did not complete: {}", e),
            }
        }
        report
    }

    pub async fn handle(&self, event: &ChangeEvent) -> SyncReport {
        let tasks = self.translate(event);
        if tasks.is_empty() {
            return SyncReport::default();
        }
        let report = self.execute(tasks).await;
        if !report.is_success() {
            warn!(
                "{} of {} copies failed",
                report.failed.len(),
                report.failed.len() + report.copied.len()
            );
        }
        report
    }

    /// Handle events in arrival order until every sender is gone.
    pub async fn run(self, mut events: UnboundedReceiver<ChangeEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(&event).await;
        }
        debug!("Change event channel closed");
    }
}

fn is_copyable(file: &FileChange) -> bool {
    file.exists
        && file.kind != FileKind::Directory
        && !has_component(Path::new(&file.name), INSTALL_DIR)
}

enum CopyOutcome {
    Copied(CopyTask),
    SameFile(CopyTask),
}

fn run_task<R: Runtime>(
    runtime: &R,
    task: CopyTask,
) -> std::result::Result<CopyOutcome, CopyFailure> {
    if resolves_to_same_file(runtime, &task.from, &task.to) {
        return Ok(CopyOutcome::SameFile(task));
    }
    match copy_file(runtime, &task) {
        Ok(()) => Ok(CopyOutcome::Copied(task)),
        Err(e) => Err(CopyFailure {
            from_exists: runtime.exists(&task.from),
            to_exists: runtime.exists(&task.to),
            error: format!("{:#}", e),
            task,
        }),
    }
}

/// Whether `to` is `from` once symlinks are resolved, as when the install
/// directory is a workspace symlink to the source. Copying would truncate the
/// source. `to` may not exist yet, so its parent is resolved instead.
fn resolves_to_same_file<R: Runtime>(runtime: &R, from: &Path, to: &Path) -> bool {
    let Ok(from) = runtime.canonicalize(from) else {
        return false;
    };
    let to = match runtime.canonicalize(to) {
        Ok(resolved) => resolved,
        Err(_) => {
            let (Some(parent), Some(name)) = (to.parent(), to.file_name()) else {
                return false;
            };
            match runtime.canonicalize(parent) {
                Ok(parent) => parent.join(name),
                Err(_) => return false,
            }
        }
    };
    from == to
}

fn copy_file<R: Runtime>(runtime: &R, task: &CopyTask) -> Result<()> {
    if let Some(parent) = task.to.parent() {
        runtime.create_dir_all(parent)?;
    }
    runtime.copy(&task.from, &task.to)?;
    Ok(())
}
