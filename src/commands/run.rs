use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::config::Config;
use super::console;
use crate::{
    link::run_link_plan,
    runtime::Runtime,
    snapshot::Snapshot,
    sync::{SyncExecutor, subscribe_watch_plan},
    watcher::NotifyWatcher,
};

/// How long pending copies may take to finish after the user quits.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Plan, link, then keep the watch plan in sync until the user quits.
#[tracing::instrument(skip(config))]
pub async fn run<R: Runtime + 'static>(config: Config<R>) -> Result<()> {
    let runtime = Arc::clone(&config.runtime);
    let snapshot = Snapshot::build(runtime.as_ref(), &config.plan)?;

    info!(
        "Found {} package(s) under {:?}",
        snapshot.catalog.packages.len(),
        config.root()
    );
    for target in &snapshot.targets {
        debug!("{} is used by {} package(s)", target.source, target.destinations.len());
    }

    if snapshot.plan.link_plan.is_empty() {
        debug!("Nothing to link");
    } else if config.run_links {
        let report = run_link_plan(runtime.as_ref(), &snapshot.plan.link_plan, config.link_cli);
        if !report.failed.is_empty() {
            warn!("{} link command(s) failed", report.failed.len());
        }
    } else {
        info!(
            "Skipping {} link entr(ies)",
            snapshot.plan.link_plan.len()
        );
    }

    let (sender, events) = mpsc::unbounded_channel();
    let mut watcher = NotifyWatcher::new(sender, config.plan.ignore.clone());
    let subscriptions = subscribe_watch_plan(
        &mut watcher,
        runtime.as_ref(),
        &snapshot.plan.watch_plan,
        &config.plan.ignore,
    );
    info!("Watching {} source folder(s)", subscriptions.len());

    let executor = SyncExecutor::new(Arc::clone(&runtime), snapshot.plan.watch_plan.clone());
    let sync_task = tokio::spawn(executor.run(events));

    wait_for_exit(runtime, &config).await?;

    // Dropping the watcher closes the event channel and ends the executor
    drop(watcher);
    if tokio::time::timeout(SHUTDOWN_GRACE, sync_task).await.is_err() {
        warn!("Pending copies did not finish in time");
    }
    info!("Bye");
    Ok(())
}

async fn wait_for_exit<R: Runtime + 'static>(runtime: Arc<R>, config: &Config<R>) -> Result<()> {
    if std::io::stdin().is_terminal() {
        let options = config.plan.clone();
        tokio::task::spawn_blocking(move || console::run_interactive(runtime.as_ref(), &options))
            .await
            .context("Console task failed")??;
    } else {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
    }
    Ok(())
}
