use log::{error, info, warn};

use crate::plan::WatchEntry;
use crate::runtime::Runtime;
use crate::watcher::{
    ChangeWatcher, RELATIVE_ROOT_CAPABILITY, SubscriptionName, SubscriptionRequest,
    ensure_watchman_config,
};

/// Subscribe to changes of every source folder in the watch plan.
///
/// A folder whose capability check, watch or subscription fails is logged and
/// skipped. Returns the names of the subscriptions that were registered.
#[tracing::instrument(skip_all)]
pub fn subscribe_watch_plan<W: ChangeWatcher, R: Runtime>(
    watcher: &mut W,
    runtime: &R,
    watch_plan: &[WatchEntry],
    ignore_dirs: &[String],
) -> Vec<String> {
    let required = vec![RELATIVE_ROOT_CAPABILITY.to_string()];
    let mut subscriptions = Vec::new();

    for entry in watch_plan {
        let folder = &entry.source_folder;

        if let Err(e) = watcher.capability_check(&required) {
            error!("Watcher capability check failed for {:?}: {:#}", folder, e);
            continue;
        }

        if let Err(e) = ensure_watchman_config(runtime, folder, ignore_dirs) {
            warn!("Could not write watcher config in {:?}: {:#}", folder, e);
        }

        let root = match watcher.watch_root(folder) {
            Ok(root) => root,
            Err(e) => {
                error!("Failed to watch {:?}: {:#}", folder, e);
                continue;
            }
        };
        if let Some(warning) = &root.warning {
            warn!("{}", warning);
        }

        let name = SubscriptionName::new(root.watch.clone(), root.relative_path.clone()).to_string();
        let request = SubscriptionRequest::for_root(&root);

        match watcher.subscribe(&root.watch, &name, &request) {
            Ok(()) => {
                info!("Watching {:?}", folder);
                subscriptions.push(name);
            }
            Err(e) => error!("Failed to subscribe to {:?}: {:#}", folder, e),
        }
    }

    subscriptions
}
