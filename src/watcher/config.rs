use anyhow::Result;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::runtime::Runtime;

pub const WATCHMAN_CONFIG_FILE: &str = ".watchmanconfig";

/// Per-folder watcher configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct WatchmanConfig {
    #[serde(default)]
    pub ignore_dirs: Vec<String>,
}

/// Write `.watchmanconfig` into `folder` unless a parseable one is already there.
///
/// Returns whether the file was written.
#[tracing::instrument(skip(runtime, ignore_dirs))]
pub fn ensure_watchman_config<R: Runtime>(
    runtime: &R,
    folder: &Path,
    ignore_dirs: &[String],
) -> Result<bool> {
    let path = folder.join(WATCHMAN_CONFIG_FILE);

    if runtime.exists(&path) {
        let existing = runtime
            .read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok());
        if existing.is_some() {
            debug!("Keeping existing {:?}", path);
            return Ok(false);
        }
    }

    let config = WatchmanConfig {
        ignore_dirs: ignore_dirs.to_vec(),
    };
    let content = serde_json::to_string(&config)?;
    runtime.write(&path, content.as_bytes())?;
    info!("Wrote {:?}", path);
    Ok(true)
}
