//! One planning cycle: catalog, sync targets and plan, computed together from
//! the tree as it is on disk right now.

use anyhow::Result;
use log::debug;
use std::path::PathBuf;

use crate::graph::{SyncTarget, build_sync_targets, internal_names};
use crate::package::{Catalog, MANIFEST_FILE, default_ignore_dirs, scan};
use crate::plan::{OverwritePolicy, Planner, SyncPlan};
use crate::runtime::Runtime;

/// Inputs of a planning cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanOptions {
    pub root: PathBuf,
    pub ignore: Vec<String>,
    pub manifest_file: String,
    pub overwrite_policy: OverwritePolicy,
}

impl PlanOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ignore: default_ignore_dirs(),
            manifest_file: MANIFEST_FILE.to_string(),
            overwrite_policy: OverwritePolicy::default(),
        }
    }
}

/// Immutable result of one planning cycle. Build a new one to re-plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub catalog: Catalog,
    pub targets: Vec<SyncTarget>,
    pub plan: SyncPlan,
}

impl Snapshot {
    #[tracing::instrument(skip(runtime))]
    pub fn build<R: Runtime>(runtime: &R, options: &PlanOptions) -> Result<Self> {
        let catalog = scan(
            runtime,
            &options.root,
            &options.ignore,
            &options.manifest_file,
        )?;

        for file in &catalog.files {
            debug!("Manifest: {:?}", file);
        }
        debug!(
            "Internal package names: {:?}",
            internal_names(&catalog.packages)
        );

        let targets = build_sync_targets(&catalog.packages);
        let plan = Planner::new(runtime, options.manifest_file.as_str())
            .with_policy(options.overwrite_policy)
            .plan(&targets);

        debug!(
            "Planned {} watch entr(ies), {} link entr(ies)",
            plan.watch_plan.len(),
            plan.link_plan.len()
        );

        Ok(Self {
            catalog,
            targets,
            plan,
        })
    }
}
