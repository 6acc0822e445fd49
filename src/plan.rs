//! Sync planning.
//!
//! Splits every [`SyncTarget`] into a watch entry (destinations that get
//! changed files copied in) and a link entry (destinations the package manager
//! links instead). Each destination lands in exactly one of the two.

use log::{debug, info};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::graph::SyncTarget;
use crate::package::{LinkingStrategy, Package, is_higher_or_equal, linking_strategy_for};
use crate::runtime::{Runtime, installed_dependency_dir};

/// Whether a copy destination that already has an up-to-date install is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Every destination receives changed files.
    #[default]
    Always,
    /// Skip a copy destination whose installed version is higher than or equal
    /// to the source version. Unknown versions never skip.
    SkipUpToDate,
}

/// A consumer folder and the name it installs the source under.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub destination_folder: PathBuf,
    pub dependency_name: String,
}

impl Destination {
    /// `<destination_folder>/node_modules/<dependency_name>`
    pub fn install_dir(&self) -> PathBuf {
        installed_dependency_dir(&self.destination_folder, &self.dependency_name)
    }
}

/// A source folder and the destinations that receive it.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncEntry {
    pub source_folder: PathBuf,
    pub destinations: Vec<Destination>,
}

/// Source synchronised by copying changed files.
pub type WatchEntry = SyncEntry;

/// Source synchronised by a package-manager link.
pub type LinkEntry = SyncEntry;

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SyncPlan {
    pub watch_plan: Vec<WatchEntry>,
    pub link_plan: Vec<LinkEntry>,
}

impl SyncPlan {
    /// The watch entry for a source folder, if it is watched.
    pub fn watch_entry(&self, source_folder: &Path) -> Option<&WatchEntry> {
        self.watch_plan
            .iter()
            .find(|w| w.source_folder == source_folder)
    }
}

/// Routes the destinations of sync targets to the watch or link plan.
pub struct Planner<'a, R: Runtime> {
    runtime: &'a R,
    manifest_file: String,
    policy: OverwritePolicy,
}

impl<'a, R: Runtime> Planner<'a, R> {
    pub fn new(runtime: &'a R, manifest_file: impl Into<String>) -> Self {
        Self {
            runtime,
            manifest_file: manifest_file.into(),
            policy: OverwritePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: OverwritePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The destination's currently installed copy of `dependency_name`.
    ///
    /// Missing or unreadable installs yield `None`.
    pub fn installed_copy(&self, destination_folder: &Path, dependency_name: &str) -> Option<Package> {
        let path =
            installed_dependency_dir(destination_folder, dependency_name).join(&self.manifest_file);
        Package::load_optional(self.runtime, &path)
    }

    /// Build the watch and link plans. Entries without destinations are dropped.
    #[tracing::instrument(skip(self, targets))]
    pub fn plan(&self, targets: &[SyncTarget]) -> SyncPlan {
        let mut plan = SyncPlan::default();

        for target in targets {
            let Some(dependency_name) = target.source.graph_name() else {
                continue;
            };
            let source_folder = target.source.folder();
            let mut watch = SyncEntry {
                source_folder: source_folder.clone(),
                destinations: Vec::new(),
            };
            let mut link = SyncEntry {
                source_folder,
                destinations: Vec::new(),
            };

            for consumer in &target.destinations {
                let destination = Destination {
                    destination_folder: consumer.folder(),
                    dependency_name: dependency_name.to_string(),
                };
                let installed =
                    self.installed_copy(&destination.destination_folder, dependency_name);

                match linking_strategy_for(installed.as_ref()) {
                    LinkingStrategy::Link => link.destinations.push(destination),
                    LinkingStrategy::Copy => {
                        if self.is_linked_to_source(&destination, &watch.source_folder) {
                            info!(
                                "Skipping {:?}: {} resolves to the source folder",
                                destination.destination_folder,
                                destination.install_dir().display()
                            );
                            continue;
                        }
                        if self.is_up_to_date(&target.source, installed.as_ref()) {
                            debug!(
                                "Skipping {:?}: installed {} is up to date",
                                destination.destination_folder, dependency_name
                            );
                            continue;
                        }
                        watch.destinations.push(destination);
                    }
                }
            }

            if !watch.destinations.is_empty() {
                plan.watch_plan.push(watch);
            }
            if !link.destinations.is_empty() {
                plan.link_plan.push(link);
            }
        }

        plan
    }

    /// A workspace install is a symlink to the source; copying into it would
    /// write each file onto itself.
    fn is_linked_to_source(&self, destination: &Destination, source_folder: &Path) -> bool {
        match (
            self.runtime.canonicalize(&destination.install_dir()),
            self.runtime.canonicalize(source_folder),
        ) {
            (Ok(install_dir), Ok(source_folder)) => install_dir == source_folder,
            _ => false,
        }
    }

    fn is_up_to_date(&self, source: &Package, installed: Option<&Package>) -> bool {
        if self.policy != OverwritePolicy::SkipUpToDate {
            return false;
        }
        match (
            source.version.as_deref(),
            installed.and_then(|p| p.version.as_deref()),
        ) {
            (Some(source_version), Some(installed_version)) => {
                is_higher_or_equal(installed_version, source_version)
            }
            _ => false,
        }
    }
}
