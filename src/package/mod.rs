//! Package catalog
//!
//! This module discovers package manifests under a root directory, parses
//! them into [`Package`] records, and orders their versions.

mod discovery;
mod manifest;
mod version;

pub use discovery::{Catalog, DEFAULT_IGNORE_DIRS, default_ignore_dirs, find_manifests, scan};
pub use manifest::{
    DependencyMap, LinkingStrategy, MANIFEST_FILE, Package, ProjectType, linking_strategy_for,
};
pub use version::{compare_component, is_higher_or_equal, keep_highest};
