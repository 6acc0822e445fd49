//! Dependency graph between packages of one catalog.
//!
//! A package is *internal* when some package in the catalog depends on it by
//! name. Every consumer of an internal package gets an edge to it, and the
//! edges are grouped per internal package into [`SyncTarget`]s.

use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use std::path::Path;

use crate::package::{Package, keep_highest};

/// A consumer depending on an internal package.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DependencyEdge<'a> {
    pub consumer: &'a Package,
    pub dependency: &'a Package,
}

/// One internal package and every package that consumes it.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncTarget {
    pub source: Package,
    /// Consumers, unique by manifest path, in first-seen order.
    pub destinations: Vec<Package>,
}

/// Every dependency name declared anywhere in the catalog, first-seen order.
pub fn internal_names(catalog: &[Package]) -> IndexSet<&str> {
    catalog.iter().flat_map(Package::dependency_names).collect()
}

/// Named catalog packages that some package depends on.
///
/// When several manifests share a name, only the highest version is kept
/// (see [`keep_highest`]) so edge resolution is deterministic.
pub fn internal_packages(catalog: &[Package]) -> Vec<Package> {
    let names = internal_names(catalog);

    let candidates: Vec<&Package> = catalog
        .iter()
        .filter(|p| p.graph_name().is_some_and(|n| names.contains(n)))
        .collect();

    let kept = candidates
        .iter()
        .map(|p| (*p).clone())
        .fold(Vec::new(), keep_highest);

    for candidate in &candidates {
        if !kept.iter().any(|k| k.path == candidate.path) {
            warn!(
                "Duplicate package name {:?}: ignoring {:?} in favour of a higher version",
                candidate.name.as_deref().unwrap_or_default(),
                candidate.path
            );
        }
    }

    kept
}

/// Resolve every (consumer, internal package) edge in the catalog.
///
/// Consumers are visited in catalog order and their dependency names in
/// manifest order. A package never gets an edge to itself.
pub fn build_edges<'a>(catalog: &'a [Package], internal: &'a [Package]) -> Vec<DependencyEdge<'a>> {
    let mut edges = Vec::new();

    for consumer in catalog {
        for name in consumer.unique_dependency_names() {
            let Some(dependency) = internal.iter().find(|p| p.graph_name() == Some(name)) else {
                continue;
            };
            if consumer.path == dependency.path {
                debug!("Ignoring self-dependency of {:?}", consumer.path);
                continue;
            }
            edges.push(DependencyEdge {
                consumer,
                dependency,
            });
        }
    }

    edges
}

/// Group edges by their internal package.
///
/// Targets are ordered by the first edge that mentions them; destinations are
/// unique by manifest path.
pub fn group_edges(edges: &[DependencyEdge<'_>]) -> Vec<SyncTarget> {
    let mut targets: IndexMap<&Path, SyncTarget> = IndexMap::new();

    for edge in edges {
        let target = targets
            .entry(edge.dependency.path.as_path())
            .or_insert_with(|| SyncTarget {
                source: edge.dependency.clone(),
                destinations: Vec::new(),
            });

        if !target
            .destinations
            .iter()
            .any(|d| d.path == edge.consumer.path)
        {
            target.destinations.push(edge.consumer.clone());
        }
    }

    targets.into_values().collect()
}

/// Derive the sync targets of a catalog.
pub fn build_sync_targets(catalog: &[Package]) -> Vec<SyncTarget> {
    let internal = internal_packages(catalog);
    let edges = build_edges(catalog, &internal);

    for edge in &edges {
        debug!(
            "Edge: {:?} -> {:?}",
            edge.dependency.path, edge.consumer.path
        );
    }

    group_edges(&edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn make_package(path: &str, name: Option<&str>, version: Option<&str>, deps: &[&str]) -> Package {
        Package {
            path: PathBuf::from(path),
            name: name.map(String::from),
            version: version.map(String::from),
            dependencies: deps
                .iter()
                .map(|d| (d.to_string(), "*".to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_internal_names_collects_all_maps() {
        let mut app = make_package("/r/app/package.json", Some("app"), None, &["lib"]);
        app.dev_dependencies.insert("jest".into(), "29".into());
        app.peer_dependencies.insert("lib".into(), "*".into());

        let names = internal_names(std::slice::from_ref(&app));
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["lib", "jest"]);
    }

    #[test]
    fn test_internal_packages_requires_name_and_consumer() {
        let catalog = vec![
            make_package("/r/app/package.json", Some("app"), None, &["lib", "react"]),
            make_package("/r/lib/package.json", Some("lib"), Some("1.0.0"), &[]),
            make_package("/r/unused/package.json", Some("unused"), None, &[]),
            make_package("/r/anon/package.json", None, None, &[]),
        ];

        let internal = internal_packages(&catalog);
        assert_eq!(internal.len(), 1);
        assert_eq!(internal[0].name.as_deref(), Some("lib"));
    }

    #[test]
    fn test_single_edge_end_to_end() {
        let catalog = vec![
            make_package("/r/app/package.json", Some("app"), None, &["lib"]),
            make_package("/r/lib/package.json", Some("lib"), Some("1.0.0"), &[]),
        ];

        let targets = build_sync_targets(&catalog);

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].source.name.as_deref(), Some("lib"));
        assert_eq!(targets[0].destinations.len(), 1);
        assert_eq!(
            targets[0].destinations[0].path,
            PathBuf::from("/r/app/package.json")
        );
    }

    #[test]
    fn test_multiple_consumers_and_dependencies() {
        let catalog = vec![
            make_package("/r/web/package.json", Some("web"), None, &["ui", "utils"]),
            make_package("/r/api/package.json", Some("api"), None, &["utils"]),
            make_package("/r/ui/package.json", Some("ui"), None, &["utils"]),
            make_package("/r/utils/package.json", Some("utils"), None, &[]),
        ];

        let targets = build_sync_targets(&catalog);

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].source.name.as_deref(), Some("ui"));
        assert_eq!(
            targets[0]
                .destinations
                .iter()
                .map(|d| d.name.as_deref().unwrap())
                .collect::<Vec<_>>(),
            vec!["web"]
        );
        assert_eq!(targets[1].source.name.as_deref(), Some("utils"));
        assert_eq!(
            targets[1]
                .destinations
                .iter()
                .map(|d| d.name.as_deref().unwrap())
                .collect::<Vec<_>>(),
            vec!["web", "api", "ui"]
        );
    }

    #[test]
    fn test_consumer_listed_in_several_maps_is_one_destination() {
        let mut app = make_package("/r/app/package.json", Some("app"), None, &["lib"]);
        app.dev_dependencies.insert("lib".into(), "*".into());
        app.peer_dependencies.insert("lib".into(), "*".into());
        let catalog = vec![
            app,
            make_package("/r/lib/package.json", Some("lib"), None, &[]),
        ];

        let targets = build_sync_targets(&catalog);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].destinations.len(), 1);
    }

    #[test]
    fn test_self_dependency_is_excluded() {
        let catalog = vec![
            make_package("/r/lib/package.json", Some("lib"), None, &["lib"]),
            make_package("/r/app/package.json", Some("app"), None, &["lib"]),
        ];

        let targets = build_sync_targets(&catalog);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].destinations.len(), 1);
        assert_eq!(targets[0].destinations[0].name.as_deref(), Some("app"));
    }

    #[test]
    fn test_only_self_dependency_yields_no_target() {
        let catalog = vec![make_package("/r/lib/package.json", Some("lib"), None, &["lib"])];
        assert!(build_sync_targets(&catalog).is_empty());
    }

    #[test]
    fn test_duplicate_names_resolve_to_highest_version() {
        let catalog = vec![
            make_package("/r/app/package.json", Some("app"), None, &["lib"]),
            make_package("/r/old/lib/package.json", Some("lib"), Some("1.0.0"), &[]),
            make_package("/r/new/lib/package.json", Some("lib"), Some("2.0.0"), &[]),
        ];

        let targets = build_sync_targets(&catalog);

        assert_eq!(targets.len(), 1);
        assert_eq!(
            targets[0].source.path,
            PathBuf::from("/r/new/lib/package.json")
        );
    }

    #[test]
    fn test_no_internal_dependencies() {
        let catalog = vec![
            make_package("/r/a/package.json", Some("a"), None, &["react"]),
            make_package("/r/b/package.json", Some("b"), None, &[]),
        ];
        assert!(build_sync_targets(&catalog).is_empty());
    }
}
