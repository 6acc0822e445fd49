use anyhow::Result;
use log::{debug, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

use super::Package;

/// Directory names never descended into while scanning.
pub const DEFAULT_IGNORE_DIRS: [&str; 2] = ["node_modules", ".git"];

/// Manifests found under a root directory, and the packages parsed from them.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct Catalog {
    /// Every matching manifest file, including ones that failed to parse.
    pub files: Vec<PathBuf>,
    pub packages: Vec<Package>,
}

/// Find every file named `manifest_file` under `root`.
///
/// Entries whose name is in `ignore` are pruned at every depth. Symlinked
/// directories are not followed. Entries of each directory are visited in name
/// order so repeated scans of an unchanged tree return the same list.
#[tracing::instrument(skip(runtime, ignore))]
pub fn find_manifests<R: Runtime>(
    runtime: &R,
    root: &Path,
    ignore: &[String],
    manifest_file: &str,
) -> Result<Vec<PathBuf>> {
    let mut manifests = Vec::new();
    let mut entries = runtime.read_dir(root)?;
    entries.sort();

    for entry in entries {
        let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if ignore.iter().any(|i| i == name) {
            continue;
        }

        if runtime.is_dir(&entry) {
            if runtime.is_symlink(&entry) {
                debug!("Not following symlinked directory {:?}", entry);
                continue;
            }
            match find_manifests(runtime, &entry, ignore, manifest_file) {
                Ok(found) => manifests.extend(found),
                Err(e) => warn!("Skipping unreadable directory {:?}: {:#}", entry, e),
            }
        } else if name == manifest_file {
            manifests.push(entry);
        }
    }

    Ok(manifests)
}

/// Scan `root` for manifests and parse each one into a [`Package`].
///
/// Manifests that cannot be read or parsed are left out of `packages`.
#[tracing::instrument(skip(runtime, ignore))]
pub fn scan<R: Runtime>(
    runtime: &R,
    root: &Path,
    ignore: &[String],
    manifest_file: &str,
) -> Result<Catalog> {
    let files = find_manifests(runtime, root, ignore, manifest_file)?;
    let packages = files
        .iter()
        .filter_map(|path| Package::load_optional(runtime, path))
        .collect::<Vec<_>>();

    debug!(
        "Found {} manifest(s), {} parsed package(s) under {:?}",
        files.len(),
        packages.len(),
        root
    );

    Ok(Catalog { files, packages })
}

/// The default ignore list as owned strings.
pub fn default_ignore_dirs() -> Vec<String> {
    DEFAULT_IGNORE_DIRS.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::MANIFEST_FILE;
    use crate::runtime::{MockRuntime, RealRuntime};
    use mockall::predicate::eq;
    use std::fs;
    use tempfile::tempdir;

    fn write_manifest(dir: &Path, content: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(MANIFEST_FILE), content).unwrap();
    }

    #[test]
    fn test_find_manifests_nested() {
        // Test finding manifests at several depths

        let mut runtime = MockRuntime::new();

        // --- Setup Paths ---
        let root = PathBuf::from("/repo");
        let packages_dir = root.join("packages"); // /repo/packages
        let lib_dir = packages_dir.join("lib"); // /repo/packages/lib

        // --- 1. Scan Root Directory ---

        // Read dir /repo -> [/repo/package.json, /repo/packages]
        runtime
            .expect_read_dir()
            .with(eq(root.clone()))
            .returning(|p| Ok(vec![p.join("packages"), p.join("package.json")]));

        // --- 2. Scan Nested Directories ---

        runtime
            .expect_read_dir()
            .with(eq(packages_dir.clone()))
            .returning(|p| Ok(vec![p.join("lib")]));

        runtime
            .expect_read_dir()
            .with(eq(lib_dir.clone()))
            .returning(|p| Ok(vec![p.join("package.json"), p.join("index.js")]));

        // Only the two directories are directories
        let dirs = [packages_dir.clone(), lib_dir.clone()];
        runtime
            .expect_is_dir()
            .returning(move |p| dirs.iter().any(|d| d == p));
        runtime.expect_is_symlink().returning(|_| false);

        // --- Execute & Verify ---

        let ignore = default_ignore_dirs();
        let manifests = find_manifests(&runtime, &root, &ignore, MANIFEST_FILE).unwrap();
        assert_eq!(
            manifests,
            vec![root.join("package.json"), lib_dir.join("package.json")]
        );
    }

    #[test]
    fn test_find_manifests_prunes_ignored_names_without_descending() {
        // Ignored directories must never be read

        let mut runtime = MockRuntime::new();
        let root = PathBuf::from("/repo");

        // Read dir /repo -> [node_modules, .git]; neither is read further
        runtime
            .expect_read_dir()
            .with(eq(root.clone()))
            .returning(|p| Ok(vec![p.join("node_modules"), p.join(".git")]));

        let ignore = default_ignore_dirs();
        let manifests = find_manifests(&runtime, &root, &ignore, MANIFEST_FILE).unwrap();
        assert!(manifests.is_empty());
    }

    #[test]
    fn test_find_manifests_unreadable_root_is_error() {
        let mut runtime = MockRuntime::new();
        let root = PathBuf::from("/missing");

        runtime.expect_read_dir().with(eq(root.clone())).returning(|_| {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "not found").into())
        });

        let result = find_manifests(&runtime, &root, &default_ignore_dirs(), MANIFEST_FILE);
        assert!(result.is_err());
    }

    #[test]
    fn test_scan_ignores_manifests_in_ignored_dirs_at_any_depth() {
        let dir = tempdir().unwrap();
        let root = dir.path();

        write_manifest(&root.join("app"), r#"{ "name": "app" }"#);
        write_manifest(&root.join("app/node_modules/lib"), r#"{ "name": "lib" }"#);
        write_manifest(&root.join("deep/a/b/.git/x"), r#"{ "name": "git-internal" }"#);
        write_manifest(&root.join("deep/a/b/c"), r#"{ "name": "deep" }"#);

        let catalog = scan(&RealRuntime, root, &default_ignore_dirs(), MANIFEST_FILE).unwrap();

        let names: Vec<_> = catalog
            .packages
            .iter()
            .filter_map(|p| p.name.as_deref())
            .collect();
        assert_eq!(names, vec!["app", "deep"]);
    }

    #[test]
    fn test_scan_drops_unparseable_manifest() {
        let dir = tempdir().unwrap();
        let root = dir.path();

        write_manifest(&root.join("good"), r#"{ "name": "good" }"#);
        write_manifest(&root.join("bad"), "{ this is not json");

        let catalog = scan(&RealRuntime, root, &default_ignore_dirs(), MANIFEST_FILE).unwrap();

        assert_eq!(catalog.files.len(), 2);
        assert_eq!(catalog.packages.len(), 1);
        assert_eq!(catalog.packages[0].name.as_deref(), Some("good"));
    }

    #[test]
    fn test_scan_is_idempotent() {
        let dir = tempdir().unwrap();
        let root = dir.path();

        write_manifest(&root.join("b"), r#"{ "name": "b", "dependencies": { "a": "1" } }"#);
        write_manifest(&root.join("a"), r#"{ "name": "a", "version": "1.0.0" }"#);
        write_manifest(&root.join("c/d"), r#"{ "name": "d" }"#);

        let ignore = default_ignore_dirs();
        let first = scan(&RealRuntime, root, &ignore, MANIFEST_FILE).unwrap();
        let second = scan(&RealRuntime, root, &ignore, MANIFEST_FILE).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.packages.len(), 3);
    }

    #[test]
    fn test_scan_matches_custom_manifest_name() {
        let dir = tempdir().unwrap();
        let root = dir.path();

        fs::create_dir_all(root.join("x")).unwrap();
        fs::write(root.join("x/manifest.json"), r#"{ "name": "x" }"#).unwrap();
        write_manifest(&root.join("y"), r#"{ "name": "y" }"#);

        let catalog =
            scan(&RealRuntime, root, &default_ignore_dirs(), "manifest.json").unwrap();

        assert_eq!(catalog.packages.len(), 1);
        assert_eq!(catalog.packages[0].name.as_deref(), Some("x"));
    }
}
