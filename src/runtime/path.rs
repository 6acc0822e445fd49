//! Path helpers shared by the planner, the watcher and the sync executor.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Name of the directory package managers install dependencies into.
pub const INSTALL_DIR: &str = "node_modules";

/// Resolve `.` and `..` without touching the filesystem. A leading `..` that
/// cannot be popped is kept.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    path.components()
        .fold(PathBuf::new(), |mut result, component| {
            match component {
                Component::CurDir => {}
                Component::ParentDir if result.pop() => {}
                _ => result.push(component),
            }
            result
        })
}

/// Whether `path` is `dir` or lies below it, component-wise after
/// normalization.
///
/// The watcher consolidates roots with this while the planner's folders are
/// still unresolved, so a symlinked folder is compared by its spelled path and
/// gets its own watch root.
pub fn is_path_under(path: &Path, dir: &Path) -> bool {
    normalize_path(path).starts_with(normalize_path(dir))
}

/// Relative path from a directory to a path below it.
///
/// Returns `None` if no relative path exists (e.g., different drive letters on Windows).
pub fn relative_path_from_dir(from_dir: &Path, to_path: &Path) -> Option<PathBuf> {
    let result = pathdiff::diff_paths(to_path, from_dir)?;

    if result.is_absolute() {
        return None;
    }

    Some(result)
}

/// The folder a manifest lives in: `/repo/app/package.json` -> `/repo/app`.
pub fn manifest_folder(manifest_path: &Path) -> PathBuf {
    manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Where a consumer keeps its installed copy of a dependency.
///
/// Returns: `<consumer_folder>/node_modules/<dependency_name>`
pub fn installed_dependency_dir(consumer_folder: &Path, dependency_name: &str) -> PathBuf {
    consumer_folder.join(INSTALL_DIR).join(dependency_name)
}

/// Check if any component of a (relative) path equals `name`.
pub fn has_component(path: &Path, name: &str) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(part) if part == OsStr::new(name)))
}
