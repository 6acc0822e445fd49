use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::runtime::{Runtime, manifest_folder};

/// File name of a package manifest.
pub const MANIFEST_FILE: &str = "package.json";

/// Dependency name -> version range, in manifest order.
pub type DependencyMap = IndexMap<String, String>;

/// Kind of project a manifest describes, derived from its dependency names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectType {
    Next,
    ReactNative,
    React,
    Express,
    #[default]
    Unknown,
}

/// How a destination receives a source package's files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkingStrategy {
    /// Changed files are copied into `node_modules/<name>` by the watcher.
    Copy,
    /// The package manager links `node_modules/<name>` to the source folder.
    Link,
}

impl ProjectType {
    /// Classify a project by the names it depends on.
    ///
    /// Checked in priority order: `next`, `expo`/`react-native`, `react`, `express`.
    pub fn detect<'a, I>(dependency_names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let names: Vec<&str> = dependency_names.into_iter().collect();
        let has = |name: &str| names.contains(&name);

        if has("next") {
            ProjectType::Next
        } else if has("expo") || has("react-native") {
            ProjectType::ReactNative
        } else if has("react") {
            ProjectType::React
        } else if has("express") {
            ProjectType::Express
        } else {
            ProjectType::Unknown
        }
    }

    pub fn linking_strategy(self) -> LinkingStrategy {
        match self {
            ProjectType::Next | ProjectType::React => LinkingStrategy::Link,
            ProjectType::ReactNative | ProjectType::Express | ProjectType::Unknown => {
                LinkingStrategy::Copy
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectType::Next => "next",
            ProjectType::ReactNative => "react-native",
            ProjectType::React => "react",
            ProjectType::Express => "express",
            ProjectType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Linking strategy for a destination, given what it currently has installed.
///
/// No installed copy classifies as `unknown`, which copies.
pub fn linking_strategy_for(installed: Option<&Package>) -> LinkingStrategy {
    installed
        .map(|p| p.project_type)
        .unwrap_or_default()
        .linking_strategy()
}

/// One discovered manifest.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    /// Absolute path of the manifest file; identifies the package within a scan.
    pub path: PathBuf,
    pub name: Option<String>,
    pub version: Option<String>,
    pub private: Option<bool>,
    /// String or `{ name, email, url }` object, kept verbatim.
    pub author: Option<Value>,
    pub dependencies: DependencyMap,
    pub dev_dependencies: DependencyMap,
    pub peer_dependencies: DependencyMap,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
}

impl Package {
    /// Parse manifest `content` read from `path`.
    ///
    /// Only invalid JSON is an error. A field of the wrong type reads as absent,
    /// and a dependency whose range is not a string keeps its name.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(content)
            .with_context(|| format!("Failed to parse manifest {:?}", path))?;

        let mut package = Package {
            path: path.to_path_buf(),
            name: string_field(&raw, "name"),
            version: string_field(&raw, "version"),
            private: raw.get("private").and_then(Value::as_bool),
            author: raw.get("author").filter(|a| !a.is_null()).cloned(),
            dependencies: dependency_field(&raw, "dependencies"),
            dev_dependencies: dependency_field(&raw, "devDependencies"),
            peer_dependencies: dependency_field(&raw, "peerDependencies"),
            project_type: ProjectType::Unknown,
        };
        package.project_type = ProjectType::detect(package.dependency_names());
        Ok(package)
    }

    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime.read_to_string(path)?;
        Self::parse(path, &content)
    }

    /// Load a manifest, treating a missing or malformed file as "no package".
    pub fn load_optional<R: Runtime>(runtime: &R, path: &Path) -> Option<Self> {
        match Self::load(runtime, path) {
            Ok(package) => Some(package),
            Err(e) => {
                debug!("Skipping manifest {:?}: {:#}", path, e);
                None
            }
        }
    }

    /// Folder containing the manifest.
    pub fn folder(&self) -> PathBuf {
        manifest_folder(&self.path)
    }

    /// Name if present and non-empty.
    pub fn graph_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    /// Dependency names across dependencies, devDependencies and peerDependencies,
    /// in that order. A name listed in more than one map appears more than once.
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .keys()
            .chain(self.dev_dependencies.keys())
            .chain(self.peer_dependencies.keys())
            .map(String::as_str)
    }

    /// Distinct dependency names, first-seen order.
    pub fn unique_dependency_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in self.dependency_names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// A string field; numbers are kept in their JSON form (`"version": 1` reads as `"1"`).
fn string_field(raw: &Value, key: &str) -> Option<String> {
    match raw.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn dependency_field(raw: &Value, key: &str) -> DependencyMap {
    let Some(map) = raw.get(key).and_then(Value::as_object) else {
        return DependencyMap::new();
    };
    map.iter()
        .map(|(name, range)| {
            let range = range
                .as_str()
                .map(String::from)
                .unwrap_or_else(|| range.to_string());
            (name.clone(), range)
        })
        .collect()
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.version) {
            (Some(name), Some(version)) => write!(f, "{}@{}", name, version),
            (Some(name), None) => write!(f, "{}", name),
            (None, _) => write!(f, "(unnamed) {}", self.path.display()),
        }
    }
}
