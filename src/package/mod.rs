use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

pub use batch::*;
pub use graph::*;
pub use workspace::*;

/// Grouping packages into dependency-ordered batches
mod batch;
/// Graph of the dependencies between the packages of one set
mod graph;
/// Reading every package of a packages directory
mod workspace;

/// Dependency name to version range, in manifest order
pub type DependencyMap = IndexMap<String, String>;

/// What we need to know about a package: its name, entry point, and what it depends on.
/// Usually read from a `package.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub name: String,
    /// `"main"` of the manifest, e.g. `out/main.js`
    pub main: Option<String>,
    pub dependencies: DependencyMap,
    pub peer_dependencies: DependencyMap,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read {}: {source}", .path.display())]
    Io { path: PathBuf, #[source] source: io::Error },
    #[error("failed to parse {}: {source}", .path.display())]
    Json { path: PathBuf, #[source] source: serde_json::Error },
    #[error("{}: \"name\" must be a string", .path.display())]
    MissingName { path: PathBuf },
    #[error("{}: \"{field}\" must be an object", .path.display())]
    InvalidDependencies { path: PathBuf, field: &'static str },
}

impl PackageDescriptor {
    /// Package without a main file or dependencies
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            main: None,
            dependencies: DependencyMap::new(),
            peer_dependencies: DependencyMap::new()
        }
    }

    /// Add a regular dependency
    pub fn depends_on(mut self, name: impl Into<String>, version_range: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), version_range.into());
        self
    }

    /// Add a peer dependency
    pub fn peer_depends_on(mut self, name: impl Into<String>, version_range: impl Into<String>) -> Self {
        self.peer_dependencies.insert(name.into(), version_range.into());
        self
    }

    /// Read the `package.json` at `path`
    pub fn read(path: &Path) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ManifestError::Io { path: path.to_path_buf(), source })?;
        let manifest = serde_json::from_str::<Value>(&text)
            .map_err(|source| ManifestError::Json { path: path.to_path_buf(), source })?;
        Self::from_manifest(&manifest, path)
    }

    /// Extract the descriptor from a parsed `package.json`. `path` is only used in errors.
    pub fn from_manifest(manifest: &Value, path: &Path) -> Result<Self, ManifestError> {
        let name = manifest.get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ManifestError::MissingName { path: path.to_path_buf() })?;
        Ok(Self {
            name: name.to_string(),
            main: manifest.get("main").and_then(Value::as_str).map(String::from),
            dependencies: dependency_map(manifest, "dependencies", path)?,
            peer_dependencies: dependency_map(manifest, "peerDependencies", path)?
        })
    }

    /// Regular, then peer dependency names
    pub fn all_dependency_names(&self) -> impl Iterator<Item=&str> + '_ {
        self.dependencies.keys()
            .chain(self.peer_dependencies.keys())
            .map(String::as_str)
    }
}

fn dependency_map(manifest: &Value, field: &'static str, path: &Path) -> Result<DependencyMap, ManifestError> {
    match manifest.get(field) {
        None | Some(Value::Null) => Ok(DependencyMap::new()),
        Some(Value::Object(dependencies)) => Ok(dependencies.iter()
            .map(|(name, version_range)| {
                let version_range = match version_range {
                    Value::String(version_range) => version_range.clone(),
                    other => other.to_string()
                };
                (name.clone(), version_range)
            })
            .collect()),
        Some(_) => Err(ManifestError::InvalidDependencies { path: path.to_path_buf(), field })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde_json::json;
    use test_log::test;

    use super::{ManifestError, PackageDescriptor};

    #[test]
    fn reads_name_main_and_dependencies() {
        let manifest = json!({
            "name": "app",
            "main": "out/main.js",
            "dependencies": { "lib": "^1.0.0", "left-pad": "*" },
            "peerDependencies": { "core": "2.x" },
            "devDependencies": { "tool": "*" }
        });
        let package = PackageDescriptor::from_manifest(&manifest, Path::new("package.json")).unwrap();
        assert_eq!(package.name, "app");
        assert_eq!(package.main.as_deref(), Some("out/main.js"));
        assert_eq!(package.dependencies.get("lib").map(String::as_str), Some("^1.0.0"));
        assert_eq!(package.peer_dependencies.get("core").map(String::as_str), Some("2.x"));
        // Regular before peer, each in manifest order
        assert_eq!(package.all_dependency_names().collect::<Vec<_>>(), vec!["lib", "left-pad", "core"]);
    }

    #[test]
    fn missing_dependencies_are_empty() {
        let package = PackageDescriptor::from_manifest(&json!({ "name": "a", "dependencies": null }), Path::new("p")).unwrap();
        assert_eq!(package, PackageDescriptor::new("a"));
    }

    #[test]
    fn non_string_versions_keep_their_json_text() {
        let package = PackageDescriptor::from_manifest(&json!({ "name": "a", "dependencies": { "b": 2 } }), Path::new("p")).unwrap();
        assert_eq!(package.dependencies.get("b").map(String::as_str), Some("2"));
    }

    #[test]
    fn rejects_bad_manifests() {
        assert!(matches!(
            PackageDescriptor::from_manifest(&json!({ "version": "1.0.0" }), Path::new("p")),
            Err(ManifestError::MissingName { .. })
        ));
        assert!(matches!(
            PackageDescriptor::from_manifest(&json!({ "name": "a", "dependencies": ["b"] }), Path::new("p")),
            Err(ManifestError::InvalidDependencies { field: "dependencies", .. })
        ));
    }
}
