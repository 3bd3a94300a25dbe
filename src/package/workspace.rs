use std::fs;
use std::path::Path;

use log::debug;

use crate::misc::mk_path;
use crate::package::{ManifestError, PackageDescriptor};

const TSCONFIG_FILE_NAME: &str = "tsconfig.json";
const MANIFEST_FILE_NAME: &str = "package.json";

/// Read the manifests of every package in `packages_dir`.
///
/// A package is a direct subdirectory whose name has no `.` and which contains a
/// `tsconfig.json`. Packages are returned sorted by directory name.
pub fn read_project_metadata(packages_dir: &Path) -> Result<Vec<PackageDescriptor>, ManifestError> {
    let entries = fs::read_dir(packages_dir)
        .map_err(|source| ManifestError::Io { path: packages_dir.to_path_buf(), source })?;
    let mut dir_names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ManifestError::Io { path: packages_dir.to_path_buf(), source })?;
        let Ok(dir_name) = entry.file_name().into_string() else {
            debug!("Skipping non-UTF-8 entry in {}: {:?}", packages_dir.display(), entry.file_name());
            continue
        };
        if !dir_name.contains('.') {
            dir_names.push(dir_name);
        }
    }
    dir_names.sort();

    dir_names.into_iter()
        .filter(|dir_name| mk_path!(packages_dir, dir_name, TSCONFIG_FILE_NAME).is_file())
        .map(|dir_name| PackageDescriptor::read(&mk_path!(packages_dir, dir_name, MANIFEST_FILE_NAME)))
        .collect()
}
