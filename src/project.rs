use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;
use tsconfig::TsConfig;

use crate::declaration::ModuleLayout;
use crate::misc::mk_path;
use crate::misc::path::{absolute, relative, to_slash};
use crate::package::{ManifestError, PackageDescriptor};

const TSCONFIG_FILE_NAME: &str = "tsconfig.json";
const MANIFEST_FILE_NAME: &str = "package.json";
/// Top-level `tsconfig.json` key saying which merged declaration files to write
const DECLARATION_KEY: &str = "declaration";

/// Module name to the path of its merged declaration file
pub type DeclarationTargets = IndexMap<String, PathBuf>;

/// A TypeScript project: a directory with a `tsconfig.json`, usually also a `package.json`
#[derive(Debug, Clone)]
pub struct Project {
    /// Absolute directory containing `tsconfig.json`
    pub base_path: PathBuf,
    /// Absolute compiler output directory
    pub out_dir: PathBuf,
    /// `package.json`, if there is one
    pub manifest: Option<PackageDescriptor>,
    /// Merged declaration files to write. Empty if declarations are disabled.
    pub declarations: DeclarationTargets,
}

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("failed to read {}: {message}", .path.display())]
    TsConfig { path: PathBuf, message: String },
    #[error("outDir is not specified in the compilerOptions of {}", .path.display())]
    MissingOutDir { path: PathBuf },
    #[error("\"declaration\" in {} must be a boolean, a path, or an object of module names to paths", .path.display())]
    InvalidDeclaration { path: PathBuf },
    #[error("\"declaration\" in {} is named after the package, but there is no {}", .path.display(), MANIFEST_FILE_NAME)]
    MissingPackageName { path: PathBuf },
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

impl Project {
    /// Load the project in `base_path`
    pub fn load(base_path: impl Into<PathBuf>) -> Result<Self, ProjectError> {
        let base_path = PathBuf::from(absolute(&to_slash(&base_path.into())));
        let tsconfig_path = mk_path!(&base_path, TSCONFIG_FILE_NAME);

        let tsconfig = TsConfig::parse_file(&tsconfig_path)
            .map_err(|error| ProjectError::TsConfig { path: tsconfig_path.clone(), message: error.to_string() })?;
        let out_dir = tsconfig.compiler_options
            .and_then(|compiler_options| compiler_options.out_dir)
            .ok_or_else(|| ProjectError::MissingOutDir { path: tsconfig_path.clone() })?;
        let out_dir = base_path.join(out_dir);

        let manifest_path = mk_path!(&base_path, MANIFEST_FILE_NAME);
        let manifest = if manifest_path.is_file() {
            Some(PackageDescriptor::read(&manifest_path)?)
        } else {
            None
        };

        let raw_tsconfig = read_raw_tsconfig(&tsconfig_path)?;
        let declarations = resolve_declaration_targets(
            raw_tsconfig.get(DECLARATION_KEY),
            manifest.as_ref().map(|manifest| manifest.name.as_str()),
            &base_path,
            &out_dir
        ).map_err(|error| error.at(&tsconfig_path))?;

        Ok(Self {
            base_path,
            out_dir,
            manifest,
            declarations
        })
    }

    /// Whether any merged declaration file is configured
    pub fn emits_declarations(&self) -> bool {
        !self.declarations.is_empty()
    }

    /// `out_dir` relative to `base_path`, forward slashes
    pub fn relative_out_dir(&self) -> String {
        relative(&to_slash(&self.base_path), &to_slash(&self.out_dir))
    }

    /// Layout of the merged declaration file for `module_name`
    pub fn layout(&self, module_name: &str) -> ModuleLayout {
        let layout = ModuleLayout::new(&to_slash(&self.out_dir), &self.relative_out_dir());
        let layout = if module_name.is_empty() {
            layout
        } else {
            layout.with_module_name(module_name)
        };
        layout.with_main_file(self.manifest.as_ref().and_then(|manifest| manifest.main.as_deref()))
    }
}

/// `tsconfig.json` as plain JSON (comments and trailing commas allowed), for keys the compiler
/// doesn't know about
fn read_raw_tsconfig(path: &Path) -> Result<Value, ProjectError> {
    let text = fs::read_to_string(path)
        .map_err(|error| ProjectError::TsConfig { path: path.to_path_buf(), message: error.to_string() })?;
    json5::from_str::<Value>(&text)
        .map_err(|error| ProjectError::TsConfig { path: path.to_path_buf(), message: error.to_string() })
}

/// Errors of [resolve_declaration_targets], before we know which file they came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclarationError {
    Invalid,
    MissingPackageName,
}

impl DeclarationError {
    fn at(self, path: &Path) -> ProjectError {
        let path = path.to_path_buf();
        match self {
            DeclarationError::Invalid => ProjectError::InvalidDeclaration { path },
            DeclarationError::MissingPackageName => ProjectError::MissingPackageName { path },
        }
    }
}

/// Interpret the `"declaration"` setting:
///
/// - absent or `false`: no merged declaration file
/// - `true`: `<out_dir>/<package name>.d.ts`
/// - a path: that path, for the package name
/// - an object: module names to paths
///
/// Relative paths are resolved against `base_path`.
fn resolve_declaration_targets(
    declaration: Option<&Value>,
    package_name: Option<&str>,
    base_path: &Path,
    out_dir: &Path
) -> Result<DeclarationTargets, DeclarationError> {
    let package_name = || package_name.ok_or(DeclarationError::MissingPackageName);
    let mut targets = DeclarationTargets::new();
    match declaration {
        None | Some(Value::Null) | Some(Value::Bool(false)) => {}
        Some(Value::Bool(true)) => {
            let package_name = package_name()?;
            targets.insert(package_name.to_string(), out_dir.join(format!("{}.d.ts", package_name)));
        }
        Some(Value::String(path)) => {
            targets.insert(package_name()?.to_string(), base_path.join(path));
        }
        Some(Value::Object(paths)) => {
            for (module_name, path) in paths {
                let path = path.as_str().ok_or(DeclarationError::Invalid)?;
                targets.insert(module_name.clone(), base_path.join(path));
            }
        }
        Some(_) => return Err(DeclarationError::Invalid)
    }
    Ok(targets)
}
