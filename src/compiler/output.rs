use std::fmt::{self, Display};
use std::io;
use std::ops::AddAssign;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::ast::tree_sitter::TreeCreateError;
use crate::package::ManifestError;
use crate::project::ProjectError;

/// What happened in a run: how many projects were built, and the problems along the way
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Output {
    pub num_built: usize,
    pub num_warnings: usize,
    pub num_errors: usize
}

/// Errors which stop the run before anything is built
#[derive(Debug, Error, Diagnostic)]
pub enum FatalError {
    #[error("Can't read the current directory")]
    #[diagnostic(code(declbuild::current_dir), help("pass the project paths explicitly"))]
    CurrentDir { #[source] source: io::Error },
    #[error("Can't read the packages in {}", .path.display())]
    #[diagnostic(
        code(declbuild::workspace),
        help("every directory with a tsconfig.json in a packages directory needs a package.json with a \"name\"")
    )]
    Workspace { path: PathBuf, #[source] source: ManifestError },
}

/// Errors building one project
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error("When running {}: {source}", .tsc.display())]
    SpawnCompiler { tsc: PathBuf, #[source] source: io::Error },
    #[error("Compilation failed:\n{}", .diagnostics.join("\n"))]
    Compilation { diagnostics: Vec<String> },
    #[error("When parsing {}: {source}", .path.display())]
    Parse { path: PathBuf, #[source] source: TreeCreateError },
    #[error("When writing {}: {source}", .path.display())]
    Write { path: PathBuf, #[source] source: io::Error },
    #[error("When removing {}: {source}", .path.display())]
    RemoveStale { path: PathBuf, #[source] source: io::Error },
    #[error("When traversing {}: {source}", .path.display())]
    WalkDir { path: PathBuf, #[source] source: walkdir::Error },
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    /// One project built
    pub fn built() -> Self {
        Self { num_built: 1, ..Self::default() }
    }

    /// One project which failed to build
    pub fn error() -> Self {
        Self { num_errors: 1, ..Self::default() }
    }

    pub fn is_ok(&self) -> bool {
        self.num_errors == 0
    }

    /// Print a summary and return the exit code
    pub fn report(self) -> i32 {
        eprintln!("{}", self);
        if self.is_ok() { 0 } else { 1 }
    }
}

impl Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let projects = if self.num_built == 1 { "project" } else { "projects" };
        if self.is_ok() {
            write!(f, "Built {} {}", self.num_built, projects)?;
        } else {
            write!(f, "Failed after building {} {}: {} errors", self.num_built, projects, self.num_errors)?;
        }
        if self.num_warnings > 0 {
            write!(f, ", {} warnings", self.num_warnings)?;
        }
        Ok(())
    }
}

impl AddAssign for Output {
    fn add_assign(&mut self, rhs: Self) {
        self.num_built += rhs.num_built;
        self.num_warnings += rhs.num_warnings;
        self.num_errors += rhs.num_errors;
    }
}
