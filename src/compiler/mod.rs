use std::fs::remove_file;
use std::path::{Path, PathBuf};
use std::process::Command;

use globset::{Glob, GlobSet, GlobSetBuilder};
use indexmap::IndexSet;
use join_lazy_fmt::Join;
use lazy_static::lazy_static;
use log::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::ast::DeclarationFile;
use crate::declaration::write_declaration_file;
use crate::misc::path::{absolute, to_slash};
use crate::misc::ResultFilterErr;
use crate::package::{batch_packages_with, read_project_metadata};
use crate::project::Project;
pub use output::*;

mod output;

/// Suffix which marks a path as a directory of packages
const PACKAGES_DIR_SUFFIX: &str = "/*";
const DECLARATION_EXTENSION: &str = ".d.ts";
/// Line prefix of `tsc --listEmittedFiles`
const EMITTED_FILE_PREFIX: &str = "TSFILE: ";

lazy_static! {
    /// Compiler outputs which are removed when no longer emitted
    static ref STALE_OUTPUT_GLOBS: GlobSet = {
        let mut builder = GlobSetBuilder::new();
        for pattern in ["*.js", "*.js.map"] {
            builder.add(Glob::new(pattern).expect("stale output glob is invalid"));
        }
        builder.build().expect("stale output globs are invalid")
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// `tsc` executable
    pub tsc: PathBuf,
    /// If false, don't run `tsc` and use what is already in each project's output directory
    pub compile: bool,
}

/// Builds projects: runs `tsc`, writes merged declaration files, and removes stale outputs
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            tsc: PathBuf::from("tsc"),
            compile: true
        }
    }
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Build every path (the current directory if there are none) and return the combined output.
    ///
    /// Paths ending with `/*` are packages directories: their packages are built in dependency
    /// batches, before the other paths. Stops at the first project which fails.
    pub fn run(&self, paths: impl IntoIterator<Item=PathBuf>) -> Result<Output, FatalError> {
        let mut paths = paths.into_iter().collect::<Vec<_>>();
        if paths.is_empty() {
            paths.push(std::env::current_dir().map_err(|source| FatalError::CurrentDir { source })?);
        }
        let (packages_dirs, project_paths) = paths.into_iter()
            .partition::<Vec<_>, _>(|path| strip_packages_glob(path).is_some());

        let mut output = Output::new();
        for packages_dir in packages_dirs.iter().filter_map(|path| strip_packages_glob(path)) {
            let packages = read_project_metadata(&packages_dir)
                .map_err(|source| FatalError::Workspace { path: packages_dir.clone(), source })?;
            let batches = batch_packages_with(packages, |_| output.num_warnings += 1);
            for batch in batches {
                info!("Building {}", ", ".join(batch.iter().map(|package| &package.name)));
                for package in batch.iter() {
                    output += self.build_logged(&packages_dir.join(&package.name));
                    if !output.is_ok() {
                        return Ok(output)
                    }
                }
            }
        }
        for path in project_paths {
            info!("Building {}", path.display());
            output += self.build_logged(&path);
            if !output.is_ok() {
                return Ok(output)
            }
        }
        Ok(output)
    }

    fn build_logged(&self, base_path: &Path) -> Output {
        match self.build(base_path) {
            Ok(output) => output,
            Err(err) => {
                error!("Failed to build {}: {}", base_path.display(), err);
                Output::error()
            }
        }
    }

    /// Build the project in `base_path`
    pub fn build(&self, base_path: &Path) -> Result<Output, BuildError> {
        let mut output = Output::built();
        let project = Project::load(base_path)?;

        let emitted = if self.options.compile {
            self.run_tsc(&project)?
        } else {
            existing_outputs(&project.out_dir)?
        };

        if project.emits_declarations() {
            let targets = project.declarations.values()
                .map(|target| absolute(&to_slash(target)))
                .collect::<IndexSet<_>>();
            let declaration_files = emitted.iter()
                .filter(|path| path.ends_with(DECLARATION_EXTENSION) && !targets.contains(*path))
                .map(|path| DeclarationFile::read(Path::new(path))
                    .map_err(|source| BuildError::Parse { path: PathBuf::from(path), source }))
                .collect::<Result<Vec<_>, _>>()?;
            if declaration_files.is_empty() {
                warn!("{} configures a declaration file but no .d.ts files were emitted", project.base_path.display());
                output.num_warnings += 1;
            } else {
                for (module_name, target) in &project.declarations {
                    let modules = write_declaration_file(target, &declaration_files, &project.layout(module_name))
                        .map_err(|source| BuildError::Write { path: target.clone(), source })?;
                    if modules.is_empty() {
                        warn!("{} has no modules: every declaration file is empty", target.display());
                        output.num_warnings += 1;
                    } else {
                        debug!("{} modules in {}", modules.len(), target.display());
                    }
                }
            }
        }

        remove_stale_outputs(&project.out_dir, &emitted)?;
        Ok(output)
    }

    /// Run `tsc` on the project and return the emitted files, in emission order
    fn run_tsc(&self, project: &Project) -> Result<IndexSet<String>, BuildError> {
        let mut command = Command::new(&self.options.tsc);
        command.arg("-p")
            .arg(&project.base_path)
            .arg("--listEmittedFiles")
            .arg("--noEmitOnError");
        if project.emits_declarations() {
            command.arg("--declaration");
        }
        debug!("Running {:?}", command);
        let result = command.output()
            .map_err(|source| BuildError::SpawnCompiler { tsc: self.options.tsc.clone(), source })?;

        let (emitted, diagnostics) = parse_tsc_output(&String::from_utf8_lossy(&result.stdout));
        if !result.status.success() {
            let mut diagnostics = diagnostics;
            diagnostics.extend(String::from_utf8_lossy(&result.stderr).lines()
                .filter(|line| !line.trim().is_empty())
                .map(String::from));
            return Err(BuildError::Compilation { diagnostics })
        }
        for diagnostic in diagnostics {
            debug!("tsc: {}", diagnostic);
        }
        Ok(emitted)
    }
}

/// The directory of a `<dir>/*` path
fn strip_packages_glob(path: &Path) -> Option<PathBuf> {
    let path = to_slash(path);
    path.strip_suffix(PACKAGES_DIR_SUFFIX).map(PathBuf::from)
}

/// Split `tsc --listEmittedFiles` output into emitted files (absolute, normalized) and every
/// other non-empty line
fn parse_tsc_output(stdout: &str) -> (IndexSet<String>, Vec<String>) {
    let mut emitted = IndexSet::new();
    let mut diagnostics = Vec::new();
    for line in stdout.lines() {
        match line.strip_prefix(EMITTED_FILE_PREFIX) {
            Some(path) => {
                emitted.insert(absolute(path.trim()));
            }
            None if line.trim().is_empty() => {}
            None => diagnostics.push(line.to_string())
        }
    }
    (emitted, diagnostics)
}

/// Every file already in `out_dir`, sorted by path
fn existing_outputs(out_dir: &Path) -> Result<IndexSet<String>, BuildError> {
    if !out_dir.is_dir() {
        return Ok(IndexSet::new())
    }
    let mut paths = Vec::new();
    for entry in WalkDir::new(out_dir).follow_links(true) {
        let entry = entry.map_err(|source| BuildError::WalkDir { path: out_dir.to_path_buf(), source })?;
        if entry.file_type().is_file() {
            paths.push(absolute(&to_slash(entry.path())));
        }
    }
    paths.sort();
    Ok(paths.into_iter().collect())
}

/// Delete every `.js` and `.js.map` file in `out_dir` (recursively) which isn't in `emitted`.
/// Returns how many were deleted.
pub fn remove_stale_outputs(out_dir: &Path, emitted: &IndexSet<String>) -> Result<usize, BuildError> {
    if !out_dir.is_dir() {
        return Ok(0)
    }
    let mut num_removed = 0;
    for entry in WalkDir::new(out_dir) {
        let entry = entry.map_err(|source| BuildError::WalkDir { path: out_dir.to_path_buf(), source })?;
        if !entry.file_type().is_file() || !STALE_OUTPUT_GLOBS.is_match(entry.file_name()) {
            continue
        }
        let path = absolute(&to_slash(entry.path()));
        if emitted.contains(&path) {
            continue
        }
        debug!("Removing stale output {}", entry.path().display());
        remove_file(entry.path())
            .filter_err(|err| err.kind() != std::io::ErrorKind::NotFound)
            .map_err(|source| BuildError::RemoveStale { path: entry.path().to_path_buf(), source })?;
        num_removed += 1;
    }
    Ok(num_removed)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use indexmap::IndexSet;
    use test_log::test;

    use crate::misc::mk_path;
    use crate::misc::path::{absolute, to_slash};
    use super::{BuildError, CompileOptions, Compiler, parse_tsc_output, remove_stale_outputs};

    fn no_compile() -> Compiler {
        Compiler::new(CompileOptions { compile: false, ..CompileOptions::default() })
    }

    fn write_project(dir: &Path, manifest: &str, tsconfig: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("package.json"), manifest).unwrap();
        fs::write(dir.join("tsconfig.json"), tsconfig).unwrap();
    }

    #[test]
    fn merges_existing_declarations_without_compiling() {
        let dir = tempfile::tempdir().unwrap();
        write_project(
            dir.path(),
            r#"{ "name": "kit" }"#,
            r#"{ "compilerOptions": { "outDir": "out" }, "declaration": true }"#
        );
        fs::create_dir(dir.path().join("out")).unwrap();
        fs::write(mk_path!(dir.path(), "out", "index.d.ts"), "export * from \"./util\";\n").unwrap();
        fs::write(mk_path!(dir.path(), "out", "util.d.ts"), "export declare const x: number;\n").unwrap();
        fs::write(mk_path!(dir.path(), "out", "index.js"), "").unwrap();

        let compiler = no_compile();
        assert!(compiler.build(dir.path()).unwrap().is_ok());
        let merged_path = mk_path!(dir.path(), "out", "kit.d.ts");
        let merged = fs::read_to_string(&merged_path).unwrap();
        assert!(merged.contains("declare module \"kit\" {\n  export * from \"kit/out/util\"\n}\n"), "{}", merged);
        assert!(merged.contains("declare module \"kit/out/util\" {\n  export const x: number\n}\n"), "{}", merged);
        assert!(mk_path!(dir.path(), "out", "index.js").exists());

        // The merged file is in the output directory now, but isn't an input
        assert!(compiler.build(dir.path()).unwrap().is_ok());
        assert_eq!(fs::read_to_string(&merged_path).unwrap(), merged);
    }

    #[test]
    fn missing_declarations_are_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        write_project(
            dir.path(),
            r#"{ "name": "kit" }"#,
            r#"{ "compilerOptions": { "outDir": "out" }, "declaration": "typings/kit.d.ts" }"#
        );
        let output = no_compile().build(dir.path()).unwrap();
        assert_eq!(output.num_warnings, 1);
        assert!(output.is_ok());
        assert!(!mk_path!(dir.path(), "typings", "kit.d.ts").exists());
    }

    /// A package in `packages` whose output directory has one declaration file
    fn write_package(packages: &Path, name: &str, dependencies: &str) {
        let dir = packages.join(name);
        write_project(
            &dir,
            &format!(r#"{{ "name": "{}", "dependencies": {} }}"#, name, dependencies),
            r#"{ "compilerOptions": { "outDir": "out" }, "declaration": true }"#
        );
        fs::create_dir(dir.join("out")).unwrap();
        fs::write(mk_path!(&dir, "out", "index.d.ts"), "export declare const version: string;\n").unwrap();
    }

    #[test]
    fn builds_packages_directory_in_batches() {
        let dir = tempfile::tempdir().unwrap();
        let packages = dir.path().join("packages");
        write_package(&packages, "app", r#"{ "core": "^1.0.0" }"#);
        write_package(&packages, "core", "{}");

        let output = no_compile().run([packages.join("*")]).unwrap();
        assert!(output.is_ok());
        assert_eq!(output.num_built, 2);
        assert_eq!(output.num_warnings, 0);
        let merged = fs::read_to_string(mk_path!(&packages, "core", "out", "core.d.ts")).unwrap();
        assert!(merged.starts_with("declare module \"core\" {\n  export const version: string\n}"), "{}", merged);
        assert!(mk_path!(&packages, "app", "out", "app.d.ts").exists());
    }

    #[test]
    fn failing_dependency_stops_later_batches() {
        let dir = tempfile::tempdir().unwrap();
        let packages = dir.path().join("packages");
        // `app` sorts first, but has to wait for `core`
        write_package(&packages, "app", r#"{ "core": "^1.0.0" }"#);
        write_project(&packages.join("core"), r#"{ "name": "core" }"#, r#"{ "compilerOptions": {} }"#);

        let output = no_compile().run([packages.join("*")]).unwrap();
        assert_eq!(output.num_errors, 1);
        assert_eq!(output.num_built, 0);
        assert!(!mk_path!(&packages, "app", "out", "app.d.ts").exists());
    }

    #[test]
    fn dependency_cycles_are_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let packages = dir.path().join("packages");
        write_package(&packages, "a", r#"{ "b": "*" }"#);
        write_package(&packages, "b", r#"{ "a": "*" }"#);

        let output = no_compile().run([packages.join("*")]).unwrap();
        assert!(output.is_ok());
        assert_eq!(output.num_built, 2);
        assert_eq!(output.num_warnings, 1);
    }

    #[test]
    fn first_failure_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let output = no_compile().run([dir.path().join("missing"), dir.path().join("also-missing")]).unwrap();
        assert_eq!(output.num_errors, 1);
    }

    #[test]
    fn missing_compiler_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        write_project(dir.path(), r#"{ "name": "kit" }"#, r#"{ "compilerOptions": { "outDir": "out" } }"#);
        let compiler = Compiler::new(CompileOptions {
            tsc: dir.path().join("no-such-tsc"),
            compile: true
        });
        assert!(matches!(compiler.build(dir.path()), Err(BuildError::SpawnCompiler { .. })));
    }

    #[test]
    fn parses_emitted_files_and_diagnostics() {
        let (emitted, diagnostics) = parse_tsc_output(
            "TSFILE: /proj/out/a.js\nTSFILE: /proj/out/a.d.ts\n\nsrc/b.ts(1,7): error TS2322: Type 'string' is not assignable to type 'number'.\n"
        );
        assert_eq!(emitted.iter().collect::<Vec<_>>(), vec!["/proj/out/a.js", "/proj/out/a.d.ts"]);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].contains("TS2322"));
    }

    #[test]
    fn removes_only_unlisted_js_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir_all(out.join("sub")).unwrap();
        for name in ["a.js", "a.js.map", "b.js", "b.js.map", "keep.d.ts", "sub/c.js"] {
            fs::write(out.join(name), "").unwrap();
        }
        let emitted = ["a.js", "a.js.map"].iter()
            .map(|name| absolute(&to_slash(&out.join(name))))
            .collect::<IndexSet<_>>();

        assert_eq!(remove_stale_outputs(&out, &emitted).unwrap(), 3);
        assert!(out.join("a.js").exists());
        assert!(out.join("a.js.map").exists());
        assert!(out.join("keep.d.ts").exists());
        assert!(!out.join("b.js").exists());
        assert!(!out.join("b.js.map").exists());
        assert!(!mk_path!(&out, "sub", "c.js").exists());
    }
}
