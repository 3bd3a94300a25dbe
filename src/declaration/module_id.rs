use indexmap::IndexMap;

use crate::misc::path::{absolute, basename, dirname, normalize_separators, relative};

const DECLARATION_EXTENSION: &str = ".d.ts";
const MAIN_DECLARATION_SUFFIX: &str = "main.d.ts";

/// How the compiler output is laid out, and what the merged declaration file should be called
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLayout {
    /// Compiler output directory (`compilerOptions.outDir`), forward slashes, no trailing `/`
    out_dir: String,
    /// Name of the merged module (usually the package name)
    module_name: Option<String>,
    /// `out_dir` relative to the project root, e.g. `out`
    relative_out_dir: String,
    /// `"main"` of the manifest, e.g. `out/main.js`
    main_file: Option<String>,
}

/// Where a declaration file lands in the merged file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLocation {
    /// File name without `.d.ts`, forward slashes
    pub file_name_without_ext: String,
    /// `file_name_without_ext` relative to the output directory, e.g. `dir/file` or `index`
    pub name: String,
    /// Flat id of the file's `declare module` block
    pub id: String,
    /// Prefix for `../` specifiers which aren't in the [ModuleIdTable] yet
    pub base_name: String,
    /// Prefix for `./` specifiers
    pub parent_dir: String,
}

/// Absolute path of every visited declaration file (no extension, forward slashes) to its flat
/// module id. Lives for one merged-file run; files can only refer to files visited before them.
#[derive(Debug, Clone, Default)]
pub struct ModuleIdTable {
    ids: IndexMap<String, String>,
}

impl ModuleLayout {
    pub fn new(out_dir: &str, relative_out_dir: &str) -> Self {
        Self {
            out_dir: normalize_separators(out_dir).trim_end_matches('/').to_string(),
            module_name: None,
            relative_out_dir: normalize_separators(relative_out_dir).trim_end_matches('/').to_string(),
            main_file: None
        }
    }

    pub fn with_module_name(mut self, module_name: impl Into<String>) -> Self {
        self.module_name = Some(module_name.into());
        self
    }

    pub fn with_main_file(mut self, main_file: Option<impl Into<String>>) -> Self {
        self.main_file = main_file.map(Into::into);
        self
    }

    pub fn out_dir(&self) -> &str {
        &self.out_dir
    }

    pub fn module_name(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    pub fn relative_out_dir(&self) -> &str {
        &self.relative_out_dir
    }

    pub fn main_file(&self) -> Option<&str> {
        self.main_file.as_deref()
    }

    /// Basename of the main file without `.js`: a `./` specifier naming it refers to the module
    /// itself
    pub fn main_basename(&self) -> Option<&str> {
        self.main_file.as_deref().map(|main_file| basename(main_file, ".js"))
    }

    /// Compute the flat id and specifier prefixes for the declaration file `file_name`
    pub fn locate(&self, file_name: &str) -> ModuleLocation {
        let normalized = normalize_separators(file_name);
        let file_name_without_ext = normalized.strip_suffix(DECLARATION_EXTENSION)
            .unwrap_or(&normalized)
            .to_string();
        let name = match file_name_without_ext.strip_prefix(&self.out_dir).and_then(|rest| rest.strip_prefix('/')) {
            Some(name) => name.to_string(),
            None => relative(&self.out_dir, &file_name_without_ext)
        };
        let is_index = name == "index";

        let (mut id, base_name) = match &self.module_name {
            Some(module_name) => {
                let id = if is_index {
                    module_name.clone()
                } else {
                    format!("{}/{}", module_name, self.relative_out_dir)
                };
                (id, format!("{}/{}", module_name, self.relative_out_dir))
            }
            None => (self.relative_out_dir.clone(), self.relative_out_dir.clone())
        };
        let parent_dir = if name.contains('/') {
            format!("{}/{}", base_name, dirname(&name))
        } else {
            base_name.clone()
        };
        if !is_index {
            id.push('/');
            id.push_str(&name);
        }
        if self.is_main(file_name, &file_name_without_ext) {
            id = self.module_name.clone().unwrap_or_default();
        }

        ModuleLocation {
            file_name_without_ext,
            name,
            id,
            base_name,
            parent_dir
        }
    }

    fn is_main(&self, file_name: &str, file_name_without_ext: &str) -> bool {
        file_name.ends_with(MAIN_DECLARATION_SUFFIX) || self.main_file.as_deref()
            .map_or(false, |main_file| format!("{}.js", file_name_without_ext).contains(main_file))
    }
}

impl ModuleIdTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the id of the file at `path` (no extension). Returns the previous id, if any.
    pub fn insert(&mut self, path: &str, id: impl Into<String>) -> Option<String> {
        self.ids.insert(absolute(path), id.into())
    }

    /// Id of the file at the absolute, normalized `path` (no extension)
    pub fn get(&self, path: &str) -> Option<&str> {
        self.ids.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
