//! Lexical, forward-slash path arithmetic.
//!
//! Module ids and compiler-emitted paths always use `/`, regardless of the host OS, so these
//! helpers take and return strings. Cleaning is [PathClean] and diffing is [diff_paths]; none of
//! them touch the file system, except [absolute], which reads the current directory for relative
//! inputs.

use std::env;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use pathdiff::diff_paths;

/// Concatenate path components into a [std::path::PathBuf]
macro_rules! mk_path {
    ($base:expr, $($segment:expr),+) => {{
        let mut base: ::std::path::PathBuf = $base.into();
        $(
            base.push($segment);
        )*
        base
    }}
}
pub(crate) use mk_path;

/// Convert host separators to `/`
pub fn to_slash(path: &Path) -> String {
    normalize_separators(&path.to_string_lossy())
}

/// Replace every `\` with `/`
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Lexically clean `path` (`.`, `..`, repeated separators), forward slashes. Never empty (`"."`
/// instead).
fn clean(path: impl AsRef<Path>) -> String {
    to_slash(&path.as_ref().clean())
}

/// Join and clean, like node's `path.posix.join`
pub fn join(base: &str, relative: &str) -> String {
    if base.is_empty() {
        clean(relative)
    } else {
        clean(format!("{}/{}", base, relative))
    }
}

/// Everything before the last segment: `"a/b/c"` -> `"a/b"`, `"a"` -> `"."`, `"/a"` -> `"/"`
pub fn dirname(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return if path.starts_with('/') { "/" } else { "." };
    }
    match trimmed.rfind('/') {
        Some(0) => "/",
        Some(index) => &trimmed[..index],
        None => "."
    }
}

/// Last segment, without `extension` if it ends with it
pub fn basename<'a>(path: &'a str, extension: &str) -> &'a str {
    let trimmed = path.trim_end_matches('/');
    let name = trimmed.rsplit('/').next().unwrap_or(trimmed);
    match name.strip_suffix(extension) {
        Some(stem) if !stem.is_empty() => stem,
        _ => name
    }
}

fn is_rooted(path: &Path) -> bool {
    path.is_absolute() || path.has_root()
}

/// Make `path` absolute (against the current directory) and clean it
pub fn absolute(path: &str) -> String {
    let path = PathBuf::from(normalize_separators(path));
    if is_rooted(&path) {
        return clean(path)
    }
    match env::current_dir() {
        Ok(cwd) => clean(cwd.join(path)),
        Err(_) => clean(path)
    }
}

/// Resolve `relative` against the directory `base`, like node's `path.resolve(base, relative)`
pub fn resolve(base: &str, relative: &str) -> String {
    let relative = normalize_separators(relative);
    if is_rooted(Path::new(&relative)) {
        absolute(&relative)
    } else {
        absolute(&join(&normalize_separators(base), &relative))
    }
}

/// Path from `from` to `to`, like node's `path.relative`. Empty if they are the same.
pub fn relative(from: &str, to: &str) -> String {
    let from = absolute(from);
    let to = absolute(to);
    match diff_paths(&to, &from) {
        Some(relative) => to_slash(&relative),
        None => to
    }
}
