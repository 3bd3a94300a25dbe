use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::info;

use crate::ast::DeclarationFile;

pub use module_id::*;
pub use rewriter::*;

/// Flat module ids: output layout and the id table shared by one run
mod module_id;
/// Rewriting one declaration file into a `declare module` block
mod rewriter;

/// Merge `files` into `out`, one `declare module` block per non-empty file, in the given order.
///
/// Files can only refer (via `../`) to files before them, so pass dependencies first when you
/// know them. Returns the ids assigned to every file.
pub fn generate_declaration_file(
    files: &[DeclarationFile],
    layout: &ModuleLayout,
    out: &mut impl Write
) -> io::Result<ModuleIdTable> {
    let mut table = ModuleIdTable::new();
    for file in files {
        if let Some(rendered) = rewrite_declaration(file, layout, &mut table) {
            out.write_all(rendered.as_bytes())?;
        }
    }
    Ok(table)
}

/// [generate_declaration_file] into a new file at `path`, creating parent directories
pub fn write_declaration_file(
    path: &Path,
    files: &[DeclarationFile],
    layout: &ModuleLayout
) -> io::Result<ModuleIdTable> {
    info!("Generating d.ts to {}", path.display());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(create_output_file(path)?);
    let table = generate_declaration_file(files, layout, &mut out)?;
    out.flush()?;
    Ok(table)
}

#[cfg(unix)]
fn create_output_file(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new().write(true).create(true).truncate(true).mode(0o644).open(path)
}

#[cfg(not(unix))]
fn create_output_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().write(true).create(true).truncate(true).open(path)
}
