#![doc = include_str!("../README.md")]

/// Parsed declaration files and a wrapper for tree-sitter
pub mod ast;
/// Building projects: running `tsc`, writing declaration files, removing stale outputs
pub mod compiler;
/// Merging declaration files into flat `declare module` blocks
pub mod declaration;
/// Utilities which could go in any crate
pub mod misc;
/// Package manifests and dependency-ordered batching
pub mod package;
/// `tsconfig.json` and `package.json` of one project
mod project;

pub use project::*;
