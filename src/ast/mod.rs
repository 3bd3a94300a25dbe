/// Wrapper for the tree-sitter TypeScript parser
pub mod tree_sitter;
/// Parsed `.d.ts` files
mod declaration_file;
/// Re-print a tree while replacing or dropping nodes
mod process_tree;

pub use declaration_file::*;
pub use process_tree::*;
