use std::path::Path;

use crate::ast::tree_sitter::{TreeCreateError, TSNode, TSTree, TYPESCRIPT_PARSER};
use crate::misc::path::to_slash;

/// A parsed declaration (`.d.ts`) file emitted by the compiler
#[derive(Debug)]
pub struct DeclarationFile {
    file_name: String,
    text: String,
    tree: TSTree,
}

impl DeclarationFile {
    /// Parse `text` as the contents of `file_name`
    pub fn parse(file_name: impl Into<String>, text: impl Into<String>) -> Result<Self, TreeCreateError> {
        let text = text.into();
        let tree = TYPESCRIPT_PARSER.lock().parse_string(&text)?;
        Ok(Self {
            file_name: file_name.into(),
            text,
            tree
        })
    }

    /// Read and parse the file at `path`
    pub fn read(path: &Path) -> Result<Self, TreeCreateError> {
        let (text, tree) = TYPESCRIPT_PARSER.lock().parse_file(path)?;
        Ok(Self {
            file_name: to_slash(path),
            text,
            tree
        })
    }

    /// On-disk path of the file
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Full source text
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> TSNode<'_> {
        self.tree.root_node()
    }

    /// Top-level declarations in source order (comments excluded)
    pub fn statements(&self) -> impl Iterator<Item=TSNode<'_>> + '_ {
        let root = self.root();
        (0..root.named_child_count())
            .filter_map(move |index| root.named_child(index))
            .filter(|node| node.kind() != "comment")
    }

    /// Source text of a node in this file
    pub fn node_text(&self, node: TSNode<'_>) -> &str {
        &self.text[node.byte_range()]
    }
}
