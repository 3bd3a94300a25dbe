use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use parking_lot::Mutex;
use thiserror::Error;
use tree_sitter_typescript::language_typescript;

/// Thin wrapper over [tree_sitter::Parser] which reports failures as [TreeCreateError]
pub struct TSParser(tree_sitter::Parser);

pub type TSLanguage = tree_sitter::Language;
pub type TSTree = tree_sitter::Tree;
pub type TSNode<'tree> = tree_sitter::Node<'tree>;

#[derive(Debug, Error)]
pub enum TreeCreateError {
    #[error("failed to read source: {0}")]
    IO(#[from] std::io::Error),
    #[error("failed to load the TypeScript grammar: {0}")]
    LoadLanguage(String),
    #[error("parsing failed")]
    ParsingFailed,
}

lazy_static! {
    /// Shared TypeScript parser. Parsing is the only thing done under the lock.
    pub static ref TYPESCRIPT_PARSER: Mutex<TSParser> =
        Mutex::new(TSParser::new(language_typescript()).expect("failed to load TypeScript parser"));
}

impl TSParser {
    #[inline]
    pub fn new(language: TSLanguage) -> Result<Self, TreeCreateError> {
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(language)
            .map_err(|error| TreeCreateError::LoadLanguage(format!("{:?}", error)))?;
        Ok(Self(parser))
    }

    #[inline]
    pub fn parse_file(&mut self, path: &Path) -> Result<(String, TSTree), TreeCreateError> {
        let text = fs::read_to_string(path)?;
        let tree = self.parse_string(&text)?;
        Ok((text, tree))
    }

    #[inline]
    pub fn parse_string(&mut self, text: &str) -> Result<TSTree, TreeCreateError> {
        self.0.parse(text, None).ok_or(TreeCreateError::ParsingFailed)
    }
}

/// Source text of `node`
#[inline]
pub fn node_text<'a>(text: &'a str, node: TSNode<'_>) -> &'a str {
    &text[node.byte_range()]
}
