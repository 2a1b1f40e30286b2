//! Tree-sitter C parser wrapper.
//!
//! Parses preprocessed C translation units (`.i`) and reports parse
//! status, error locations, and the concrete syntax tree.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tree_sitter::{Node, Parser, Tree};

use crate::tsoracle::normalize::raw_hash;

/// Error type for TU parsing.
#[derive(Debug, Error)]
pub enum TsParseError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("tree-sitter rejected the C grammar: {0}")]
    Language(String),

    #[error("tree-sitter returned no tree for {0}")]
    NoTree(String),
}

/// A single error node found in the parse tree (0-based coordinates).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseErrorLoc {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Result of parsing a single translation unit.
pub struct ParseResult {
    pub tree: Tree,
    pub source_bytes: Vec<u8>,
    /// As supplied (may be relative).
    pub tu_path: String,
    /// sha256 of the raw text.
    pub tu_hash: String,
    pub parser_version: String,
    /// "OK" | "ERROR".
    pub parse_status: String,
    pub parse_errors: Vec<ParseErrorLoc>,
}

/// Runtime + grammar identity for provenance.
fn parser_version_string() -> String {
    let lang: tree_sitter::Language = tree_sitter_c::LANGUAGE.into();
    format!(
        "tree-sitter abi {}; tree-sitter-c abi {}",
        tree_sitter::LANGUAGE_VERSION,
        lang.version()
    )
}

/// Walk the tree and collect ERROR / MISSING nodes.
fn collect_errors(node: Node<'_>, errors: &mut Vec<ParseErrorLoc>) {
    if node.is_error() || node.is_missing() {
        let point = node.start_position();
        let message = if node.is_missing() {
            format!("MISSING({})", node.kind())
        } else {
            "ERROR".to_string()
        };
        errors.push(ParseErrorLoc { line: point.row, column: point.column, message });
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_errors(child, errors);
    }
}

/// Parse raw TU bytes.
pub fn parse_bytes(source_bytes: Vec<u8>, tu_path: &str) -> Result<ParseResult, TsParseError> {
    let tu_hash = raw_hash(&source_bytes);

    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_c::LANGUAGE.into())
        .map_err(|e| TsParseError::Language(e.to_string()))?;

    let tree = parser
        .parse(&source_bytes, None)
        .ok_or_else(|| TsParseError::NoTree(tu_path.to_string()))?;

    let mut parse_errors = Vec::new();
    collect_errors(tree.root_node(), &mut parse_errors);
    let parse_status = if parse_errors.is_empty() { "OK" } else { "ERROR" }.to_string();

    Ok(ParseResult {
        tree,
        source_bytes,
        tu_path: tu_path.to_string(),
        tu_hash,
        parser_version: parser_version_string(),
        parse_status,
        parse_errors,
    })
}

/// Parse a preprocessed C translation unit from disk.
pub fn parse_tu(i_path: &Path) -> Result<ParseResult, TsParseError> {
    let source_bytes = std::fs::read(i_path)
        .map_err(|e| TsParseError::Io { path: i_path.display().to_string(), source: e })?;
    parse_bytes(source_bytes, &i_path.display().to_string())
}
