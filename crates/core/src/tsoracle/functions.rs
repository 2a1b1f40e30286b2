//! Function index: extract function_definition nodes from the CST.
//!
//! For each function definition: name, byte/line spans, signature/body/
//! preamble spans, raw-text hash, and the whitespace/comment-insensitive
//! context hash that serves as the cross-TU dedup key.

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::tsoracle::normalize::{normalize_and_hash, raw_hash};
use crate::tsoracle::parser::ParseResult;

/// A byte/line span (0-based lines).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanInfo {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_line: usize,
    pub end_line: usize,
}

impl SpanInfo {
    fn of(node: Node<'_>) -> Self {
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: node.start_position().row,
            end_line: node.end_position().row,
        }
    }
}

/// One function extracted from a translation unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsFunctionEntry {
    pub name: Option<String>,

    pub start_line: usize,
    pub end_line: usize,
    pub start_byte: usize,
    pub end_byte: usize,

    pub signature_span: SpanInfo,
    pub body_span: SpanInfo,
    /// Everything before this function: bytes `[0, start_byte)`.
    pub preamble_span: SpanInfo,

    /// `tu_path:start_byte:end_byte`.
    pub span_id: String,
    /// sha256 of the normalized function text; the cross-TU dedup key.
    pub context_hash: String,
    /// `span_id:context_hash`; unique within a TU.
    pub ts_func_id: String,
    /// sha256 of the exact span bytes.
    pub node_hash_raw: String,

    /// Set by policy after indexing.
    pub verdict: String,
    pub reasons: Vec<String>,
}

/// Extract the function name from a function_definition node.
///
/// Grammar shape: `function_definition -> declarator: function_declarator
/// -> declarator: identifier | pointer_declarator | ...`.
fn extract_function_name(node: Node<'_>, source: &[u8]) -> Option<String> {
    let declarator = node.child_by_field_name("declarator")?;
    find_identifier(declarator, source)
}

/// Recursively drill into declarator nodes to find the identifier.
fn find_identifier(node: Node<'_>, source: &[u8]) -> Option<String> {
    match node.kind() {
        "identifier" => {
            Some(String::from_utf8_lossy(&source[node.byte_range()]).into_owned())
        }
        "function_declarator" | "pointer_declarator" | "array_declarator" => {
            let inner = node.child_by_field_name("declarator")?;
            find_identifier(inner, source)
        }
        "parenthesized_declarator" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if let Some(name) = find_identifier(child, source) {
                    return Some(name);
                }
            }
            None
        }
        _ => None,
    }
}

/// Walk the CST root and extract all top-level function_definition nodes.
pub fn index_functions(parse_result: &ParseResult) -> Vec<TsFunctionEntry> {
    let root = parse_result.tree.root_node();
    let source = parse_result.source_bytes.as_slice();
    let tu_path = parse_result.tu_path.as_str();

    let mut entries: Vec<TsFunctionEntry> = Vec::new();
    let mut cursor = root.walk();
    for node in root.children(&mut cursor) {
        if node.kind() != "function_definition" {
            continue;
        }

        let name = extract_function_name(node, source);
        let start_byte = node.start_byte();
        let end_byte = node.end_byte();
        let start_line = node.start_position().row;
        let end_line = node.end_position().row;

        // Signature runs from the function start to the body start; the
        // body is the compound_statement when present.
        let body_node = node.child_by_field_name("body");
        let (signature_span, body_span) = match body_node {
            Some(body) if body.kind() == "compound_statement" => (
                SpanInfo {
                    start_byte,
                    end_byte: body.start_byte(),
                    start_line,
                    end_line: body.start_position().row,
                },
                SpanInfo::of(body),
            ),
            _ => (
                SpanInfo { start_byte, end_byte, start_line, end_line },
                SpanInfo { start_byte: end_byte, end_byte, start_line: end_line, end_line },
            ),
        };

        let preamble_span =
            SpanInfo { start_byte: 0, end_byte: start_byte, start_line: 0, end_line: start_line };

        let func_text = &source[start_byte..end_byte];
        let context_hash = normalize_and_hash(func_text);
        let node_hash_raw = raw_hash(func_text);

        let span_id = format!("{tu_path}:{start_byte}:{end_byte}");
        let ts_func_id = format!("{span_id}:{context_hash}");

        entries.push(TsFunctionEntry {
            name,
            start_line,
            end_line,
            start_byte,
            end_byte,
            signature_span,
            body_span,
            preamble_span,
            span_id,
            context_hash,
            ts_func_id,
            node_hash_raw,
            verdict: String::new(),
            reasons: Vec::new(),
        });
    }

    entries
}
