//! Structural node index: control-flow nodes within functions.
//!
//! Fixed allowlist of node types indexed per function_definition.

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::tsoracle::normalize::raw_hash;

/// Node types indexed within a function body.
pub const STRUCTURAL_NODE_TYPES: &[&str] = &[
    "compound_statement",
    "if_statement",
    "for_statement",
    "while_statement",
    "do_statement",
    "switch_statement",
    "return_statement",
    "goto_statement",
    "labeled_statement",
];

/// Flag raised when a node sits at or beyond the nesting threshold.
pub const DEEP_NESTING: &str = "DEEP_NESTING";

/// One structural node within a function body (0-based lines).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralNode {
    pub node_type: String,
    pub start_line: usize,
    pub end_line: usize,
    pub start_byte: usize,
    pub end_byte: usize,
    pub node_hash_raw: String,
    pub depth: usize,
    pub uncertainty_flags: Vec<String>,
}

/// Walk a function_definition node and collect allowlisted nodes.
pub fn index_structural_nodes(
    func_node: Node<'_>,
    source_bytes: &[u8],
    deep_nesting_threshold: usize,
) -> Vec<StructuralNode> {
    let mut out = Vec::new();
    walk(func_node, source_bytes, 0, deep_nesting_threshold, &mut out);
    out
}

fn walk(
    node: Node<'_>,
    source_bytes: &[u8],
    depth: usize,
    threshold: usize,
    out: &mut Vec<StructuralNode>,
) {
    if STRUCTURAL_NODE_TYPES.contains(&node.kind()) {
        let text = &source_bytes[node.byte_range()];
        let mut flags = Vec::new();
        if depth >= threshold {
            flags.push(DEEP_NESTING.to_string());
        }

        out.push(StructuralNode {
            node_type: node.kind().to_string(),
            start_line: node.start_position().row,
            end_line: node.end_position().row,
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            node_hash_raw: raw_hash(text),
            depth,
            uncertainty_flags: flags,
        });
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, source_bytes, depth + 1, threshold, out);
    }
}
