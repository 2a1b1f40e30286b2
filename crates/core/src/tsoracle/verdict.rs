//! Verdict policy for the tree-sitter oracle.
//!
//! All verdicts are strictly syntactic, derived from parse-tree
//! properties. No semantic inference.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::model::Verdict;
use crate::tsoracle::functions::TsFunctionEntry;
use crate::tsoracle::nodes::{StructuralNode, DEEP_NESTING};
use crate::tsoracle::parser::ParseResult;

/// TU-level reject reason.
pub const TU_PARSE_ERROR: &str = "TU_PARSE_ERROR";

/// Function-level reject reasons.
pub mod reject_reason {
    pub const INVALID_SPAN: &str = "INVALID_SPAN";
    pub const MISSING_FUNCTION_NAME: &str = "MISSING_FUNCTION_NAME";
}

/// Function-level warn reasons.
pub mod warn_reason {
    pub const DUPLICATE_FUNCTION_NAME: &str = "DUPLICATE_FUNCTION_NAME";
    pub const DEEP_NESTING: &str = "DEEP_NESTING";
    pub const ANONYMOUS_AGGREGATE_PRESENT: &str = "ANONYMOUS_AGGREGATE_PRESENT";
    pub const NONSTANDARD_EXTENSION_PATTERN: &str = "NONSTANDARD_EXTENSION_PATTERN";
}

/// Support profile for the tree-sitter oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsProfile {
    pub profile_id: String,
    pub parser_name: String,
    pub deep_nesting_threshold: usize,
}

impl Default for TsProfile {
    fn default() -> Self {
        Self {
            profile_id: "source-c-treesitter".to_string(),
            parser_name: "tree-sitter-c".to_string(),
            deep_nesting_threshold: 8,
        }
    }
}

/// TU-level verdict.
///
/// Lenient policy: parse errors produce WARN unless the root has zero
/// children (completely unparseable), which is a REJECT.
pub fn gate_tu(parse_result: &ParseResult) -> (Verdict, Vec<String>) {
    if parse_result.parse_status == "ERROR" {
        let root = parse_result.tree.root_node();
        if root.child_count() == 0 {
            return (Verdict::Reject, vec![TU_PARSE_ERROR.to_string()]);
        }
        return (Verdict::Warn, vec![TU_PARSE_ERROR.to_string()]);
    }
    (Verdict::Accept, Vec::new())
}

/// Names that appear on more than one function definition in a TU.
pub fn duplicate_names(entries: &[TsFunctionEntry]) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut dupes = BTreeSet::new();
    for entry in entries {
        if let Some(name) = &entry.name {
            if !seen.insert(name.clone()) {
                dupes.insert(name.clone());
            }
        }
    }
    dupes
}

/// Per-function verdict.
pub fn judge_function(
    func: &TsFunctionEntry,
    duplicates: &BTreeSet<String>,
    structural_nodes: &[StructuralNode],
    func_node: Option<Node<'_>>,
    source_bytes: &[u8],
    _profile: &TsProfile,
) -> (Verdict, Vec<String>) {
    let mut reasons: Vec<String> = Vec::new();

    if func.start_byte >= func.end_byte {
        reasons.push(reject_reason::INVALID_SPAN.to_string());
        return (Verdict::Reject, reasons);
    }
    if func.name.is_none() {
        reasons.push(reject_reason::MISSING_FUNCTION_NAME.to_string());
        return (Verdict::Reject, reasons);
    }

    if let Some(name) = &func.name {
        if duplicates.contains(name) {
            reasons.push(warn_reason::DUPLICATE_FUNCTION_NAME.to_string());
        }
    }

    if structural_nodes.iter().any(|n| n.uncertainty_flags.iter().any(|f| f == DEEP_NESTING)) {
        reasons.push(warn_reason::DEEP_NESTING.to_string());
    }

    // Only check when the actual function node is available; scanning the
    // whole TU would produce false WARNs for other functions' aggregates.
    if let Some(node) = func_node {
        if has_anonymous_aggregate(node) {
            reasons.push(warn_reason::ANONYMOUS_AGGREGATE_PRESENT.to_string());
        }
    }

    let func_text = &source_bytes[func.start_byte..func.end_byte];
    if has_nonstandard_extension(func_text) {
        reasons.push(warn_reason::NONSTANDARD_EXTENSION_PATTERN.to_string());
    }

    if reasons.is_empty() {
        (Verdict::Accept, reasons)
    } else {
        (Verdict::Warn, reasons)
    }
}

/// True if a node subtree contains an anonymous struct/union/enum with a
/// body. Pure forward declarations without names do not count.
fn has_anonymous_aggregate(node: Node<'_>) -> bool {
    if matches!(node.kind(), "struct_specifier" | "union_specifier" | "enum_specifier")
        && node.child_by_field_name("name").is_none()
        && node.child_by_field_name("body").is_some()
    {
        return true;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if has_anonymous_aggregate(child) {
            return true;
        }
    }
    false
}

/// Best-effort detection of GCC/Clang extensions in function text.
fn has_nonstandard_extension(func_text: &[u8]) -> bool {
    const MARKERS: &[&str] = &[
        "__attribute__",
        "__asm__",
        "__asm",
        "__extension__",
        "__typeof__",
        "__builtin_",
        "_Pragma",
    ];
    let text = String::from_utf8_lossy(func_text);
    MARKERS.iter().any(|m| text.contains(m))
}
