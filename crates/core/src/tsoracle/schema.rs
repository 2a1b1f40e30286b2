//! JSON output schema for the tree-sitter oracle.
//!
//! Three outputs per run:
//! 1. `oracle_ts_report.json`: per-TU parse status and verdicts.
//! 2. `oracle_ts_functions.json`: per-function entries with node indexes.
//! 3. `extraction_recipes.json`: deterministic slice descriptors.

use serde::{Deserialize, Serialize};

use crate::tsoracle::functions::TsFunctionEntry;
use crate::tsoracle::nodes::StructuralNode;
use crate::tsoracle::parser::ParseErrorLoc;
use crate::{PACKAGE_NAME, SCHEMA_VERSION};

/// Per-TU summary in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuReport {
    pub tu_path: String,
    /// sha256 of the raw TU text.
    pub tu_hash: String,
    pub parser_version: String,
    /// "OK" | "ERROR".
    pub parse_status: String,
    /// ACCEPT | WARN | REJECT.
    pub verdict: String,
    pub reasons: Vec<String>,
    pub n_functions: usize,
    pub parse_errors: Vec<ParseErrorLoc>,
}

/// Wrapper for `oracle_ts_report.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsReport {
    pub package_name: String,
    pub version: String,
    pub schema_version: String,
    pub profile_id: String,

    pub tu_reports: Vec<TuReport>,

    /// RFC 3339; the single permitted nondeterministic field.
    pub timestamp: String,
}

impl TsReport {
    pub fn new(profile_id: &str) -> Self {
        Self {
            package_name: PACKAGE_NAME.to_string(),
            version: crate::version().to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            profile_id: profile_id.to_string(),
            tu_reports: Vec::new(),
            timestamp: crate::util::now_rfc3339(),
        }
    }
}

/// One function row in `oracle_ts_functions.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsFunctionRecord {
    pub tu_path: String,
    #[serde(flatten)]
    pub entry: TsFunctionEntry,
    /// Structural nodes indexed within this function.
    pub nodes: Vec<StructuralNode>,
}

/// Wrapper for `oracle_ts_functions.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsFunctionsOutput {
    pub package_name: String,
    pub version: String,
    pub schema_version: String,
    pub profile_id: String,

    pub functions: Vec<TsFunctionRecord>,
}

impl TsFunctionsOutput {
    pub fn new(profile_id: &str) -> Self {
        Self {
            package_name: PACKAGE_NAME.to_string(),
            version: crate::version().to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            profile_id: profile_id.to_string(),
            functions: Vec::new(),
        }
    }
}

/// A byte slice of a TU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceSpan {
    pub start_byte: usize,
    pub end_byte: usize,
}

/// Deterministic slice descriptor for downstream extraction.
///
/// Not a compilation instruction: consumers concatenate the listed byte
/// slices of the TU in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRecipe {
    pub ts_func_id: String,
    pub tu_path: String,
    /// "function_only" | "function_with_file_preamble".
    pub kind: String,
    pub slices: Vec<SliceSpan>,
}

/// Wrapper for `extraction_recipes.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipesOutput {
    pub package_name: String,
    pub version: String,
    pub schema_version: String,
    pub profile_id: String,

    pub recipes: Vec<ExtractionRecipe>,
}

impl RecipesOutput {
    pub fn new(profile_id: &str) -> Self {
        Self {
            package_name: PACKAGE_NAME.to_string(),
            version: crate::version().to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            profile_id: profile_id.to_string(),
            recipes: Vec::new(),
        }
    }
}
