//! JSON output schema for the DWARF oracle.
//!
//! Two outputs per binary:
//! 1. `oracle_report.json`: binary-level verdict + summary counts.
//! 2. `oracle_functions.json`: per-function verdicts + alignment evidence.
//!
//! Runtime contract fields present in every output: package_name, version,
//! schema_version, profile_id, binary_sha256.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{PACKAGE_NAME, SCHEMA_VERSION};

/// A `[low, high)` range as hex strings for stable JSON serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeModel {
    pub low: String,
    pub high: String,
}

/// A single (file, line) hit count from `.debug_line` evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRowEntry {
    pub file: String,
    pub line: u64,
    pub count: u64,
}

/// One function alignment target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleFunctionEntry {
    pub function_id: String,
    /// Hex, section-relative.
    pub die_offset: String,
    pub cu_offset: String,

    pub name: Option<String>,
    pub linkage_name: Option<String>,

    pub decl_file: Option<String>,
    pub decl_line: Option<u64>,
    pub decl_column: Option<u64>,
    pub comp_dir: Option<String>,
    /// NO_DECL_FILE_ATTR or FILE_INDEX_UNRESOLVABLE when decl_file is None.
    pub decl_missing_reason: Option<String>,

    pub ranges: Vec<RangeModel>,
    pub total_range_bytes: u64,

    pub dominant_file: Option<String>,
    pub dominant_file_ratio: f64,
    pub line_min: Option<u64>,
    pub line_max: Option<u64>,
    pub n_line_rows: u64,

    /// Granular line evidence for the alignment join. Populated for
    /// ACCEPT and WARN functions; empty for REJECT.
    pub line_rows: Vec<LineRowEntry>,
    pub file_row_counts: BTreeMap<String, u64>,

    /// ACCEPT | WARN | REJECT.
    pub verdict: String,
    pub reasons: Vec<String>,
}

/// Per-verdict function counts for the report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionCounts {
    pub total: u64,
    pub accept: u64,
    pub warn: u64,
    pub reject: u64,
}

/// Wrapper for `oracle_functions.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleFunctionsOutput {
    pub package_name: String,
    pub version: String,
    pub schema_version: String,
    pub profile_id: String,

    pub binary_path: String,
    pub binary_sha256: String,

    pub functions: Vec<OracleFunctionEntry>,
}

impl OracleFunctionsOutput {
    pub fn new(profile_id: &str, binary_path: &str, binary_sha256: &str) -> Self {
        Self {
            package_name: PACKAGE_NAME.to_string(),
            version: crate::version().to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            profile_id: profile_id.to_string(),
            binary_path: binary_path.to_string(),
            binary_sha256: binary_sha256.to_string(),
            functions: Vec::new(),
        }
    }
}

/// Binary-level summary: `oracle_report.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleReport {
    pub package_name: String,
    pub version: String,
    pub schema_version: String,
    pub profile_id: String,

    pub binary_path: String,
    pub binary_sha256: String,
    pub build_id: Option<String>,

    /// Binary gate verdict: ACCEPT | REJECT.
    pub verdict: String,
    pub reasons: Vec<String>,

    pub function_counts: FunctionCounts,

    /// RFC 3339; the single permitted nondeterministic field.
    pub timestamp: String,
}

impl OracleReport {
    pub fn new(profile_id: &str, binary_path: &str, binary_sha256: &str) -> Self {
        Self {
            package_name: PACKAGE_NAME.to_string(),
            version: crate::version().to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            profile_id: profile_id.to_string(),
            binary_path: binary_path.to_string(),
            binary_sha256: binary_sha256.to_string(),
            build_id: None,
            verdict: String::new(),
            reasons: Vec::new(),
            function_counts: FunctionCounts::default(),
            timestamp: crate::util::now_rfc3339(),
        }
    }
}
