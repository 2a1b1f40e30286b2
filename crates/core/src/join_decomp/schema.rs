//! JSON output schema for the oracle-to-decompiler join.
//!
//! Two outputs per stripped binary:
//! 1. `join_report.json`: aggregate distributions + invariant findings.
//! 2. `joined_functions.jsonl`: one row per DWARF function, REJECT and
//!    non-target rows included.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{CfgCompleteness, MatchKind, StableFunctionKey};
use crate::{PACKAGE_NAME, SCHEMA_VERSION};

/// Frozen configuration for the oracle-to-decompiler join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinDecompProfile {
    pub profile_id: String,
    pub strong_overlap_threshold: f64,
    pub weak_overlap_threshold: f64,
    /// Fraction of the best candidate's overlap bytes for near-ties.
    pub near_tie_epsilon: f64,
    /// Warning codes that disqualify a row from high confidence.
    pub fatal_warnings: Vec<String>,
}

impl Default for JoinDecompProfile {
    fn default() -> Self {
        Self {
            profile_id: "join-oracles-decompile-v2".to_string(),
            strong_overlap_threshold: 0.9,
            weak_overlap_threshold: 0.3,
            near_tie_epsilon: 0.05,
            fatal_warnings: vec![
                "DECOMPILE_TIMEOUT".to_string(),
                "UNRESOLVED_INDIRECT_JUMP".to_string(),
            ],
        }
    }
}

/// One row of `joined_functions.jsonl`.
///
/// The union of the DWARF entry, the alignment row, and the best-match
/// decompiler function (or an absence marker). No DWARF function is ever
/// dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinedFunctionRow {
    // ── DWARF identity ───────────────────────────────────────────────
    pub dwarf_function_id: String,
    pub dwarf_name: Option<String>,
    pub decl_file: Option<String>,
    pub decl_line: Option<u64>,
    pub decl_column: Option<u64>,
    pub stable_key: StableFunctionKey,
    pub oracle_verdict: String,
    pub oracle_reasons: Vec<String>,
    pub total_dwarf_range_bytes: u64,
    pub has_range: bool,

    // ── Alignment evidence ───────────────────────────────────────────
    pub align_verdict: Option<String>,
    pub align_overlap_ratio: Option<f64>,
    pub align_n_candidates: Option<usize>,
    pub align_reasons: Vec<String>,

    // ── Eligibility ──────────────────────────────────────────────────
    pub eligible_for_join: bool,
    pub eligible_for_gold: bool,
    pub exclusion_reason: Option<String>,

    // ── Decompiler match ─────────────────────────────────────────────
    pub match_kind: MatchKind,
    pub decomp_function_id: Option<String>,
    pub decomp_entry_va: Option<u64>,
    pub decomp_name: Option<String>,
    pub pc_overlap_bytes: u64,
    pub pc_overlap_ratio: f64,
    pub n_near_ties: usize,
    pub join_warnings: Vec<String>,

    // ── Fat-function tagging ─────────────────────────────────────────
    /// True when several DWARF functions map to this decompiler function.
    pub fat_function_multi_dwarf: bool,
    pub fat_function_dwarf_count: usize,

    // ── Noise tags (additive; rows are never dropped) ────────────────
    pub is_external_block: bool,
    pub is_thunk: bool,
    pub is_aux_function: bool,
    pub is_import_proxy: bool,

    // ── Decompiler quality ───────────────────────────────────────────
    pub decomp_verdict: Option<String>,
    pub decomp_warnings: Vec<String>,
    pub cfg_completeness: Option<CfgCompleteness>,

    // ── Gate ─────────────────────────────────────────────────────────
    pub is_high_confidence: bool,
}

/// An invariant-check violation carried in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvariantViolation {
    pub check: String,
    pub function_ids: Vec<String>,
    pub message: String,
}

/// Wrapper for `join_report.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinReport {
    pub package_name: String,
    pub version: String,
    pub schema_version: String,
    pub profile_id: String,

    /// Oracle-side (debug) binary hash: the ground-truth anchor.
    pub binary_sha256: String,
    /// Decompiler-side (stripped) binary hash.
    pub decomp_binary_sha256: String,
    pub test_case: String,
    pub optimization: String,

    pub n_dwarf_functions: u64,
    pub n_decomp_functions: u64,

    pub match_kind_counts: BTreeMap<String, u64>,
    pub exclusion_counts: BTreeMap<String, u64>,
    pub n_high_confidence: u64,
    pub n_eligible_for_join: u64,
    pub n_eligible_for_gold: u64,

    pub pipeline_warnings: Vec<InvariantViolation>,

    /// RFC 3339; the single permitted nondeterministic field.
    pub timestamp: String,
}

impl JoinReport {
    pub fn new(profile_id: &str) -> Self {
        Self {
            package_name: PACKAGE_NAME.to_string(),
            version: crate::version().to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            profile_id: profile_id.to_string(),
            binary_sha256: String::new(),
            decomp_binary_sha256: String::new(),
            test_case: String::new(),
            optimization: String::new(),
            n_dwarf_functions: 0,
            n_decomp_functions: 0,
            match_kind_counts: BTreeMap::new(),
            exclusion_counts: BTreeMap::new(),
            n_high_confidence: 0,
            n_eligible_for_join: 0,
            n_eligible_for_gold: 0,
            pipeline_warnings: Vec::new(),
            timestamp: crate::util::now_rfc3339(),
        }
    }
}
