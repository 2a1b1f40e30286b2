//! JSON output schema for the DWARF/tree-sitter alignment join.
//!
//! Two outputs per binary:
//! 1. `alignment_report.json`: pair/reason counts and thresholds.
//! 2. `alignment_pairs.json`: one pair per DWARF target + non-targets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{PACKAGE_NAME, SCHEMA_VERSION};

/// Frozen configuration for the alignment join.
///
/// The profile_id uniquely identifies the configuration; changing any
/// parameter should change it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinTsProfile {
    pub profile_id: String,
    /// Minimum overlap ratio for MATCH.
    pub overlap_threshold: f64,
    /// Absolute near-tie tolerance on the overlap ratio.
    pub epsilon: f64,
    /// Minimum overlap count to be considered at all.
    pub min_overlap_lines: u64,
    /// Origin-map path prefixes mapped to absent.
    pub excluded_path_prefixes: Vec<String>,
}

impl Default for JoinTsProfile {
    fn default() -> Self {
        Self {
            profile_id: "join-dwarf-ts-v2".to_string(),
            overlap_threshold: 0.7,
            epsilon: 0.02,
            min_overlap_lines: 1,
            excluded_path_prefixes: vec![
                "/usr/include".to_string(),
                "/usr/lib/gcc".to_string(),
                "<built-in>".to_string(),
                "<command-line>".to_string(),
            ],
        }
    }
}

/// One scored candidate, kept on the pair for transparency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateScore {
    pub ts_func_id: String,
    pub tu_path: String,
    pub function_name: Option<String>,
    pub context_hash: String,
    pub overlap_count: u64,
    pub overlap_ratio: f64,
    pub gap_count: u64,
}

/// One alignment pair: a DWARF target and its best TS candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentPair {
    pub dwarf_function_id: String,
    pub dwarf_function_name: Option<String>,
    /// DWARF oracle verdict (ACCEPT | WARN).
    pub dwarf_verdict: String,

    pub decl_file: Option<String>,
    pub decl_line: Option<u64>,
    pub decl_column: Option<u64>,
    pub comp_dir: Option<String>,

    pub best_ts_func_id: Option<String>,
    pub best_tu_path: Option<String>,
    pub best_ts_function_name: Option<String>,

    pub overlap_count: u64,
    pub total_count: u64,
    pub overlap_ratio: f64,
    pub gap_count: u64,

    /// MATCH | AMBIGUOUS | NO_MATCH.
    pub verdict: String,
    pub reasons: Vec<String>,

    /// Length of `candidates` (best included).
    pub n_candidates: usize,
    pub candidates: Vec<CandidateScore>,
}

/// A DWARF REJECT entry passed through without alignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonTargetEntry {
    pub dwarf_function_id: String,
    pub name: Option<String>,
    pub dwarf_verdict: String,
    pub dwarf_reasons: Vec<String>,
    pub decl_file: Option<String>,
    pub decl_line: Option<u64>,
    pub decl_column: Option<u64>,
    pub comp_dir: Option<String>,
}

/// Wrapper for `alignment_pairs.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentPairsOutput {
    pub package_name: String,
    pub version: String,
    pub schema_version: String,
    pub profile_id: String,

    pub binary_sha256: String,
    pub build_id: Option<String>,
    pub dwarf_profile_id: String,
    pub ts_profile_id: String,

    pub pairs: Vec<AlignmentPair>,
    pub non_targets: Vec<NonTargetEntry>,
}

/// Verdict counters for the report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PairCounts {
    pub r#match: u64,
    pub ambiguous: u64,
    pub no_match: u64,
    pub non_target: u64,
}

/// Wrapper for `alignment_report.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentReport {
    pub package_name: String,
    pub version: String,
    pub schema_version: String,
    pub profile_id: String,

    pub binary_sha256: String,
    pub build_id: Option<String>,
    pub dwarf_profile_id: String,
    pub ts_profile_id: String,

    /// tu_path -> tu_hash, from the TS report.
    pub tu_hashes: BTreeMap<String, String>,

    pub pair_counts: PairCounts,
    pub reason_counts: BTreeMap<String, u64>,

    pub thresholds: BTreeMap<String, f64>,
    pub excluded_path_prefixes: Vec<String>,

    /// RFC 3339; the single permitted nondeterministic field.
    pub timestamp: String,
}

impl AlignmentPairsOutput {
    pub fn new(profile_id: &str) -> Self {
        Self {
            package_name: PACKAGE_NAME.to_string(),
            version: crate::version().to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            profile_id: profile_id.to_string(),
            binary_sha256: String::new(),
            build_id: None,
            dwarf_profile_id: String::new(),
            ts_profile_id: String::new(),
            pairs: Vec::new(),
            non_targets: Vec::new(),
        }
    }
}

impl AlignmentReport {
    pub fn new(profile_id: &str) -> Self {
        Self {
            package_name: PACKAGE_NAME.to_string(),
            version: crate::version().to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            profile_id: profile_id.to_string(),
            binary_sha256: String::new(),
            build_id: None,
            dwarf_profile_id: String::new(),
            ts_profile_id: String::new(),
            tu_hashes: BTreeMap::new(),
            pair_counts: PairCounts::default(),
            reason_counts: BTreeMap::new(),
            thresholds: BTreeMap::new(),
            excluded_path_prefixes: Vec::new(),
            timestamp: crate::util::now_rfc3339(),
        }
    }
}
