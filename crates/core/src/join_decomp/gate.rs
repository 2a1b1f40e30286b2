//! High-confidence gate.
//!
//! High-confidence rows form the gold subset for evaluation tasks that
//! need maximal alignment certainty; every quality signal must pass.

use crate::model::{CfgCompleteness, MatchKind};

/// Inputs to the gate, flattened so the rule reads in one place.
pub struct GateInputs<'a> {
    pub oracle_verdict: &'a str,
    pub align_verdict: Option<&'a str>,
    pub align_n_candidates: Option<usize>,
    pub align_overlap_ratio: Option<f64>,
    pub match_kind: MatchKind,
    pub is_external_block: bool,
    pub is_thunk: bool,
    pub is_aux_function: bool,
    pub is_import_proxy: bool,
    pub cfg_completeness: Option<CfgCompleteness>,
    pub warning_tags: &'a [String],
    pub fatal_warnings: &'a [String],
}

/// True iff the joined row qualifies as high-confidence.
pub fn is_high_confidence(inputs: &GateInputs<'_>) -> bool {
    // DWARF oracle must be a clean ACCEPT; WARN carries provenance
    // uncertainty.
    if inputs.oracle_verdict != "ACCEPT" {
        return false;
    }

    // Alignment: perfect unique match.
    if inputs.align_verdict != Some("MATCH") {
        return false;
    }
    if inputs.align_n_candidates != Some(1) {
        return false;
    }
    match inputs.align_overlap_ratio {
        Some(ratio) if ratio >= 1.0 => {}
        _ => return false,
    }

    // Address join: strong overlap.
    if inputs.match_kind != MatchKind::JoinedStrong {
        return false;
    }

    // Not noise or infrastructure.
    if inputs.is_external_block
        || inputs.is_thunk
        || inputs.is_aux_function
        || inputs.is_import_proxy
    {
        return false;
    }

    // CFG must not be known-incomplete.
    if inputs.cfg_completeness == Some(CfgCompleteness::Low) {
        return false;
    }

    // No fatal decompiler warnings.
    if inputs.warning_tags.iter().any(|w| inputs.fatal_warnings.contains(w)) {
        return false;
    }

    true
}
