//! Candidate generation and overlap scoring.
//!
//! For each DWARF target function, every tree-sitter function is scored by
//! scanning its `.i` line span through the TU's origin map and summing the
//! DWARF line-evidence counts over the hit keys. A forward-map scan avoids
//! building an inverse index.

use std::collections::BTreeMap;

use crate::join_ts::origin::OriginMap;

/// Scored alignment candidate: one TS function for one DWARF function.
#[derive(Debug, Clone)]
pub struct CandidateResult {
    pub ts_func_id: String,
    pub tu_path: String,
    pub function_name: Option<String>,
    pub context_hash: String,

    /// Sum of DWARF multiset counts hit by this candidate.
    pub overlap_count: u64,
    /// Sum of all DWARF multiset counts (`n_line_rows`).
    pub total_count: u64,
    pub overlap_ratio: f64,
    pub gap_count: u64,

    /// Tie-break fields.
    pub span_size: usize,
    pub start_byte: usize,
}

/// Minimal TS function info needed for candidate scoring.
#[derive(Debug, Clone)]
pub struct TsFunctionInfo {
    pub ts_func_id: String,
    pub tu_path: String,
    pub name: Option<String>,
    pub context_hash: String,
    /// 0-based `.i` lines.
    pub start_line: usize,
    pub end_line: usize,
    pub start_byte: usize,
    pub end_byte: usize,
}

/// Reason tags emitted by candidate selection.
pub mod reason {
    pub const UNIQUE_BEST: &str = "UNIQUE_BEST";
    pub const NEAR_TIE: &str = "NEAR_TIE";
    pub const HEADER_REPLICATION_COLLISION: &str = "HEADER_REPLICATION_COLLISION";
    pub const MULTI_FILE_RANGE_PROPAGATED: &str = "MULTI_FILE_RANGE_PROPAGATED";
    pub const NO_CANDIDATES: &str = "NO_CANDIDATES";
    pub const NO_OVERLAP: &str = "NO_OVERLAP";
    pub const LOW_OVERLAP_RATIO: &str = "LOW_OVERLAP_RATIO";
    pub const BELOW_MIN_OVERLAP: &str = "BELOW_MIN_OVERLAP";
    pub const ORIGIN_MAP_MISSING: &str = "ORIGIN_MAP_MISSING";
    pub const PC_LINE_GAP: &str = "PC_LINE_GAP";
}

/// Deterministic candidate ranking key.
///
/// Highest overlap ratio, then highest overlap count, then smallest span,
/// then `(tu_path, start_byte)`.
pub fn sort_candidates(candidates: &mut [CandidateResult]) {
    candidates.sort_by(|a, b| {
        b.overlap_ratio
            .partial_cmp(&a.overlap_ratio)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.overlap_count.cmp(&a.overlap_count))
            .then(a.span_size.cmp(&b.span_size))
            .then(a.tu_path.cmp(&b.tu_path))
            .then(a.start_byte.cmp(&b.start_byte))
    });
}

/// Score all TS functions of a single TU against a DWARF function's line
/// evidence. Only candidates with positive overlap are materialized.
pub fn score_candidates(
    dwarf_evidence: &BTreeMap<(String, u64), u64>,
    ts_functions: &[TsFunctionInfo],
    origin_map: &OriginMap,
) -> Vec<CandidateResult> {
    let total_count: u64 = dwarf_evidence.values().sum();
    if total_count == 0 {
        return Vec::new();
    }

    let mut results: Vec<CandidateResult> = Vec::new();

    for ts_func in ts_functions {
        let mut overlap_count: u64 = 0;

        for i_line in ts_func.start_line..=ts_func.end_line {
            if let Some((file, line)) = origin_map.query(i_line) {
                if let Some(count) = dwarf_evidence.get(&(file.clone(), *line)) {
                    overlap_count += count;
                }
            }
        }

        if overlap_count == 0 {
            continue;
        }

        results.push(CandidateResult {
            ts_func_id: ts_func.ts_func_id.clone(),
            tu_path: ts_func.tu_path.clone(),
            function_name: ts_func.name.clone(),
            context_hash: ts_func.context_hash.clone(),
            overlap_count,
            total_count,
            overlap_ratio: overlap_count as f64 / total_count as f64,
            gap_count: total_count - overlap_count,
            span_size: ts_func.end_byte - ts_func.start_byte,
            start_byte: ts_func.start_byte,
        });
    }

    sort_candidates(&mut results);
    results
}

/// Select the best candidate and collect verdict reasons.
///
/// Returns `(best, near_ties, reasons)`. Candidates must already be in
/// rank order across all TUs.
pub fn select_best<'c>(
    all_candidates: &'c [CandidateResult],
    overlap_threshold: f64,
    epsilon: f64,
    min_overlap_lines: u64,
) -> (Option<&'c CandidateResult>, Vec<&'c CandidateResult>, Vec<String>) {
    let mut reasons: Vec<String> = Vec::new();

    let best = match all_candidates.first() {
        Some(best) => best,
        None => {
            reasons.push(reason::NO_CANDIDATES.to_string());
            return (None, Vec::new(), reasons);
        }
    };

    if best.overlap_count < min_overlap_lines {
        reasons.push(reason::BELOW_MIN_OVERLAP.to_string());
        return (None, Vec::new(), reasons);
    }

    if best.overlap_ratio < overlap_threshold {
        reasons.push(reason::LOW_OVERLAP_RATIO.to_string());
    }

    // Near-ties: absolute epsilon on the ratio.
    let near_ties: Vec<&CandidateResult> = all_candidates[1..]
        .iter()
        .filter(|c| (best.overlap_ratio - c.overlap_ratio).abs() <= epsilon)
        .collect();

    if !near_ties.is_empty() {
        reasons.push(reason::NEAR_TIE.to_string());
    } else if !reasons.iter().any(|r| r == reason::LOW_OVERLAP_RATIO) {
        reasons.push(reason::UNIQUE_BEST.to_string());
    }

    if best.gap_count > 0 {
        reasons.push(reason::PC_LINE_GAP.to_string());
    }

    (Some(best), near_ties, reasons)
}

/// Header-replication collision: best and a near-tie share a context hash
/// but live in different TUs.
pub fn detect_header_replication(
    best: &CandidateResult,
    near_ties: &[&CandidateResult],
) -> bool {
    near_ties
        .iter()
        .any(|tie| tie.context_hash == best.context_hash && tie.tu_path != best.tu_path)
}
