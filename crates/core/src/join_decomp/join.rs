//! Address-overlap join: DWARF functions to decompiler functions.
//!
//! Pure functions, no IO.

use std::collections::BTreeMap;

use crate::decomp::DecompFunctionRow;
use crate::join_decomp::tables::{DwarfRow, IntervalEntry};
use crate::model::MatchKind;

/// One decompiler function overlapping a DWARF range set.
#[derive(Debug, Clone)]
struct OverlapCandidate {
    function_id: String,
    entry_va: u64,
    overlap_bytes: u64,
    is_thunk: bool,
    is_external_block: bool,
}

/// Join outcome for one DWARF function (internal form).
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub match_kind: MatchKind,
    pub decomp_function_id: Option<String>,
    pub overlap_bytes: u64,
    pub pc_overlap_ratio: f64,
    pub n_near_ties: usize,
    pub join_warnings: Vec<String>,
}

/// Join warning tags.
pub mod join_warning {
    pub const DWARF_RANGE_MISSING: &str = "DWARF_RANGE_MISSING";
    pub const NO_DECOMP_OVERLAP: &str = "NO_DECOMP_OVERLAP";
    pub const NEAR_TIE_CANDIDATES: &str = "NEAR_TIE_CANDIDATES";
    pub const LOW_PC_OVERLAP: &str = "LOW_PC_OVERLAP";
}

/// Thresholds for the address join.
#[derive(Debug, Clone)]
pub struct JoinThresholds {
    pub strong_overlap_threshold: f64,
    pub weak_overlap_threshold: f64,
    /// Fraction of the best candidate's overlap bytes within which another
    /// candidate counts as a near-tie.
    pub near_tie_epsilon: f64,
}

/// Classify a mapping by PC-range overlap.
pub fn classify_match_kind(
    pc_overlap_ratio: f64,
    n_near_ties: usize,
    has_range: bool,
    thresholds: &JoinThresholds,
) -> MatchKind {
    if !has_range {
        return MatchKind::NoRange;
    }
    if pc_overlap_ratio <= 0.0 {
        return MatchKind::NoMatch;
    }
    if n_near_ties >= 1 {
        return MatchKind::MultiMatch;
    }
    if pc_overlap_ratio >= thresholds.strong_overlap_threshold {
        return MatchKind::JoinedStrong;
    }
    if pc_overlap_ratio >= thresholds.weak_overlap_threshold {
        return MatchKind::JoinedWeak;
    }
    MatchKind::NoMatch
}

/// Sum overlap bytes per decompiler function across all DWARF segments.
fn find_overlaps(
    dwarf_ranges: &[(u64, u64)],
    interval_index: &[IntervalEntry],
) -> BTreeMap<String, u64> {
    let mut overlaps: BTreeMap<String, u64> = BTreeMap::new();

    for &(d_low, d_high) in dwarf_ranges {
        for entry in interval_index {
            // Index is sorted by start; nothing past d_high can overlap.
            if entry.body_start >= d_high {
                break;
            }
            if entry.body_end <= d_low {
                continue;
            }
            let overlap_start = d_low.max(entry.body_start);
            let overlap_end = d_high.min(entry.body_end);
            if overlap_end > overlap_start {
                *overlaps.entry(entry.function_id.clone()).or_insert(0) +=
                    overlap_end - overlap_start;
            }
        }
    }

    overlaps
}

/// Execute the DWARF-to-decompiler mapping for one DWARF function.
///
/// Functions without ranges get `NO_RANGE` and are never force-joined;
/// ranges that find no overlap get `NO_MATCH`. Near-ties become
/// `MULTI_MATCH`.
pub fn join_one(
    drow: &DwarfRow,
    decomp_by_id: &BTreeMap<String, &DecompFunctionRow>,
    interval_index: &[IntervalEntry],
    thresholds: &JoinThresholds,
) -> JoinOutcome {
    if !drow.has_range {
        return JoinOutcome {
            match_kind: MatchKind::NoRange,
            decomp_function_id: None,
            overlap_bytes: 0,
            pc_overlap_ratio: 0.0,
            n_near_ties: 0,
            join_warnings: vec![join_warning::DWARF_RANGE_MISSING.to_string()],
        };
    }

    let overlaps = find_overlaps(&drow.ranges, interval_index);
    if overlaps.is_empty() {
        return JoinOutcome {
            match_kind: MatchKind::NoMatch,
            decomp_function_id: None,
            overlap_bytes: 0,
            pc_overlap_ratio: 0.0,
            n_near_ties: 0,
            join_warnings: vec![join_warning::NO_DECOMP_OVERLAP.to_string()],
        };
    }

    let mut candidates: Vec<OverlapCandidate> = overlaps
        .iter()
        .filter_map(|(fid, &bytes)| {
            decomp_by_id.get(fid.as_str()).map(|grow| OverlapCandidate {
                function_id: fid.clone(),
                entry_va: grow.entry_va,
                overlap_bytes: bytes,
                is_thunk: grow.is_thunk,
                is_external_block: grow.is_external_block,
            })
        })
        .collect();

    // Max overlap bytes, then nearest entry to the DWARF low_pc, then
    // prefer non-thunk and non-external.
    let d_low = drow.low_pc.unwrap_or(0);
    candidates.sort_by_key(|c| {
        (
            std::cmp::Reverse(c.overlap_bytes),
            c.entry_va.abs_diff(d_low),
            c.is_thunk,
            c.is_external_block,
            c.function_id.clone(),
        )
    });

    let best = &candidates[0];
    let pc_ratio = best.overlap_bytes as f64 / drow.total_range_bytes.max(1) as f64;

    let threshold_bytes = best.overlap_bytes as f64 * thresholds.near_tie_epsilon;
    let n_near_ties = candidates[1..]
        .iter()
        .filter(|c| (best.overlap_bytes - c.overlap_bytes) as f64 <= threshold_bytes)
        .count();

    let match_kind = classify_match_kind(pc_ratio, n_near_ties, true, thresholds);

    let mut join_warnings: Vec<String> = Vec::new();
    if n_near_ties > 0 {
        join_warnings.push(join_warning::NEAR_TIE_CANDIDATES.to_string());
    }
    if pc_ratio < thresholds.weak_overlap_threshold {
        join_warnings.push(join_warning::LOW_PC_OVERLAP.to_string());
    }

    JoinOutcome {
        match_kind,
        decomp_function_id: Some(best.function_id.clone()),
        overlap_bytes: best.overlap_bytes,
        pc_overlap_ratio: pc_ratio,
        n_near_ties,
        join_warnings,
    }
}
