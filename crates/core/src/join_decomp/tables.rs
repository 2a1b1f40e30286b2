//! Function tables: indexed lookup structures for the DWARF and
//! decompiler function inventories.
//!
//! Pure transformations, no IO.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::decomp::DecompFunctionRow;
use crate::dwarf::schema::OracleFunctionsOutput;
use crate::join_ts::schema::AlignmentPairsOutput;
use crate::model::is_aux_name;

/// Merged view of one DWARF function from oracle + alignment.
#[derive(Debug, Clone)]
pub struct DwarfRow {
    pub function_id: String,
    pub name: Option<String>,
    pub decl_file: Option<String>,
    pub decl_line: Option<u64>,
    pub decl_column: Option<u64>,
    pub oracle_verdict: String,
    pub oracle_reasons: Vec<String>,

    /// Parsed `[low, high)` pairs.
    pub ranges: Vec<(u64, u64)>,
    pub total_range_bytes: u64,
    pub has_range: bool,
    pub low_pc: Option<u64>,

    pub align_verdict: Option<String>,
    pub align_overlap_ratio: Option<f64>,
    pub align_gap_count: Option<u64>,
    pub align_n_candidates: Option<usize>,
    pub align_reasons: Vec<String>,
    pub is_non_target: bool,

    pub eligible_for_join: bool,
    pub eligible_for_gold: bool,
    pub exclusion_reason: Option<String>,
}

/// Exclusion reason constants for eligibility stamping.
pub mod exclusion {
    pub const NO_RANGE: &str = "NO_RANGE";
    pub const NON_TARGET: &str = "NON_TARGET";
}

fn parse_hex(s: &str) -> Option<u64> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16).ok()
}

/// Build the DWARF function table keyed by function id.
///
/// Alignment pairs and non-targets are merged in; every oracle function
/// appears in the table regardless of verdict.
pub fn build_dwarf_table(
    oracle: &OracleFunctionsOutput,
    alignment: &AlignmentPairsOutput,
) -> BTreeMap<String, DwarfRow> {
    let mut pair_idx: BTreeMap<&str, &crate::join_ts::schema::AlignmentPair> = BTreeMap::new();
    for pair in &alignment.pairs {
        pair_idx.insert(pair.dwarf_function_id.as_str(), pair);
    }
    let mut non_target_ids: Vec<&str> = Vec::new();
    for nt in &alignment.non_targets {
        non_target_ids.push(nt.dwarf_function_id.as_str());
    }

    let mut table: BTreeMap<String, DwarfRow> = BTreeMap::new();

    for func in &oracle.functions {
        let mut ranges: Vec<(u64, u64)> = Vec::new();
        for r in &func.ranges {
            match (parse_hex(&r.low), parse_hex(&r.high)) {
                (Some(low), Some(high)) if high > low => ranges.push((low, high)),
                _ => warn!(function = %func.function_id, "unparsable range in oracle output"),
            }
        }
        let total_range_bytes: u64 = ranges.iter().map(|(l, h)| h - l).sum();
        let has_range = !ranges.is_empty() && total_range_bytes > 0;
        let low_pc = ranges.first().map(|(l, _)| *l);

        let pair = pair_idx.get(func.function_id.as_str());
        let is_non_target =
            non_target_ids.contains(&func.function_id.as_str()) && has_range;

        let (eligible_for_join, exclusion_reason) = if !has_range {
            (false, Some(exclusion::NO_RANGE.to_string()))
        } else if is_non_target {
            (false, Some(exclusion::NON_TARGET.to_string()))
        } else {
            (true, None)
        };

        let name = func.name.clone().or_else(|| func.linkage_name.clone());
        let eligible_for_gold = eligible_for_join
            && func.verdict == "ACCEPT"
            && !name.as_deref().map(is_aux_name).unwrap_or(false);

        table.insert(
            func.function_id.clone(),
            DwarfRow {
                function_id: func.function_id.clone(),
                name,
                decl_file: func.decl_file.clone(),
                decl_line: func.decl_line,
                decl_column: func.decl_column,
                oracle_verdict: func.verdict.clone(),
                oracle_reasons: func.reasons.clone(),
                ranges,
                total_range_bytes,
                has_range,
                low_pc,
                align_verdict: pair.map(|p| p.verdict.clone()),
                align_overlap_ratio: pair.map(|p| p.overlap_ratio),
                align_gap_count: pair.map(|p| p.gap_count),
                align_n_candidates: pair.map(|p| p.n_candidates),
                align_reasons: pair.map(|p| p.reasons.clone()).unwrap_or_default(),
                is_non_target,
                eligible_for_join,
                eligible_for_gold,
                exclusion_reason,
            },
        );
    }

    debug!(functions = table.len(), "built DWARF function table");
    table
}

/// Sorted entry for the decompiler body-range interval index.
#[derive(Debug, Clone)]
pub struct IntervalEntry {
    pub body_start: u64,
    pub body_end: u64,
    pub function_id: String,
}

/// Build the interval index over decompiler functions with usable bodies.
///
/// Sorted by start address; the join scans it linearly with early
/// termination, which is ample for per-binary function counts.
pub fn build_interval_index(functions: &[DecompFunctionRow]) -> Vec<IntervalEntry> {
    let mut index: Vec<IntervalEntry> = functions
        .iter()
        .filter_map(|f| match (f.body_start_va, f.body_end_va) {
            (Some(start), Some(end)) if end > start => Some(IntervalEntry {
                body_start: start,
                body_end: end,
                function_id: f.function_id.clone(),
            }),
            _ => None,
        })
        .collect();
    index.sort_by_key(|e| (e.body_start, e.body_end));
    index
}
