//! Join: DWARF functions to tree-sitter functions via the `#line` bridge.
//!
//! For every DWARF ACCEPT/WARN target, candidates from all TUs are scored
//! against the function's line-row multiset through each TU's origin map,
//! ranked deterministically, and thresholded into MATCH / AMBIGUOUS /
//! NO_MATCH. DWARF REJECT entries pass through as non-targets.

pub mod candidate;
pub mod origin;
pub mod schema;

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

use crate::dwarf::schema::{OracleFunctionsOutput, OracleReport};
use crate::model::AlignmentVerdict;
use crate::tsoracle::schema::{TsFunctionsOutput, TsReport};
use crate::util::{self, UtilError};
use candidate::{reason, CandidateResult, TsFunctionInfo};
use origin::OriginMap;
pub use schema::{AlignmentPairsOutput, AlignmentReport, JoinTsProfile};

use schema::{AlignmentPair, CandidateScore, NonTargetEntry, PairCounts};

/// Error type for the alignment join.
#[derive(Debug, Error)]
pub enum JoinTsError {
    #[error(transparent)]
    Util(#[from] UtilError),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Deserialized inputs for one join run.
pub struct JoinInputs {
    pub dwarf_report: OracleReport,
    pub dwarf_functions: OracleFunctionsOutput,
    pub ts_report: TsReport,
    pub ts_functions: TsFunctionsOutput,
    /// tu_path -> `.i` file content. Keys may be bare file names; they are
    /// reconciled against the TS functions' tu paths by basename.
    pub i_contents: BTreeMap<String, String>,
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Execute the deterministic DWARF/tree-sitter join.
pub fn run_join(
    inputs: &JoinInputs,
    profile: &JoinTsProfile,
    output_dir: Option<&Path>,
) -> Result<(AlignmentPairsOutput, AlignmentReport), JoinTsError> {
    // ── Provenance anchors ───────────────────────────────────────────
    let binary_sha256 = inputs.dwarf_report.binary_sha256.clone();
    let build_id = inputs.dwarf_report.build_id.clone();

    let mut tu_hashes: BTreeMap<String, String> = BTreeMap::new();
    for tu in &inputs.ts_report.tu_reports {
        tu_hashes.insert(tu.tu_path.clone(), tu.tu_hash.clone());
    }

    // ── Group TS functions by TU ─────────────────────────────────────
    let mut ts_by_tu: BTreeMap<String, Vec<TsFunctionInfo>> = BTreeMap::new();
    for record in &inputs.ts_functions.functions {
        ts_by_tu.entry(record.tu_path.clone()).or_default().push(TsFunctionInfo {
            ts_func_id: record.entry.ts_func_id.clone(),
            tu_path: record.tu_path.clone(),
            name: record.entry.name.clone(),
            context_hash: record.entry.context_hash.clone(),
            start_line: record.entry.start_line,
            end_line: record.entry.end_line,
            start_byte: record.entry.start_byte,
            end_byte: record.entry.end_byte,
        });
    }

    // ── Build origin maps, re-keyed to TS tu paths ───────────────────
    // i_contents may use bare filenames ("arrays.i") while TS functions
    // reference full paths; reconcile by basename.
    let mut raw_maps: BTreeMap<String, OriginMap> = BTreeMap::new();
    for (key, content) in &inputs.i_contents {
        raw_maps.insert(
            key.clone(),
            origin::build_origin_map(content, key, &profile.excluded_path_prefixes),
        );
    }

    let mut origin_maps: BTreeMap<String, OriginMap> = BTreeMap::new();
    let mut origin_missing = false;
    for tu_path in ts_by_tu.keys() {
        let resolved = raw_maps.get(tu_path).cloned().or_else(|| {
            let base = basename(tu_path);
            raw_maps
                .iter()
                .find(|(k, _)| basename(k) == base)
                .map(|(_, v)| v.clone())
        });
        match resolved {
            Some(om) => {
                if !om.origin_available {
                    warn!(tu = %tu_path, "no line directives found in .i content");
                    origin_missing = true;
                }
                origin_maps.insert(tu_path.clone(), om);
            }
            None => {
                warn!(tu = %tu_path, "origin map missing for TU");
                origin_missing = true;
            }
        }
    }

    // ── Partition DWARF functions into targets and non-targets ───────
    let mut pairs: Vec<AlignmentPair> = Vec::new();
    let mut non_targets: Vec<NonTargetEntry> = Vec::new();
    let mut pair_counts = PairCounts::default();
    let mut reason_counts: BTreeMap<String, u64> = BTreeMap::new();

    for func in &inputs.dwarf_functions.functions {
        if func.verdict == "REJECT" {
            non_targets.push(NonTargetEntry {
                dwarf_function_id: func.function_id.clone(),
                name: func.name.clone(),
                dwarf_verdict: func.verdict.clone(),
                dwarf_reasons: func.reasons.clone(),
                decl_file: func.decl_file.clone(),
                decl_line: func.decl_line,
                decl_column: func.decl_column,
                comp_dir: func.comp_dir.clone(),
            });
            continue;
        }

        // Line evidence multiset.
        let mut evidence: BTreeMap<(String, u64), u64> = BTreeMap::new();
        for row in &func.line_rows {
            *evidence.entry((row.file.clone(), row.line)).or_insert(0) += row.count;
        }
        let total_count: u64 = evidence.values().sum();

        // Candidates across all TUs, re-ranked globally.
        let mut all_candidates: Vec<CandidateResult> = Vec::new();
        for (tu_path, om) in &origin_maps {
            if let Some(ts_funcs) = ts_by_tu.get(tu_path) {
                all_candidates.extend(candidate::score_candidates(&evidence, ts_funcs, om));
            }
        }
        candidate::sort_candidates(&mut all_candidates);

        let (best, near_ties, mut reasons) = candidate::select_best(
            &all_candidates,
            profile.overlap_threshold,
            profile.epsilon,
            profile.min_overlap_lines,
        );

        if total_count == 0 {
            reasons.push(reason::NO_OVERLAP.to_string());
        }

        if func.reasons.iter().any(|r| r == "MULTI_FILE_RANGE") {
            reasons.push(reason::MULTI_FILE_RANGE_PROPAGATED.to_string());
        }

        if best.is_none() && origin_missing {
            reasons.push(reason::ORIGIN_MAP_MISSING.to_string());
        }

        let is_replication = match best {
            Some(b) if !near_ties.is_empty() => {
                candidate::detect_header_replication(b, &near_ties)
            }
            _ => false,
        };
        if is_replication {
            reasons.push(reason::HEADER_REPLICATION_COLLISION.to_string());
        }

        let no_match_triggers = [reason::NO_CANDIDATES, reason::BELOW_MIN_OVERLAP];
        let verdict = if best.is_none()
            || reasons.iter().any(|r| no_match_triggers.contains(&r.as_str()))
        {
            AlignmentVerdict::NoMatch
        } else if is_replication
            || (!near_ties.is_empty() && !reasons.iter().any(|r| r == reason::LOW_OVERLAP_RATIO))
        {
            AlignmentVerdict::Ambiguous
        } else if reasons.iter().any(|r| r == reason::LOW_OVERLAP_RATIO) {
            AlignmentVerdict::NoMatch
        } else {
            AlignmentVerdict::Match
        };

        // Deduplicate reasons preserving order.
        let mut unique_reasons: Vec<String> = Vec::new();
        for r in reasons {
            if !unique_reasons.contains(&r) {
                unique_reasons.push(r);
            }
        }

        let candidates: Vec<CandidateScore> = all_candidates
            .iter()
            .map(|c| CandidateScore {
                ts_func_id: c.ts_func_id.clone(),
                tu_path: c.tu_path.clone(),
                function_name: c.function_name.clone(),
                context_hash: c.context_hash.clone(),
                overlap_count: c.overlap_count,
                overlap_ratio: c.overlap_ratio,
                gap_count: c.gap_count,
            })
            .collect();

        match verdict {
            AlignmentVerdict::Match => pair_counts.r#match += 1,
            AlignmentVerdict::Ambiguous => pair_counts.ambiguous += 1,
            _ => pair_counts.no_match += 1,
        }
        for r in &unique_reasons {
            *reason_counts.entry(r.clone()).or_insert(0) += 1;
        }

        pairs.push(AlignmentPair {
            dwarf_function_id: func.function_id.clone(),
            dwarf_function_name: func.name.clone(),
            dwarf_verdict: func.verdict.clone(),
            decl_file: func.decl_file.clone(),
            decl_line: func.decl_line,
            decl_column: func.decl_column,
            comp_dir: func.comp_dir.clone(),
            best_ts_func_id: best.map(|b| b.ts_func_id.clone()),
            best_tu_path: best.map(|b| b.tu_path.clone()),
            best_ts_function_name: best.and_then(|b| b.function_name.clone()),
            overlap_count: best.map(|b| b.overlap_count).unwrap_or(0),
            total_count,
            overlap_ratio: best.map(|b| b.overlap_ratio).unwrap_or(0.0),
            gap_count: best.map(|b| b.gap_count).unwrap_or(total_count),
            verdict: verdict.as_str().to_string(),
            reasons: unique_reasons,
            n_candidates: candidates.len(),
            candidates,
        });
    }

    pair_counts.non_target = non_targets.len() as u64;
    pairs.sort_by(|a, b| a.dwarf_function_id.cmp(&b.dwarf_function_id));
    non_targets.sort_by(|a, b| a.dwarf_function_id.cmp(&b.dwarf_function_id));

    // ── Assemble outputs ─────────────────────────────────────────────
    let mut pairs_output = AlignmentPairsOutput::new(&profile.profile_id);
    pairs_output.binary_sha256 = binary_sha256.clone();
    pairs_output.build_id = build_id.clone();
    pairs_output.dwarf_profile_id = inputs.dwarf_report.profile_id.clone();
    pairs_output.ts_profile_id = inputs.ts_report.profile_id.clone();
    pairs_output.pairs = pairs;
    pairs_output.non_targets = non_targets;

    let mut report = AlignmentReport::new(&profile.profile_id);
    report.binary_sha256 = binary_sha256;
    report.build_id = build_id;
    report.dwarf_profile_id = inputs.dwarf_report.profile_id.clone();
    report.ts_profile_id = inputs.ts_report.profile_id.clone();
    report.tu_hashes = tu_hashes;
    report.pair_counts = pair_counts;
    report.reason_counts = reason_counts;
    report.thresholds.insert("overlap_threshold".to_string(), profile.overlap_threshold);
    report.thresholds.insert("epsilon".to_string(), profile.epsilon);
    report
        .thresholds
        .insert("min_overlap_lines".to_string(), profile.min_overlap_lines as f64);
    report.excluded_path_prefixes = profile.excluded_path_prefixes.clone();

    info!(
        matches = report.pair_counts.r#match,
        ambiguous = report.pair_counts.ambiguous,
        no_match = report.pair_counts.no_match,
        non_targets = report.pair_counts.non_target,
        "alignment join complete"
    );

    if let Some(dir) = output_dir {
        util::write_json_atomic(&dir.join("alignment_report.json"), &report)?;
        util::write_json_atomic(&dir.join("alignment_pairs.json"), &pairs_output)?;
    }

    Ok((pairs_output, report))
}
