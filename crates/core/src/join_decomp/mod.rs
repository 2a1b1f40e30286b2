//! Join: oracle ground truth to decompiler output via address overlap.
//!
//! Stage order:
//! 0. Cross-validate binary hashes against the build receipt (hard
//!    failure on mismatch; the receipt is the single authority).
//! 1. Build the DWARF table (oracle + alignment merged, eligibility
//!    stamped).
//! 2. Build the decompiler interval index.
//! 3. Address-overlap join per DWARF function.
//! 4. Fat-function tagging, noise tags, high-confidence gate.
//! 5. Invariant checks, report, row file.

pub mod gate;
pub mod join;
pub mod schema;
pub mod tables;

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

use crate::builder::receipt::BuildReceipt;
use crate::decomp::{DecompFunctionRow, DecompReport};
use crate::dwarf::schema::{OracleFunctionsOutput, OracleReport};
use crate::join_ts::schema::AlignmentPairsOutput;
use crate::model::{MatchKind, OptLevel, StableFunctionKey, Variant};
use crate::util::{self, UtilError};
pub use schema::{JoinDecompProfile, JoinReport, JoinedFunctionRow};

use join::JoinThresholds;
use schema::InvariantViolation;

/// Error type for the oracle-to-decompiler join.
#[derive(Debug, Error)]
pub enum JoinDecompError {
    /// Provenance chain broken: a stage's binary hash does not match the
    /// receipt. Hard failure; no partial payload is written.
    #[error("binary hash mismatch for {what}: receipt has {expected}, input has {found}")]
    HashMismatch { what: String, expected: String, found: String },

    #[error("receipt has no artifact for {opt} {variant}")]
    MissingArtifact { opt: String, variant: String },

    #[error(transparent)]
    Util(#[from] UtilError),
}

/// Deserialized inputs for one join run.
pub struct JoinDecompInputs {
    pub receipt: BuildReceipt,
    pub optimization: OptLevel,
    pub dwarf_report: OracleReport,
    pub dwarf_functions: OracleFunctionsOutput,
    pub alignment: AlignmentPairsOutput,
    pub decomp_report: DecompReport,
    pub decomp_functions: Vec<DecompFunctionRow>,
}

/// Validate the provenance chain against the receipt.
///
/// The oracle side reads the debug artifact; the decompiler side reads
/// the stripped artifact of the same cell. Both hashes must match the
/// receipt, and the alignment output must match the oracle side.
fn cross_validate(inputs: &JoinDecompInputs) -> Result<(String, String), JoinDecompError> {
    let opt = inputs.optimization;

    let debug_hash = inputs
        .receipt
        .artifact_for(opt, Variant::Debug)
        .map(|a| a.sha256.clone())
        .ok_or_else(|| JoinDecompError::MissingArtifact {
            opt: opt.as_str().to_string(),
            variant: Variant::Debug.as_str().to_string(),
        })?;
    let stripped_hash = inputs
        .receipt
        .artifact_for(opt, Variant::Stripped)
        .map(|a| a.sha256.clone())
        .ok_or_else(|| JoinDecompError::MissingArtifact {
            opt: opt.as_str().to_string(),
            variant: Variant::Stripped.as_str().to_string(),
        })?;

    if inputs.dwarf_report.binary_sha256 != debug_hash {
        return Err(JoinDecompError::HashMismatch {
            what: "DWARF oracle report".to_string(),
            expected: debug_hash,
            found: inputs.dwarf_report.binary_sha256.clone(),
        });
    }
    if inputs.alignment.binary_sha256 != debug_hash {
        return Err(JoinDecompError::HashMismatch {
            what: "alignment pairs".to_string(),
            expected: debug_hash,
            found: inputs.alignment.binary_sha256.clone(),
        });
    }
    if inputs.decomp_report.binary_sha256 != stripped_hash {
        return Err(JoinDecompError::HashMismatch {
            what: "decompiler report".to_string(),
            expected: stripped_hash,
            found: inputs.decomp_report.binary_sha256.clone(),
        });
    }

    Ok((debug_hash, stripped_hash))
}

/// Execute the oracle-to-decompiler join.
pub fn run_join(
    inputs: &JoinDecompInputs,
    profile: &JoinDecompProfile,
    output_dir: Option<&Path>,
) -> Result<(JoinReport, Vec<JoinedFunctionRow>), JoinDecompError> {
    let (debug_hash, stripped_hash) = cross_validate(inputs)?;
    let test_case = inputs.receipt.job.name.clone();

    let dwarf_table = tables::build_dwarf_table(&inputs.dwarf_functions, &inputs.alignment);
    let interval_index = tables::build_interval_index(&inputs.decomp_functions);
    let decomp_by_id: BTreeMap<String, &DecompFunctionRow> =
        inputs.decomp_functions.iter().map(|f| (f.function_id.clone(), f)).collect();

    let thresholds = JoinThresholds {
        strong_overlap_threshold: profile.strong_overlap_threshold,
        weak_overlap_threshold: profile.weak_overlap_threshold,
        near_tie_epsilon: profile.near_tie_epsilon,
    };

    // ── Join pass ────────────────────────────────────────────────────
    let mut rows: Vec<JoinedFunctionRow> = Vec::new();
    let mut decomp_hit_counts: BTreeMap<String, usize> = BTreeMap::new();

    for drow in dwarf_table.values() {
        let outcome = join::join_one(drow, &decomp_by_id, &interval_index, &thresholds);
        if let Some(fid) = &outcome.decomp_function_id {
            *decomp_hit_counts.entry(fid.clone()).or_insert(0) += 1;
        }

        let matched = outcome
            .decomp_function_id
            .as_ref()
            .and_then(|fid| decomp_by_id.get(fid.as_str()).copied());

        let stable_key = StableFunctionKey::new(
            &test_case,
            drow.decl_file.as_deref(),
            drow.decl_line,
            drow.decl_column,
            drow.name.as_deref(),
            &drow.function_id,
        );

        let is_aux_function =
            drow.name.as_deref().map(crate::model::is_aux_name).unwrap_or(false)
                || matched.map(|m| m.is_init_fini_aux || m.is_compiler_aux).unwrap_or(false);

        let row = JoinedFunctionRow {
            dwarf_function_id: drow.function_id.clone(),
            dwarf_name: drow.name.clone(),
            decl_file: drow.decl_file.clone(),
            decl_line: drow.decl_line,
            decl_column: drow.decl_column,
            stable_key,
            oracle_verdict: drow.oracle_verdict.clone(),
            oracle_reasons: drow.oracle_reasons.clone(),
            total_dwarf_range_bytes: drow.total_range_bytes,
            has_range: drow.has_range,
            align_verdict: drow.align_verdict.clone(),
            align_overlap_ratio: drow.align_overlap_ratio,
            align_n_candidates: drow.align_n_candidates,
            align_reasons: drow.align_reasons.clone(),
            eligible_for_join: drow.eligible_for_join,
            eligible_for_gold: drow.eligible_for_gold,
            exclusion_reason: drow.exclusion_reason.clone(),
            match_kind: outcome.match_kind,
            decomp_function_id: outcome.decomp_function_id.clone(),
            decomp_entry_va: matched.map(|m| m.entry_va),
            decomp_name: matched.map(|m| m.name.clone()),
            pc_overlap_bytes: outcome.overlap_bytes,
            pc_overlap_ratio: outcome.pc_overlap_ratio,
            n_near_ties: outcome.n_near_ties,
            join_warnings: outcome.join_warnings,
            fat_function_multi_dwarf: false,
            fat_function_dwarf_count: 0,
            is_external_block: matched.map(|m| m.is_external_block).unwrap_or(false),
            is_thunk: matched.map(|m| m.is_thunk).unwrap_or(false),
            is_aux_function,
            is_import_proxy: matched.map(|m| m.is_import || m.is_plt_or_stub).unwrap_or(false),
            decomp_verdict: matched.map(|m| m.verdict.as_str().to_string()),
            decomp_warnings: matched.map(|m| m.warnings.clone()).unwrap_or_default(),
            cfg_completeness: matched.map(|m| m.cfg_completeness),
            is_high_confidence: false,
        };
        rows.push(row);
    }

    // ── Fat-function tagging + gate ──────────────────────────────────
    for row in &mut rows {
        if let Some(fid) = &row.decomp_function_id {
            let count = decomp_hit_counts.get(fid).copied().unwrap_or(0);
            if count > 1 {
                row.fat_function_multi_dwarf = true;
            }
            row.fat_function_dwarf_count = count;
        }

        let gate_inputs = gate::GateInputs {
            oracle_verdict: &row.oracle_verdict,
            align_verdict: row.align_verdict.as_deref(),
            align_n_candidates: row.align_n_candidates,
            align_overlap_ratio: row.align_overlap_ratio,
            match_kind: row.match_kind,
            is_external_block: row.is_external_block,
            is_thunk: row.is_thunk,
            is_aux_function: row.is_aux_function,
            is_import_proxy: row.is_import_proxy,
            cfg_completeness: row.cfg_completeness,
            warning_tags: &row.decomp_warnings,
            fatal_warnings: &profile.fatal_warnings,
        };
        row.is_high_confidence = gate::is_high_confidence(&gate_inputs)
            && !row.fat_function_multi_dwarf
            && row.eligible_for_gold;
    }

    rows.sort_by(|a, b| a.dwarf_function_id.cmp(&b.dwarf_function_id));

    // ── Report assembly ──────────────────────────────────────────────
    let mut report = JoinReport::new(&profile.profile_id);
    report.binary_sha256 = debug_hash;
    report.decomp_binary_sha256 = stripped_hash;
    report.test_case = test_case;
    report.optimization = inputs.optimization.as_str().to_string();
    report.n_dwarf_functions = rows.len() as u64;
    report.n_decomp_functions = inputs.decomp_functions.len() as u64;

    for row in &rows {
        *report
            .match_kind_counts
            .entry(row.match_kind.as_str().to_string())
            .or_insert(0) += 1;
        if let Some(reason) = &row.exclusion_reason {
            *report.exclusion_counts.entry(reason.clone()).or_insert(0) += 1;
        }
        if row.is_high_confidence {
            report.n_high_confidence += 1;
        }
        if row.eligible_for_join {
            report.n_eligible_for_join += 1;
        }
        if row.eligible_for_gold {
            report.n_eligible_for_gold += 1;
        }
    }

    report.pipeline_warnings = check_invariants(&rows);

    info!(
        dwarf = report.n_dwarf_functions,
        decomp = report.n_decomp_functions,
        high_confidence = report.n_high_confidence,
        "oracle-to-decompiler join complete"
    );

    if let Some(dir) = output_dir {
        util::write_json_atomic(&dir.join("join_report.json"), &report)?;
        util::write_jsonl_atomic(&dir.join("joined_functions.jsonl"), &rows)?;
    }

    Ok((report, rows))
}

/// Post-join assertion checks.
///
/// Violations are recorded in the report rather than thrown: the rows are
/// still valid evidence, but a violation means an upstream bug worth
/// surfacing.
fn check_invariants(rows: &[JoinedFunctionRow]) -> Vec<InvariantViolation> {
    let mut violations: Vec<InvariantViolation> = Vec::new();

    let hc_not_gold: Vec<String> = rows
        .iter()
        .filter(|r| r.is_high_confidence && !r.eligible_for_gold)
        .map(|r| r.dwarf_function_id.clone())
        .collect();
    if !hc_not_gold.is_empty() {
        warn!(ids = ?hc_not_gold, "invariant violated: high-confidence but not gold-eligible");
        violations.push(InvariantViolation {
            check: "hc_implies_gold".to_string(),
            function_ids: hc_not_gold,
            message: "high-confidence rows must be gold-eligible".to_string(),
        });
    }

    let bad_ratio: Vec<String> = rows
        .iter()
        .filter(|r| r.pc_overlap_ratio < 0.0 || r.pc_overlap_ratio > 1.0001)
        .map(|r| r.dwarf_function_id.clone())
        .collect();
    if !bad_ratio.is_empty() {
        warn!(ids = ?bad_ratio, "invariant violated: pc_overlap_ratio out of [0, 1]");
        violations.push(InvariantViolation {
            check: "overlap_ratio_bounds".to_string(),
            function_ids: bad_ratio,
            message: "pc_overlap_ratio must lie in [0, 1]".to_string(),
        });
    }

    let no_range_joined: Vec<String> = rows
        .iter()
        .filter(|r| r.match_kind == MatchKind::NoRange && r.decomp_function_id.is_some())
        .map(|r| r.dwarf_function_id.clone())
        .collect();
    if !no_range_joined.is_empty() {
        warn!(ids = ?no_range_joined, "invariant violated: NO_RANGE row carries a join");
        violations.push(InvariantViolation {
            check: "no_range_not_joined".to_string(),
            function_ids: no_range_joined,
            message: "NO_RANGE rows must never be force-joined".to_string(),
        });
    }

    violations
}
