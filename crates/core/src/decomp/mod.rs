//! Decompiler-output reshape: raw export JSONL into the validated,
//! rebased, warning-classified per-function record set.
//!
//! The decompiler itself is an external collaborator; this stage consumes
//! one JSON record per function plus a summary trailer and owns everything
//! after that: PIE rebasing, warning taxonomy, variable identity, CFG
//! metrics, noise tagging, and verdicts.

pub mod calls;
pub mod cfg;
pub mod noise;
pub mod raw;
pub mod variables;
pub mod verdict;
pub mod warnings;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::model::{CfgCompleteness, FunctionVerdict};
use crate::util::{self, UtilError};
use crate::{PACKAGE_NAME, SCHEMA_VERSION};
pub use calls::CallRow;
pub use cfg::CfgRow;
pub use raw::{RawFunctionRecord, RawSummary};
pub use variables::VariableRow;
pub use verdict::DecompProfile;

/// Error type for the reshape stage.
#[derive(Debug, Error)]
pub enum DecompError {
    #[error(transparent)]
    Raw(#[from] raw::RawParseError),

    #[error(transparent)]
    Util(#[from] UtilError),
}

/// One output-ready function row (`functions.jsonl`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecompFunctionRow {
    pub binary_id: String,
    /// `func:{entry_va:#x}` after rebasing.
    pub function_id: String,
    pub entry_va: u64,
    pub entry_hex: String,
    pub name: String,
    pub namespace: Option<String>,

    pub body_start_va: Option<u64>,
    pub body_end_va: Option<u64>,
    pub size_bytes: Option<u64>,
    pub has_body_range: bool,
    pub section_hint: Option<String>,

    pub is_external_block: bool,
    pub is_thunk: bool,
    pub is_import: bool,
    pub is_plt_or_stub: bool,
    pub is_init_fini_aux: bool,
    pub is_compiler_aux: bool,
    pub is_library_like: bool,

    /// "OK" | "FAIL".
    pub decompile_status: String,
    pub verdict: FunctionVerdict,
    pub reasons: Vec<String>,
    /// Normalized taxonomy codes.
    pub warnings: Vec<String>,
    pub warnings_raw: Vec<String>,

    /// Decompiled C text; None when decompilation failed.
    pub c_raw: Option<String>,
    pub c_line_count: u64,
    pub asm_insn_count: u64,
    pub insn_to_c_ratio: f64,
    pub temp_var_count: u64,

    pub bb_count: usize,
    pub cfg_completeness: CfgCompleteness,
}

/// Binary-level report for the reshape (`report.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecompReport {
    pub package_name: String,
    pub version: String,
    pub schema_version: String,
    pub profile_id: String,

    pub binary_path: String,
    pub binary_sha256: String,

    pub tool_version: String,
    /// Image base subtracted from every virtual address.
    pub image_base: u64,

    pub total_functions: u64,
    pub decompile_ok: u64,
    pub decompile_fail: u64,
    pub verdict_counts_ok: u64,
    pub verdict_counts_warn: u64,
    pub verdict_counts_fail: u64,

    /// ACCEPT | WARN (high decompile-fail rate).
    pub verdict: String,
    pub reasons: Vec<String>,

    /// RFC 3339; the single permitted nondeterministic field.
    pub timestamp: String,
}

/// Complete reshape result for one binary.
pub struct ReshapeOutput {
    pub report: DecompReport,
    pub functions: Vec<DecompFunctionRow>,
    pub variables: Vec<VariableRow>,
    pub cfg: Vec<CfgRow>,
    pub calls: Vec<CallRow>,
}

/// Count non-empty lines in decompiled C output.
fn count_c_lines(c_raw: Option<&str>) -> u64 {
    c_raw.map(|c| c.lines().filter(|l| !l.trim().is_empty()).count() as u64).unwrap_or(0)
}

/// Reshape the raw export for one binary.
///
/// `binary_sha256` is the content hash of the stripped binary the
/// decompiler analyzed; it becomes `binary_id` on every row. All virtual
/// addresses are rebased by the summary's image base before use, which is
/// what makes the later address-overlap join possible for PIE binaries.
pub fn reshape(
    raw_jsonl_path: &Path,
    binary_path: &str,
    binary_sha256: &str,
    profile: &DecompProfile,
    output_dir: Option<&Path>,
) -> Result<ReshapeOutput, DecompError> {
    let (summary, raw_functions) = raw::parse_raw_jsonl(raw_jsonl_path)?;
    let image_base = summary.image_base.unwrap_or(0);
    if image_base != 0 {
        info!(image_base = format!("{image_base:#x}"), "rebasing decompiler addresses");
    }

    let rebase = |va: u64| va.saturating_sub(image_base);

    let mut functions: Vec<DecompFunctionRow> = Vec::new();
    let mut variables: Vec<VariableRow> = Vec::new();
    let mut cfg_rows: Vec<CfgRow> = Vec::new();
    let mut call_rows: Vec<CallRow> = Vec::new();

    let mut ok = 0u64;
    let mut warn_count = 0u64;
    let mut fail = 0u64;

    for rf in &raw_functions {
        let entry_va = rebase(rf.entry_va);
        let function_id = format!("func:{entry_va:#x}");

        let body_start_va = rf.body_start_va.map(rebase);
        let body_end_va = rf.body_end_va.map(rebase);
        let has_body_range = matches!((body_start_va, body_end_va), (Some(s), Some(e)) if e > s);

        let (warn_codes, warnings_raw) =
            warnings::map_warnings(rf.error.as_deref(), rf.c_raw.as_deref(), &rf.warnings_raw);

        let noise_flags = noise::classify_noise(
            Some(&rf.name),
            rf.section_hint.as_deref(),
            rf.is_external_block,
            rf.is_thunk,
            rf.is_import,
        );

        let decompile_failed = rf.c_raw.is_none() || rf.error.is_some();
        let (fv, reasons) = verdict::judge_function(
            decompile_failed,
            &warn_codes,
            body_start_va,
            body_end_va,
            noise_flags.is_library_like,
        );
        match fv {
            FunctionVerdict::Ok => ok += 1,
            FunctionVerdict::Warn => warn_count += 1,
            FunctionVerdict::Fail => fail += 1,
        }

        let rebased_vars: Vec<raw::RawVariable> = rf
            .variables
            .iter()
            .map(|v| raw::RawVariable {
                name: v.name.clone(),
                is_param: v.is_param,
                size_bytes: v.size_bytes,
                type_str: v.type_str.clone(),
                storage_class: v.storage_class.clone(),
                stack_offset: v.stack_offset,
                register_name: v.register_name.clone(),
                addr_va: v.addr_va.map(rebase),
                access_sites: v.access_sites.iter().map(|&a| rebase(a)).collect(),
                access_sites_truncated: v.access_sites_truncated,
            })
            .collect();
        let func_vars =
            variables::process_variables(&rebased_vars, &function_id, entry_va, binary_sha256);
        let temp_var_count =
            func_vars.iter().filter(|v| v.var_kind == variables::VarKind::Temp).count() as u64;

        let rebased_blocks: Vec<raw::RawBlock> = rf
            .blocks
            .iter()
            .map(|b| raw::RawBlock {
                block_id: b.block_id,
                start_va: rebase(b.start_va),
                end_va: rebase(b.end_va),
                succ_va: b.succ_va.iter().map(|&s| rebase(s)).collect(),
            })
            .collect();
        let cfg_row =
            cfg::process_cfg(&rebased_blocks, &warn_codes, binary_sha256, &function_id, entry_va);

        let rebased_calls: Vec<raw::RawCall> = rf
            .calls
            .iter()
            .map(|c| raw::RawCall {
                callsite_va: rebase(c.callsite_va),
                call_kind: c.call_kind.clone(),
                callee_entry_va: c.callee_entry_va.map(rebase),
                callee_name: c.callee_name.clone(),
                is_external_target: c.is_external_target,
                is_import_proxy_target: c.is_import_proxy_target,
            })
            .collect();
        call_rows.extend(calls::process_calls(
            &rebased_calls,
            binary_sha256,
            &function_id,
            entry_va,
        ));

        let c_line_count = count_c_lines(rf.c_raw.as_deref());
        let insn_to_c_ratio =
            if c_line_count > 0 { rf.insn_count as f64 / c_line_count as f64 } else { 0.0 };

        functions.push(DecompFunctionRow {
            binary_id: binary_sha256.to_string(),
            function_id,
            entry_va,
            entry_hex: format!("{entry_va:#x}"),
            name: rf.name.clone(),
            namespace: rf.namespace.clone(),
            body_start_va,
            body_end_va,
            size_bytes: rf.size_bytes,
            has_body_range,
            section_hint: rf.section_hint.clone(),
            is_external_block: rf.is_external_block,
            is_thunk: rf.is_thunk,
            is_import: rf.is_import,
            is_plt_or_stub: noise_flags.is_plt_or_stub,
            is_init_fini_aux: noise_flags.is_init_fini_aux,
            is_compiler_aux: noise_flags.is_compiler_aux,
            is_library_like: noise_flags.is_library_like,
            decompile_status: if decompile_failed { "FAIL" } else { "OK" }.to_string(),
            verdict: fv,
            reasons,
            warnings: warn_codes,
            warnings_raw,
            c_raw: rf.c_raw.clone(),
            c_line_count,
            asm_insn_count: rf.insn_count,
            insn_to_c_ratio,
            temp_var_count,
            bb_count: cfg_row.bb_count,
            cfg_completeness: cfg_row.cfg_completeness,
        });

        variables.extend(func_vars);
        cfg_rows.push(cfg_row);
    }

    // Deterministic orders: functions/cfg by entry VA, variables by
    // (function, kind, key), calls by (caller, callsite).
    functions.sort_by_key(|f| f.entry_va);
    cfg_rows.sort_by_key(|c| c.entry_va);
    variables.sort_by(|a, b| {
        a.entry_va
            .cmp(&b.entry_va)
            .then(a.var_kind.as_str().cmp(b.var_kind.as_str()))
            .then(a.storage_key.cmp(&b.storage_key))
    });
    call_rows.sort_by_key(|c| (c.caller_entry_va, c.callsite_va));

    let total = raw_functions.len() as u64;
    let mut report_verdict = "ACCEPT".to_string();
    let mut report_reasons: Vec<String> = Vec::new();
    if total > 0 && (fail as f64 / total as f64) > profile.high_decompile_fail_rate {
        report_verdict = "WARN".to_string();
        report_reasons.push("HIGH_DECOMPILE_FAIL_RATE".to_string());
    }

    let report = DecompReport {
        package_name: PACKAGE_NAME.to_string(),
        version: crate::version().to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
        profile_id: profile.profile_id.clone(),
        binary_path: binary_path.to_string(),
        binary_sha256: binary_sha256.to_string(),
        tool_version: summary.tool_version.clone(),
        image_base,
        total_functions: total,
        decompile_ok: ok + warn_count,
        decompile_fail: fail,
        verdict_counts_ok: ok,
        verdict_counts_warn: warn_count,
        verdict_counts_fail: fail,
        verdict: report_verdict,
        reasons: report_reasons,
        timestamp: util::now_rfc3339(),
    };

    if let Some(dir) = output_dir {
        util::write_json_atomic(&dir.join("report.json"), &report)?;
        util::write_jsonl_atomic(&dir.join("functions.jsonl"), &functions)?;
        util::write_jsonl_atomic(&dir.join("variables.jsonl"), &variables)?;
        util::write_jsonl_atomic(&dir.join("cfg.jsonl"), &cfg_rows)?;
        util::write_jsonl_atomic(&dir.join("calls.jsonl"), &call_rows)?;
    }

    Ok(ReshapeOutput { report, functions, variables, cfg: cfg_rows, calls: call_rows })
}
