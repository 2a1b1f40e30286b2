use reforge_core::join_decomp::gate::{is_high_confidence, GateInputs};
use reforge_core::model::{CfgCompleteness, MatchKind};

fn passing<'a>(warnings: &'a [String], fatal: &'a [String]) -> GateInputs<'a> {
    GateInputs {
        oracle_verdict: "ACCEPT",
        align_verdict: Some("MATCH"),
        align_n_candidates: Some(1),
        align_overlap_ratio: Some(1.0),
        match_kind: MatchKind::JoinedStrong,
        is_external_block: false,
        is_thunk: false,
        is_aux_function: false,
        is_import_proxy: false,
        cfg_completeness: Some(CfgCompleteness::High),
        warning_tags: warnings,
        fatal_warnings: fatal,
    }
}

fn fatal_set() -> Vec<String> {
    vec!["DECOMPILE_TIMEOUT".to_string(), "UNRESOLVED_INDIRECT_JUMP".to_string()]
}

#[test]
fn clean_row_is_high_confidence() {
    let warnings: Vec<String> = Vec::new();
    let fatal = fatal_set();
    assert!(is_high_confidence(&passing(&warnings, &fatal)));
}

#[test]
fn warn_oracle_verdict_fails_gate() {
    let warnings: Vec<String> = Vec::new();
    let fatal = fatal_set();
    let mut inputs = passing(&warnings, &fatal);
    inputs.oracle_verdict = "WARN";
    assert!(!is_high_confidence(&inputs));
}

#[test]
fn multiple_candidates_fail_gate() {
    let warnings: Vec<String> = Vec::new();
    let fatal = fatal_set();
    let mut inputs = passing(&warnings, &fatal);
    inputs.align_n_candidates = Some(2);
    assert!(!is_high_confidence(&inputs));
}

#[test]
fn imperfect_alignment_ratio_fails_gate() {
    let warnings: Vec<String> = Vec::new();
    let fatal = fatal_set();
    let mut inputs = passing(&warnings, &fatal);
    inputs.align_overlap_ratio = Some(0.97);
    assert!(!is_high_confidence(&inputs));
}

#[test]
fn weak_join_fails_gate() {
    let warnings: Vec<String> = Vec::new();
    let fatal = fatal_set();
    let mut inputs = passing(&warnings, &fatal);
    inputs.match_kind = MatchKind::JoinedWeak;
    assert!(!is_high_confidence(&inputs));
}

#[test]
fn thunk_fails_gate() {
    let warnings: Vec<String> = Vec::new();
    let fatal = fatal_set();
    let mut inputs = passing(&warnings, &fatal);
    inputs.is_thunk = true;
    assert!(!is_high_confidence(&inputs));
}

#[test]
fn low_cfg_completeness_fails_gate() {
    let warnings: Vec<String> = Vec::new();
    let fatal = fatal_set();
    let mut inputs = passing(&warnings, &fatal);
    inputs.cfg_completeness = Some(CfgCompleteness::Low);
    assert!(!is_high_confidence(&inputs));
}

#[test]
fn medium_cfg_completeness_still_passes() {
    let warnings: Vec<String> = Vec::new();
    let fatal = fatal_set();
    let mut inputs = passing(&warnings, &fatal);
    inputs.cfg_completeness = Some(CfgCompleteness::Medium);
    assert!(is_high_confidence(&inputs));
}

#[test]
fn fatal_warning_fails_gate() {
    let warnings = vec!["DECOMPILE_TIMEOUT".to_string()];
    let fatal = fatal_set();
    assert!(!is_high_confidence(&passing(&warnings, &fatal)));
}

#[test]
fn non_fatal_warning_passes_gate() {
    let warnings = vec!["UNREACHABLE_BLOCKS_REMOVED".to_string()];
    let fatal = fatal_set();
    assert!(is_high_confidence(&passing(&warnings, &fatal)));
}
