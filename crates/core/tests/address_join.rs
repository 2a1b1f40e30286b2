use std::collections::BTreeMap;

use reforge_core::decomp::DecompFunctionRow;
use reforge_core::join_decomp::join::{classify_match_kind, join_one, JoinThresholds};
use reforge_core::join_decomp::tables::{build_interval_index, DwarfRow};
use reforge_core::model::{CfgCompleteness, FunctionVerdict, MatchKind};

fn thresholds() -> JoinThresholds {
    JoinThresholds {
        strong_overlap_threshold: 0.9,
        weak_overlap_threshold: 0.3,
        near_tie_epsilon: 0.05,
    }
}

fn decomp_row(id: &str, entry: u64, body: Option<(u64, u64)>) -> DecompFunctionRow {
    DecompFunctionRow {
        binary_id: "bin".to_string(),
        function_id: id.to_string(),
        entry_va: entry,
        entry_hex: format!("{entry:#x}"),
        name: id.to_string(),
        namespace: None,
        body_start_va: body.map(|(s, _)| s),
        body_end_va: body.map(|(_, e)| e),
        size_bytes: body.map(|(s, e)| e - s),
        has_body_range: body.is_some(),
        section_hint: Some(".text".to_string()),
        is_external_block: false,
        is_thunk: false,
        is_import: false,
        is_plt_or_stub: false,
        is_init_fini_aux: false,
        is_compiler_aux: false,
        is_library_like: false,
        decompile_status: "OK".to_string(),
        verdict: FunctionVerdict::Ok,
        reasons: Vec::new(),
        warnings: Vec::new(),
        warnings_raw: Vec::new(),
        c_raw: Some("int f(void) { return 0; }".to_string()),
        c_line_count: 1,
        asm_insn_count: 4,
        insn_to_c_ratio: 4.0,
        temp_var_count: 0,
        bb_count: 1,
        cfg_completeness: CfgCompleteness::High,
    }
}

fn dwarf_row(id: &str, ranges: Vec<(u64, u64)>) -> DwarfRow {
    let total: u64 = ranges.iter().map(|(l, h)| h - l).sum();
    let has_range = total > 0;
    let low_pc = ranges.first().map(|(l, _)| *l);
    DwarfRow {
        function_id: id.to_string(),
        name: Some(id.to_string()),
        decl_file: Some("main.c".to_string()),
        decl_line: Some(1),
        decl_column: Some(1),
        oracle_verdict: "ACCEPT".to_string(),
        oracle_reasons: Vec::new(),
        ranges,
        total_range_bytes: total,
        has_range,
        low_pc,
        align_verdict: Some("MATCH".to_string()),
        align_overlap_ratio: Some(1.0),
        align_gap_count: Some(0),
        align_n_candidates: Some(1),
        align_reasons: Vec::new(),
        is_non_target: false,
        eligible_for_join: has_range,
        eligible_for_gold: has_range,
        exclusion_reason: None,
    }
}

fn by_id(rows: &[DecompFunctionRow]) -> BTreeMap<String, &DecompFunctionRow> {
    rows.iter().map(|r| (r.function_id.clone(), r)).collect()
}

#[test]
fn classify_thresholds_and_tiers() {
    let t = thresholds();
    assert_eq!(classify_match_kind(0.95, 0, true, &t), MatchKind::JoinedStrong);
    assert_eq!(classify_match_kind(0.9, 0, true, &t), MatchKind::JoinedStrong);
    assert_eq!(classify_match_kind(0.5, 0, true, &t), MatchKind::JoinedWeak);
    assert_eq!(classify_match_kind(0.3, 0, true, &t), MatchKind::JoinedWeak);
    assert_eq!(classify_match_kind(0.2, 0, true, &t), MatchKind::NoMatch);
    assert_eq!(classify_match_kind(0.95, 2, true, &t), MatchKind::MultiMatch);
    assert_eq!(classify_match_kind(0.0, 0, true, &t), MatchKind::NoMatch);
    assert_eq!(classify_match_kind(0.95, 0, false, &t), MatchKind::NoRange);
}

#[test]
fn exact_overlap_joins_strong() {
    let decomp = vec![decomp_row("func:0x1000", 0x1000, Some((0x1000, 0x1040)))];
    let index = build_interval_index(&decomp);
    let drow = dwarf_row("cu0x0:die0x10", vec![(0x1000, 0x1040)]);

    let outcome = join_one(&drow, &by_id(&decomp), &index, &thresholds());
    assert_eq!(outcome.match_kind, MatchKind::JoinedStrong);
    assert_eq!(outcome.overlap_bytes, 0x40);
    assert!((outcome.pc_overlap_ratio - 1.0).abs() < 1e-9);
    assert_eq!(outcome.decomp_function_id.as_deref(), Some("func:0x1000"));
}

#[test]
fn partial_overlap_joins_weak() {
    // 0x20 of 0x40 bytes covered: ratio 0.5.
    let decomp = vec![decomp_row("func:0x1000", 0x1000, Some((0x1000, 0x1020)))];
    let index = build_interval_index(&decomp);
    let drow = dwarf_row("d", vec![(0x1000, 0x1040)]);

    let outcome = join_one(&drow, &by_id(&decomp), &index, &thresholds());
    assert_eq!(outcome.match_kind, MatchKind::JoinedWeak);
    assert!(!outcome.join_warnings.iter().any(|w| w == "LOW_PC_OVERLAP"));
}

#[test]
fn no_range_is_never_force_joined() {
    let decomp = vec![decomp_row("func:0x1000", 0x1000, Some((0x1000, 0x1040)))];
    let index = build_interval_index(&decomp);
    let drow = dwarf_row("d", vec![]);

    let outcome = join_one(&drow, &by_id(&decomp), &index, &thresholds());
    assert_eq!(outcome.match_kind, MatchKind::NoRange);
    assert!(outcome.decomp_function_id.is_none());
    assert!(outcome.join_warnings.iter().any(|w| w == "DWARF_RANGE_MISSING"));
}

#[test]
fn disjoint_ranges_no_match() {
    let decomp = vec![decomp_row("func:0x9000", 0x9000, Some((0x9000, 0x9040)))];
    let index = build_interval_index(&decomp);
    let drow = dwarf_row("d", vec![(0x1000, 0x1040)]);

    let outcome = join_one(&drow, &by_id(&decomp), &index, &thresholds());
    assert_eq!(outcome.match_kind, MatchKind::NoMatch);
    assert!(outcome.join_warnings.iter().any(|w| w == "NO_DECOMP_OVERLAP"));
}

#[test]
fn near_tie_becomes_multi_match() {
    // Two decompiler functions each covering half the DWARF range.
    let decomp = vec![
        decomp_row("func:0x1000", 0x1000, Some((0x1000, 0x1020))),
        decomp_row("func:0x1020", 0x1020, Some((0x1020, 0x1040))),
    ];
    let index = build_interval_index(&decomp);
    let drow = dwarf_row("d", vec![(0x1000, 0x1040)]);

    let outcome = join_one(&drow, &by_id(&decomp), &index, &thresholds());
    assert_eq!(outcome.match_kind, MatchKind::MultiMatch);
    assert_eq!(outcome.n_near_ties, 1);
    assert!(outcome.join_warnings.iter().any(|w| w == "NEAR_TIE_CANDIDATES"));
}

#[test]
fn best_prefers_max_overlap_then_entry_distance() {
    let decomp = vec![
        decomp_row("small", 0x1030, Some((0x1030, 0x1040))),
        decomp_row("big", 0x1000, Some((0x1000, 0x1030))),
    ];
    let index = build_interval_index(&decomp);
    let drow = dwarf_row("d", vec![(0x1000, 0x1040)]);

    let outcome = join_one(&drow, &by_id(&decomp), &index, &thresholds());
    assert_eq!(outcome.decomp_function_id.as_deref(), Some("big"));
}

#[test]
fn interval_index_skips_unknown_bodies() {
    let decomp = vec![
        decomp_row("bodyless", 0x1000, None),
        decomp_row("solid", 0x2000, Some((0x2000, 0x2040))),
    ];
    let index = build_interval_index(&decomp);
    assert_eq!(index.len(), 1);
    assert_eq!(index[0].function_id, "solid");
}
