use reforge_core::decomp::cfg::{compute_cfg_completeness, process_cfg};
use reforge_core::decomp::raw::RawBlock;
use reforge_core::model::CfgCompleteness;

fn block(id: u64, start: u64, end: u64, succ: Vec<u64>) -> RawBlock {
    RawBlock { block_id: id, start_va: start, end_va: end, succ_va: succ }
}

#[test]
fn edges_resolve_through_block_starts() {
    let blocks = vec![
        block(0, 0x1000, 0x1010, vec![0x1010, 0x1020]),
        block(1, 0x1010, 0x1020, vec![0x1020]),
        block(2, 0x1020, 0x1030, vec![]),
    ];
    let row = process_cfg(&blocks, &[], "bin", "func:0x1000", 0x1000);

    assert_eq!(row.bb_count, 3);
    assert_eq!(row.edge_count, 3);
    // E - N + 2 = 3 - 3 + 2.
    assert_eq!(row.cyclomatic, 2);
    assert_eq!(row.blocks[0].succ, vec![1, 2]);
}

#[test]
fn successors_outside_the_function_drop_out() {
    let blocks = vec![block(0, 0x1000, 0x1010, vec![0x9999])];
    let row = process_cfg(&blocks, &[], "bin", "f", 0x1000);
    assert_eq!(row.edge_count, 0);
    assert!(row.blocks[0].succ.is_empty());
}

#[test]
fn loop_back_edge_raises_cyclomatic() {
    let blocks = vec![
        block(0, 0x1000, 0x1010, vec![0x1010]),
        block(1, 0x1010, 0x1020, vec![0x1000, 0x1020]),
        block(2, 0x1020, 0x1030, vec![]),
    ];
    let row = process_cfg(&blocks, &[], "bin", "f", 0x1000);
    assert_eq!(row.cyclomatic, 3 - 3 + 2 + 1);
}

#[test]
fn completeness_tiers() {
    assert_eq!(compute_cfg_completeness(&[]), CfgCompleteness::High);
    assert_eq!(
        compute_cfg_completeness(&["SWITCH_RECOVERY_FAILED".to_string()]),
        CfgCompleteness::Medium
    );
    assert_eq!(
        compute_cfg_completeness(&["UNREACHABLE_BLOCKS_REMOVED".to_string()]),
        CfgCompleteness::Medium
    );
    assert_eq!(
        compute_cfg_completeness(&["UNRESOLVED_INDIRECT_JUMP".to_string()]),
        CfgCompleteness::Low
    );
    assert_eq!(
        compute_cfg_completeness(&["TRUNCATED_CONTROL_FLOW".to_string()]),
        CfgCompleteness::Low
    );
    // LOW dominates MEDIUM.
    assert_eq!(
        compute_cfg_completeness(&[
            "SWITCH_RECOVERY_FAILED".to_string(),
            "BAD_INSTRUCTION_DATA".to_string()
        ]),
        CfgCompleteness::Low
    );
}

#[test]
fn zero_blocks_cannot_be_high() {
    let row = process_cfg(&[], &[], "bin", "f", 0x1000);
    assert_eq!(row.cfg_completeness, CfgCompleteness::Low);
    assert_eq!(row.cyclomatic, 0);
}

#[test]
fn indirect_jump_flag_tracks_warnings() {
    let blocks = vec![block(0, 0x1000, 0x1010, vec![])];
    let row = process_cfg(
        &blocks,
        &["UNRESOLVED_INDIRECT_JUMP".to_string()],
        "bin",
        "f",
        0x1000,
    );
    assert!(row.has_indirect_jumps);
    assert_eq!(row.cfg_completeness, CfgCompleteness::Low);
}
