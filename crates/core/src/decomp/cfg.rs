//! CFG processing: basic-block graph metrics per function.
//!
//! Successor edges are kept as block-id references indexed by block start
//! address; the graph may contain cycles (recursion, loops), so blocks
//! never own their successors.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::decomp::raw::RawBlock;
use crate::decomp::warnings::code;
use crate::model::CfgCompleteness;

/// One block descriptor with resolved successor block ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDescriptor {
    pub block_id: u64,
    pub start_va: u64,
    pub end_va: u64,
    pub succ: Vec<u64>,
}

/// One output-ready CFG row (`cfg.jsonl`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfgRow {
    pub binary_id: String,
    pub function_id: String,
    pub entry_va: u64,
    pub bb_count: usize,
    pub edge_count: usize,
    /// E - N + 2 for single-entry graphs.
    pub cyclomatic: i64,
    pub has_indirect_jumps: bool,
    pub cfg_completeness: CfgCompleteness,
    pub blocks: Vec<BlockDescriptor>,
}

/// Coarse completeness from the warning set.
///
/// LOW on unresolved indirect jumps, truncated flow, or bad instruction
/// data; MEDIUM on removed unreachable blocks or failed switch recovery;
/// HIGH otherwise.
pub fn compute_cfg_completeness(warnings: &[String]) -> CfgCompleteness {
    const LOW_TRIGGERS: &[&str] = &[
        code::UNRESOLVED_INDIRECT_JUMP,
        code::TRUNCATED_CONTROL_FLOW,
        code::BAD_INSTRUCTION_DATA,
    ];
    const MEDIUM_TRIGGERS: &[&str] =
        &[code::UNREACHABLE_BLOCKS_REMOVED, code::SWITCH_RECOVERY_FAILED];

    if warnings.iter().any(|w| LOW_TRIGGERS.contains(&w.as_str())) {
        return CfgCompleteness::Low;
    }
    if warnings.iter().any(|w| MEDIUM_TRIGGERS.contains(&w.as_str())) {
        return CfgCompleteness::Medium;
    }
    CfgCompleteness::High
}

/// Process raw blocks into a CFG row.
pub fn process_cfg(
    raw_blocks: &[RawBlock],
    warnings: &[String],
    binary_id: &str,
    function_id: &str,
    entry_va: u64,
) -> CfgRow {
    let bb_count = raw_blocks.len();

    // Successor VAs resolve to block ids through the start-address map;
    // targets outside the function drop out of the edge set.
    let addr_to_id: HashMap<u64, u64> =
        raw_blocks.iter().map(|b| (b.start_va, b.block_id)).collect();

    let mut blocks = Vec::with_capacity(bb_count);
    let mut edge_count = 0usize;
    for blk in raw_blocks {
        let succ: Vec<u64> =
            blk.succ_va.iter().filter_map(|sva| addr_to_id.get(sva).copied()).collect();
        edge_count += succ.len();
        blocks.push(BlockDescriptor {
            block_id: blk.block_id,
            start_va: blk.start_va,
            end_va: blk.end_va,
            succ,
        });
    }

    let cyclomatic =
        if bb_count > 0 { edge_count as i64 - bb_count as i64 + 2 } else { 0 };

    let mut cfg_completeness = compute_cfg_completeness(warnings);
    // A function with no recovered blocks cannot claim a complete CFG.
    if bb_count == 0 && cfg_completeness == CfgCompleteness::High {
        cfg_completeness = CfgCompleteness::Low;
    }

    CfgRow {
        binary_id: binary_id.to_string(),
        function_id: function_id.to_string(),
        entry_va,
        bb_count,
        edge_count,
        cyclomatic,
        has_indirect_jumps: warnings.iter().any(|w| w == code::UNRESOLVED_INDIRECT_JUMP),
        cfg_completeness,
        blocks,
    }
}
