//! Callsite normalization.
//!
//! Call targets are plain values (`callee_entry_va` or the indirect
//! marker), never references into the function table; the call graph is a
//! directed graph with cycles.

use serde::{Deserialize, Serialize};

use crate::decomp::raw::RawCall;
use crate::model::CallKind;

/// One output-ready call row (`calls.jsonl`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRow {
    pub binary_id: String,
    pub caller_function_id: String,
    pub caller_entry_va: u64,
    pub callsite_va: u64,
    pub call_kind: CallKind,
    /// Resolved callee entry; None for unresolved indirect calls.
    pub callee_entry_va: Option<u64>,
    pub callee_name: Option<String>,
    pub is_external_target: bool,
    pub is_import_proxy_target: bool,
}

/// Process raw callsites into rows sorted by callsite VA.
pub fn process_calls(
    raw_calls: &[RawCall],
    binary_id: &str,
    function_id: &str,
    caller_entry_va: u64,
) -> Vec<CallRow> {
    let mut rows: Vec<CallRow> = raw_calls
        .iter()
        .map(|rc| CallRow {
            binary_id: binary_id.to_string(),
            caller_function_id: function_id.to_string(),
            caller_entry_va,
            callsite_va: rc.callsite_va,
            call_kind: if rc.call_kind == "INDIRECT" {
                CallKind::Indirect
            } else {
                CallKind::Direct
            },
            callee_entry_va: rc.callee_entry_va,
            callee_name: rc.callee_name.clone(),
            is_external_target: rc.is_external_target,
            is_import_proxy_target: rc.is_import_proxy_target,
        })
        .collect();

    rows.sort_by_key(|c| c.callsite_va);
    rows
}
