//! Verdict policy for reshaped decompiler functions.

use serde::{Deserialize, Serialize};

use crate::decomp::warnings::code;
use crate::model::FunctionVerdict;

/// Frozen configuration for the decompiler reshape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecompProfile {
    pub profile_id: String,
    /// Binary-level WARN when fail/total exceeds this rate.
    pub high_decompile_fail_rate: f64,
}

impl Default for DecompProfile {
    fn default() -> Self {
        Self { profile_id: "decompile-reshape-v2".to_string(), high_decompile_fail_rate: 0.2 }
    }
}

/// Warnings that degrade structure without making the function unusable.
const STRUCTURING_WARNINGS: &[&str] = &[
    code::UNREACHABLE_BLOCKS_REMOVED,
    code::TRUNCATED_CONTROL_FLOW,
    code::UNRESOLVED_INDIRECT_JUMP,
    code::SWITCH_RECOVERY_FAILED,
    code::NON_RETURNING_CALL_MISMODELED,
    code::UNKNOWN_CALLING_CONVENTION,
    code::PARAM_STORAGE_LOCKED,
    code::DECOMPILER_INTERNAL_WARNING,
    code::DECOMPILE_TIMEOUT,
];

/// Reason tag for functions failed outright by the decompiler.
pub const DECOMPILE_FAIL: &str = "DECOMPILE_FAIL";
/// Reason tag for functions with no usable body range.
pub const NO_BODY_RANGE: &str = "NO_BODY_RANGE";
/// Reason tag for noise functions (external/thunk/aux/import).
pub const NOISE_FUNCTION: &str = "NOISE_FUNCTION";

/// Assign a verdict to a single function.
///
/// FAIL: decompilation error, bad instruction data, or missing body range.
/// WARN: any structuring warning, or noise classification.
/// OK otherwise.
pub fn judge_function(
    decompile_failed: bool,
    warnings: &[String],
    body_start_va: Option<u64>,
    body_end_va: Option<u64>,
    is_noise: bool,
) -> (FunctionVerdict, Vec<String>) {
    let mut reasons: Vec<String> = Vec::new();

    if decompile_failed {
        reasons.push(DECOMPILE_FAIL.to_string());
    }
    if warnings.iter().any(|w| w == code::BAD_INSTRUCTION_DATA) {
        reasons.push(code::BAD_INSTRUCTION_DATA.to_string());
    }
    if body_start_va.is_none() || body_end_va.is_none() {
        reasons.push(NO_BODY_RANGE.to_string());
    }
    if !reasons.is_empty() {
        return (FunctionVerdict::Fail, reasons);
    }

    for w in warnings {
        if STRUCTURING_WARNINGS.contains(&w.as_str()) {
            reasons.push(w.clone());
        }
    }
    if is_noise {
        reasons.push(NOISE_FUNCTION.to_string());
    }

    if reasons.is_empty() {
        (FunctionVerdict::Ok, reasons)
    } else {
        (FunctionVerdict::Warn, reasons)
    }
}
