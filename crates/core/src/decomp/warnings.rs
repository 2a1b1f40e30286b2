//! Warning taxonomy: raw decompiler messages mapped to frozen codes.
//!
//! The taxonomy is fixed; downstream gates key off these exact strings.
//! Matching is case-insensitive keyword containment, first match wins,
//! and unmatched raw strings collapse to `DECOMPILER_INTERNAL_WARNING`.

/// Frozen warning codes.
pub mod code {
    pub const DECOMPILE_TIMEOUT: &str = "DECOMPILE_TIMEOUT";
    pub const UNKNOWN_CALLING_CONVENTION: &str = "UNKNOWN_CALLING_CONVENTION";
    pub const PARAM_STORAGE_LOCKED: &str = "PARAM_STORAGE_LOCKED";
    pub const UNREACHABLE_BLOCKS_REMOVED: &str = "UNREACHABLE_BLOCKS_REMOVED";
    pub const BAD_INSTRUCTION_DATA: &str = "BAD_INSTRUCTION_DATA";
    pub const TRUNCATED_CONTROL_FLOW: &str = "TRUNCATED_CONTROL_FLOW";
    pub const UNRESOLVED_INDIRECT_JUMP: &str = "UNRESOLVED_INDIRECT_JUMP";
    pub const NON_RETURNING_CALL_MISMODELED: &str = "NON_RETURNING_CALL_MISMODELED";
    pub const SWITCH_RECOVERY_FAILED: &str = "SWITCH_RECOVERY_FAILED";
    pub const DECOMPILER_INTERNAL_WARNING: &str = "DECOMPILER_INTERNAL_WARNING";
}

/// Keyword patterns in priority order; every keyword must appear
/// (case-insensitively) in the raw message.
const PATTERNS: &[(&[&str], &str)] = &[
    (&["timeout"], code::DECOMPILE_TIMEOUT),
    (&["unknown", "calling", "convention"], code::UNKNOWN_CALLING_CONVENTION),
    (&["param", "storage", "lock"], code::PARAM_STORAGE_LOCKED),
    (&["unreachable", "block"], code::UNREACHABLE_BLOCKS_REMOVED),
    (&["bad", "instruction"], code::BAD_INSTRUCTION_DATA),
    (&["bad", "data"], code::BAD_INSTRUCTION_DATA),
    (&["truncat", "control", "flow"], code::TRUNCATED_CONTROL_FLOW),
    (&["unresolved", "indirect", "jump"], code::UNRESOLVED_INDIRECT_JUMP),
    (&["non-return"], code::NON_RETURNING_CALL_MISMODELED),
    (&["non return"], code::NON_RETURNING_CALL_MISMODELED),
    (&["nonreturn"], code::NON_RETURNING_CALL_MISMODELED),
    (&["switch", "recov"], code::SWITCH_RECOVERY_FAILED),
    // Broad fallbacks for known decompiler phrasings.
    (&["could not recover"], code::SWITCH_RECOVERY_FAILED),
    (&["indirect", "jump"], code::UNRESOLVED_INDIRECT_JUMP),
    (&["unreachable"], code::UNREACHABLE_BLOCKS_REMOVED),
];

fn matches_pattern(lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().all(|k| lower.contains(k))
}

/// Map one raw message to a taxonomy code.
pub fn classify(raw: &str) -> &'static str {
    let lower = raw.to_lowercase();
    for (keywords, code) in PATTERNS {
        if matches_pattern(&lower, keywords) {
            return code;
        }
    }
    code::DECOMPILER_INTERNAL_WARNING
}

/// Map all warning sources for one function to deduplicated codes.
///
/// Sources, in order:
/// 1. `warnings_raw` from the decompiler result messages.
/// 2. `error` (may carry warnings even when decompilation succeeds).
/// 3. Leading comment lines of the decompiled C (the tool embeds warnings
///    there); only the first ten lines are scanned.
pub fn map_warnings(
    error_msg: Option<&str>,
    c_raw: Option<&str>,
    warnings_raw: &[String],
) -> (Vec<String>, Vec<String>) {
    let mut raw_lines: Vec<String> = warnings_raw.to_vec();

    if let Some(err) = error_msg {
        if !err.trim().is_empty() {
            raw_lines.push(err.to_string());
        }
    }

    if let Some(c) = c_raw {
        for line in c.lines().take(10) {
            let stripped = line.trim();
            if stripped.starts_with("/*") || stripped.starts_with("//") {
                let lower = stripped.to_lowercase();
                const HINTS: &[&str] = &[
                    "warning",
                    "could not",
                    "unresolved",
                    "unreachable",
                    "bad instruction",
                    "truncat",
                ];
                if HINTS.iter().any(|h| lower.contains(h)) {
                    raw_lines.push(stripped.to_string());
                }
            }
        }
    }

    let mut normalized: Vec<String> = Vec::new();
    for raw in &raw_lines {
        if raw.trim().is_empty() {
            continue;
        }
        let code = classify(raw);
        if !normalized.iter().any(|c| c == code) {
            normalized.push(code.to_string());
        }
    }

    (normalized, raw_lines)
}
