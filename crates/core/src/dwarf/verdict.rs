//! Verdict policy: structured ACCEPT / WARN / REJECT decisions.
//!
//! Two layers:
//! 1. Binary-level gate (`gate_binary`): can we evaluate any functions?
//! 2. Function-level judge (`judge_function`): is this function usable?
//!
//! Policy rules reference the profile for thresholds but never touch the
//! extraction code.

use serde::{Deserialize, Serialize};

use crate::dwarf::functions::FunctionEntry;
use crate::dwarf::lines::LineSpan;
use crate::elf::ElfMeta;
use crate::model::Verdict;

/// Reasons an entire binary is rejected by the oracle.
pub mod binary_reason {
    pub const NO_DEBUG_INFO: &str = "NO_DEBUG_INFO";
    pub const NO_DEBUG_LINE: &str = "NO_DEBUG_LINE";
    pub const UNSUPPORTED_ARCH: &str = "UNSUPPORTED_ARCH";
    pub const SPLIT_DWARF: &str = "SPLIT_DWARF";
    pub const DWARF_PARSE_ERROR: &str = "DWARF_PARSE_ERROR";
}

/// Reasons a single function is rejected.
pub mod reject_reason {
    pub const DECLARATION_ONLY: &str = "DECLARATION_ONLY";
    pub const MISSING_RANGE: &str = "MISSING_RANGE";
    pub const NO_LINE_ROWS_IN_RANGE: &str = "NO_LINE_ROWS_IN_RANGE";
}

/// Reasons a function receives WARN (accepted with caveats).
pub mod warn_reason {
    pub const MULTI_FILE_RANGE: &str = "MULTI_FILE_RANGE";
    pub const SYSTEM_HEADER_DOMINANT: &str = "SYSTEM_HEADER_DOMINANT";
    pub const RANGES_FRAGMENTED: &str = "RANGES_FRAGMENTED";
    pub const NAME_MISSING: &str = "NAME_MISSING";
}

/// Support profile: thresholds and path exclusions for the DWARF oracle.
///
/// Changing thresholds or adding compiler support is a profile change, not
/// a code change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DwarfProfile {
    pub profile_id: String,
    /// Dominant-file paths starting with these prefixes are flagged.
    pub exclude_paths: Vec<String>,
    pub min_dominant_file_ratio: f64,
    /// Warn if a function has more range segments than this.
    pub max_fragments_warn: usize,
}

impl Default for DwarfProfile {
    fn default() -> Self {
        Self {
            profile_id: "linux-x86_64-gcc-dwarf".to_string(),
            exclude_paths: vec![
                "/usr/include".to_string(),
                "/usr/lib/gcc".to_string(),
                "<built-in>".to_string(),
                "<command-line>".to_string(),
            ],
            min_dominant_file_ratio: 0.7,
            max_fragments_warn: 2,
        }
    }
}

/// Evaluate binary-level facts against the profile.
///
/// Any single reject reason is fatal for the whole binary.
pub fn gate_binary(meta: &ElfMeta, _profile: &DwarfProfile) -> (Verdict, Vec<String>) {
    let mut reasons: Vec<String> = Vec::new();

    if !meta.has_debug_info {
        reasons.push(binary_reason::NO_DEBUG_INFO.to_string());
    }
    if !meta.has_debug_line {
        reasons.push(binary_reason::NO_DEBUG_LINE.to_string());
    }
    if !meta.is_x86_64_elf() {
        reasons.push(binary_reason::UNSUPPORTED_ARCH.to_string());
    }
    if meta.has_split_dwarf {
        reasons.push(binary_reason::SPLIT_DWARF.to_string());
    }

    if reasons.is_empty() {
        (Verdict::Accept, reasons)
    } else {
        (Verdict::Reject, reasons)
    }
}

/// Evaluate a single function against the profile.
pub fn judge_function(
    func: &FunctionEntry,
    span: &LineSpan,
    profile: &DwarfProfile,
) -> (Verdict, Vec<String>) {
    let mut rejects: Vec<String> = Vec::new();
    let mut warns: Vec<String> = Vec::new();

    if func.is_declaration {
        rejects.push(reject_reason::DECLARATION_ONLY.to_string());
    }
    if !func.is_declaration && func.ranges.is_empty() {
        rejects.push(reject_reason::MISSING_RANGE.to_string());
    }
    if !func.is_declaration && !func.ranges.is_empty() && span.is_empty() {
        rejects.push(reject_reason::NO_LINE_ROWS_IN_RANGE.to_string());
    }

    if !rejects.is_empty() {
        return (Verdict::Reject, rejects);
    }

    if func.name.is_none() && func.linkage_name.is_none() {
        warns.push(warn_reason::NAME_MISSING.to_string());
    }
    if span.dominant_file_ratio < profile.min_dominant_file_ratio {
        warns.push(warn_reason::MULTI_FILE_RANGE.to_string());
    }
    if let Some(dominant) = &span.dominant_file {
        if profile.exclude_paths.iter().any(|p| dominant.starts_with(p.as_str())) {
            warns.push(warn_reason::SYSTEM_HEADER_DOMINANT.to_string());
        }
    }
    if func.ranges.len() > profile.max_fragments_warn {
        warns.push(warn_reason::RANGES_FRAGMENTED.to_string());
    }

    if warns.is_empty() {
        (Verdict::Accept, warns)
    } else {
        (Verdict::Warn, warns)
    }
}
