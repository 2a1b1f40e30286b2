//! Frozen vocabulary shared across pipeline stages.
//!
//! Verdicts, reason tags, match kinds, storage classes, and the canonical
//! noise-name lists all live here so the stages can never drift apart
//! lexically. A new reason value anywhere in the pipeline should be added
//! here first.

use serde::{Deserialize, Serialize};

/// Optimization levels in the build matrix (exact strings, no dash prefix).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OptLevel {
    O0,
    O1,
    O2,
    O3,
}

impl OptLevel {
    /// All levels in deterministic matrix order.
    pub const ALL: [OptLevel; 4] = [OptLevel::O0, OptLevel::O1, OptLevel::O2, OptLevel::O3];

    pub fn as_str(self) -> &'static str {
        match self {
            OptLevel::O0 => "O0",
            OptLevel::O1 => "O1",
            OptLevel::O2 => "O2",
            OptLevel::O3 => "O3",
        }
    }

    /// Compiler flag form, e.g. `-O2`.
    pub fn to_flag(self) -> String {
        format!("-{}", self.as_str())
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "O0" => Some(OptLevel::O0),
            "O1" => Some(OptLevel::O1),
            "O2" => Some(OptLevel::O2),
            "O3" => Some(OptLevel::O3),
            _ => None,
        }
    }
}

/// Binary variant within a build cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Full debug symbols, not stripped. Ground-truth source for the oracle.
    Debug,
    /// No debug flags, not stripped.
    Release,
    /// Stripped after link. What the decompiler analyzes.
    Stripped,
}

impl Variant {
    /// All variants in deterministic matrix order.
    pub const ALL: [Variant; 3] = [Variant::Debug, Variant::Release, Variant::Stripped];

    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Debug => "debug",
            Variant::Release => "release",
            Variant::Stripped => "stripped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "debug" => Some(Variant::Debug),
            "release" => Some(Variant::Release),
            "stripped" => Some(Variant::Stripped),
            _ => None,
        }
    }
}

/// Three-state verdict used by both oracles and the binary gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Accept,
    Warn,
    Reject,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Accept => "ACCEPT",
            Verdict::Warn => "WARN",
            Verdict::Reject => "REJECT",
        }
    }
}

/// Per-function verdict assigned by the decompiler reshape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FunctionVerdict {
    Ok,
    Warn,
    Fail,
}

impl FunctionVerdict {
    pub fn as_str(self) -> &'static str {
        match self {
            FunctionVerdict::Ok => "OK",
            FunctionVerdict::Warn => "WARN",
            FunctionVerdict::Fail => "FAIL",
        }
    }
}

/// Outcome of DWARF-to-tree-sitter alignment for a single function.
///
/// `NonTarget` is not produced by the scorer itself: it is the state of
/// functions whose oracle verdict was REJECT and which therefore never
/// entered alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlignmentVerdict {
    Match,
    Ambiguous,
    NoMatch,
    NonTarget,
}

impl AlignmentVerdict {
    pub fn as_str(self) -> &'static str {
        match self {
            AlignmentVerdict::Match => "MATCH",
            AlignmentVerdict::Ambiguous => "AMBIGUOUS",
            AlignmentVerdict::NoMatch => "NO_MATCH",
            AlignmentVerdict::NonTarget => "NON_TARGET",
        }
    }
}

/// Classification of a DWARF-to-decompiler mapping by PC-range overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchKind {
    JoinedStrong,
    JoinedWeak,
    MultiMatch,
    NoMatch,
    NoRange,
}

impl MatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchKind::JoinedStrong => "JOINED_STRONG",
            MatchKind::JoinedWeak => "JOINED_WEAK",
            MatchKind::MultiMatch => "MULTI_MATCH",
            MatchKind::NoMatch => "NO_MATCH",
            MatchKind::NoRange => "NO_RANGE",
        }
    }
}

/// Call-site kind reported by the decompiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallKind {
    Direct,
    Indirect,
}

/// Variable storage class in decompiler output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StorageClass {
    Stack,
    Register,
    Memory,
    Unique,
    Unknown,
}

impl StorageClass {
    pub fn parse(s: &str) -> Self {
        match s {
            "STACK" => StorageClass::Stack,
            "REGISTER" => StorageClass::Register,
            "MEMORY" => StorageClass::Memory,
            "UNIQUE" => StorageClass::Unique,
            _ => StorageClass::Unknown,
        }
    }
}

/// Coarse CFG completeness score derived from the warning set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CfgCompleteness {
    High,
    Medium,
    Low,
}

impl CfgCompleteness {
    pub fn as_str(self) -> &'static str {
        match self {
            CfgCompleteness::High => "HIGH",
            CfgCompleteness::Medium => "MEDIUM",
            CfgCompleteness::Low => "LOW",
        }
    }
}

/// Quality of the stable cross-optimization function key.
///
/// DWARF DIE offsets are not stable across optimization levels; the decl
/// tuple is. The quality tier records how much of the tuple was available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StableKeyQuality {
    /// (test_case, decl_file, decl_line, decl_column, name)
    High,
    /// Column missing.
    Medium,
    /// Line missing.
    Low,
    /// decl_file missing. Must never be joined across optimizations.
    Unresolved,
}

/// Stable cross-optimization identity for a DWARF function.
///
/// Unique within a single binary. When the function has no name, an
/// explicit `<anon:{function_id}>` placeholder keeps same-keyed rows from
/// collapsing silently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StableFunctionKey {
    pub test_case: String,
    pub decl_file: String,
    pub decl_line: Option<u64>,
    pub decl_column: Option<u64>,
    pub name: String,
    pub quality: StableKeyQuality,
}

impl StableFunctionKey {
    /// Build the key from decl-tuple components.
    ///
    /// `function_id` feeds the anonymous placeholder so nameless functions
    /// stay distinct.
    pub fn new(
        test_case: &str,
        decl_file: Option<&str>,
        decl_line: Option<u64>,
        decl_column: Option<u64>,
        name: Option<&str>,
        function_id: &str,
    ) -> Self {
        let name = match name {
            Some(n) => n.to_string(),
            None => format!("<anon:{function_id}>"),
        };
        match decl_file {
            Some(file) => {
                let quality = if decl_line.is_some() && decl_column.is_some() {
                    StableKeyQuality::High
                } else if decl_line.is_some() {
                    StableKeyQuality::Medium
                } else {
                    StableKeyQuality::Low
                };
                Self {
                    test_case: test_case.to_string(),
                    decl_file: file.to_string(),
                    decl_line,
                    decl_column,
                    name,
                    quality,
                }
            }
            None => Self {
                test_case: test_case.to_string(),
                decl_file: "<decl_missing>".to_string(),
                decl_line: None,
                decl_column: None,
                // The function_id keeps unresolved keys unique within a binary.
                name: format!("{name}#{function_id}"),
                quality: StableKeyQuality::Unresolved,
            },
        }
    }
}

// ── Noise-name lists ─────────────────────────────────────────────────────

/// Version tag for the frozen noise lists below.
pub const NOISE_LIST_VERSION: &str = "1.1";

/// Init/fini auxiliary function names.
pub const AUX_INIT_FINI_NAMES: &[&str] =
    &["_init", "_fini", "_DT_INIT", "_DT_FINI", "_INIT_0", "_FINI_0"];

/// Compiler/linker inserted auxiliary names.
pub const COMPILER_AUX_NAMES: &[&str] = &[
    "frame_dummy",
    "register_tm_clones",
    "deregister_tm_clones",
    "__do_global_dtors_aux",
    "__libc_csu_init",
    "__libc_csu_fini",
    "__cxa_finalize",
    "__cxa_atexit",
    "__stack_chk_fail",
    "__gmon_start__",
    "_start",
    "__libc_start_main",
    "_dl_relocate_static_pie",
    "__x86.get_pc_thunk.bx",
    "__x86.get_pc_thunk.ax",
    "_ITM_registerTMCloneTable",
    "_ITM_deregisterTMCloneTable",
];

/// Section prefixes that mark PLT entries.
pub const PLT_SECTION_PREFIXES: &[&str] = &[".plt"];

/// Name prefixes that mark decompiler-invented stubs.
pub const STUB_NAME_PREFIXES: &[&str] = &["FUN_"];

/// Strip `@@GLIBC_*` version suffixes for set membership tests.
///
/// `__cxa_finalize@@GLIBC_2.17` becomes `__cxa_finalize`.
pub fn normalize_glibc_name(name: &str) -> &str {
    match name.find("@@GLIBC_") {
        Some(idx) => &name[..idx],
        None => name,
    }
}

/// True if `name` (after GLIBC normalization) is an init/fini or compiler
/// auxiliary.
pub fn is_aux_name(name: &str) -> bool {
    let norm = normalize_glibc_name(name.trim());
    AUX_INIT_FINI_NAMES.contains(&norm) || COMPILER_AUX_NAMES.contains(&norm)
}
