//! Build receipt schema.
//!
//! Single authoritative JSON receipt per synthetic build job. Records
//! exactly what was built, how, and with what outcome. No DWARF semantics,
//! no alignment, no oracle logic.

use serde::{Deserialize, Serialize};

use crate::builder::policy::CompilePolicy;
use crate::model::{OptLevel, Variant};
use crate::{PACKAGE_NAME, SCHEMA_VERSION};

/// Status of a single build cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CellStatus {
    Success,
    Failed,
}

/// Status of a single phase (compile/link/strip/preprocess).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PhaseStatus {
    Success,
    Failed,
    Timeout,
    Skipped,
}

/// Flags raised per build cell. Builder-only, no oracle flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildFlag {
    BuildFailed,
    Timeout,
    NoArtifact,
    CompileUnitFailed,
    LinkFailed,
    StripFailed,
    DebugExpectedMissing,
    StripExpectedMissing,
    NonElfOutput,
}

/// Role of a source file within the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    CUnit,
    Header,
    Other,
}

/// A single source file in the project snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub path_rel: String,
    pub sha256: String,
    pub size_bytes: u64,
    pub role: FileRole,
}

/// Identity of the source input for this build job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceIdentity {
    pub kind: String,
    /// "single_file" or "multi_file".
    pub entry_type: String,
    /// Relative paths of `.c` compilation units, in snapshot order.
    pub entry_c_files: Vec<String>,
    pub files: Vec<SourceFile>,
    /// Hash over the normalized archive of all source files.
    pub snapshot_sha256: String,
    pub language: String,
}

/// Immutable record of the build environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainIdentity {
    /// `gcc --version` first line.
    pub gcc_version: String,
    /// `ld --version` first line.
    pub binutils_version: String,
    /// `strip --version` first line.
    pub strip_version: String,
    /// /etc/os-release PRETTY_NAME, or "unknown".
    pub os_release: String,
    /// `uname -r`.
    pub kernel: String,
    /// `uname -m`.
    pub arch: String,
}

/// Result of compiling a single `.c` translation unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileUnitResult {
    pub source_path_rel: String,
    pub object_path_rel: String,
    /// Content hash of the produced object, when compilation succeeded.
    pub object_sha256: Option<String>,
    pub exit_code: i32,
    pub stdout_path_rel: Option<String>,
    pub stderr_path_rel: Option<String>,
    pub duration_ms: u64,
    pub status: PhaseStatus,
}

/// Summary of the compile phase across all TUs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompilePhaseSummary {
    pub compiled_units: usize,
    pub failed_units: usize,
}

/// Compile phase: all `.c` to `.o`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilePhase {
    /// Representative `gcc -c` command line.
    pub command_template: String,
    pub units: Vec<CompileUnitResult>,
    pub summary: CompilePhaseSummary,
    pub status: PhaseStatus,
}

/// Link phase: all `.o` to one executable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkPhase {
    pub command: String,
    pub exit_code: i32,
    pub stdout_path_rel: Option<String>,
    pub stderr_path_rel: Option<String>,
    pub duration_ms: u64,
    pub status: PhaseStatus,
}

impl Default for LinkPhase {
    fn default() -> Self {
        Self {
            command: String::new(),
            exit_code: -1,
            stdout_path_rel: None,
            stderr_path_rel: None,
            duration_ms: 0,
            status: PhaseStatus::Skipped,
        }
    }
}

/// Strip phase (stripped variant only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripPhase {
    pub command: String,
    pub exit_code: i32,
    pub duration_ms: u64,
    pub status: PhaseStatus,
}

/// Result of preprocessing a single `.c` to `.i` translation unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessUnitResult {
    pub source_path_rel: String,
    pub output_path_rel: String,
    pub output_sha256: Option<String>,
    pub exit_code: i32,
    pub stdout_path_rel: Option<String>,
    pub stderr_path_rel: Option<String>,
    pub duration_ms: u64,
    pub status: PhaseStatus,
}

/// Preprocess phase: all `.c` to `.i` via `gcc -E`.
///
/// Top-level in the receipt (not per-cell) because preprocessing is
/// optimization-independent. Unit failure is non-fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessPhase {
    pub command_template: String,
    pub units: Vec<PreprocessUnitResult>,
    pub status: PhaseStatus,
}

/// Minimal ELF metadata recorded per artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElfArtifactMeta {
    /// ET_EXEC, ET_DYN, etc.
    pub elf_type: String,
    /// EM_X86_64, etc.
    pub arch: String,
    pub build_id: Option<String>,
}

/// Debug section presence check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugPresence {
    pub has_debug_sections: bool,
    pub debug_sections: Vec<String>,
}

/// Metadata for a produced binary artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub path_rel: String,
    pub sha256: String,
    pub size_bytes: u64,
    pub elf: ElfArtifactMeta,
    pub debug_presence: DebugPresence,
}

/// Result of building one `(optimization, variant)` combination.
///
/// Contains the full phase breakdown: compile, link, strip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildCell {
    pub optimization: OptLevel,
    pub variant: Variant,
    pub status: CellStatus,
    pub flags: Vec<BuildFlag>,

    pub compile: CompilePhase,
    pub link: LinkPhase,
    /// Present for the stripped variant only.
    pub strip: Option<StripPhase>,

    /// Present only if link succeeded and an artifact exists.
    pub artifact: Option<ArtifactMeta>,
}

/// Identifies the builder package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderInfo {
    pub name: String,
    pub version: String,
    pub schema_version: String,
    pub profile_id: String,
    /// sha256 of the profile lock text, when loaded from a file.
    pub lock_text_hash: Option<String>,
}

impl BuilderInfo {
    pub fn new(profile_id: &str, lock_text_hash: Option<String>) -> Self {
        Self {
            name: PACKAGE_NAME.to_string(),
            version: crate::version().to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            profile_id: profile_id.to_string(),
            lock_text_hash,
        }
    }
}

/// Job-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    pub job_id: String,
    pub name: String,
    /// RFC 3339; the single permitted nondeterministic field.
    pub created_at: String,
    /// BUILDING, SUCCESS, PARTIAL, FAILED.
    pub status: String,
}

/// What was requested to be built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestedMatrix {
    pub optimizations: Vec<OptLevel>,
    pub variants: Vec<Variant>,
    pub compile_policy: CompilePolicy,
}

/// Single authoritative receipt for a synthetic build job.
///
/// One file per job: `build_receipt.json`. Any downstream stage reading a
/// binary must resolve its provenance through the artifact hashes recorded
/// here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReceipt {
    pub builder: BuilderInfo,
    pub job: JobInfo,
    pub source: SourceIdentity,
    pub toolchain: ToolchainIdentity,
    pub requested: RequestedMatrix,
    pub preprocess: PreprocessPhase,
    pub builds: Vec<BuildCell>,
}

impl BuildReceipt {
    /// Derive the job status from cell results.
    pub fn compute_status(&self) -> &'static str {
        if self.builds.is_empty() {
            return "FAILED";
        }
        let ok = self.builds.iter().filter(|c| c.status == CellStatus::Success).count();
        if ok == self.builds.len() {
            "SUCCESS"
        } else if ok > 0 {
            "PARTIAL"
        } else {
            "FAILED"
        }
    }

    /// Find the artifact for a cell, if that cell produced one.
    pub fn artifact_for(&self, opt: OptLevel, variant: Variant) -> Option<&ArtifactMeta> {
        self.builds
            .iter()
            .find(|c| c.optimization == opt && c.variant == variant)
            .and_then(|c| c.artifact.as_ref())
    }
}
