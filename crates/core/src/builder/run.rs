//! Matrix executor: compile, link, strip, preprocess, receipt.
//!
//! The whole job builds into a staging directory and is renamed into place
//! only after the receipt is written, so the artifact root never holds a
//! half-built case. Rebuilding an existing case requires an explicit
//! replace request.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::builder::policy::CompilePolicy;
use crate::builder::receipt::{
    ArtifactMeta, BuildCell, BuildFlag, BuildReceipt, BuilderInfo, CellStatus, CompilePhase,
    CompilePhaseSummary, CompileUnitResult, DebugPresence, ElfArtifactMeta, JobInfo, LinkPhase,
    PhaseStatus, PreprocessPhase, PreprocessUnitResult, RequestedMatrix, StripPhase,
    ToolchainIdentity,
};
use crate::builder::snapshot::SourceSnapshot;
use crate::builder::subprocess::{probe_version, render_command, run_command};
use crate::elf;
use crate::layout::CaseLayout;
use crate::model::{OptLevel, Variant};
use crate::util::{self, UtilError};

/// Error type for build-job execution.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("case directory already exists: {0} (pass replace to rebuild)")]
    CaseExists(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Snapshot(#[from] crate::builder::snapshot::SnapshotError),

    #[error(transparent)]
    Util(#[from] UtilError),
}

fn io_err(path: &Path, source: std::io::Error) -> BuildError {
    BuildError::Io { path: path.display().to_string(), source }
}

/// Options controlling one build job.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub job_id: String,
    pub optimizations: Vec<OptLevel>,
    /// Per-phase subprocess timeout.
    pub phase_timeout: Duration,
    /// Replace an existing case directory instead of refusing.
    pub replace_existing: bool,
    /// Cooperative cancellation: checked between cells. A cancelled job
    /// still flushes a receipt covering the cells already completed.
    pub cancel: Option<Arc<AtomicBool>>,
    /// sha256 of the compile-policy file text, when the policy was loaded
    /// from disk.
    pub lock_text_hash: Option<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            job_id: "job-local".to_string(),
            optimizations: OptLevel::ALL.to_vec(),
            phase_timeout: Duration::from_secs(60),
            replace_existing: false,
            cancel: None,
            lock_text_hash: None,
        }
    }
}

/// Probe the build environment for the receipt's toolchain identity.
fn probe_toolchain(cwd: &Path) -> ToolchainIdentity {
    let os_release = fs::read_to_string("/etc/os-release")
        .ok()
        .and_then(|body| {
            body.lines()
                .find(|l| l.starts_with("PRETTY_NAME="))
                .map(|l| l.trim_start_matches("PRETTY_NAME=").trim_matches('"').to_string())
        })
        .unwrap_or_else(|| "unknown".to_string());

    let kernel = run_command("uname", &["-r".to_string()], cwd, Duration::from_secs(5));
    let arch = run_command("uname", &["-m".to_string()], cwd, Duration::from_secs(5));

    ToolchainIdentity {
        gcc_version: probe_version("gcc", "--version", cwd),
        binutils_version: probe_version("ld", "--version", cwd),
        strip_version: probe_version("strip", "--version", cwd),
        os_release,
        kernel: kernel.stdout.trim().to_string(),
        arch: arch.stdout.trim().to_string(),
    }
}

fn write_log(path: &Path, content: &str) -> Option<String> {
    if content.is_empty() {
        return None;
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok();
    }
    fs::write(path, content).ok()?;
    Some(path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default())
}

fn rel_to(base: &Path, path: &Path) -> String {
    path.strip_prefix(base).unwrap_or(path).to_string_lossy().to_string()
}

/// Execute the full build job for `name` under `root`.
///
/// Builds 4 optimization levels x 3 variants (unless the requested
/// optimization list narrows the matrix), preprocesses every TU once, and
/// writes `build_receipt.json` before publishing the case directory.
pub fn run_build(
    root: &Path,
    name: &str,
    snapshot: &SourceSnapshot,
    policy: &CompilePolicy,
    options: &BuildOptions,
) -> Result<BuildReceipt, BuildError> {
    let target_dir = root.join(name);
    if target_dir.exists() && !options.replace_existing {
        return Err(BuildError::CaseExists(target_dir.display().to_string()));
    }

    // Stage the whole case; rename over the target only when complete.
    let staging_name = format!(".{name}.staging");
    let staging_dir = root.join(&staging_name);
    if staging_dir.exists() {
        fs::remove_dir_all(&staging_dir).map_err(|e| io_err(&staging_dir, e))?;
    }
    let layout = CaseLayout::new(root, &staging_name);
    fs::create_dir_all(&layout.case_dir).map_err(|e| io_err(&layout.case_dir, e))?;

    info!(job_id = %options.job_id, case = %name, "starting synthetic build");

    snapshot.write_to(&layout.src_dir)?;
    let toolchain = probe_toolchain(&layout.case_dir);

    let preprocess = run_preprocess(&layout, snapshot, policy, options);

    let mut builds: Vec<BuildCell> = Vec::new();
    let mut cancelled = false;
    for opt in &options.optimizations {
        for variant in Variant::ALL {
            if let Some(flag) = &options.cancel {
                if flag.load(Ordering::SeqCst) {
                    warn!(job_id = %options.job_id, "build cancelled; flushing partial receipt");
                    cancelled = true;
                    break;
                }
            }
            builds.push(build_cell(&layout, name, snapshot, policy, *opt, variant, options));
        }
        if cancelled {
            break;
        }
    }

    let mut receipt = BuildReceipt {
        builder: BuilderInfo::new(&policy.profile_id, options.lock_text_hash.clone()),
        job: JobInfo {
            job_id: options.job_id.clone(),
            name: name.to_string(),
            created_at: util::now_rfc3339(),
            status: "BUILDING".to_string(),
        },
        source: snapshot.identity.clone(),
        toolchain,
        requested: RequestedMatrix {
            optimizations: options.optimizations.clone(),
            variants: Variant::ALL.to_vec(),
            compile_policy: policy.clone(),
        },
        preprocess,
        builds,
    };
    receipt.job.status = receipt.compute_status().to_string();

    util::write_json_atomic(&layout.receipt_path, &receipt)?;

    // Publish: replace the target directory in one rename.
    if target_dir.exists() {
        fs::remove_dir_all(&target_dir).map_err(|e| io_err(&target_dir, e))?;
    }
    fs::rename(&staging_dir, &target_dir).map_err(|e| io_err(&target_dir, e))?;

    info!(
        job_id = %options.job_id,
        case = %name,
        status = %receipt.job.status,
        cells = receipt.builds.len(),
        "build finished"
    );
    Ok(receipt)
}

/// Preprocess every TU once (`gcc -E`), independent of the matrix.
///
/// Unit failure is non-fatal: the unit is recorded FAILED and the job
/// continues.
fn run_preprocess(
    layout: &CaseLayout,
    snapshot: &SourceSnapshot,
    policy: &CompilePolicy,
    options: &BuildOptions,
) -> PreprocessPhase {
    fs::create_dir_all(&layout.preprocess_dir).ok();
    fs::create_dir_all(&layout.preprocess_logs_dir).ok();

    let flags = policy.preprocess_flags();
    let command_template = format!("{} {} <unit.c> -o <unit.i>", policy.compiler, flags.join(" "));

    let mut units = Vec::new();
    let mut any_failed = false;

    for (src_rel, stem) in snapshot.identity.entry_c_files.iter().zip(snapshot.tu_stems()) {
        let out_path = layout.i_path(&stem);
        let mut args = flags.clone();
        // Absolute source path: the .i line markers must carry the same
        // file strings the debug line table will, or the alignment join
        // has nothing to match on.
        args.push(layout.src_dir.join(src_rel).display().to_string());
        args.push("-o".to_string());
        args.push(rel_to(&layout.case_dir, &out_path));

        let outcome = run_command(&policy.compiler, &args, &layout.case_dir, options.phase_timeout);

        let stdout_rel = write_log(
            &layout.preprocess_logs_dir.join(format!("{stem}.out.log")),
            &outcome.stdout,
        )
        .map(|n| format!("preprocess/logs/{n}"));
        let stderr_rel = write_log(
            &layout.preprocess_logs_dir.join(format!("{stem}.err.log")),
            &outcome.stderr,
        )
        .map(|n| format!("preprocess/logs/{n}"));

        let output_sha256 = if outcome.success() {
            util::sha256_file(&out_path).ok()
        } else {
            any_failed = true;
            warn!(unit = %src_rel, "preprocess failed; continuing");
            None
        };

        units.push(PreprocessUnitResult {
            source_path_rel: src_rel.clone(),
            output_path_rel: rel_to(&layout.case_dir, &out_path),
            output_sha256,
            exit_code: outcome.exit_code,
            stdout_path_rel: stdout_rel,
            stderr_path_rel: stderr_rel,
            duration_ms: outcome.duration_ms,
            status: outcome.status,
        });
    }

    PreprocessPhase {
        command_template,
        units,
        status: if any_failed { PhaseStatus::Failed } else { PhaseStatus::Success },
    }
}

/// Build one `(optimization, variant)` cell: compile all TUs, link, strip.
fn build_cell(
    layout: &CaseLayout,
    name: &str,
    snapshot: &SourceSnapshot,
    policy: &CompilePolicy,
    opt: OptLevel,
    variant: Variant,
    options: &BuildOptions,
) -> BuildCell {
    let delta = policy.delta_for(variant);
    let obj_dir = layout.obj_dir(opt, variant);
    let bin_dir = layout.bin_dir(opt, variant);
    let logs_dir = layout.cell_logs_dir(opt, variant);
    fs::create_dir_all(&obj_dir).ok();
    fs::create_dir_all(&bin_dir).ok();
    fs::create_dir_all(&logs_dir).ok();

    let mut flags: Vec<BuildFlag> = Vec::new();

    // ── Compile phase ────────────────────────────────────────────────
    let mut unit_flags = policy.common_flags();
    unit_flags.extend(delta.add_cflags.clone());
    unit_flags.push(opt.to_flag());

    let command_template =
        format!("{} {} -c <unit.c> -o <unit.o>", policy.compiler, unit_flags.join(" "));

    let mut units = Vec::new();
    let mut summary = CompilePhaseSummary::default();
    let mut object_rels: Vec<String> = Vec::new();

    for (src_rel, stem) in snapshot.identity.entry_c_files.iter().zip(snapshot.tu_stems()) {
        let obj_path = obj_dir.join(format!("{stem}.o"));
        let obj_rel = rel_to(&layout.case_dir, &obj_path);

        let mut args = unit_flags.clone();
        args.push("-c".to_string());
        args.push(layout.src_dir.join(src_rel).display().to_string());
        args.push("-o".to_string());
        args.push(obj_rel.clone());

        let outcome = run_command(&policy.compiler, &args, &layout.case_dir, options.phase_timeout);

        let log_prefix = format!("{}/{}/logs", opt.as_str(), variant.as_str());
        let stdout_rel = write_log(&logs_dir.join(format!("{stem}.compile.out.log")), &outcome.stdout)
            .map(|n| format!("{log_prefix}/{n}"));
        let stderr_rel = write_log(&logs_dir.join(format!("{stem}.compile.err.log")), &outcome.stderr)
            .map(|n| format!("{log_prefix}/{n}"));

        let object_sha256 = if outcome.success() {
            summary.compiled_units += 1;
            object_rels.push(obj_rel.clone());
            util::sha256_file(&obj_path).ok()
        } else {
            summary.failed_units += 1;
            if outcome.status == PhaseStatus::Timeout {
                flags.push(BuildFlag::Timeout);
            }
            None
        };

        units.push(CompileUnitResult {
            source_path_rel: src_rel.clone(),
            object_path_rel: obj_rel,
            object_sha256,
            exit_code: outcome.exit_code,
            stdout_path_rel: stdout_rel,
            stderr_path_rel: stderr_rel,
            duration_ms: outcome.duration_ms,
            status: outcome.status,
        });
    }

    let compile_status =
        if summary.failed_units == 0 { PhaseStatus::Success } else { PhaseStatus::Failed };
    let compile =
        CompilePhase { command_template, units, summary: summary.clone(), status: compile_status };

    if summary.failed_units > 0 {
        flags.push(BuildFlag::CompileUnitFailed);
        flags.push(BuildFlag::BuildFailed);
        flags.sort();
        flags.dedup();
        return BuildCell {
            optimization: opt,
            variant,
            status: CellStatus::Failed,
            flags,
            compile,
            link: LinkPhase::default(),
            strip: None,
            artifact: None,
        };
    }

    // ── Link phase ───────────────────────────────────────────────────
    let binary_path = layout.binary_path(opt, variant, name);
    let binary_rel = rel_to(&layout.case_dir, &binary_path);

    let mut link_args = object_rels.clone();
    link_args.push("-o".to_string());
    link_args.push(binary_rel.clone());
    link_args.extend(policy.link_libs.clone());

    let link_outcome =
        run_command(&policy.compiler, &link_args, &layout.case_dir, options.phase_timeout);
    let log_prefix = format!("{}/{}/logs", opt.as_str(), variant.as_str());
    let link = LinkPhase {
        command: render_command(&policy.compiler, &link_args),
        exit_code: link_outcome.exit_code,
        stdout_path_rel: write_log(&logs_dir.join("link.out.log"), &link_outcome.stdout)
            .map(|n| format!("{log_prefix}/{n}")),
        stderr_path_rel: write_log(&logs_dir.join("link.err.log"), &link_outcome.stderr)
            .map(|n| format!("{log_prefix}/{n}")),
        duration_ms: link_outcome.duration_ms,
        status: link_outcome.status,
    };

    if !link_outcome.success() {
        flags.push(BuildFlag::LinkFailed);
        flags.push(BuildFlag::BuildFailed);
        if link_outcome.status == PhaseStatus::Timeout {
            flags.push(BuildFlag::Timeout);
        }
        flags.sort();
        flags.dedup();
        return BuildCell {
            optimization: opt,
            variant,
            status: CellStatus::Failed,
            flags,
            compile,
            link,
            strip: None,
            artifact: None,
        };
    }

    // ── Strip phase (stripped variant only) ──────────────────────────
    let strip = if delta.strip {
        let strip_args = vec!["--strip-all".to_string(), binary_rel.clone()];
        let outcome = run_command("strip", &strip_args, &layout.case_dir, options.phase_timeout);
        if !outcome.success() {
            flags.push(BuildFlag::StripFailed);
        }
        Some(StripPhase {
            command: render_command("strip", &strip_args),
            exit_code: outcome.exit_code,
            duration_ms: outcome.duration_ms,
            status: outcome.status,
        })
    } else {
        None
    };

    // ── Artifact metadata + post-conditions ──────────────────────────
    let artifact = match inspect_artifact(&binary_path, &binary_rel, &delta, &mut flags) {
        Some(a) => Some(a),
        None => {
            flags.push(BuildFlag::NoArtifact);
            None
        }
    };

    let failed = flags.iter().any(|f| {
        matches!(
            f,
            BuildFlag::BuildFailed
                | BuildFlag::StripFailed
                | BuildFlag::NoArtifact
                | BuildFlag::NonElfOutput
        )
    });
    flags.sort();
    flags.dedup();

    BuildCell {
        optimization: opt,
        variant,
        status: if failed { CellStatus::Failed } else { CellStatus::Success },
        flags,
        compile,
        link,
        strip,
        artifact,
    }
}

/// Hash the artifact, read ELF metadata, and apply the variant's
/// post-conditions (debug presence / strip completeness).
fn inspect_artifact(
    binary_path: &PathBuf,
    binary_rel: &str,
    delta: &crate::builder::policy::VariantDelta,
    flags: &mut Vec<BuildFlag>,
) -> Option<ArtifactMeta> {
    if !binary_path.is_file() {
        return None;
    }

    let sha256 = util::sha256_file(binary_path).ok()?;
    let size_bytes = fs::metadata(binary_path).ok()?.len();

    let (elf_meta, debug_presence) = match elf::read_elf(binary_path) {
        Ok(meta) => {
            let presence = DebugPresence {
                has_debug_sections: !meta.debug_section_names.is_empty(),
                debug_sections: meta.debug_section_names.clone(),
            };
            let artifact_elf = ElfArtifactMeta {
                elf_type: meta.elf_type.clone(),
                arch: meta.machine.clone(),
                build_id: meta.build_id.clone(),
            };

            if delta.dwarf_presence_check && !(meta.has_debug_info && meta.has_debug_line) {
                flags.push(BuildFlag::DebugExpectedMissing);
            }
            if delta.strip && presence.has_debug_sections {
                flags.push(BuildFlag::StripExpectedMissing);
            }

            (artifact_elf, presence)
        }
        Err(_) => {
            flags.push(BuildFlag::NonElfOutput);
            (ElfArtifactMeta::default(), DebugPresence::default())
        }
    };

    Some(ArtifactMeta {
        path_rel: binary_rel.to_string(),
        sha256,
        size_bytes,
        elf: elf_meta,
        debug_presence,
    })
}
