//! `submit-build`: snapshot a source directory, build the matrix, register
//! artifacts.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use reforge_core::builder::policy::CompilePolicy;
use reforge_core::builder::run::{run_build, BuildOptions};
use reforge_core::builder::snapshot::SourceSnapshot;
use reforge_core::db::{BinaryRecord, SyntheticCodeRecord};
use reforge_core::model::OptLevel;

use crate::commands::util::{open_project_db, parse_opt, print_json};

/// Snapshot `source_dir`, run the full build matrix, write the receipt,
/// and register the case + artifacts in the project DB.
#[allow(clippy::too_many_arguments)]
pub fn submit_build_command(
    root: &str,
    source_dir: &str,
    name: Option<String>,
    test_category: &str,
    optimizations: Option<Vec<String>>,
    profile_path: Option<String>,
    timeout_secs: u64,
    replace: bool,
    json: bool,
) -> Result<()> {
    let root_path = crate::canonicalize_or_current(root)?;
    let source_path = crate::canonicalize_or_current(source_dir)?;
    let name = name.unwrap_or_else(|| crate::infer_case_name(&source_path));

    let snapshot = SourceSnapshot::from_dir(&source_path)
        .with_context(|| format!("Failed to snapshot {}", source_path.display()))?;

    let (policy, lock_text_hash) = match profile_path {
        Some(path) => {
            let policy = CompilePolicy::load(Path::new(&path))
                .with_context(|| format!("Failed to load profile {path}"))?;
            let text = std::fs::read(&path)
                .with_context(|| format!("Failed to re-read profile {path}"))?;
            (policy, Some(reforge_core::util::sha256_bytes(&text)))
        }
        None => (CompilePolicy::default_profile(), None),
    };

    let opts: Vec<OptLevel> = match optimizations {
        Some(list) => list.iter().map(|s| parse_opt(s)).collect::<Result<_>>()?,
        None => OptLevel::ALL.to_vec(),
    };

    let options = BuildOptions {
        job_id: format!("job-{}", &snapshot.identity.snapshot_sha256[..12]),
        optimizations: opts,
        phase_timeout: Duration::from_secs(timeout_secs),
        replace_existing: replace,
        cancel: None,
        lock_text_hash,
    };

    let receipt = run_build(&root_path, &name, &snapshot, &policy, &options)
        .with_context(|| format!("Build failed for case {name}"))?;

    // Register the case and every produced artifact.
    let db = open_project_db(&root_path)?;
    let code_id = db.upsert_synthetic_code(&SyntheticCodeRecord {
        name: name.clone(),
        snapshot_sha256: snapshot.identity.snapshot_sha256.clone(),
        source_files: snapshot.identity.files.iter().map(|f| f.path_rel.clone()).collect(),
        test_category: test_category.to_string(),
        status: receipt.job.status.clone(),
    })?;

    for cell in &receipt.builds {
        if let Some(artifact) = &cell.artifact {
            db.insert_binary(&BinaryRecord {
                file_hash: artifact.sha256.clone(),
                synthetic_code_id: code_id,
                file_path: format!("{name}/{}", artifact.path_rel),
                file_size: artifact.size_bytes,
                optimization_level: cell.optimization,
                variant_type: cell.variant,
                has_debug_info: artifact.debug_presence.has_debug_sections,
                is_stripped: cell.variant == reforge_core::model::Variant::Stripped,
                elf_type: artifact.elf.elf_type.clone(),
                elf_machine: artifact.elf.arch.clone(),
                build_id: artifact.elf.build_id.clone(),
            })?;
        }
    }

    if json {
        print_json(&receipt)?;
    } else {
        println!("Build {}: {}", name, receipt.job.status);
        for cell in &receipt.builds {
            let marker = match cell.artifact {
                Some(_) => "ok",
                None => "--",
            };
            println!(
                "  {:>2} {:<8} [{}] flags: {:?}",
                cell.optimization.as_str(),
                cell.variant.as_str(),
                marker,
                cell.flags
            );
        }
        println!("Receipt: {}/{}/build_receipt.json", root_path.display(), name);
    }

    Ok(())
}
