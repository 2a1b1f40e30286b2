//! `list-binaries` and `show-receipt`.

use anyhow::Result;

use crate::commands::util::{case_layout, load_receipt, open_project_db, print_json};

/// List all binaries registered in the project database.
pub fn list_binaries_command(root: &str, case: Option<&str>, json: bool) -> Result<()> {
    let root_path = crate::canonicalize_or_current(root)?;
    let db = open_project_db(&root_path)?;

    let filter_id = match case {
        Some(name) => db.synthetic_code_id(name)?,
        None => None,
    };
    let binaries = db.list_binaries(filter_id)?;

    if json {
        print_json(&binaries)?;
    } else if binaries.is_empty() {
        println!("No binaries registered.");
    } else {
        for b in &binaries {
            println!(
                "{}  {:>2} {:<8} debug={} stripped={}  {}",
                &b.file_hash[..16.min(b.file_hash.len())],
                b.optimization_level.as_str(),
                b.variant_type.as_str(),
                b.has_debug_info,
                b.is_stripped,
                b.file_path,
            );
        }
    }

    Ok(())
}

/// Show a case's build receipt (human summary or full JSON).
pub fn show_receipt_command(root: &str, name: &str, json: bool) -> Result<()> {
    let root_path = crate::canonicalize_or_current(root)?;
    let layout = case_layout(&root_path, name);
    let receipt = load_receipt(&layout)?;

    if json {
        print_json(&receipt)?;
    } else {
        println!("Case: {} ({})", receipt.job.name, receipt.job.status);
        println!("Job: {} created {}", receipt.job.job_id, receipt.job.created_at);
        println!("Snapshot: {}", receipt.source.snapshot_sha256);
        println!("Toolchain: {}", receipt.toolchain.gcc_version);
        println!("Cells:");
        for cell in &receipt.builds {
            let hash = cell
                .artifact
                .as_ref()
                .map(|a| a.sha256[..16.min(a.sha256.len())].to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {:>2} {:<8} {:?} {}",
                cell.optimization.as_str(),
                cell.variant.as_str(),
                cell.status,
                hash,
            );
        }
    }

    Ok(())
}
