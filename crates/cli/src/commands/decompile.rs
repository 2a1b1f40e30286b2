//! `reshape-decompile`: validate and reshape the raw decompiler export.

use anyhow::{Context, Result};

use reforge_core::decomp::{self, DecompProfile};
use reforge_core::model::Variant;

use crate::commands::util::{artifact_path, case_layout, load_receipt, parse_opt, print_json};

/// Reshape the external decompiler's raw JSONL for one stripped binary.
pub fn reshape_decompile_command(
    root: &str,
    name: &str,
    opt: &str,
    raw_jsonl: &str,
    json: bool,
) -> Result<()> {
    let root_path = crate::canonicalize_or_current(root)?;
    let layout = case_layout(&root_path, name);
    let receipt = load_receipt(&layout)?;
    let opt = parse_opt(opt)?;

    // The stripped artifact is what the decompiler analyzed; its hash is
    // the binary_id on every reshaped row.
    let binary = artifact_path(&layout, &receipt, opt, Variant::Stripped)?;
    let binary_sha256 = receipt
        .artifact_for(opt, Variant::Stripped)
        .map(|a| a.sha256.clone())
        .unwrap_or_default();

    let raw_path = crate::canonicalize_or_current(raw_jsonl)?;
    let output_dir = layout.decompile_dir(opt);

    let profile = DecompProfile::default();
    let output = decomp::reshape(
        &raw_path,
        &binary.display().to_string(),
        &binary_sha256,
        &profile,
        Some(&output_dir),
    )
    .with_context(|| format!("reshape failed for {}", raw_path.display()))?;

    if json {
        print_json(&output.report)?;
    } else {
        println!(
            "Reshape {} {}: {} functions ({} ok / {} warn / {} fail), image base {:#x}",
            name,
            opt.as_str(),
            output.report.total_functions,
            output.report.verdict_counts_ok,
            output.report.verdict_counts_warn,
            output.report.verdict_counts_fail,
            output.report.image_base,
        );
        println!("Outputs: {}", output_dir.display());
    }

    Ok(())
}
