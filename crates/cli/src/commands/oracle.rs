//! `run-dwarf-oracle` and `run-ts-oracle`.

use anyhow::{Context, Result};

use reforge_core::dwarf::{self, DwarfProfile};
use reforge_core::model::Variant;
use reforge_core::tsoracle::{self, TsProfile};

use crate::commands::util::{
    artifact_path, case_layout, collect_i_paths, load_receipt, parse_opt, print_json,
};

/// Run the DWARF oracle over a case's debug binary at one optimization
/// level.
pub fn run_dwarf_oracle_command(root: &str, name: &str, opt: &str, json: bool) -> Result<()> {
    let root_path = crate::canonicalize_or_current(root)?;
    let layout = case_layout(&root_path, name);
    let receipt = load_receipt(&layout)?;
    let opt = parse_opt(opt)?;

    let binary = artifact_path(&layout, &receipt, opt, Variant::Debug)?;
    let output_dir = layout.oracle_dir(opt);

    let profile = DwarfProfile::default();
    let (report, _functions) = dwarf::run_oracle(&binary, &profile, Some(&output_dir))
        .with_context(|| format!("DWARF oracle failed on {}", binary.display()))?;

    if json {
        print_json(&report)?;
    } else {
        println!(
            "DWARF oracle {} {}: {} ({} functions: {} accept / {} warn / {} reject)",
            name,
            opt.as_str(),
            report.verdict,
            report.function_counts.total,
            report.function_counts.accept,
            report.function_counts.warn,
            report.function_counts.reject,
        );
        println!("Outputs: {}", output_dir.display());
    }

    Ok(())
}

/// Run the tree-sitter oracle over the case's preprocessed TUs.
pub fn run_ts_oracle_command(root: &str, name: &str, json: bool) -> Result<()> {
    let root_path = crate::canonicalize_or_current(root)?;
    let layout = case_layout(&root_path, name);

    let i_paths = collect_i_paths(&layout)?;
    if i_paths.is_empty() {
        anyhow::bail!("no .i files under {}", layout.preprocess_dir.display());
    }

    let profile = TsProfile::default();
    let (report, functions, recipes) =
        tsoracle::run_ts_oracle(&i_paths, &profile, Some(&layout.oracle_ts_dir))
            .context("tree-sitter oracle failed")?;

    if json {
        print_json(&report)?;
    } else {
        println!(
            "TS oracle {}: {} TUs, {} functions, {} recipes",
            name,
            report.tu_reports.len(),
            functions.functions.len(),
            recipes.recipes.len(),
        );
        for tu in &report.tu_reports {
            println!("  {} [{}] {} functions", tu.tu_path, tu.verdict, tu.n_functions);
        }
        println!("Outputs: {}", layout.oracle_ts_dir.display());
    }

    Ok(())
}
