//! `run-join-dwarf-ts` and `run-join-decompile`.

use std::collections::BTreeMap;
use std::fs;

use anyhow::{Context, Result};

use reforge_core::decomp::{DecompFunctionRow, DecompReport};
use reforge_core::dwarf::schema::{OracleFunctionsOutput, OracleReport};
use reforge_core::join_decomp::{self, JoinDecompInputs, JoinDecompProfile};
use reforge_core::join_ts::schema::AlignmentPairsOutput;
use reforge_core::join_ts::{self, JoinInputs, JoinTsProfile};
use reforge_core::tsoracle::schema::{TsFunctionsOutput, TsReport};

use crate::commands::util::{case_layout, load_json, load_jsonl, load_receipt, parse_opt, print_json};

/// Align DWARF functions to tree-sitter functions for one optimization
/// level.
pub fn run_join_dwarf_ts_command(root: &str, name: &str, opt: &str, json: bool) -> Result<()> {
    let root_path = crate::canonicalize_or_current(root)?;
    let layout = case_layout(&root_path, name);
    let opt = parse_opt(opt)?;

    let oracle_dir = layout.oracle_dir(opt);
    let dwarf_report: OracleReport = load_json(&oracle_dir.join("oracle_report.json"))?;
    let dwarf_functions: OracleFunctionsOutput =
        load_json(&oracle_dir.join("oracle_functions.json"))?;
    let ts_report: TsReport = load_json(&layout.oracle_ts_dir.join("oracle_ts_report.json"))?;
    let ts_functions: TsFunctionsOutput =
        load_json(&layout.oracle_ts_dir.join("oracle_ts_functions.json"))?;

    // The join tolerates missing .i files; affected functions surface as
    // ORIGIN_MAP_MISSING rather than failing the stage.
    let mut i_contents: BTreeMap<String, String> = BTreeMap::new();
    for tu in &ts_report.tu_reports {
        if let Ok(content) = fs::read_to_string(&tu.tu_path) {
            i_contents.insert(tu.tu_path.clone(), content);
        }
    }

    let inputs = JoinInputs { dwarf_report, dwarf_functions, ts_report, ts_functions, i_contents };
    let profile = JoinTsProfile::default();
    let output_dir = layout.join_dwarf_ts_dir(opt);

    let (_pairs, report) = join_ts::run_join(&inputs, &profile, Some(&output_dir))
        .context("DWARF/tree-sitter join failed")?;

    if json {
        print_json(&report)?;
    } else {
        println!(
            "Alignment {} {}: {} match / {} ambiguous / {} no-match / {} non-target",
            name,
            opt.as_str(),
            report.pair_counts.r#match,
            report.pair_counts.ambiguous,
            report.pair_counts.no_match,
            report.pair_counts.non_target,
        );
        println!("Outputs: {}", output_dir.display());
    }

    Ok(())
}

/// Join oracle ground truth to reshaped decompiler output.
pub fn run_join_decompile_command(root: &str, name: &str, opt: &str, json: bool) -> Result<()> {
    let root_path = crate::canonicalize_or_current(root)?;
    let layout = case_layout(&root_path, name);
    let receipt = load_receipt(&layout)?;
    let opt = parse_opt(opt)?;

    let oracle_dir = layout.oracle_dir(opt);
    let decompile_dir = layout.decompile_dir(opt);

    let inputs = JoinDecompInputs {
        receipt,
        optimization: opt,
        dwarf_report: load_json::<OracleReport>(&oracle_dir.join("oracle_report.json"))?,
        dwarf_functions: load_json::<OracleFunctionsOutput>(
            &oracle_dir.join("oracle_functions.json"),
        )?,
        alignment: load_json::<AlignmentPairsOutput>(
            &layout.join_dwarf_ts_dir(opt).join("alignment_pairs.json"),
        )?,
        decomp_report: load_json::<DecompReport>(&decompile_dir.join("report.json"))?,
        decomp_functions: load_jsonl::<DecompFunctionRow>(&decompile_dir.join("functions.jsonl"))?,
    };

    let profile = JoinDecompProfile::default();
    let output_dir = layout.join_decompile_dir(opt);

    let (report, rows) = join_decomp::run_join(&inputs, &profile, Some(&output_dir))
        .context("oracle-to-decompiler join failed")?;

    if json {
        print_json(&report)?;
    } else {
        println!(
            "Join {} {}: {} rows, {} high-confidence",
            name,
            opt.as_str(),
            rows.len(),
            report.n_high_confidence,
        );
        for (kind, count) in &report.match_kind_counts {
            println!("  {kind}: {count}");
        }
        println!("Outputs: {}", output_dir.display());
    }

    Ok(())
}
