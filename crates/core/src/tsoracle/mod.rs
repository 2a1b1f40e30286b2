//! Tree-sitter oracle: function and structural-node index over
//! preprocessed translation units.
//!
//! Per `.i` TU: parse with the C grammar, index function definitions with
//! stable content-addressed identifiers, index allowlisted structural
//! nodes, and emit extraction recipes. A TU that fails to parse is
//! recorded with a REJECT verdict; the run continues.

pub mod functions;
pub mod nodes;
pub mod normalize;
pub mod parser;
pub mod schema;
pub mod verdict;

use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};
use tree_sitter::Node;

use crate::model::Verdict;
use crate::util::{self, UtilError};
pub use functions::TsFunctionEntry;
pub use schema::{RecipesOutput, TsFunctionsOutput, TsReport};
pub use verdict::TsProfile;

use schema::{ExtractionRecipe, SliceSpan, TsFunctionRecord, TuReport};

/// Error type for the oracle runner. Per-TU problems never surface here.
#[derive(Debug, Error)]
pub enum TsOracleError {
    #[error(transparent)]
    Util(#[from] UtilError),
}

/// Run the tree-sitter oracle over a set of `.i` paths.
///
/// When `output_dir` is given, the three JSON outputs are written there
/// atomically.
pub fn run_ts_oracle(
    i_paths: &[std::path::PathBuf],
    profile: &TsProfile,
    output_dir: Option<&Path>,
) -> Result<(TsReport, TsFunctionsOutput, RecipesOutput), TsOracleError> {
    let mut report = TsReport::new(&profile.profile_id);
    let mut functions_out = TsFunctionsOutput::new(&profile.profile_id);
    let mut recipes_out = RecipesOutput::new(&profile.profile_id);

    for i_path in i_paths {
        let tu_path = i_path.display().to_string();

        let parse_result = match parser::parse_tu(i_path) {
            Ok(result) => result,
            Err(e) => {
                warn!(tu = %tu_path, error = %e, "TU unreadable or unparseable");
                report.tu_reports.push(TuReport {
                    tu_path,
                    tu_hash: String::new(),
                    parser_version: String::new(),
                    parse_status: "ERROR".to_string(),
                    verdict: Verdict::Reject.as_str().to_string(),
                    reasons: vec![verdict::TU_PARSE_ERROR.to_string()],
                    n_functions: 0,
                    parse_errors: Vec::new(),
                });
                continue;
            }
        };

        let (tu_verdict, tu_reasons) = verdict::gate_tu(&parse_result);

        let mut entries = if tu_verdict == Verdict::Reject {
            Vec::new()
        } else {
            functions::index_functions(&parse_result)
        };

        // The function nodes in tree order match the indexed entries.
        let func_nodes = collect_function_nodes(&parse_result);
        let duplicates = verdict::duplicate_names(&entries);

        let mut records: Vec<TsFunctionRecord> = Vec::new();
        for (idx, entry) in entries.iter_mut().enumerate() {
            let func_node = func_nodes.get(idx).copied();
            let structural = match func_node {
                Some(node) => nodes::index_structural_nodes(
                    node,
                    &parse_result.source_bytes,
                    profile.deep_nesting_threshold,
                ),
                None => Vec::new(),
            };

            let (fv, reasons) = verdict::judge_function(
                entry,
                &duplicates,
                &structural,
                func_node,
                &parse_result.source_bytes,
                profile,
            );
            entry.verdict = fv.as_str().to_string();
            entry.reasons = reasons;

            if fv != Verdict::Reject {
                recipes_out.recipes.push(ExtractionRecipe {
                    ts_func_id: entry.ts_func_id.clone(),
                    tu_path: parse_result.tu_path.clone(),
                    kind: "function_only".to_string(),
                    slices: vec![SliceSpan {
                        start_byte: entry.start_byte,
                        end_byte: entry.end_byte,
                    }],
                });
                recipes_out.recipes.push(ExtractionRecipe {
                    ts_func_id: entry.ts_func_id.clone(),
                    tu_path: parse_result.tu_path.clone(),
                    kind: "function_with_file_preamble".to_string(),
                    slices: vec![
                        SliceSpan { start_byte: 0, end_byte: entry.start_byte },
                        SliceSpan { start_byte: entry.start_byte, end_byte: entry.end_byte },
                    ],
                });
            }

            records.push(TsFunctionRecord {
                tu_path: parse_result.tu_path.clone(),
                entry: entry.clone(),
                nodes: structural,
            });
        }

        info!(tu = %parse_result.tu_path, functions = records.len(), "indexed translation unit");

        report.tu_reports.push(TuReport {
            tu_path: parse_result.tu_path.clone(),
            tu_hash: parse_result.tu_hash.clone(),
            parser_version: parse_result.parser_version.clone(),
            parse_status: parse_result.parse_status.clone(),
            verdict: tu_verdict.as_str().to_string(),
            reasons: tu_reasons,
            n_functions: records.len(),
            parse_errors: parse_result.parse_errors.clone(),
        });
        functions_out.functions.extend(records);
    }

    // Deterministic order across TUs.
    report.tu_reports.sort_by(|a, b| a.tu_path.cmp(&b.tu_path));
    functions_out
        .functions
        .sort_by(|a, b| a.tu_path.cmp(&b.tu_path).then(a.entry.start_byte.cmp(&b.entry.start_byte)));
    recipes_out
        .recipes
        .sort_by(|a, b| a.ts_func_id.cmp(&b.ts_func_id).then(a.kind.cmp(&b.kind)));

    if let Some(dir) = output_dir {
        util::write_json_atomic(&dir.join("oracle_ts_report.json"), &report)?;
        util::write_json_atomic(&dir.join("oracle_ts_functions.json"), &functions_out)?;
        util::write_json_atomic(&dir.join("extraction_recipes.json"), &recipes_out)?;
    }

    Ok((report, functions_out, recipes_out))
}

/// Top-level function_definition nodes in tree order.
fn collect_function_nodes<'t>(parse_result: &'t parser::ParseResult) -> Vec<Node<'t>> {
    let root = parse_result.tree.root_node();
    let mut cursor = root.walk();
    root.children(&mut cursor).filter(|n| n.kind() == "function_definition").collect()
}
