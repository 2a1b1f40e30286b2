//! End-to-end alignment join over synthetic oracle outputs.

use std::collections::BTreeMap;

use reforge_core::dwarf::schema::{
    LineRowEntry, OracleFunctionEntry, OracleFunctionsOutput, OracleReport, RangeModel,
};
use reforge_core::join_ts::schema::JoinTsProfile;
use reforge_core::join_ts::{run_join, JoinInputs};
use reforge_core::tsoracle::functions::{SpanInfo, TsFunctionEntry};
use reforge_core::tsoracle::schema::{TsFunctionRecord, TsFunctionsOutput, TsReport, TuReport};

fn dwarf_entry(
    id: &str,
    name: &str,
    verdict: &str,
    line_rows: &[(&str, u64, u64)],
) -> OracleFunctionEntry {
    OracleFunctionEntry {
        function_id: id.to_string(),
        die_offset: "0x2a".to_string(),
        cu_offset: "0x0".to_string(),
        name: Some(name.to_string()),
        linkage_name: None,
        decl_file: Some("main.c".to_string()),
        decl_line: Some(1),
        decl_column: Some(5),
        comp_dir: Some("/work".to_string()),
        decl_missing_reason: None,
        ranges: vec![RangeModel { low: "0x1000".to_string(), high: "0x1040".to_string() }],
        total_range_bytes: 0x40,
        dominant_file: Some("main.c".to_string()),
        dominant_file_ratio: 1.0,
        line_min: line_rows.iter().map(|(_, l, _)| *l).min(),
        line_max: line_rows.iter().map(|(_, l, _)| *l).max(),
        n_line_rows: line_rows.iter().map(|(_, _, c)| *c).sum(),
        line_rows: line_rows
            .iter()
            .map(|(f, l, c)| LineRowEntry { file: f.to_string(), line: *l, count: *c })
            .collect(),
        file_row_counts: BTreeMap::new(),
        verdict: verdict.to_string(),
        reasons: Vec::new(),
    }
}

fn ts_record(tu: &str, name: &str, lines: (usize, usize), bytes: (usize, usize)) -> TsFunctionRecord {
    let span_id = format!("{tu}:{}:{}", bytes.0, bytes.1);
    let context_hash = format!("ctx-{name}");
    TsFunctionRecord {
        tu_path: tu.to_string(),
        entry: TsFunctionEntry {
            name: Some(name.to_string()),
            start_line: lines.0,
            end_line: lines.1,
            start_byte: bytes.0,
            end_byte: bytes.1,
            signature_span: SpanInfo {
                start_byte: bytes.0,
                end_byte: bytes.0,
                start_line: lines.0,
                end_line: lines.0,
            },
            body_span: SpanInfo {
                start_byte: bytes.0,
                end_byte: bytes.1,
                start_line: lines.0,
                end_line: lines.1,
            },
            preamble_span: SpanInfo {
                start_byte: 0,
                end_byte: bytes.0,
                start_line: 0,
                end_line: lines.0,
            },
            ts_func_id: format!("{span_id}:{context_hash}"),
            span_id,
            context_hash,
            node_hash_raw: "raw".to_string(),
            verdict: "ACCEPT".to_string(),
            reasons: Vec::new(),
        },
        nodes: Vec::new(),
    }
}

fn inputs_with(
    functions: Vec<OracleFunctionEntry>,
    ts_records: Vec<TsFunctionRecord>,
    i_contents: BTreeMap<String, String>,
) -> JoinInputs {
    let mut dwarf_report = OracleReport::new("dwarf-p", "bin", &"ab".repeat(32));
    dwarf_report.verdict = "ACCEPT".to_string();

    let mut dwarf_functions = OracleFunctionsOutput::new("dwarf-p", "bin", &"ab".repeat(32));
    dwarf_functions.functions = functions;

    let mut ts_report = TsReport::new("ts-p");
    let mut ts_functions = TsFunctionsOutput::new("ts-p");
    for record in &ts_records {
        if !ts_report.tu_reports.iter().any(|t| t.tu_path == record.tu_path) {
            ts_report.tu_reports.push(TuReport {
                tu_path: record.tu_path.clone(),
                tu_hash: "deadbeef".to_string(),
                parser_version: "test".to_string(),
                parse_status: "OK".to_string(),
                verdict: "ACCEPT".to_string(),
                reasons: Vec::new(),
                n_functions: 1,
                parse_errors: Vec::new(),
            });
        }
    }
    ts_functions.functions = ts_records;

    JoinInputs { dwarf_report, dwarf_functions, ts_report, ts_functions, i_contents }
}

/// A .i body whose lines 1..=8 map to `file` lines 1..=8.
fn i_body(file: &str) -> String {
    let mut s = format!("# 1 \"{file}\"\n");
    for _ in 0..8 {
        s.push('\n');
    }
    s
}

#[test]
fn unique_best_produces_match() {
    let functions =
        vec![dwarf_entry("cu0x0:die0x2a", "add", "ACCEPT", &[("main.c", 1, 1), ("main.c", 2, 2)])];
    let records = vec![ts_record("main.i", "add", (1, 3), (0, 50))];
    let mut i_contents = BTreeMap::new();
    i_contents.insert("main.i".to_string(), i_body("main.c"));

    let (pairs, report) =
        run_join(&inputs_with(functions, records, i_contents), &JoinTsProfile::default(), None)
            .unwrap();

    assert_eq!(report.pair_counts.r#match, 1);
    let pair = &pairs.pairs[0];
    assert_eq!(pair.verdict, "MATCH");
    assert_eq!(pair.overlap_count, 3);
    assert_eq!(pair.total_count, 3);
    assert_eq!(pair.n_candidates, pair.candidates.len());
    assert!(pair.reasons.iter().any(|r| r == "UNIQUE_BEST"));
}

#[test]
fn reject_functions_pass_through_as_non_targets() {
    let mut rejected = dwarf_entry("cu0x0:die0x99", "dead", "REJECT", &[]);
    rejected.reasons = vec!["MISSING_RANGE".to_string()];
    let functions = vec![rejected];

    let (pairs, report) = run_join(
        &inputs_with(functions, Vec::new(), BTreeMap::new()),
        &JoinTsProfile::default(),
        None,
    )
    .unwrap();

    assert!(pairs.pairs.is_empty());
    assert_eq!(pairs.non_targets.len(), 1);
    assert_eq!(pairs.non_targets[0].dwarf_reasons, vec!["MISSING_RANGE".to_string()]);
    assert_eq!(report.pair_counts.non_target, 1);
}

#[test]
fn static_name_collision_keeps_three_rows() {
    // Three TUs each defining `report`; evidence points each DWARF
    // function at its own file.
    let functions = vec![
        dwarf_entry("cu0x0:die0x10", "report", "ACCEPT", &[("a.c", 1, 2)]),
        dwarf_entry("cu0x100:die0x10", "report", "ACCEPT", &[("b.c", 1, 2)]),
        dwarf_entry("cu0x200:die0x10", "report", "ACCEPT", &[("c.c", 1, 2)]),
    ];
    let records = vec![
        ts_record("a.i", "report", (1, 2), (0, 30)),
        ts_record("b.i", "report", (1, 2), (0, 31)),
        ts_record("c.i", "report", (1, 2), (0, 32)),
    ];
    let mut i_contents = BTreeMap::new();
    i_contents.insert("a.i".to_string(), i_body("a.c"));
    i_contents.insert("b.i".to_string(), i_body("b.c"));
    i_contents.insert("c.i".to_string(), i_body("c.c"));

    let (pairs, report) =
        run_join(&inputs_with(functions, records, i_contents), &JoinTsProfile::default(), None)
            .unwrap();

    assert_eq!(report.pair_counts.r#match, 3);
    let mut best_ids: Vec<_> =
        pairs.pairs.iter().map(|p| p.best_ts_func_id.clone().unwrap()).collect();
    best_ids.sort();
    best_ids.dedup();
    assert_eq!(best_ids.len(), 3, "rows must not collapse");
}

#[test]
fn header_replication_is_ambiguous() {
    // Identical helper replicated into two TUs: same context hash,
    // different tu_path, identical scores.
    let functions =
        vec![dwarf_entry("cu0x0:die0x10", "helper", "ACCEPT", &[("shared.h", 1, 2)])];
    let mut rec_a = ts_record("a.i", "helper", (1, 2), (0, 30));
    rec_a.entry.context_hash = "shared-hash".to_string();
    let mut rec_b = ts_record("b.i", "helper", (1, 2), (0, 30));
    rec_b.entry.context_hash = "shared-hash".to_string();

    let mut i_contents = BTreeMap::new();
    i_contents.insert("a.i".to_string(), i_body("shared.h"));
    i_contents.insert("b.i".to_string(), i_body("shared.h"));

    let (pairs, _report) = run_join(
        &inputs_with(functions, vec![rec_a, rec_b], i_contents),
        &JoinTsProfile::default(),
        None,
    )
    .unwrap();

    let pair = &pairs.pairs[0];
    assert_eq!(pair.verdict, "AMBIGUOUS");
    assert!(pair.reasons.iter().any(|r| r == "HEADER_REPLICATION_COLLISION"));
}

#[test]
fn missing_i_file_yields_origin_map_missing() {
    let functions = vec![dwarf_entry("cu0x0:die0x10", "lost", "ACCEPT", &[("gone.c", 1, 2)])];
    let records = vec![ts_record("gone.i", "lost", (1, 2), (0, 30))];
    // No i_contents entry for gone.i at all.
    let (pairs, _report) = run_join(
        &inputs_with(functions, records, BTreeMap::new()),
        &JoinTsProfile::default(),
        None,
    )
    .unwrap();

    let pair = &pairs.pairs[0];
    assert_eq!(pair.verdict, "NO_MATCH");
    assert!(pair.reasons.iter().any(|r| r == "ORIGIN_MAP_MISSING"));
}

#[test]
fn multi_file_range_propagates() {
    let mut func = dwarf_entry("cu0x0:die0x10", "mix", "WARN", &[("main.c", 1, 2)]);
    func.reasons = vec!["MULTI_FILE_RANGE".to_string()];
    let records = vec![ts_record("main.i", "mix", (1, 2), (0, 30))];
    let mut i_contents = BTreeMap::new();
    i_contents.insert("main.i".to_string(), i_body("main.c"));

    let (pairs, _report) = run_join(
        &inputs_with(vec![func], records, i_contents),
        &JoinTsProfile::default(),
        None,
    )
    .unwrap();

    assert!(pairs.pairs[0].reasons.iter().any(|r| r == "MULTI_FILE_RANGE_PROPAGATED"));
}
