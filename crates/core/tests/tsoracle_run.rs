//! Tree-sitter oracle over real translation units.

use std::fs;

use reforge_core::tsoracle::{run_ts_oracle, TsProfile};
use tempfile::tempdir;

const SIMPLE_TU: &str = "\
# 1 \"main.c\"
int add(int a, int b)
{
  return a + b;
}

int main(void)
{
  int total = 0;
  for (int i = 0; i < 4; i++) {
    total = add(total, i);
  }
  if (total > 3) {
    return 1;
  }
  return 0;
}
";

fn write_tu(dir: &std::path::Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("write tu");
    path
}

#[test]
fn indexes_functions_with_stable_ids() {
    let dir = tempdir().expect("tempdir");
    let tu = write_tu(dir.path(), "main.i", SIMPLE_TU);

    let (report, functions, recipes) =
        run_ts_oracle(&[tu.clone()], &TsProfile::default(), None).expect("oracle");

    assert_eq!(report.tu_reports.len(), 1);
    assert_eq!(report.tu_reports[0].parse_status, "OK");
    assert_eq!(report.tu_reports[0].verdict, "ACCEPT");

    let names: Vec<_> =
        functions.functions.iter().map(|f| f.entry.name.clone().unwrap()).collect();
    assert_eq!(names, vec!["add".to_string(), "main".to_string()]);

    for f in &functions.functions {
        let expected_prefix =
            format!("{}:{}:{}:", f.tu_path, f.entry.start_byte, f.entry.end_byte);
        assert!(f.entry.ts_func_id.starts_with(&expected_prefix));
        assert!(f.entry.ts_func_id.ends_with(&f.entry.context_hash));
        assert_eq!(f.entry.verdict, "ACCEPT");
        assert!(f.entry.start_byte < f.entry.end_byte);
        // Preamble covers everything before the function.
        assert_eq!(f.entry.preamble_span.end_byte, f.entry.start_byte);
    }

    // Two recipes per accepted function.
    assert_eq!(recipes.recipes.len(), 2 * functions.functions.len());
    let with_preamble: Vec<_> = recipes
        .recipes
        .iter()
        .filter(|r| r.kind == "function_with_file_preamble")
        .collect();
    assert_eq!(with_preamble.len(), functions.functions.len());
    for recipe in with_preamble {
        assert_eq!(recipe.slices.len(), 2);
        assert_eq!(recipe.slices[0].start_byte, 0);
    }
}

#[test]
fn structural_nodes_follow_the_allowlist() {
    let dir = tempdir().expect("tempdir");
    let tu = write_tu(dir.path(), "main.i", SIMPLE_TU);

    let (_report, functions, _recipes) =
        run_ts_oracle(&[tu], &TsProfile::default(), None).expect("oracle");

    let main_fn = functions
        .functions
        .iter()
        .find(|f| f.entry.name.as_deref() == Some("main"))
        .expect("main indexed");

    let kinds: Vec<&str> = main_fn.nodes.iter().map(|n| n.node_type.as_str()).collect();
    assert!(kinds.contains(&"compound_statement"));
    assert!(kinds.contains(&"for_statement"));
    assert!(kinds.contains(&"if_statement"));
    assert!(kinds.contains(&"return_statement"));
    for node in &main_fn.nodes {
        assert!(node.start_byte < node.end_byte);
        assert_eq!(node.node_hash_raw.len(), 64);
    }
}

#[test]
fn context_hash_dedups_replicated_bodies() {
    let dir = tempdir().expect("tempdir");
    let a = write_tu(dir.path(), "a.i", "int helper(int x) { return x * 2; }\n");
    let b = write_tu(
        dir.path(),
        "b.i",
        "int helper(int x)\n{\n  /* doubled */\n  return x * 2;\n}\n",
    );

    let (_report, functions, _recipes) =
        run_ts_oracle(&[a, b], &TsProfile::default(), None).expect("oracle");

    assert_eq!(functions.functions.len(), 2);
    assert_eq!(
        functions.functions[0].entry.context_hash,
        functions.functions[1].entry.context_hash,
    );
    assert_ne!(functions.functions[0].entry.ts_func_id, functions.functions[1].entry.ts_func_id);
}

#[test]
fn duplicate_names_in_one_tu_warn() {
    let dir = tempdir().expect("tempdir");
    let tu = write_tu(
        dir.path(),
        "dup.i",
        "int twice(int a) { return a; }\nint twice(int b) { return b; }\n",
    );

    let (_report, functions, _recipes) =
        run_ts_oracle(&[tu], &TsProfile::default(), None).expect("oracle");

    for f in &functions.functions {
        assert_eq!(f.entry.verdict, "WARN");
        assert!(f.entry.reasons.iter().any(|r| r == "DUPLICATE_FUNCTION_NAME"));
    }
}

#[test]
fn pointer_return_declarator_name_is_found() {
    let dir = tempdir().expect("tempdir");
    let tu = write_tu(dir.path(), "ptr.i", "char *dup_str(const char *s) { return 0; }\n");

    let (_report, functions, _recipes) =
        run_ts_oracle(&[tu], &TsProfile::default(), None).expect("oracle");

    assert_eq!(functions.functions[0].entry.name.as_deref(), Some("dup_str"));
}

#[test]
fn missing_tu_is_rejected_not_fatal() {
    let dir = tempdir().expect("tempdir");
    let missing = dir.path().join("ghost.i");
    let present = write_tu(dir.path(), "ok.i", "int f(void) { return 0; }\n");

    let (report, functions, _recipes) =
        run_ts_oracle(&[missing, present], &TsProfile::default(), None).expect("oracle");

    assert_eq!(report.tu_reports.len(), 2);
    let ghost = report.tu_reports.iter().find(|t| t.tu_path.ends_with("ghost.i")).unwrap();
    assert_eq!(ghost.verdict, "REJECT");
    assert!(ghost.reasons.iter().any(|r| r == "TU_PARSE_ERROR"));
    assert_eq!(functions.functions.len(), 1);
}

#[test]
fn outputs_are_written_atomically() {
    let dir = tempdir().expect("tempdir");
    let tu = write_tu(dir.path(), "main.i", SIMPLE_TU);
    let out_dir = dir.path().join("oracle_ts");

    run_ts_oracle(&[tu], &TsProfile::default(), Some(&out_dir)).expect("oracle");

    for name in ["oracle_ts_report.json", "oracle_ts_functions.json", "extraction_recipes.json"] {
        assert!(out_dir.join(name).is_file(), "missing {name}");
    }
}
