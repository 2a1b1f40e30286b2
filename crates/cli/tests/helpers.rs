use std::path::Path;

use reforge_cli::{canonicalize_or_current, infer_case_name};
use tempfile::tempdir;

#[test]
fn canonicalize_absolute_path_is_identity() {
    let tmp = tempdir().expect("tempdir");
    let result = canonicalize_or_current(tmp.path().to_str().unwrap()).expect("canonicalize");
    assert_eq!(result.canonicalize().unwrap(), tmp.path().canonicalize().unwrap());
}

#[test]
fn canonicalize_missing_path_joins_cwd() {
    let result = canonicalize_or_current("does-not-exist-yet").expect("canonicalize");
    assert!(result.is_absolute());
    assert!(result.ends_with("does-not-exist-yet"));
}

#[test]
fn infer_case_name_uses_last_component() {
    assert_eq!(infer_case_name(Path::new("/data/cases/t07_switch_parser")), "t07_switch_parser");
    assert_eq!(infer_case_name(Path::new("relative/t01")), "t01");
}

#[test]
fn infer_case_name_falls_back_when_missing() {
    assert_eq!(infer_case_name(Path::new("/")), "unnamed-case");
}
