use std::collections::BTreeMap;

use reforge_core::util::{sha256_bytes, sha256_file, write_json_atomic, write_jsonl_atomic};
use tempfile::tempdir;

#[test]
fn json_write_creates_parents_and_leaves_no_tmp() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("deep/nested/report.json");

    let mut value: BTreeMap<String, u64> = BTreeMap::new();
    value.insert("b".to_string(), 2);
    value.insert("a".to_string(), 1);
    write_json_atomic(&path, &value).expect("write");

    assert!(path.is_file());
    assert!(!path.with_extension("tmp").exists());

    let body = std::fs::read_to_string(&path).expect("read");
    // BTreeMap serializes with sorted keys.
    assert!(body.find("\"a\"").unwrap() < body.find("\"b\"").unwrap());
    assert!(body.ends_with('\n'));
}

#[test]
fn json_write_replaces_previous_content() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("report.json");
    write_json_atomic(&path, &vec![1, 2, 3]).expect("first");
    write_json_atomic(&path, &vec![9]).expect("second");
    let body = std::fs::read_to_string(&path).expect("read");
    assert!(body.contains('9'));
    assert!(!body.contains('3'));
}

#[test]
fn jsonl_write_emits_one_record_per_line() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("rows.jsonl");
    let rows = vec![
        serde_json::json!({"id": 1}),
        serde_json::json!({"id": 2}),
    ];
    write_jsonl_atomic(&path, &rows).expect("write");
    let body = std::fs::read_to_string(&path).expect("read");
    assert_eq!(body.lines().count(), 2);
}

#[test]
fn file_hash_matches_bytes_hash() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("blob.bin");
    std::fs::write(&path, b"reforge").expect("write");
    assert_eq!(sha256_file(&path).expect("hash"), sha256_bytes(b"reforge"));
}
