use reforge_core::db::{BinaryRecord, ProjectDb, SyntheticCodeRecord};
use reforge_core::model::{OptLevel, Variant};
use tempfile::tempdir;

fn code_record(name: &str) -> SyntheticCodeRecord {
    SyntheticCodeRecord {
        name: name.to_string(),
        snapshot_sha256: "ab".repeat(32),
        source_files: vec!["main.c".to_string(), "util.h".to_string()],
        test_category: "loops".to_string(),
        status: "SUCCESS".to_string(),
    }
}

fn binary_record(hash: &str, code_id: i64) -> BinaryRecord {
    BinaryRecord {
        file_hash: hash.to_string(),
        synthetic_code_id: code_id,
        file_path: "t01/O0/debug/bin/t01".to_string(),
        file_size: 16384,
        optimization_level: OptLevel::O0,
        variant_type: Variant::Debug,
        has_debug_info: true,
        is_stripped: false,
        elf_type: "ET_DYN".to_string(),
        elf_machine: "EM_X86_64".to_string(),
        build_id: Some("cafe".to_string()),
    }
}

#[test]
fn upsert_synthetic_code_is_idempotent_on_name() {
    let db = ProjectDb::open_in_memory().expect("open");
    let first = db.upsert_synthetic_code(&code_record("t01")).expect("insert");

    let mut updated = code_record("t01");
    updated.status = "PARTIAL".to_string();
    let second = db.upsert_synthetic_code(&updated).expect("upsert");

    assert_eq!(first, second);
    let rows = db.list_synthetic_code().expect("list");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, "PARTIAL");
    assert_eq!(rows[0].source_files, vec!["main.c".to_string(), "util.h".to_string()]);
}

#[test]
fn duplicate_binary_hash_is_a_no_op() {
    let db = ProjectDb::open_in_memory().expect("open");
    let code_id = db.upsert_synthetic_code(&code_record("t01")).expect("insert");

    assert!(db.insert_binary(&binary_record("hash-1", code_id)).expect("insert"));
    assert!(!db.insert_binary(&binary_record("hash-1", code_id)).expect("re-insert"));
    assert_eq!(db.list_binaries(None).expect("list").len(), 1);
}

#[test]
fn binaries_filter_by_case() {
    let db = ProjectDb::open_in_memory().expect("open");
    let a = db.upsert_synthetic_code(&code_record("t01")).expect("a");
    let b = db.upsert_synthetic_code(&code_record("t02")).expect("b");

    db.insert_binary(&binary_record("hash-a", a)).expect("insert a");
    db.insert_binary(&binary_record("hash-b", b)).expect("insert b");

    let only_a = db.list_binaries(Some(a)).expect("filter");
    assert_eq!(only_a.len(), 1);
    assert_eq!(only_a[0].file_hash, "hash-a");
}

#[test]
fn lookup_by_hash_round_trips_fields() {
    let db = ProjectDb::open_in_memory().expect("open");
    let code_id = db.upsert_synthetic_code(&code_record("t01")).expect("insert");
    let record = binary_record("hash-x", code_id);
    db.insert_binary(&record).expect("insert");

    let found = db.binary_by_hash("hash-x").expect("query").expect("present");
    assert_eq!(found, record);
    assert!(db.binary_by_hash("missing").expect("query").is_none());
}

#[test]
fn db_persists_across_reopen() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("reforge.db");
    {
        let db = ProjectDb::open(&path).expect("open");
        db.upsert_synthetic_code(&code_record("t01")).expect("insert");
    }
    let db = ProjectDb::open(&path).expect("reopen");
    assert_eq!(db.list_synthetic_code().expect("list").len(), 1);
}
