//! End-to-end reshape over a synthetic raw export.

use std::fs;

use reforge_core::decomp::{reshape, DecompProfile};
use reforge_core::model::{CallKind, CfgCompleteness, FunctionVerdict};
use tempfile::tempdir;

/// A two-function export with a PIE image base; `main` is clean, `printf`
/// is a thunk in the PLT.
fn raw_export() -> String {
    let main_record = serde_json::json!({
        "_type": "function",
        "entry_va": 0x101000u64,
        "name": "main",
        "namespace": null,
        "is_external_block": false,
        "is_thunk": false,
        "is_import": false,
        "body_start_va": 0x101000u64,
        "body_end_va": 0x101040u64,
        "size_bytes": 0x40,
        "section_hint": ".text",
        "insn_count": 12,
        "c_raw": "int main(void)\n{\n  return add(2,3);\n}\n",
        "error": null,
        "warnings_raw": [],
        "variables": [
            {
                "name": "local_res",
                "is_param": false,
                "size_bytes": 4,
                "type_str": "int",
                "storage_class": "STACK",
                "stack_offset": -8,
                "register_name": null,
                "addr_va": null,
                "access_sites": [0x101010u64],
                "access_sites_truncated": false
            }
        ],
        "blocks": [
            { "block_id": 0, "start_va": 0x101000u64, "end_va": 0x101040u64, "succ_va": [] }
        ],
        "calls": [
            {
                "callsite_va": 0x101020u64,
                "call_kind": "DIRECT",
                "callee_entry_va": 0x101050u64,
                "callee_name": "add",
                "is_external_target": false,
                "is_import_proxy_target": false
            }
        ]
    });
    let thunk_record = serde_json::json!({
        "_type": "function",
        "entry_va": 0x100f00u64,
        "name": "printf",
        "namespace": null,
        "is_external_block": false,
        "is_thunk": true,
        "is_import": true,
        "body_start_va": 0x100f00u64,
        "body_end_va": 0x100f10u64,
        "size_bytes": 0x10,
        "section_hint": ".plt.sec",
        "insn_count": 2,
        "c_raw": null,
        "error": "no function body",
        "warnings_raw": [],
        "variables": [],
        "blocks": [],
        "calls": []
    });
    let summary = serde_json::json!({
        "_type": "summary",
        "tool_version": "11.1",
        "program_name": "case",
        "total_functions": 2,
        "decompile_ok": 1,
        "decompile_fail": 1,
        "image_base": 0x100000u64
    });
    format!("{main_record}\nnot json at all\n{thunk_record}\n{summary}\n")
}

#[test]
fn reshape_rebases_and_classifies() {
    let dir = tempdir().expect("tempdir");
    let raw_path = dir.path().join("raw.jsonl");
    fs::write(&raw_path, raw_export()).expect("write raw");

    let out_dir = dir.path().join("decompile");
    let profile = DecompProfile::default();
    let output =
        reshape(&raw_path, "bin/stripped", "hash-stripped", &profile, Some(&out_dir)).unwrap();

    assert_eq!(output.report.image_base, 0x100000);
    assert_eq!(output.functions.len(), 2);

    // Sorted by (rebased) entry VA: thunk first.
    let thunk = &output.functions[0];
    let main = &output.functions[1];
    assert_eq!(thunk.entry_va, 0xf00);
    assert_eq!(main.entry_va, 0x1000);
    assert_eq!(main.body_start_va, Some(0x1000));
    assert_eq!(main.body_end_va, Some(0x1040));

    // Thunk in .plt.sec with no body text: FAIL + noise flags.
    assert!(thunk.is_thunk);
    assert!(thunk.is_plt_or_stub);
    assert!(thunk.is_library_like);
    assert_eq!(thunk.verdict, FunctionVerdict::Fail);

    assert_eq!(main.verdict, FunctionVerdict::Ok);
    assert_eq!(main.cfg_completeness, CfgCompleteness::High);

    // Variables and calls are rebased and attributed.
    assert_eq!(output.variables.len(), 1);
    assert_eq!(output.variables[0].access_sites, vec![0x1010]);
    assert_eq!(output.calls.len(), 1);
    assert_eq!(output.calls[0].callsite_va, 0x1020);
    assert_eq!(output.calls[0].callee_entry_va, Some(0x1050));
    assert_eq!(output.calls[0].call_kind, CallKind::Direct);

    // All five outputs exist, with no stray .tmp files.
    for name in ["report.json", "functions.jsonl", "variables.jsonl", "cfg.jsonl", "calls.jsonl"] {
        assert!(out_dir.join(name).is_file(), "missing {name}");
    }
    let leftovers: Vec<_> = fs::read_dir(&out_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn reshape_is_deterministic_apart_from_timestamp() {
    let dir = tempdir().expect("tempdir");
    let raw_path = dir.path().join("raw.jsonl");
    fs::write(&raw_path, raw_export()).expect("write raw");

    let profile = DecompProfile::default();
    let a_dir = dir.path().join("a");
    let b_dir = dir.path().join("b");
    reshape(&raw_path, "bin", "hash", &profile, Some(&a_dir)).unwrap();
    reshape(&raw_path, "bin", "hash", &profile, Some(&b_dir)).unwrap();

    // JSONL row files carry no timestamp and must be byte-identical.
    for name in ["functions.jsonl", "variables.jsonl", "cfg.jsonl", "calls.jsonl"] {
        let a = fs::read(a_dir.join(name)).unwrap();
        let b = fs::read(b_dir.join(name)).unwrap();
        assert_eq!(a, b, "{name} differs between runs");
    }
}
