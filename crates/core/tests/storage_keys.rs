use reforge_core::decomp::raw::RawVariable;
use reforge_core::decomp::variables::{
    classify_var_kind, compute_access_sig, compute_storage_key, process_variables, VarKind,
};
use reforge_core::model::StorageClass;

#[test]
fn storage_key_shapes() {
    assert_eq!(
        compute_storage_key(StorageClass::Stack, Some(-24), None, None, "local_a"),
        "stack:off:-0x18"
    );
    assert_eq!(
        compute_storage_key(StorageClass::Stack, Some(8), None, None, "arg"),
        "stack:off:+0x8"
    );
    assert_eq!(
        compute_storage_key(StorageClass::Register, None, Some("RDI"), None, "p"),
        "reg:RDI"
    );
    assert_eq!(
        compute_storage_key(StorageClass::Memory, None, None, Some(0x404050), "g"),
        "mem:0x404050"
    );
    assert_eq!(
        compute_storage_key(StorageClass::Unique, None, None, None, "uVar3"),
        "uniq:uVar3"
    );
    assert_eq!(
        compute_storage_key(StorageClass::Unknown, None, None, None, "mystery"),
        "unk:mystery"
    );
}

#[test]
fn var_kind_classification() {
    assert_eq!(classify_var_kind(true, StorageClass::Stack, "a", None), VarKind::Param);
    assert_eq!(
        classify_var_kind(false, StorageClass::Memory, "g", Some(0x404050)),
        VarKind::GlobalRef
    );
    assert_eq!(classify_var_kind(false, StorageClass::Unique, "t", None), VarKind::Temp);
    assert_eq!(classify_var_kind(false, StorageClass::Stack, "uVar1", None), VarKind::Temp);
    assert_eq!(classify_var_kind(false, StorageClass::Stack, "uVarX", None), VarKind::Local);
    assert_eq!(classify_var_kind(false, StorageClass::Stack, "count", None), VarKind::Local);
}

#[test]
fn access_sig_ignores_site_order() {
    let a = compute_access_sig(&[0x30, 0x10, 0x20], "stack:off:-0x8");
    let b = compute_access_sig(&[0x10, 0x20, 0x30], "stack:off:-0x8");
    assert_eq!(a, b);
    assert_eq!(a.len(), 16);
}

#[test]
fn access_sig_falls_back_to_storage_key() {
    let no_sites = compute_access_sig(&[], "reg:RAX");
    let other_key = compute_access_sig(&[], "reg:RBX");
    assert_ne!(no_sites, other_key);
}

fn raw_var(name: &str, storage_class: &str, stack_offset: Option<i64>) -> RawVariable {
    RawVariable {
        name: name.to_string(),
        is_param: false,
        size_bytes: 4,
        type_str: Some("int".to_string()),
        storage_class: storage_class.to_string(),
        stack_offset,
        register_name: None,
        addr_va: None,
        access_sites: vec![0x1010, 0x1004],
        access_sites_truncated: false,
    }
}

#[test]
fn process_variables_sorts_by_kind_then_key() {
    let raw = vec![
        raw_var("z_local", "STACK", Some(-8)),
        raw_var("uVar1", "UNIQUE", None),
        raw_var("a_local", "STACK", Some(-32)),
    ];
    let rows = process_variables(&raw, "func:0x1000", 0x1000, "bin-hash");

    // LOCAL < TEMP lexically; within LOCAL, storage keys sort.
    assert_eq!(rows[0].var_kind, VarKind::Local);
    assert_eq!(rows[1].var_kind, VarKind::Local);
    assert_eq!(rows[2].var_kind, VarKind::Temp);
    assert!(rows[0].storage_key < rows[1].storage_key);

    for row in &rows {
        assert_eq!(row.binary_id, "bin-hash");
        assert!(row.var_id.starts_with("func:0x1000:"));
        // Access sites come out sorted.
        assert_eq!(row.access_sites, vec![0x1004, 0x1010]);
    }
}

#[test]
fn temp_singleton_flag_set_for_unique_temps() {
    let raw = vec![raw_var("uVar2", "UNIQUE", None)];
    let rows = process_variables(&raw, "f", 0, "b");
    assert!(rows[0].is_temp_singleton);
}
