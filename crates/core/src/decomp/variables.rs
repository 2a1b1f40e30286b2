//! Variable processing: identity, storage keys, access signatures.
//!
//! Pure transformations, no IO.

use serde::{Deserialize, Serialize};

use crate::decomp::raw::RawVariable;
use crate::model::StorageClass;
use crate::util::sha256_bytes;

/// Decompiler temporary naming convention (uVar1, iVar2, ...).
const TEMP_PREFIXES: &[&str] = &[
    "ppVar", "auVar", "abVar", "aiVar", "uVar", "iVar", "bVar", "cVar", "lVar", "sVar", "fVar",
    "dVar", "pVar",
];

fn is_temp_name(name: &str) -> bool {
    TEMP_PREFIXES.iter().any(|prefix| {
        name.strip_prefix(prefix)
            .map(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
            .unwrap_or(false)
    })
}

/// Variable kind in the output schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VarKind {
    Param,
    Local,
    GlobalRef,
    Temp,
}

impl VarKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VarKind::Param => "PARAM",
            VarKind::Local => "LOCAL",
            VarKind::GlobalRef => "GLOBAL_REF",
            VarKind::Temp => "TEMP",
        }
    }
}

/// Classify a variable into PARAM | LOCAL | GLOBAL_REF | TEMP.
pub fn classify_var_kind(
    is_param: bool,
    storage_class: StorageClass,
    name: &str,
    addr_va: Option<u64>,
) -> VarKind {
    if is_param {
        return VarKind::Param;
    }
    if storage_class == StorageClass::Memory && addr_va.is_some() {
        return VarKind::GlobalRef;
    }
    if storage_class == StorageClass::Unique || is_temp_name(name) {
        return VarKind::Temp;
    }
    VarKind::Local
}

/// Deterministic storage key for a variable.
///
/// STACK: `stack:off:{sign}0x{abs_offset:x}`; REGISTER: `reg:{name}`;
/// MEMORY: `mem:0x{addr:x}`; UNIQUE: `uniq:{name}`; fallback `unk:{name}`.
pub fn compute_storage_key(
    storage_class: StorageClass,
    stack_offset: Option<i64>,
    register_name: Option<&str>,
    addr_va: Option<u64>,
    name: &str,
) -> String {
    match (storage_class, stack_offset, register_name, addr_va) {
        (StorageClass::Stack, Some(off), _, _) => {
            let sign = if off >= 0 { '+' } else { '-' };
            format!("stack:off:{sign}0x{:x}", off.unsigned_abs())
        }
        (StorageClass::Register, _, Some(reg), _) if !reg.is_empty() => format!("reg:{reg}"),
        (StorageClass::Memory, _, _, Some(addr)) => format!("mem:0x{addr:x}"),
        (StorageClass::Unique, _, _, _) => format!("uniq:{name}"),
        _ => format!("unk:{name}"),
    }
}

/// Stable access signature: first 16 hex chars of sha256 over the sorted
/// access sites, falling back to the storage key when no sites exist.
pub fn compute_access_sig(access_sites: &[u64], storage_key: &str) -> String {
    let data = if access_sites.is_empty() {
        storage_key.to_string()
    } else {
        let mut sorted = access_sites.to_vec();
        sorted.sort_unstable();
        sorted.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(",")
    };
    sha256_bytes(data.as_bytes())[..16].to_string()
}

/// Temp-singleton heuristic: decompiler temporaries named like temps in
/// UNIQUE storage, or anything already classified TEMP.
pub fn is_temp_singleton(name: &str, var_kind: VarKind, storage_class: StorageClass) -> bool {
    var_kind == VarKind::Temp || (is_temp_name(name) && storage_class == StorageClass::Unique)
}

/// One output-ready variable row (`variables.jsonl`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableRow {
    pub binary_id: String,
    pub function_id: String,
    pub entry_va: u64,
    /// `{function_id}:{var_kind}:{storage_key}:{access_sig}`.
    pub var_id: String,
    pub var_kind: VarKind,
    pub name: String,
    pub type_str: Option<String>,
    pub size_bytes: Option<u64>,
    pub storage_class: StorageClass,
    pub storage_key: String,
    pub stack_offset: Option<i64>,
    pub register_name: Option<String>,
    pub addr_va: Option<u64>,
    pub is_temp_singleton: bool,
    pub access_sites: Vec<u64>,
    pub access_sites_truncated: bool,
    pub access_sig: String,
}

/// Process raw variables into output rows sorted by (kind, storage key).
pub fn process_variables(
    raw_vars: &[RawVariable],
    function_id: &str,
    entry_va: u64,
    binary_id: &str,
) -> Vec<VariableRow> {
    let mut rows: Vec<VariableRow> = raw_vars
        .iter()
        .map(|rv| {
            let storage_class = StorageClass::parse(&rv.storage_class);
            let var_kind =
                classify_var_kind(rv.is_param, storage_class, &rv.name, rv.addr_va);
            let storage_key = compute_storage_key(
                storage_class,
                rv.stack_offset,
                rv.register_name.as_deref(),
                rv.addr_va,
                &rv.name,
            );
            let access_sig = compute_access_sig(&rv.access_sites, &storage_key);
            let var_id =
                format!("{function_id}:{}:{storage_key}:{access_sig}", var_kind.as_str());

            let mut access_sites = rv.access_sites.clone();
            access_sites.sort_unstable();

            VariableRow {
                binary_id: binary_id.to_string(),
                function_id: function_id.to_string(),
                entry_va,
                var_id,
                var_kind,
                name: rv.name.clone(),
                type_str: rv.type_str.clone(),
                size_bytes: if rv.size_bytes > 0 { Some(rv.size_bytes) } else { None },
                storage_class,
                storage_key,
                stack_offset: rv.stack_offset,
                register_name: rv.register_name.clone(),
                addr_va: rv.addr_va,
                is_temp_singleton: is_temp_singleton(&rv.name, var_kind, storage_class),
                access_sites,
                access_sites_truncated: rv.access_sites_truncated,
                access_sig,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        a.var_kind.as_str().cmp(b.var_kind.as_str()).then(a.storage_key.cmp(&b.storage_key))
    });
    rows
}
