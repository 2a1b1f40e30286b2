//! Raw parser for the decompiler's newline-delimited JSON export.
//!
//! One JSON object per line: function records plus a final
//! `_type: "summary"` trailer. Malformed lines are skipped with a warning;
//! unresolvable fields arrive as explicit nulls and stay `None`.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

/// Error type for raw export parsing.
#[derive(Debug, Error)]
pub enum RawParseError {
    #[error("raw decompiler export not found: {0}")]
    NotFound(String),

    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Variable as emitted by the export script.
#[derive(Debug, Clone, Deserialize)]
pub struct RawVariable {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_param: bool,
    #[serde(default)]
    pub size_bytes: u64,
    pub type_str: Option<String>,
    #[serde(default = "default_unknown")]
    pub storage_class: String,
    pub stack_offset: Option<i64>,
    pub register_name: Option<String>,
    pub addr_va: Option<u64>,
    #[serde(default)]
    pub access_sites: Vec<u64>,
    #[serde(default)]
    pub access_sites_truncated: bool,
}

fn default_unknown() -> String {
    "UNKNOWN".to_string()
}

/// Basic block as emitted by the export script.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBlock {
    #[serde(default)]
    pub block_id: u64,
    #[serde(default)]
    pub start_va: u64,
    #[serde(default)]
    pub end_va: u64,
    #[serde(default)]
    pub succ_va: Vec<u64>,
}

/// Callsite as emitted by the export script.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCall {
    #[serde(default)]
    pub callsite_va: u64,
    #[serde(default = "default_direct")]
    pub call_kind: String,
    pub callee_entry_va: Option<u64>,
    pub callee_name: Option<String>,
    #[serde(default)]
    pub is_external_target: bool,
    #[serde(default)]
    pub is_import_proxy_target: bool,
}

fn default_direct() -> String {
    "DIRECT".to_string()
}

/// One function record from the raw JSONL.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFunctionRecord {
    #[serde(default)]
    pub entry_va: u64,
    #[serde(default)]
    pub name: String,
    pub namespace: Option<String>,
    #[serde(default)]
    pub is_external_block: bool,
    #[serde(default)]
    pub is_thunk: bool,
    #[serde(default)]
    pub is_import: bool,
    pub body_start_va: Option<u64>,
    pub body_end_va: Option<u64>,
    pub size_bytes: Option<u64>,
    pub section_hint: Option<String>,
    #[serde(default)]
    pub insn_count: u64,
    pub c_raw: Option<String>,
    pub error: Option<String>,
    #[serde(default)]
    pub warnings_raw: Vec<String>,
    #[serde(default)]
    pub variables: Vec<RawVariable>,
    #[serde(default)]
    pub blocks: Vec<RawBlock>,
    #[serde(default)]
    pub calls: Vec<RawCall>,
}

/// Summary trailer record from the raw JSONL.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSummary {
    #[serde(default = "default_unknown_str")]
    pub tool_version: String,
    #[serde(default)]
    pub program_name: String,
    #[serde(default)]
    pub total_functions: u64,
    #[serde(default)]
    pub decompile_ok: u64,
    #[serde(default)]
    pub decompile_fail: u64,
    /// Loader image base; critical for rebasing PIE binaries.
    pub image_base: Option<u64>,
}

fn default_unknown_str() -> String {
    "unknown".to_string()
}

impl Default for RawSummary {
    fn default() -> Self {
        Self {
            tool_version: "unknown".to_string(),
            program_name: String::new(),
            total_functions: 0,
            decompile_ok: 0,
            decompile_fail: 0,
            image_base: None,
        }
    }
}

#[derive(Deserialize)]
struct TypeProbe {
    #[serde(rename = "_type", default)]
    record_type: Option<String>,
}

/// Parse the raw JSONL export.
///
/// Returns the summary trailer (default if absent) and the function
/// records sorted by `entry_va`.
pub fn parse_raw_jsonl(path: &Path) -> Result<(RawSummary, Vec<RawFunctionRecord>), RawParseError> {
    if !path.is_file() {
        return Err(RawParseError::NotFound(path.display().to_string()));
    }
    let body = std::fs::read_to_string(path)
        .map_err(|e| RawParseError::Io { path: path.display().to_string(), source: e })?;

    let mut summary = RawSummary::default();
    let mut functions: Vec<RawFunctionRecord> = Vec::new();

    for (line_num, line) in body.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let probe: TypeProbe = match serde_json::from_str(trimmed) {
            Ok(p) => p,
            Err(e) => {
                warn!(line = line_num + 1, error = %e, "malformed JSON line in raw export");
                continue;
            }
        };

        match probe.record_type.as_deref().unwrap_or("function") {
            "summary" => match serde_json::from_str(trimmed) {
                Ok(s) => summary = s,
                Err(e) => warn!(line = line_num + 1, error = %e, "malformed summary record"),
            },
            "function" => match serde_json::from_str(trimmed) {
                Ok(f) => functions.push(f),
                Err(e) => warn!(line = line_num + 1, error = %e, "malformed function record"),
            },
            other => {
                warn!(line = line_num + 1, record_type = %other, "unknown record type");
            }
        }
    }

    functions.sort_by_key(|f| f.entry_va);
    Ok((summary, functions))
}
