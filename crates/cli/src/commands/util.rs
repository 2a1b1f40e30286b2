//! Shared command plumbing: layout resolution, input loading, DB access.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use reforge_core::builder::receipt::BuildReceipt;
use reforge_core::db::ProjectDb;
use reforge_core::layout::CaseLayout;
use reforge_core::model::{OptLevel, Variant};

/// Meta directory beneath the artifact root.
pub const META_DIR: &str = ".reforge";

/// Open (or create) the project database under `root`.
pub fn open_project_db(root: &Path) -> Result<ProjectDb> {
    let meta_dir = root.join(META_DIR);
    fs::create_dir_all(&meta_dir)
        .with_context(|| format!("Failed to create {}", meta_dir.display()))?;
    let db_path = meta_dir.join("reforge.db");
    ProjectDb::open(&db_path)
        .with_context(|| format!("Failed to open project DB at {}", db_path.display()))
}

/// Resolve the case layout for `name` under `root`.
pub fn case_layout(root: &Path, name: &str) -> CaseLayout {
    CaseLayout::new(root, name)
}

/// Load and parse the case's build receipt.
pub fn load_receipt(layout: &CaseLayout) -> Result<BuildReceipt> {
    let body = fs::read_to_string(&layout.receipt_path)
        .with_context(|| format!("Failed to read {}", layout.receipt_path.display()))?;
    serde_json::from_str(&body)
        .with_context(|| format!("Failed to parse {}", layout.receipt_path.display()))
}

/// Resolve the on-disk path of a cell's artifact through the receipt.
pub fn artifact_path(
    layout: &CaseLayout,
    receipt: &BuildReceipt,
    opt: OptLevel,
    variant: Variant,
) -> Result<PathBuf> {
    let artifact = receipt.artifact_for(opt, variant).ok_or_else(|| {
        anyhow!("receipt has no artifact for {} {}", opt.as_str(), variant.as_str())
    })?;
    Ok(layout.case_dir.join(&artifact.path_rel))
}

/// Parse an optimization-level argument.
pub fn parse_opt(opt: &str) -> Result<OptLevel> {
    OptLevel::parse(opt).ok_or_else(|| anyhow!("unknown optimization level: {opt} (expected O0..O3)"))
}

/// Load a JSON file into a deserializable value.
pub fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&body).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load a JSONL file into a vector of deserializable records.
pub fn load_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut out = Vec::new();
    for (idx, line) in body.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(line).with_context(|| {
            format!("Failed to parse line {} of {}", idx + 1, path.display())
        })?;
        out.push(record);
    }
    Ok(out)
}

/// Collect the case's preprocessed `.i` paths in sorted order.
pub fn collect_i_paths(layout: &CaseLayout) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    if !layout.preprocess_dir.is_dir() {
        return Ok(paths);
    }
    for entry in fs::read_dir(&layout.preprocess_dir)
        .with_context(|| format!("Failed to read {}", layout.preprocess_dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("i") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Print a value as pretty JSON to stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
