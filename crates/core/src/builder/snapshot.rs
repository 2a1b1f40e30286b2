//! Source snapshot: validated, ordered, content-addressed input files.

use std::path::Path;

use thiserror::Error;

use crate::builder::receipt::{FileRole, SourceFile, SourceIdentity};
use crate::util::sha256_bytes;

/// Error type for snapshot construction.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot contains no .c compilation units")]
    NoCompilationUnits,

    #[error("duplicate snapshot path: {0}")]
    DuplicatePath(String),

    #[error("snapshot path escapes the snapshot root: {0}")]
    UnsafePath(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One file queued for the snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotInput {
    pub path_rel: String,
    pub bytes: Vec<u8>,
}

/// An immutable, validated source snapshot.
///
/// Files keep their submission order; the snapshot hash is computed over
/// the path-sorted sequence of `(path, content)` so it is independent of
/// that order.
#[derive(Debug, Clone)]
pub struct SourceSnapshot {
    pub files: Vec<SnapshotInput>,
    pub identity: SourceIdentity,
}

fn role_for(path_rel: &str) -> FileRole {
    if path_rel.ends_with(".c") {
        FileRole::CUnit
    } else if path_rel.ends_with(".h") {
        FileRole::Header
    } else {
        FileRole::Other
    }
}

fn is_safe_relative(path_rel: &str) -> bool {
    let p = Path::new(path_rel);
    !p.is_absolute()
        && p.components().all(|c| matches!(c, std::path::Component::Normal(_)))
}

/// Deterministic hash over all snapshot files: sorted by relative path,
/// then `path + content` per file.
fn snapshot_hash(files: &[SnapshotInput]) -> String {
    use sha2::{Digest, Sha256};
    let mut sorted: Vec<&SnapshotInput> = files.iter().collect();
    sorted.sort_by(|a, b| a.path_rel.cmp(&b.path_rel));

    let mut hasher = Sha256::new();
    for f in sorted {
        hasher.update(f.path_rel.as_bytes());
        hasher.update(&f.bytes);
    }
    format!("{:x}", hasher.finalize())
}

impl SourceSnapshot {
    /// Validate inputs and build the snapshot identity.
    pub fn new(files: Vec<SnapshotInput>) -> Result<Self, SnapshotError> {
        let mut seen = std::collections::BTreeSet::new();
        for f in &files {
            if !is_safe_relative(&f.path_rel) {
                return Err(SnapshotError::UnsafePath(f.path_rel.clone()));
            }
            if !seen.insert(f.path_rel.clone()) {
                return Err(SnapshotError::DuplicatePath(f.path_rel.clone()));
            }
        }

        let entry_c_files: Vec<String> = files
            .iter()
            .filter(|f| role_for(&f.path_rel) == FileRole::CUnit)
            .map(|f| f.path_rel.clone())
            .collect();
        if entry_c_files.is_empty() {
            return Err(SnapshotError::NoCompilationUnits);
        }

        let source_files: Vec<SourceFile> = files
            .iter()
            .map(|f| SourceFile {
                path_rel: f.path_rel.clone(),
                sha256: sha256_bytes(&f.bytes),
                size_bytes: f.bytes.len() as u64,
                role: role_for(&f.path_rel),
            })
            .collect();

        let entry_type =
            if entry_c_files.len() == 1 { "single_file" } else { "multi_file" }.to_string();

        let identity = SourceIdentity {
            kind: "synthetic_local_files".to_string(),
            entry_type,
            entry_c_files,
            files: source_files,
            snapshot_sha256: snapshot_hash(&files),
            language: "c".to_string(),
        };

        Ok(Self { files, identity })
    }

    /// Read a snapshot from files already on disk under `dir`.
    ///
    /// Collects `.c` and `.h` files (and nothing else) in sorted order.
    pub fn from_dir(dir: &Path) -> Result<Self, SnapshotError> {
        let mut inputs = Vec::new();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| SnapshotError::Io { path: dir.display().to_string(), source: e })?;
        let mut paths: Vec<std::path::PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| SnapshotError::Io { path: dir.display().to_string(), source: e })?;
            let path = entry.path();
            if path.is_file() {
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
                if matches!(ext, "c" | "h") {
                    paths.push(path);
                }
            }
        }
        paths.sort();

        for path in paths {
            let bytes = std::fs::read(&path)
                .map_err(|e| SnapshotError::Io { path: path.display().to_string(), source: e })?;
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            inputs.push(SnapshotInput { path_rel: name, bytes });
        }

        Self::new(inputs)
    }

    /// Write snapshot files beneath `dir`, creating directories as needed.
    pub fn write_to(&self, dir: &Path) -> Result<(), SnapshotError> {
        for f in &self.files {
            let target = dir.join(&f.path_rel);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| SnapshotError::Io {
                    path: parent.display().to_string(),
                    source: e,
                })?;
            }
            std::fs::write(&target, &f.bytes).map_err(|e| SnapshotError::Io {
                path: target.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Translation-unit stems in snapshot order (file name without `.c`).
    pub fn tu_stems(&self) -> Vec<String> {
        self.identity
            .entry_c_files
            .iter()
            .map(|p| {
                Path::new(p)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or(p.as_str())
                    .to_string()
            })
            .collect()
    }
}
