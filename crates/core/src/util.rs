//! Shared helpers: hashing, atomic JSON writes, timestamps.
//!
//! Every report writer in this crate goes through [`write_json_atomic`] so
//! that a crashed or cancelled stage never leaves a partially-written file
//! behind: output is staged to a `.tmp` sibling and renamed into place.

use std::fs;
use std::io::Read;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Error type for filesystem/serialization helpers.
#[derive(Debug, Error)]
pub enum UtilError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type for helpers in this module.
pub type UtilResult<T> = Result<T, UtilError>;

fn io_err(path: &Path, source: std::io::Error) -> UtilError {
    UtilError::Io { path: path.display().to_string(), source }
}

/// SHA-256 of a byte slice as lowercase hex.
pub fn sha256_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// SHA-256 of a file's content as lowercase hex, read in chunks.
pub fn sha256_file(path: &Path) -> UtilResult<String> {
    let file = fs::File::open(path).map_err(|e| io_err(path, e))?;
    let mut reader = std::io::BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];

    loop {
        let n = reader.read(&mut buf).map_err(|e| io_err(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Serialize `value` as pretty JSON and write it atomically to `path`.
///
/// The content is staged at `<path>.tmp` and renamed into place, so readers
/// either see the previous file or the complete new one. The parent
/// directory is created if missing.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> UtilResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, body).map_err(|e| io_err(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

/// Write newline-delimited JSON records atomically to `path`.
///
/// One record per line, staged and renamed like [`write_json_atomic`].
pub fn write_jsonl_atomic<T: Serialize>(path: &Path, records: &[T]) -> UtilResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let mut body = String::new();
    for record in records {
        body.push_str(&serde_json::to_string(record)?);
        body.push('\n');
    }

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, body).map_err(|e| io_err(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

/// Current UTC time as an RFC 3339 string.
///
/// This is the single permitted nondeterministic field in reports.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
