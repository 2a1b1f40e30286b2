//! Project database integration.
//!
//! This module wraps a SQLite database storing:
//! - Synthetic test cases (`synthetic_code`) keyed by name.
//! - Produced binaries (`binaries`) keyed by content hash.
//!
//! The database is bookkeeping only; the on-disk artifact tree and the JSON
//! receipts remain the source of truth for provenance. Exactly one binary
//! row exists per produced artifact; re-registering the same hash is a
//! no-op.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::model::{OptLevel, Variant};

/// Minimum schema version we know how to handle.
///
/// `0` means "no schema yet" (fresh DB).
const MIN_SUPPORTED_SCHEMA_VERSION: i32 = 0;

/// Latest schema version this crate knows about.
const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Error type for project database operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Underlying SQLite error.
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The database was created with a newer schema version than we support.
    ///
    /// This is intentionally explicit so callers can surface a clear message
    /// instead of silently clobbering or misinterpreting data.
    #[error(
        "Unsupported schema version {found}; supported range is {min_supported}..={max_supported}"
    )]
    UnsupportedSchemaVersion { found: i32, min_supported: i32, max_supported: i32 },
}

/// Convenience result type for DB operations.
pub type DbResult<T> = Result<T, DbError>;

/// Record describing a synthetic test case known to the project.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct SyntheticCodeRecord {
    /// Unique test-case name (e.g. `t04_static_collision`).
    pub name: String,
    /// Deterministic hash over the normalized source snapshot.
    pub snapshot_sha256: String,
    /// Relative paths of the snapshot files, in snapshot order.
    pub source_files: Vec<String>,
    /// Category tag supplied at submission (arrays, loops, goto, ...).
    pub test_category: String,
    /// Job status: BUILDING, SUCCESS, PARTIAL, FAILED.
    pub status: String,
}

/// Record describing one produced binary artifact.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct BinaryRecord {
    /// Content hash; primary provenance key across all stages.
    pub file_hash: String,
    /// Owning synthetic_code row id.
    pub synthetic_code_id: i64,
    /// Path of the artifact, relative to the artifact root if possible.
    pub file_path: String,
    pub file_size: u64,
    pub optimization_level: OptLevel,
    pub variant_type: Variant,
    pub has_debug_info: bool,
    pub is_stripped: bool,
    /// ELF header type, e.g. "ET_DYN".
    pub elf_type: String,
    /// ELF machine, e.g. "EM_X86_64".
    pub elf_machine: String,
    /// GNU build-id hex, if present.
    pub build_id: Option<String>,
}

/// SQLite-backed project database.
///
/// This is a thin wrapper around `rusqlite::Connection` that is responsible
/// for:
/// - Opening/creating the DB file.
/// - Applying schema migrations.
/// - Providing small, testable helpers for querying and updating records.
pub struct ProjectDb {
    conn: Connection,
}

impl ProjectDb {
    /// Open (or create) a project database at the given path and ensure the
    /// schema exists.
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (tests).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Expose a reference to the underlying connection for advanced callers.
    /// For most code, prefer higher-level helpers.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Insert or update a synthetic_code record, returning its row id.
    ///
    /// Re-submission of the same name replaces snapshot hash, file list,
    /// category, and status.
    pub fn upsert_synthetic_code(&self, record: &SyntheticCodeRecord) -> DbResult<i64> {
        let files_json = serde_json::to_string(&record.source_files)
            .unwrap_or_else(|_| "[]".to_string());
        self.conn.execute(
            r#"
            INSERT INTO synthetic_code (name, snapshot_sha256, source_files, test_category, status)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (name) DO UPDATE SET
                snapshot_sha256 = excluded.snapshot_sha256,
                source_files = excluded.source_files,
                test_category = excluded.test_category,
                status = excluded.status
            "#,
            params![
                record.name,
                record.snapshot_sha256,
                files_json,
                record.test_category,
                record.status
            ],
        )?;
        let id: i64 = self.conn.query_row(
            "SELECT id FROM synthetic_code WHERE name = ?1",
            params![record.name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Look up a synthetic_code row id by name.
    pub fn synthetic_code_id(&self, name: &str) -> DbResult<Option<i64>> {
        let id = self
            .conn
            .query_row("SELECT id FROM synthetic_code WHERE name = ?1", params![name], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(id)
    }

    /// Update the job status of a synthetic_code row.
    pub fn set_synthetic_status(&self, name: &str, status: &str) -> DbResult<()> {
        self.conn.execute(
            "UPDATE synthetic_code SET status = ?2 WHERE name = ?1",
            params![name, status],
        )?;
        Ok(())
    }

    /// List all synthetic_code records (ordered by name).
    pub fn list_synthetic_code(&self) -> DbResult<Vec<SyntheticCodeRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT name, snapshot_sha256, source_files, test_category, status
            FROM synthetic_code
            ORDER BY name
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            let files_json: String = row.get(2)?;
            Ok(SyntheticCodeRecord {
                name: row.get(0)?,
                snapshot_sha256: row.get(1)?,
                source_files: serde_json::from_str(&files_json).unwrap_or_default(),
                test_category: row.get(3)?,
                status: row.get(4)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Insert a binary record, returning true if a new row was created.
    ///
    /// A row with the same `file_hash` already present leaves the table
    /// unchanged (one row per artifact, keyed by content).
    pub fn insert_binary(&self, record: &BinaryRecord) -> DbResult<bool> {
        let changed = self.conn.execute(
            r#"
            INSERT INTO binaries (
                file_hash, synthetic_code_id, file_path, file_size,
                optimization_level, variant_type, has_debug_info, is_stripped,
                elf_type, elf_machine, build_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT (file_hash) DO NOTHING
            "#,
            params![
                record.file_hash,
                record.synthetic_code_id,
                record.file_path,
                record.file_size as i64,
                record.optimization_level.as_str(),
                record.variant_type.as_str(),
                record.has_debug_info,
                record.is_stripped,
                record.elf_type,
                record.elf_machine,
                record.build_id,
            ],
        )?;
        Ok(changed > 0)
    }

    /// List binaries, optionally filtered by synthetic_code id.
    pub fn list_binaries(&self, synthetic_code_id: Option<i64>) -> DbResult<Vec<BinaryRecord>> {
        fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BinaryRecord> {
            let opt_str: String = row.get(4)?;
            let variant_str: String = row.get(5)?;
            let size: i64 = row.get(3)?;
            Ok(BinaryRecord {
                file_hash: row.get(0)?,
                synthetic_code_id: row.get(1)?,
                file_path: row.get(2)?,
                file_size: size as u64,
                optimization_level: OptLevel::parse(&opt_str).unwrap_or(OptLevel::O0),
                variant_type: Variant::parse(&variant_str).unwrap_or(Variant::Debug),
                has_debug_info: row.get(6)?,
                is_stripped: row.get(7)?,
                elf_type: row.get(8)?,
                elf_machine: row.get(9)?,
                build_id: row.get(10)?,
            })
        }

        const COLS: &str = "file_hash, synthetic_code_id, file_path, file_size, \
             optimization_level, variant_type, has_debug_info, is_stripped, \
             elf_type, elf_machine, build_id";

        let mut out = Vec::new();
        if let Some(id) = synthetic_code_id {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {COLS} FROM binaries WHERE synthetic_code_id = ?1 ORDER BY file_hash"
            ))?;
            let rows = stmt.query_map(params![id], map_row)?;
            for row in rows {
                out.push(row?);
            }
        } else {
            let mut stmt = self
                .conn
                .prepare(&format!("SELECT {COLS} FROM binaries ORDER BY file_hash"))?;
            let rows = stmt.query_map([], map_row)?;
            for row in rows {
                out.push(row?);
            }
        }
        Ok(out)
    }

    /// Look up a binary record by its content hash.
    pub fn binary_by_hash(&self, file_hash: &str) -> DbResult<Option<BinaryRecord>> {
        let mut all = self.list_binaries(None)?;
        all.retain(|b| b.file_hash == file_hash);
        Ok(all.into_iter().next())
    }
}

/// Apply schema migrations to bring the database to the latest version.
///
/// We use `PRAGMA user_version` as the schema version indicator.
///
/// Version map:
/// - 0: no schema
/// - 1: initial schema (synthetic_code, binaries)
fn apply_migrations(conn: &Connection) -> DbResult<()> {
    let current_version = current_schema_version(conn)?;

    // Reject DBs created with a newer schema than we support.
    if current_version > CURRENT_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            found: current_version,
            min_supported: MIN_SUPPORTED_SCHEMA_VERSION,
            max_supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if current_version == 0 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS synthetic_code (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL UNIQUE,
                snapshot_sha256 TEXT NOT NULL,
                source_files    TEXT NOT NULL,
                test_category   TEXT NOT NULL,
                status          TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS binaries (
                id                 INTEGER PRIMARY KEY AUTOINCREMENT,
                file_hash          TEXT NOT NULL UNIQUE,
                synthetic_code_id  INTEGER NOT NULL,
                file_path          TEXT NOT NULL,
                file_size          INTEGER NOT NULL,
                optimization_level TEXT NOT NULL,
                variant_type       TEXT NOT NULL,
                has_debug_info     INTEGER NOT NULL,
                is_stripped        INTEGER NOT NULL,
                elf_type           TEXT NOT NULL,
                elf_machine        TEXT NOT NULL,
                build_id           TEXT,
                FOREIGN KEY (synthetic_code_id) REFERENCES synthetic_code(id)
            );

            PRAGMA user_version = 1;
            COMMIT;
            "#,
        )?;
    }

    Ok(())
}

/// Read the SQLite schema version from `PRAGMA user_version`.
fn current_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(version)
}
