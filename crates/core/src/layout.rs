//! On-disk layout of a synthetic test-case directory.
//!
//! Layout convention:
//!
//! ```text
//! <root>/<name>/
//!   build_receipt.json
//!   src/...                       (source snapshot)
//!   preprocess/<stem>.i + logs/
//!   <opt>/<variant>/obj,bin,logs  (O0..O3 x debug|release|stripped)
//!   <opt>/debug/oracle/
//!   oracle_ts/
//!   <opt>/debug/join_dwarf_ts/
//!   <opt>/stripped/decompile/
//!   <opt>/stripped/join_oracles_decompile/
//! ```

use std::path::{Path, PathBuf};

use crate::model::{OptLevel, Variant};

/// Logical layout of a test case on disk.
///
/// This is derived from an artifact root and a case name. It does *not*
/// perform any IO itself. Stage runners and the CLI are responsible for
/// actually creating directories and files based on this layout.
#[derive(Debug, Clone)]
pub struct CaseLayout {
    /// Directory holding this test case's entire artifact tree.
    pub case_dir: PathBuf,
    /// Path to the single authoritative build receipt.
    pub receipt_path: PathBuf,
    /// Directory holding the immutable source snapshot.
    pub src_dir: PathBuf,
    /// Directory holding preprocessed `.i` translation units.
    pub preprocess_dir: PathBuf,
    /// Logs for the preprocess phase.
    pub preprocess_logs_dir: PathBuf,
    /// Directory for tree-sitter oracle outputs (optimization-independent).
    pub oracle_ts_dir: PathBuf,
}

impl CaseLayout {
    /// Compute the layout for `name` under `root`.
    ///
    /// This does *not* touch the filesystem.
    pub fn new(root: impl AsRef<Path>, name: &str) -> Self {
        let case_dir = root.as_ref().join(name);
        let receipt_path = case_dir.join("build_receipt.json");
        let src_dir = case_dir.join("src");
        let preprocess_dir = case_dir.join("preprocess");
        let preprocess_logs_dir = preprocess_dir.join("logs");
        let oracle_ts_dir = case_dir.join("oracle_ts");

        Self { case_dir, receipt_path, src_dir, preprocess_dir, preprocess_logs_dir, oracle_ts_dir }
    }

    /// Directory for one `(optimization, variant)` build cell.
    pub fn cell_dir(&self, opt: OptLevel, variant: Variant) -> PathBuf {
        self.case_dir.join(opt.as_str()).join(variant.as_str())
    }

    /// Object-file directory for a cell.
    pub fn obj_dir(&self, opt: OptLevel, variant: Variant) -> PathBuf {
        self.cell_dir(opt, variant).join("obj")
    }

    /// Directory holding the linked binary for a cell.
    pub fn bin_dir(&self, opt: OptLevel, variant: Variant) -> PathBuf {
        self.cell_dir(opt, variant).join("bin")
    }

    /// Path of the linked binary for a cell (named after the case).
    pub fn binary_path(&self, opt: OptLevel, variant: Variant, name: &str) -> PathBuf {
        self.bin_dir(opt, variant).join(name)
    }

    /// Log directory for a cell's compile/link/strip output.
    pub fn cell_logs_dir(&self, opt: OptLevel, variant: Variant) -> PathBuf {
        self.cell_dir(opt, variant).join("logs")
    }

    /// DWARF oracle output directory (debug variant only).
    pub fn oracle_dir(&self, opt: OptLevel) -> PathBuf {
        self.cell_dir(opt, Variant::Debug).join("oracle")
    }

    /// DWARF/tree-sitter alignment output directory (debug variant only).
    pub fn join_dwarf_ts_dir(&self, opt: OptLevel) -> PathBuf {
        self.cell_dir(opt, Variant::Debug).join("join_dwarf_ts")
    }

    /// Decompiler reshape output directory (stripped variant only).
    pub fn decompile_dir(&self, opt: OptLevel) -> PathBuf {
        self.cell_dir(opt, Variant::Stripped).join("decompile")
    }

    /// Oracle-to-decompiler join output directory (stripped variant only).
    pub fn join_decompile_dir(&self, opt: OptLevel) -> PathBuf {
        self.cell_dir(opt, Variant::Stripped).join("join_oracles_decompile")
    }

    /// Preprocessed `.i` path for a translation unit stem.
    pub fn i_path(&self, stem: &str) -> PathBuf {
        self.preprocess_dir.join(format!("{stem}.i"))
    }
}
