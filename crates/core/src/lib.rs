//! reforge-core
//!
//! Core library for the Reforge controlled reverse-engineering pipeline.
//!
//! This crate defines the build matrix executor, the DWARF and tree-sitter
//! oracles, the two join stages (source alignment and address overlap), the
//! decompiler-output reshape, database integration, and the shared report
//! schemas.
//!
//! The goal is to keep all substantive logic here so it is fully testable and
//! reusable from multiple frontends (CLI, service workers, etc.).

pub mod builder;
pub mod db;
pub mod decomp;
pub mod dwarf;
pub mod elf;
pub mod join_decomp;
pub mod join_ts;
pub mod layout;
pub mod model;
pub mod tsoracle;
pub mod util;
pub mod worker;

/// Package name stamped into every report for provenance.
pub const PACKAGE_NAME: &str = "reforge-core";

/// Schema version shared by all JSON outputs.
pub const SCHEMA_VERSION: &str = "v2";

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
