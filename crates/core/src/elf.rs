//! ELF reader: structural metadata for the binary gates.
//!
//! Validates that a file is a valid ELF binary, checks architecture and
//! debug-section presence, and reads the GNU build-id. This module
//! intentionally does *not* parse DWARF data; that is the oracle's job.

use std::fs;
use std::path::Path;

use object::{Object, ObjectSection};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::{self, UtilError};

/// Error type for ELF inspection.
#[derive(Debug, Error)]
pub enum ElfError {
    #[error("binary not found: {0}")]
    NotFound(String),

    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("not a valid object file: {0}")]
    Parse(#[from] object::Error),

    #[error(transparent)]
    Hash(#[from] UtilError),
}

/// Structural metadata extracted from an ELF binary.
///
/// All fields are gate-relevant facts; nothing here requires DWARF parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElfMeta {
    pub path: String,
    pub file_sha256: String,
    pub file_size: u64,

    /// "ET_EXEC", "ET_DYN", or "ET_OTHER".
    pub elf_type: String,
    /// e.g. "EM_X86_64".
    pub machine: String,
    pub is_64: bool,
    /// "little" or "big".
    pub endianness: String,

    pub has_debug_info: bool,
    pub has_debug_line: bool,
    pub has_debug_ranges: bool,
    pub has_debug_str: bool,
    pub debug_section_names: Vec<String>,

    /// GNU build-id as lowercase hex, if present.
    pub build_id: Option<String>,

    /// Split-DWARF indicator: `.dwo` sections or `.gnu_debugaltlink`.
    pub has_split_dwarf: bool,
}

impl ElfMeta {
    /// True if the binary satisfies the pipeline's architecture requirement.
    pub fn is_x86_64_elf(&self) -> bool {
        self.machine == "EM_X86_64" && self.is_64
    }
}

fn machine_name(arch: object::Architecture) -> String {
    match arch {
        object::Architecture::X86_64 => "EM_X86_64".to_string(),
        object::Architecture::I386 => "EM_386".to_string(),
        object::Architecture::Aarch64 => "EM_AARCH64".to_string(),
        object::Architecture::Arm => "EM_ARM".to_string(),
        other => format!("EM_{other:?}").to_uppercase(),
    }
}

fn elf_type_name(kind: object::ObjectKind) -> String {
    match kind {
        object::ObjectKind::Executable => "ET_EXEC".to_string(),
        object::ObjectKind::Dynamic => "ET_DYN".to_string(),
        object::ObjectKind::Relocatable => "ET_REL".to_string(),
        _ => "ET_OTHER".to_string(),
    }
}

/// Open `path` as an ELF file and return structural metadata.
pub fn read_elf(path: &Path) -> Result<ElfMeta, ElfError> {
    if !path.is_file() {
        return Err(ElfError::NotFound(path.display().to_string()));
    }

    let file_sha256 = util::sha256_file(path)?;
    let data = fs::read(path)
        .map_err(|e| ElfError::Io { path: path.display().to_string(), source: e })?;
    let file_size = data.len() as u64;

    let object = object::File::parse(&*data)?;

    let mut section_names: Vec<String> = Vec::new();
    for section in object.sections() {
        if let Ok(name) = section.name() {
            section_names.push(name.to_string());
        }
    }

    let debug_section_names: Vec<String> =
        section_names.iter().filter(|n| n.starts_with(".debug_")).cloned().collect();

    let has_debug_info = section_names.iter().any(|n| n == ".debug_info");
    let has_debug_line = section_names.iter().any(|n| n == ".debug_line");
    let has_debug_ranges =
        section_names.iter().any(|n| n == ".debug_ranges" || n == ".debug_rnglists");
    let has_debug_str = section_names.iter().any(|n| n == ".debug_str");
    let has_split_dwarf =
        section_names.iter().any(|n| n.ends_with(".dwo") || n == ".gnu_debugaltlink");

    let build_id = object
        .build_id()
        .ok()
        .flatten()
        .map(|bytes| bytes.iter().map(|b| format!("{b:02x}")).collect::<String>());

    Ok(ElfMeta {
        path: path.display().to_string(),
        file_sha256,
        file_size,
        elf_type: elf_type_name(object.kind()),
        machine: machine_name(object.architecture()),
        is_64: object.is_64(),
        endianness: if object.is_little_endian() { "little" } else { "big" }.to_string(),
        has_debug_info,
        has_debug_line,
        has_debug_ranges,
        has_debug_str,
        debug_section_names,
        build_id,
        has_split_dwarf,
    })
}

/// Cheap check used by builder post-conditions: does the file parse as an
/// object at all?
pub fn is_object_file(path: &Path) -> bool {
    match fs::read(path) {
        Ok(data) => object::File::parse(&*data).is_ok(),
        Err(_) => false,
    }
}
