//! Function index: enumerate subprogram DIEs and normalize code ranges.
//!
//! Walks the DIE tree of each compilation unit, collects
//! `DW_TAG_subprogram` entries, materializes their `[low, high)` segments
//! (single range or range list, base-address selection handled by gimli),
//! and assigns the stable id `cu{0x..}:die{0x..}`.

use gimli::{EndianSlice, RunTimeEndian};

use crate::dwarf::ranges::{normalize_ranges, AddressRange};

pub type Reader<'a> = EndianSlice<'a, RunTimeEndian>;

/// A single subprogram candidate extracted from DWARF.
#[derive(Debug, Clone)]
pub struct FunctionEntry {
    /// Stable key: `cu0x..:die0x..`.
    pub function_id: String,
    pub cu_offset: usize,
    pub die_offset: usize,

    pub name: Option<String>,
    pub linkage_name: Option<String>,

    /// Normalized, sorted, non-overlapping segments.
    pub ranges: Vec<AddressRange>,

    pub is_declaration: bool,
    pub is_external: bool,

    /// Raw DW_AT_decl_file index (before resolution against the CU file
    /// table).
    pub decl_file_index: Option<u64>,
    pub decl_line: Option<u64>,
    pub decl_column: Option<u64>,
}

fn attr_string(
    dwarf: &gimli::Dwarf<Reader<'_>>,
    unit: &gimli::Unit<Reader<'_>>,
    value: gimli::AttributeValue<Reader<'_>>,
) -> Option<String> {
    dwarf.attr_string(unit, value).ok().map(|s| s.to_string_lossy().into_owned())
}

fn attr_flag(value: gimli::AttributeValue<Reader<'_>>) -> bool {
    match value {
        gimli::AttributeValue::Flag(b) => b,
        _ => false,
    }
}

/// Enumerate all `DW_TAG_subprogram` DIEs in `unit`.
///
/// Declaration-only subprograms are still recorded (with empty ranges) so
/// policy can emit a proper `DECLARATION_ONLY` verdict downstream.
pub fn index_functions(
    dwarf: &gimli::Dwarf<Reader<'_>>,
    unit: &gimli::Unit<Reader<'_>>,
    cu_offset: usize,
) -> Result<Vec<FunctionEntry>, gimli::Error> {
    let mut entries: Vec<FunctionEntry> = Vec::new();

    let mut cursor = unit.entries();
    while let Some((_depth, die)) = cursor.next_dfs()? {
        if die.tag() != gimli::DW_TAG_subprogram {
            continue;
        }

        let die_offset = die
            .offset()
            .to_debug_info_offset(&unit.header)
            .map(|o| o.0)
            .unwrap_or(die.offset().0);

        let is_declaration =
            die.attr_value(gimli::DW_AT_declaration)?.map(attr_flag).unwrap_or(false);
        let is_external = die.attr_value(gimli::DW_AT_external)?.map(attr_flag).unwrap_or(false);

        let name = match die.attr_value(gimli::DW_AT_name)? {
            Some(v) => attr_string(dwarf, unit, v),
            None => None,
        };
        let linkage_name = match die.attr_value(gimli::DW_AT_linkage_name)? {
            Some(v) => attr_string(dwarf, unit, v),
            None => match die.attr_value(gimli::DW_AT_MIPS_linkage_name)? {
                Some(v) => attr_string(dwarf, unit, v),
                None => None,
            },
        };

        let decl_file_index =
            die.attr_value(gimli::DW_AT_decl_file)?.and_then(|v| v.udata_value());
        let decl_line = die.attr_value(gimli::DW_AT_decl_line)?.and_then(|v| v.udata_value());
        let decl_column = die.attr_value(gimli::DW_AT_decl_column)?.and_then(|v| v.udata_value());

        // die_ranges covers both low_pc/high_pc and DW_AT_ranges encodings.
        let ranges = if is_declaration {
            Vec::new()
        } else {
            let mut raw: Vec<AddressRange> = Vec::new();
            let mut iter = dwarf.die_ranges(unit, die)?;
            while let Some(range) = iter.next()? {
                if range.end > range.begin {
                    raw.push(AddressRange { low: range.begin, high: range.end });
                }
            }
            normalize_ranges(&raw)
        };

        entries.push(FunctionEntry {
            function_id: format!("cu{cu_offset:#x}:die{die_offset:#x}"),
            cu_offset,
            die_offset,
            name,
            linkage_name,
            ranges,
            is_declaration,
            is_external,
            decl_file_index,
            decl_line,
            decl_column,
        });
    }

    Ok(entries)
}
