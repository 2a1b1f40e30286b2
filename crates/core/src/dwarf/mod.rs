//! DWARF oracle: per-function ground truth from the debug ELF.
//!
//! Pipeline per binary:
//! 1. ELF gate (architecture, debug sections, split DWARF).
//! 2. Subprogram enumeration with normalized address ranges.
//! 3. Line-program intersection (table built once per CU).
//! 4. Verdict policy and report assembly.
//!
//! A binary-level REJECT short-circuits function extraction but still
//! produces a report whose verdict encodes the reason.

pub mod functions;
pub mod lines;
pub mod ranges;
pub mod schema;
pub mod verdict;

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::elf;
use crate::model::Verdict;
use crate::util::{self, UtilError};
pub use functions::FunctionEntry;
pub use lines::LineSpan;
pub use ranges::AddressRange;
pub use schema::{OracleFunctionsOutput, OracleReport};
pub use verdict::DwarfProfile;

use functions::Reader;
use schema::{FunctionCounts, LineRowEntry, OracleFunctionEntry, RangeModel};

/// Error type for the oracle runner.
///
/// Parse-level problems never surface here; they become REJECT reports.
/// Only output IO can fail.
#[derive(Debug, Error)]
pub enum DwarfError {
    #[error(transparent)]
    Util(#[from] UtilError),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Decl-file resolution outcomes.
mod decl_missing {
    pub const NO_DECL_FILE_ATTR: &str = "NO_DECL_FILE_ATTR";
    pub const FILE_INDEX_UNRESOLVABLE: &str = "FILE_INDEX_UNRESOLVABLE";
}

/// Run the DWARF oracle on a single binary.
///
/// When `output_dir` is given, `oracle_report.json` and
/// `oracle_functions.json` are written there atomically.
pub fn run_oracle(
    binary_path: &Path,
    profile: &DwarfProfile,
    output_dir: Option<&Path>,
) -> Result<(OracleReport, OracleFunctionsOutput), DwarfError> {
    let path_str = binary_path.display().to_string();

    // Step 1: ELF metadata. Unreadable input is a binary-level REJECT,
    // not an error; the report carries the reason.
    let meta = match elf::read_elf(binary_path) {
        Ok(meta) => meta,
        Err(e) => {
            error!(binary = %path_str, error = %e, "cannot open binary as ELF");
            let mut report = OracleReport::new(&profile.profile_id, &path_str, "");
            report.verdict = Verdict::Reject.as_str().to_string();
            report.reasons = vec![verdict::binary_reason::DWARF_PARSE_ERROR.to_string()];
            let functions = OracleFunctionsOutput::new(&profile.profile_id, &path_str, "");
            write_outputs(&report, &functions, output_dir)?;
            return Ok((report, functions));
        }
    };

    // Step 2: binary gate.
    let (gate_verdict, gate_reasons) = verdict::gate_binary(&meta, profile);
    let mut report = OracleReport::new(&profile.profile_id, &path_str, &meta.file_sha256);
    report.build_id = meta.build_id.clone();
    report.verdict = gate_verdict.as_str().to_string();
    report.reasons = gate_reasons;

    let mut functions =
        OracleFunctionsOutput::new(&profile.profile_id, &path_str, &meta.file_sha256);

    if gate_verdict == Verdict::Reject {
        info!(binary = %path_str, reasons = ?report.reasons, "binary gate REJECT");
        write_outputs(&report, &functions, output_dir)?;
        return Ok((report, functions));
    }

    // Step 3: extraction. Any gimli error collapses to DWARF_PARSE_ERROR.
    match extract_all(binary_path, profile) {
        Ok((entries, counts)) => {
            functions.functions = entries;
            report.function_counts = counts;
        }
        Err(e) => {
            error!(binary = %path_str, error = %e, "DWARF parse error");
            report.verdict = Verdict::Reject.as_str().to_string();
            report.reasons = vec![verdict::binary_reason::DWARF_PARSE_ERROR.to_string()];
            functions.functions.clear();
        }
    }

    write_outputs(&report, &functions, output_dir)?;
    Ok((report, functions))
}

fn write_outputs(
    report: &OracleReport,
    functions: &OracleFunctionsOutput,
    output_dir: Option<&Path>,
) -> Result<(), DwarfError> {
    if let Some(dir) = output_dir {
        util::write_json_atomic(&dir.join("oracle_report.json"), report)?;
        util::write_json_atomic(&dir.join("oracle_functions.json"), functions)?;
    }
    Ok(())
}

/// Walk every CU, index subprograms, intersect line tables, judge.
fn extract_all(
    binary_path: &Path,
    profile: &DwarfProfile,
) -> Result<(Vec<OracleFunctionEntry>, FunctionCounts), Box<dyn std::error::Error>> {
    use object::{Object, ObjectSection};

    let data = fs::read(binary_path)?;
    let object = object::File::parse(&*data)?;

    let endian = if object.is_little_endian() {
        gimli::RunTimeEndian::Little
    } else {
        gimli::RunTimeEndian::Big
    };

    let load_section = |id: gimli::SectionId| -> Result<Cow<[u8]>, gimli::Error> {
        match object.section_by_name(id.name()) {
            Some(section) => {
                Ok(section.uncompressed_data().unwrap_or(Cow::Borrowed(&[][..])))
            }
            None => Ok(Cow::Borrowed(&[][..])),
        }
    };

    let dwarf_cow = gimli::Dwarf::load(&load_section)?;
    let dwarf: gimli::Dwarf<Reader<'_>> =
        dwarf_cow.borrow(|section| gimli::EndianSlice::new(section, endian));

    let mut out: Vec<OracleFunctionEntry> = Vec::new();
    let mut counts = FunctionCounts::default();

    let mut units = dwarf.units();
    while let Some(header) = units.next()? {
        let cu_offset = header.offset().as_debug_info_offset().map(|o| o.0).unwrap_or(0);
        let unit = dwarf.unit(header)?;
        let comp_dir = unit.comp_dir.map(|d| d.to_string_lossy().into_owned());

        let raw_funcs = functions::index_functions(&dwarf, &unit, cu_offset)?;
        debug!(cu = cu_offset, functions = raw_funcs.len(), "indexed compilation unit");

        // Line table built once per CU, reused across its functions.
        let rows = lines::build_line_rows(&dwarf, &unit, comp_dir.as_deref())?;

        let line_header = unit.line_program.as_ref().map(|p| p.header().clone());

        for fe in raw_funcs {
            let span = lines::compute_line_span(&rows, &fe.ranges);
            let (fv, reasons) = verdict::judge_function(&fe, &span, profile);

            // Line evidence only for usable functions.
            let (line_rows, file_row_counts) = if fv != Verdict::Reject {
                let lr = span
                    .line_rows
                    .iter()
                    .map(|((file, line), count)| LineRowEntry {
                        file: file.clone(),
                        line: *line,
                        count: *count,
                    })
                    .collect();
                (lr, span.file_row_counts.clone())
            } else {
                (Vec::new(), Default::default())
            };

            let (decl_file, decl_missing_reason) = match fe.decl_file_index {
                Some(idx) => match line_header.as_ref().and_then(|h| {
                    lines::resolve_file_index(&dwarf, &unit, h, idx, comp_dir.as_deref())
                }) {
                    Some(path) => (Some(path), None),
                    None => (None, Some(decl_missing::FILE_INDEX_UNRESOLVABLE.to_string())),
                },
                None => (None, Some(decl_missing::NO_DECL_FILE_ATTR.to_string())),
            };

            counts.total += 1;
            match fv {
                Verdict::Accept => counts.accept += 1,
                Verdict::Warn => counts.warn += 1,
                Verdict::Reject => counts.reject += 1,
            }

            out.push(OracleFunctionEntry {
                function_id: fe.function_id.clone(),
                die_offset: format!("{:#x}", fe.die_offset),
                cu_offset: format!("{:#x}", fe.cu_offset),
                name: fe.name.clone(),
                linkage_name: fe.linkage_name.clone(),
                decl_file,
                decl_line: fe.decl_line,
                decl_column: fe.decl_column,
                comp_dir: comp_dir.clone(),
                decl_missing_reason,
                ranges: fe
                    .ranges
                    .iter()
                    .map(|r| RangeModel {
                        low: format!("{:#x}", r.low),
                        high: format!("{:#x}", r.high),
                    })
                    .collect(),
                total_range_bytes: ranges::total_range_bytes(&fe.ranges),
                dominant_file: span.dominant_file.clone(),
                dominant_file_ratio: span.dominant_file_ratio,
                line_min: span.line_min,
                line_max: span.line_max,
                n_line_rows: span.n_line_rows,
                line_rows,
                file_row_counts,
                verdict: fv.as_str().to_string(),
                reasons,
            });
        }
    }

    // Deterministic order: (cu_offset, die_offset).
    out.sort_by(|a, b| {
        let ka = (parse_hex(&a.cu_offset), parse_hex(&a.die_offset));
        let kb = (parse_hex(&b.cu_offset), parse_hex(&b.die_offset));
        ka.cmp(&kb)
    });

    Ok((out, counts))
}

fn parse_hex(s: &str) -> u64 {
    u64::from_str_radix(s.trim_start_matches("0x"), 16).unwrap_or(0)
}
