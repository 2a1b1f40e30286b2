//! Line mapper: per-function line evidence from `.debug_line`.
//!
//! The CU's line program is replayed once into a row table which is then
//! reused for every function in that CU. Intersecting a function's address
//! ranges against the table yields the `(file, line)` multiset, dominant
//! file, and row counts the joiners depend on.

use std::collections::{BTreeMap, HashMap};

use crate::dwarf::functions::Reader;
use crate::dwarf::ranges::{in_ranges, AddressRange};

/// A single row from the line-number state machine, with the file index
/// already resolved to a path.
#[derive(Debug, Clone)]
pub struct CuLineRow {
    pub address: u64,
    pub file: String,
    pub line: u64,
}

/// Aggregated line information for one function's address ranges.
#[derive(Debug, Clone, Default)]
pub struct LineSpan {
    pub dominant_file: Option<String>,
    pub dominant_file_ratio: f64,
    pub line_min: Option<u64>,
    pub line_max: Option<u64>,
    pub n_line_rows: u64,

    /// Rows contributed per file (for MULTI_FILE_RANGE detection).
    pub file_row_counts: BTreeMap<String, u64>,

    /// Per-(file, line) hit counts; the multiset of DWARF line evidence.
    /// Downstream alignment consumes this without re-parsing the binary.
    pub line_rows: BTreeMap<(String, u64), u64>,
}

impl LineSpan {
    pub fn is_empty(&self) -> bool {
        self.n_line_rows == 0
    }
}

/// Resolve a line-program file index to a path string.
///
/// gimli's `header.file()` already accounts for DWARF v4 (1-based) vs v5
/// (0-based) indexing; this resolves the directory reference and
/// absolutizes against the compilation directory.
pub fn resolve_file_index(
    dwarf: &gimli::Dwarf<Reader<'_>>,
    unit: &gimli::Unit<Reader<'_>>,
    header: &gimli::LineProgramHeader<Reader<'_>>,
    index: u64,
    comp_dir: Option<&str>,
) -> Option<String> {
    let file = header.file(index)?;

    let mut dir_path = String::new();
    if let Some(dir_value) = file.directory(header) {
        if let Ok(dir) = dwarf.attr_string(unit, dir_value) {
            dir_path = dir.to_string_lossy().into_owned();
        }
    }

    let name = dwarf
        .attr_string(unit, file.path_name())
        .ok()
        .map(|s| s.to_string_lossy().into_owned())?;

    let mut full = if dir_path.is_empty() || name.starts_with('/') {
        name
    } else {
        format!("{}/{}", dir_path.trim_end_matches('/'), name)
    };

    if let Some(cd) = comp_dir {
        if !full.starts_with('/') && !full.starts_with('<') {
            full = format!("{}/{}", cd.trim_end_matches('/'), full);
        }
    }

    Some(full)
}

/// Replay the CU's line program into a row table.
///
/// `end_sequence` rows point one past the last address of a block and are
/// not real source locations, so they are skipped.
pub fn build_line_rows(
    dwarf: &gimli::Dwarf<Reader<'_>>,
    unit: &gimli::Unit<Reader<'_>>,
    comp_dir: Option<&str>,
) -> Result<Vec<CuLineRow>, gimli::Error> {
    let program = match unit.line_program.clone() {
        Some(p) => p,
        None => return Ok(Vec::new()),
    };

    let mut path_cache: HashMap<u64, String> = HashMap::new();
    let mut out: Vec<CuLineRow> = Vec::new();

    let mut rows = program.rows();
    while let Some((header, row)) = rows.next_row()? {
        if row.end_sequence() {
            continue;
        }
        let line = match row.line() {
            Some(l) => l.get(),
            None => continue,
        };

        let file_index = row.file_index();
        let path = match path_cache.get(&file_index) {
            Some(p) => p.clone(),
            None => {
                let resolved = resolve_file_index(dwarf, unit, header, file_index, comp_dir)
                    .unwrap_or_else(|| format!("<unknown file {file_index}>"));
                path_cache.insert(file_index, resolved.clone());
                resolved
            }
        };

        out.push(CuLineRow { address: row.address(), file: path, line });
    }

    Ok(out)
}

/// Intersect a function's address ranges against the CU row table.
pub fn compute_line_span(rows: &[CuLineRow], ranges: &[AddressRange]) -> LineSpan {
    if ranges.is_empty() || rows.is_empty() {
        return LineSpan::default();
    }

    let mut line_rows: BTreeMap<(String, u64), u64> = BTreeMap::new();
    let mut file_counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut total: u64 = 0;

    for row in rows {
        if in_ranges(row.address, ranges) {
            *line_rows.entry((row.file.clone(), row.line)).or_insert(0) += 1;
            *file_counts.entry(row.file.clone()).or_insert(0) += 1;
            total += 1;
        }
    }

    if total == 0 {
        return LineSpan::default();
    }

    // Dominant file: maximum summed count; ties broken by path order for
    // determinism.
    let (dominant_file, dominant_count) = file_counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
        .map(|(f, c)| (f.clone(), *c))
        .unwrap_or_default();

    let dominant_lines: Vec<u64> = line_rows
        .keys()
        .filter(|(f, _)| *f == dominant_file)
        .map(|(_, l)| *l)
        .collect();

    LineSpan {
        dominant_file: Some(dominant_file),
        dominant_file_ratio: dominant_count as f64 / total as f64,
        line_min: dominant_lines.iter().min().copied(),
        line_max: dominant_lines.iter().max().copied(),
        n_line_rows: total,
        file_row_counts: file_counts,
        line_rows,
    }
}
