//! Origin map: preprocessor `#line` directives in a `.i` file mapped back
//! to original source coordinates.
//!
//! The forward map is the authoritative structure:
//! `i_line (0-based) -> Some((original_path, original_line)) | None`.
//!
//! Lines attributed to synthetic markers (`<built-in>`, `<command-line>`),
//! excluded path prefixes, or GCC system-header flag 3 map to None so they
//! do not dilute overlap scoring.

/// Forward map from `.i` line numbers to original source locations.
#[derive(Debug, Clone)]
pub struct OriginMap {
    /// Path of the `.i` file this map was built from.
    pub tu_path: String,
    /// Index = 0-based `.i` line number.
    pub forward: Vec<Option<(String, u64)>>,
    /// True if at least one line directive was found.
    pub origin_available: bool,
    pub n_total_lines: usize,
}

/// A parsed GCC line marker: `# 123 "path" 1 3` or `#line 123 "path"`.
struct LineDirective {
    line: u64,
    path: String,
    system_header: bool,
}

/// Parse one line as a preprocessor line marker, if it is one.
fn parse_directive(raw: &str) -> Option<LineDirective> {
    let rest = raw.trim_end().strip_prefix('#')?;
    let mut rest = rest.trim_start();
    if let Some(stripped) = rest.strip_prefix("line") {
        rest = stripped.trim_start();
    }

    // Line number.
    let digits_end = rest.find(|c: char| !c.is_ascii_digit())?;
    if digits_end == 0 {
        return None;
    }
    let line: u64 = rest[..digits_end].parse().ok()?;
    rest = rest[digits_end..].trim_start();

    // Quoted path with backslash escapes.
    let mut chars = rest.chars();
    if chars.next()? != '"' {
        return None;
    }
    let mut path = String::new();
    let mut closed = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    path.push(escaped);
                }
            }
            '"' => {
                closed = true;
                break;
            }
            _ => path.push(c),
        }
    }
    if !closed {
        return None;
    }

    // Trailing GCC flags: 3 marks a system header.
    let flags = chars.as_str();
    let system_header = flags.split_whitespace().any(|f| f == "3");

    Some(LineDirective { line, path, system_header })
}

/// True if a path is synthetic or matches an excluded prefix.
fn is_excluded_path(path: &str, excluded_prefixes: &[String]) -> bool {
    if path.starts_with('<') && path.ends_with('>') {
        return true;
    }
    excluded_prefixes.iter().any(|p| path.starts_with(p.as_str()))
}

/// Parse a `.i` file's content into a forward origin map.
pub fn build_origin_map(
    i_content: &str,
    tu_path: &str,
    excluded_prefixes: &[String],
) -> OriginMap {
    let lines: Vec<&str> = i_content.split('\n').collect();
    let mut forward: Vec<Option<(String, u64)>> = vec![None; lines.len()];

    let mut current_path: Option<String> = None;
    let mut current_line: u64 = 0;
    let mut current_excluded = true;
    let mut found_any = false;

    for (idx, raw) in lines.iter().enumerate() {
        if let Some(directive) = parse_directive(raw) {
            found_any = true;
            current_excluded =
                directive.system_header || is_excluded_path(&directive.path, excluded_prefixes);
            current_path = Some(directive.path);
            current_line = directive.line;
            // The directive line itself maps to no source content.
            continue;
        }

        if let Some(path) = &current_path {
            if !current_excluded {
                forward[idx] = Some((path.clone(), current_line));
            }
            current_line += 1;
        }
    }

    OriginMap {
        tu_path: tu_path.to_string(),
        forward,
        origin_available: found_any,
        n_total_lines: lines.len(),
    }
}

impl OriginMap {
    /// Look up the original (path, line) for a 0-based `.i` line number.
    pub fn query(&self, i_line: usize) -> Option<&(String, u64)> {
        self.forward.get(i_line).and_then(|v| v.as_ref())
    }
}
