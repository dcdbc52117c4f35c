//! Parsing of search output into symbol locations
//!
//! cscope's line-oriented output has the shape
//! `<file> <scope> <line> <text...>`, fields separated by single spaces.

use serde::Serialize;

/// One hit reported by the indexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolLocation {
    /// File as printed by the tool (relative to the database directory
    /// unless the file list held absolute paths)
    pub file: String,
    /// Line number exactly as reported (1-based)
    pub line: u32,
    pub column_start: u32,
    pub column_end: u32,
    /// Scope marker followed by the matched source text
    pub text: String,
}

/// Parse one output line; `None` when it does not carry a location
pub fn parse_line(line: &str) -> Option<SymbolLocation> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let fields: Vec<&str> = line.split(' ').collect();
    if fields.len() <= 3 {
        return None;
    }

    let line_number = leading_number(fields[2])?;
    let mut text = fields[1].to_string();
    for field in &fields[3..] {
        text.push(' ');
        text.push_str(field);
    }

    Some(SymbolLocation {
        file: fields[0].to_string(),
        line: line_number,
        column_start: 0,
        column_end: 0,
        text,
    })
}

/// Parse every location in a block of tool output
pub fn parse_locations(output: &str) -> Vec<SymbolLocation> {
    output.split('\n').filter_map(parse_line).collect()
}

/// Leading decimal digits of a field (`"42"` → 42, `"42x"` → 42, `"x"` → None)
fn leading_number(field: &str) -> Option<u32> {
    let end = field
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(field.len());
    field[..end].parse().ok()
}
