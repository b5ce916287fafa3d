//! Location extraction: `(sourceFile, lineNumber, column)` from raw error
//! text, trying a fixed set of patterns in priority order.

use regex::Regex;
use std::sync::LazyLock;

pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

static FILE_LINE_COL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([^\s:]+):(\d+):(\d+):").unwrap());
static FILE_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([^\s:]+):(\d+):").unwrap());
static AT_FILE_LINE_COL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"at ([^\s:]+):(\d+):(\d+)").unwrap());

/// Try `file:line:col:`, then `file:line:`, then `at file:line:col`, in
/// that order; first match wins. Returns `None` if nothing matches;
/// unparseable numbers fall back to zero rather than failing.
pub fn extract(message: &str) -> Option<Location> {
    if let Some(caps) = FILE_LINE_COL.captures(message) {
        return Some(Location {
            file: caps[1].to_string(),
            line: caps[2].parse().unwrap_or(0),
            column: caps[3].parse().unwrap_or(0),
        });
    }
    if let Some(caps) = FILE_LINE.captures(message) {
        return Some(Location {
            file: caps[1].to_string(),
            line: caps[2].parse().unwrap_or(0),
            column: 0,
        });
    }
    if let Some(caps) = AT_FILE_LINE_COL.captures(message) {
        return Some(Location {
            file: caps[1].to_string(),
            line: caps[2].parse().unwrap_or(0),
            column: caps[3].parse().unwrap_or(0),
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_file_line_col() {
        let loc = extract("compile error at main.go:10:2: undefined foo").unwrap();
        assert_eq!(loc.file, "main.go");
        assert_eq!(loc.line, 10);
        assert_eq!(loc.column, 2);
    }

    #[test]
    fn extracts_file_line_without_col() {
        let loc = extract("syntax error: src/app.ts:42: unexpected token").unwrap();
        assert_eq!(loc.file, "src/app.ts");
        assert_eq!(loc.line, 42);
    }

    #[test]
    fn returns_none_when_no_pattern_matches() {
        assert!(extract("something broke").is_none());
    }
}
