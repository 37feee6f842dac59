//! Unified error reporting.
//!
//! A single `Diagnostic` type replaces the original's five ad hoc
//! `error`/`error_at`/`error_line` helpers: one shape, one format.

use crate::ast::SourceLoc;
use std::fmt;

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub loc: Option<SourceLoc>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(loc: SourceLoc, message: impl Into<String>) -> Self {
        Diagnostic { loc: Some(loc), message: message.into() }
    }

    /// A diagnostic with no source location (I/O errors before any token
    /// has been produced).
    pub fn bare(message: impl Into<String>) -> Self {
        Diagnostic { loc: None, message: message.into() }
    }

    /// Render `file:line:col: message`, the offending source line, and a
    /// caret under the offending column.
    ///
    /// `source` must be the flattened (post-`#include`) buffer the
    /// location's `offset` was measured against, not the raw input file —
    /// `line`/`col` are per-file numbers retargeted by `#file` markers and
    /// don't index into that buffer, so the line text is recovered by
    /// scanning backward and forward to newlines from `offset` instead.
    pub fn report(&self, source: &str) -> String {
        let Some(loc) = &self.loc else {
            return format!("error: {}", self.message);
        };
        let mut out = format!("{}:{}:{}: error: {}\n", loc.file, loc.line, loc.col, self.message);
        let bytes = source.as_bytes();
        let offset = loc.offset.min(bytes.len());
        let line_start = bytes[..offset].iter().rposition(|&b| b == b'\n').map_or(0, |p| p + 1);
        let line_end = bytes[offset..].iter().position(|&b| b == b'\n').map_or(bytes.len(), |p| offset + p);
        if let Ok(line_text) = std::str::from_utf8(&bytes[line_start..line_end]) {
            out.push_str(line_text);
            out.push('\n');
            out.push_str(&" ".repeat(offset - line_start));
            out.push('^');
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.loc {
            Some(loc) => write!(f, "{}:{}:{}: error: {}", loc.file, loc.line, loc.col, self.message),
            None => write!(f, "error: {}", self.message),
        }
    }
}

impl std::error::Error for Diagnostic {}

pub type HResult<T> = Result<T, Diagnostic>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn caret_lands_under_the_right_column() {
        let src = "let x = y + ;\n";
        let loc = SourceLoc::new(Rc::from("a.hel"), 1, 13, 12);
        let d = Diagnostic::new(loc, "unexpected token");
        let rendered = d.report(src);
        let mut lines = rendered.lines();
        lines.next();
        assert_eq!(lines.next().unwrap(), "let x = y + ;");
        let caret_line = lines.next().unwrap();
        assert_eq!(caret_line.len(), 13);
        assert!(caret_line.ends_with('^'));
    }

    #[test]
    fn caret_recovers_the_right_line_across_an_include_boundary() {
        // Simulates a flattened buffer where `#file` markers have retargeted
        // `line`/`col` to the included file's own numbering (line 1 here),
        // which does not match this line's real position in `source`.
        let src = "#file \"main.hel\" 1\nfn main() -> int {\n  bad token\n}\n";
        let offset = src.find("bad").unwrap();
        let loc = SourceLoc::new(Rc::from("main.hel"), 1, 3, offset);
        let d = Diagnostic::new(loc, "unexpected token");
        let rendered = d.report(src);
        let mut lines = rendered.lines();
        lines.next();
        assert_eq!(lines.next().unwrap(), "  bad token");
    }

    #[test]
    fn bare_diagnostic_has_no_location_line() {
        let d = Diagnostic::bare("could not open file");
        assert_eq!(format!("{d}"), "error: could not open file");
    }
}
