//! Maps `line:column` error locations back onto the text that failed.
//!
//! Parser and formatter errors only say *where* something went wrong. The
//! line mapper turns that into a short snippet of the offending text with a
//! caret under the reported column:
//!
//! ```text
//! previous line
//! faulty line
//!       ^^^^^
//! following line
//! ```
//!
//! Locators come either from the leading `line:col:` prefix of an error
//! message ([`annotate`]) or, for errors that expose a structured position,
//! directly as a [`Locator`] ([`annotate_at`]).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::error::{BoxError, LineMapError};

/// Marker printed under the faulty column
pub const CARET: &str = "^^^^^";

static LOCATOR_RX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+):(\d+):").expect("locator pattern is valid"));

/// A 1-based line and column position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locator {
    pub line: usize,
    pub column: usize,
}

impl Locator {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Why a locator could not be read from an error message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorError {
    /// The message does not start with `line:col:`
    Missing,
    /// The line number does not fit a `usize`
    BadLine,
    /// The column does not fit a `usize`
    BadColumn,
}

/// Extract the leading `line:col:` locator from an error message.
///
/// This is the only place that parses positions out of free text.
pub fn extract_locator(message: &str) -> Result<Locator, LocatorError> {
    let caps = LOCATOR_RX
        .captures(message)
        .ok_or(LocatorError::Missing)?;

    let line = caps[1].parse().map_err(|_| LocatorError::BadLine)?;
    let column = caps[2].parse().map_err(|_| LocatorError::BadColumn)?;

    Ok(Locator { line, column })
}

/// Annotate `err` using the locator at the start of its message.
pub fn annotate<E>(err: E, source_text: &str) -> LineMapError
where
    E: Into<BoxError>,
{
    let err: BoxError = err.into();
    let message = err.to_string();

    match extract_locator(&message) {
        Ok(locator) => annotate_at(locator, err, source_text),
        Err(LocatorError::Missing) => LineMapError::Unlocated { source: err },
        Err(LocatorError::BadLine) => LineMapError::BadLineNumber { source: err },
        Err(LocatorError::BadColumn) => {
            // the line is still reported so the reader has something to go on
            let line_text = caps_line(&message, source_text).unwrap_or_default();
            LineMapError::BadColumn {
                line_text,
                source: err,
            }
        }
    }
}

fn caps_line(message: &str, source_text: &str) -> Option<String> {
    let caps = LOCATOR_RX.captures(message)?;
    let line: usize = caps[1].parse().ok()?;
    source_text
        .split('\n')
        .nth(line.checked_sub(1)?)
        .map(str::to_string)
}

/// Annotate `err` at an already known position in `source_text`.
///
/// The snippet is made of the line before the fault, the fault line, the
/// caret line and a trailing context line. The trailing line is taken at
/// index `line` of the 0-based line array, i.e. one past the fault line in
/// 1-based terms.
pub fn annotate_at<E>(locator: Locator, err: E, source_text: &str) -> LineMapError
where
    E: Into<BoxError>,
{
    let err: BoxError = err.into();
    let lines: Vec<&str> = source_text.split('\n').collect();

    if locator.line == 0 || lines.len() < locator.line {
        return LineMapError::LineNotFound {
            line: locator.line,
            total: lines.len(),
            source: err,
        };
    }

    let line = lines[locator.line - 1];

    if line.len() < locator.column {
        return LineMapError::ColumnNotFound {
            line_text: line.to_string(),
            source: err,
        };
    }

    let before = locator
        .line
        .checked_sub(2)
        .and_then(|idx| lines.get(idx))
        .copied()
        .unwrap_or_default();
    let after = lines.get(locator.line).copied().unwrap_or_default();

    let snippet = format!(
        "{}\n{}\n{}{}\n{}",
        trim_tabs(before),
        trim_tabs(line),
        " ".repeat(locator.column.saturating_sub(1)),
        CARET,
        trim_tabs(after),
    );

    LineMapError::Located {
        snippet,
        source: err,
    }
}

fn trim_tabs(line: &str) -> &str {
    line.trim_matches('\t')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn err(msg: &str) -> io::Error {
        io::Error::other(msg.to_string())
    }

    const TEXT: &str = "fn a() {}\n\tlet x = 1;\n\tlet y = oops;\nfn b() {}\nfn c() {}";

    #[test]
    fn test_extract_locator() {
        assert_eq!(extract_locator("3:9: boom"), Ok(Locator::new(3, 9)));
        assert_eq!(extract_locator("boom 3:9:"), Err(LocatorError::Missing));
        assert_eq!(extract_locator("3:9 boom"), Err(LocatorError::Missing));
        assert_eq!(
            extract_locator("99999999999999999999999:1: boom"),
            Err(LocatorError::BadLine)
        );
        assert_eq!(
            extract_locator("1:99999999999999999999999: boom"),
            Err(LocatorError::BadColumn)
        );
    }

    #[test]
    fn test_annotate_builds_snippet() {
        let annotated = annotate(err("3:9: expected expression"), TEXT);

        let snippet = annotated.snippet().expect("located");
        let lines: Vec<&str> = snippet.split('\n').collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "let x = 1;");
        assert_eq!(lines[1], "let y = oops;");
        assert_eq!(lines[2], format!("{}{}", " ".repeat(8), CARET));
        // index 3 of the 0-based array, the line right after the fault
        assert_eq!(lines[3], "fn b() {}");
    }

    #[test]
    fn test_annotate_wraps_original_message() {
        let annotated = annotate(err("3:9: expected expression"), TEXT);
        assert!(annotated.to_string().starts_with('\n'));
        assert!(annotated.to_string().ends_with(": 3:9: expected expression"));
        assert_eq!(annotated.original().to_string(), "3:9: expected expression");
    }

    #[test]
    fn test_trailing_line_uses_fault_line_number_as_index() {
        let text = "l1\nl2\nl3\nl4\nl5";
        let annotated = annotate(err("2:1: boom"), text);
        let snippet = annotated.snippet().unwrap();
        assert_eq!(snippet, format!("l1\nl2\n{CARET}\nl3"));
    }

    #[test]
    fn test_unlocated_message() {
        let annotated = annotate(err("something failed"), TEXT);
        assert!(matches!(annotated, LineMapError::Unlocated { .. }));
        assert_eq!(
            annotated.to_string(),
            "can't parse error message: something failed"
        );
    }

    #[test]
    fn test_line_out_of_range() {
        let annotated = annotate(err("12:1: boom"), TEXT);
        match &annotated {
            LineMapError::LineNotFound { line, total, .. } => {
                assert_eq!(*line, 12);
                assert_eq!(*total, 5);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(annotated.to_string().contains("line num 12 not found (total 5)"));
    }

    #[test]
    fn test_line_zero_is_not_found() {
        let annotated = annotate(err("0:1: boom"), TEXT);
        assert!(matches!(
            annotated,
            LineMapError::LineNotFound { line: 0, .. }
        ));
    }

    #[test]
    fn test_column_out_of_range() {
        let annotated = annotate(err("1:40: boom"), TEXT);
        match annotated {
            LineMapError::ColumnNotFound { line_text, .. } => assert_eq!(line_text, "fn a() {}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_column_at_line_end_is_found() {
        let annotated = annotate(err("1:9: boom"), TEXT);
        assert!(annotated.snippet().is_some());
    }

    #[test]
    fn test_first_and_last_lines_do_not_panic() {
        let first = annotate(err("1:1: boom"), TEXT);
        assert_eq!(
            first.snippet().unwrap(),
            format!("\nfn a() {{}}\n{CARET}\nlet x = 1;")
        );

        let last = annotate(err("5:1: boom"), TEXT);
        assert_eq!(
            last.snippet().unwrap(),
            format!("fn b() {{}}\nfn c() {{}}\n{CARET}\n")
        );
    }

    #[test]
    fn test_column_zero_has_no_padding() {
        let annotated = annotate_at(Locator::new(2, 0), err("boom"), TEXT);
        let snippet = annotated.snippet().unwrap();
        assert_eq!(snippet.split('\n').nth(2), Some(CARET));
    }

    #[test]
    fn test_bad_column_reports_line() {
        let annotated = annotate(err("2:99999999999999999999999: boom"), TEXT);
        match annotated {
            LineMapError::BadColumn { line_text, .. } => assert_eq!(line_text, "\tlet x = 1;"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
