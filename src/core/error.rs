//! Error handling for the argen code generation library.
//!
//! Every failure is fatal to the record package being generated and is
//! returned fully annotated: which package, which backend, which file and
//! in which phase it happened. Template and formatter failures additionally
//! carry a caret-annotated snippet of the offending text produced by the
//! line mapper, wrapped around the original error so the root cause stays
//! reachable through [`std::error::Error::source`].

use std::fmt;

use thiserror::Error;

/// Boxed underlying cause carried by diagnostics
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for generation operations
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Stage of the pipeline a diagnostic was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Parse,
    Execute,
    Format,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Parse => "parse",
            Phase::Execute => "execute",
            Phase::Format => "format",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of mapping an error location back onto source text.
///
/// Every variant wraps the original error; none of them replaces it.
#[derive(Debug, Error)]
pub enum LineMapError {
    /// Location found, `snippet` shows the surrounding lines with a caret
    #[error("\n{snippet}: {source}")]
    Located { snippet: String, source: BoxError },

    #[error("can't parse error message: {source}")]
    Unlocated { source: BoxError },

    #[error("can't unparse error line num: {source}")]
    BadLineNumber { source: BoxError },

    #[error("line num {line} not found (total {total}): {source}")]
    LineNotFound {
        line: usize,
        total: usize,
        source: BoxError,
    },

    #[error("can't unparse error byte num in line: {line_text}: {source}")]
    BadColumn { line_text: String, source: BoxError },

    #[error("byte num not found in line: {line_text}: {source}")]
    ColumnNotFound { line_text: String, source: BoxError },
}

impl LineMapError {
    /// The caret-annotated snippet, when the location could be resolved
    pub fn snippet(&self) -> Option<&str> {
        match self {
            LineMapError::Located { snippet, .. } => Some(snippet),
            _ => None,
        }
    }

    /// The error that was being located
    pub fn original(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        match self {
            LineMapError::Located { source, .. }
            | LineMapError::Unlocated { source }
            | LineMapError::BadLineNumber { source }
            | LineMapError::LineNotFound { source, .. }
            | LineMapError::BadColumn { source, .. }
            | LineMapError::ColumnNotFound { source, .. } => source.as_ref(),
        }
    }
}

/// Enriched failure of a parse, execute or format step
#[derive(Debug, Error)]
#[error(
    "generate {}: backend {backend}{} {phase} error: {context}",
    display_or_dash(.name),
    file_suffix(.filename)
)]
pub struct Diagnostic {
    /// Display name of the record package, filled in by the dispatcher
    pub name: String,
    /// Backend tag, or `meta` / `fixture` for the aggregate paths
    pub backend: String,
    /// Output file, known only once a buffer is being formatted
    pub filename: Option<String>,
    pub phase: Phase,
    #[source]
    pub context: LineMapError,
}

impl Diagnostic {
    pub fn new(backend: impl Into<String>, phase: Phase, context: LineMapError) -> Self {
        Self {
            name: String::new(),
            backend: backend.into(),
            filename: None,
            phase,
            context,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Lines around the fault with a caret, if they could be extracted
    pub fn snippet(&self) -> Option<&str> {
        self.context.snippet()
    }
}

fn display_or_dash(name: &str) -> &str {
    if name.is_empty() { "-" } else { name }
}

fn file_suffix(filename: &Option<String>) -> String {
    filename
        .as_deref()
        .map(|f| format!(" file {f}"))
        .unwrap_or_default()
}

/// Errors returned from generating a record package
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("{0}")]
    Phase(Box<Diagnostic>),

    #[error("generate {name}: backend {backend} not implemented")]
    BackendNotImplemented { name: String, backend: String },

    #[error("generate {name}: unknown backend {backend}")]
    BackendUnknown { name: String, backend: String },
}

impl GeneratorError {
    /// The phase diagnostic, for template and formatter failures
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            GeneratorError::Phase(diag) => Some(diag),
            _ => None,
        }
    }

    /// Backend identifier the failure is attributed to
    pub fn backend(&self) -> &str {
        match self {
            GeneratorError::Phase(diag) => &diag.backend,
            GeneratorError::BackendNotImplemented { backend, .. }
            | GeneratorError::BackendUnknown { backend, .. } => backend,
        }
    }
}

impl From<Diagnostic> for GeneratorError {
    fn from(diag: Diagnostic) -> Self {
        GeneratorError::Phase(Box::new(diag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    fn boxed(msg: &str) -> BoxError {
        Box::new(io::Error::other(msg.to_string()))
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Parse.to_string(), "parse");
        assert_eq!(Phase::Execute.to_string(), "execute");
        assert_eq!(Phase::Format.to_string(), "format");
    }

    #[test]
    fn test_line_map_error_keeps_original() {
        let err = LineMapError::LineNotFound {
            line: 12,
            total: 3,
            source: boxed("12:1: boom"),
        };

        assert_eq!(
            err.to_string(),
            "line num 12 not found (total 3): 12:1: boom"
        );
        assert_eq!(err.original().to_string(), "12:1: boom");
        assert!(err.source().is_some());
        assert!(err.snippet().is_none());
    }

    #[test]
    fn test_diagnostic_display_with_name_and_file() {
        let diag = Diagnostic::new(
            "octopus",
            Phase::Format,
            LineMapError::Unlocated {
                source: boxed("bad"),
            },
        )
        .with_name("Account")
        .with_filename("octopus.rs");

        assert_eq!(
            diag.to_string(),
            "generate Account: backend octopus file octopus.rs format error: can't parse error message: bad"
        );
    }

    #[test]
    fn test_diagnostic_display_without_name() {
        let diag = Diagnostic::new(
            "meta",
            Phase::Parse,
            LineMapError::Unlocated {
                source: boxed("bad"),
            },
        );

        assert!(diag.to_string().starts_with("generate -: backend meta parse error"));
    }

    #[test]
    fn test_generator_error_backend() {
        let err = GeneratorError::BackendNotImplemented {
            name: "Account".into(),
            backend: "tarantool16".into(),
        };
        assert_eq!(err.backend(), "tarantool16");
        assert!(err.diagnostic().is_none());
        assert_eq!(
            err.to_string(),
            "generate Account: backend tarantool16 not implemented"
        );
    }
}
