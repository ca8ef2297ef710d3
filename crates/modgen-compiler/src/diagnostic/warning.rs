//! Recoverable parse diagnostics.

use std::fmt;

use super::Span;

/// A fragment of an existing file that did not match the shape the parser
/// understands. The fragment is dropped and parsing continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// What kind of fragment was skipped ("route", "schema", "import", ...).
    pub fragment: &'static str,
    pub message: String,
    pub span: Span,
}

impl ParseWarning {
    pub fn new(fragment: &'static str, message: impl Into<String>, span: Span) -> Self {
        Self {
            fragment,
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: skipped {}: {}", self.span, self.fragment, self.message)
    }
}
