//! The error returned when spec text cannot be parsed.

use thiserror::Error;

use crate::error::{Diagnostic, ErrorCode};

/// A type alias for `Result<T, Diagnostic>`.
pub type Result<T> = std::result::Result<T, Diagnostic>;

/// One or more fatal diagnostics produced while parsing a spec.
#[derive(Debug, Clone, Error)]
#[error("{}", self.summary())]
pub struct ParseError {
    diagnostics: Vec<Diagnostic>,
}

impl ParseError {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    /// Get all diagnostics in this error.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Returns `true` when the text itself is malformed, as opposed to a
    /// well-formed document whose entries are invalid.
    pub fn is_syntax_error(&self) -> bool {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity().is_error())
            .any(|diag| diag.code().is_some_and(|code| code.is_syntax()))
    }

    /// Returns `true` if any diagnostic carries `code`.
    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.diagnostics.iter().any(|diag| diag.code() == Some(code))
    }

    fn summary(&self) -> String {
        let Some(first) = self.diagnostics.first() else {
            return String::new();
        };
        let kind = if self.is_syntax_error() {
            "syntax error"
        } else {
            "invalid spec"
        };
        match self.diagnostics.len() {
            1 => format!("{kind}: {first}"),
            n => format!("{kind}: {first} (+{} more)", n - 1),
        }
    }
}

impl From<Diagnostic> for ParseError {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            diagnostics: vec![diagnostic],
        }
    }
}

impl From<Vec<Diagnostic>> for ParseError {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }
}
