//! Collector for accumulating diagnostics during a processing phase.

use crate::error::{Diagnostic, ParseError};

/// Accumulates diagnostics so one pass can report every invalid entry
/// instead of stopping at the first.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
    has_errors: bool,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a diagnostic to this collector.
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity().is_error() {
            self.has_errors = true;
        }
        self.diagnostics.push(diagnostic);
    }

    /// Finish collection.
    ///
    /// - If there are errors, returns `Err(ParseError)` with all diagnostics.
    /// - Otherwise returns the collected warnings.
    pub fn finish(self) -> Result<Vec<Diagnostic>, ParseError> {
        if self.has_errors {
            Err(ParseError::new(self.diagnostics))
        } else {
            Ok(self.diagnostics)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorCode, span::Span};

    #[test]
    fn test_collector_new_finish_ok() {
        let collector = DiagnosticCollector::new();
        assert!(collector.finish().unwrap().is_empty());
    }

    #[test]
    fn test_collector_keeps_warnings() {
        let mut collector = DiagnosticCollector::new();
        collector.emit(Diagnostic::warning("unknown parameter `colour`"));
        collector.emit(Diagnostic::warning("unknown directive kind `glow`"));

        let warnings = collector.finish().unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[1].message().contains("glow"));
    }

    #[test]
    fn test_collector_errors_carry_everything() {
        let mut collector = DiagnosticCollector::new();
        collector.emit(
            Diagnostic::error("missing `selector`")
                .with_code(ErrorCode::E203)
                .with_label(Span::new(10..20), "here"),
        );
        collector.emit(Diagnostic::warning("unknown parameter `x`"));

        let err = collector.finish().unwrap_err();
        assert_eq!(err.diagnostics().len(), 2);
        assert_eq!(err.diagnostics()[0].message(), "missing `selector`");
    }
}
