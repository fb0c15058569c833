//! Error codes for the Spytial diagnostic system.
//!
//! Error codes are organized by phase:
//! - `E0xx` - Document syntax errors
//! - `E1xx` - Selector expression errors
//! - `E2xx` - Spec structure and parameter errors

use std::fmt;

/// Error codes for categorizing diagnostic errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Document Syntax Errors (E0xx)
    // =========================================================================
    /// Unterminated quoted scalar.
    ///
    /// A `'` or `"` opened a scalar that the line never closes.
    E001,

    /// Unexpected character.
    ///
    /// Something other than a comment follows a complete value.
    E002,

    /// Tab in indentation.
    ///
    /// Indentation must use spaces only.
    E003,

    /// Unclosed flow collection.
    ///
    /// A `[` or `{` is not closed on the same line.
    E004,

    /// Inconsistent indentation.
    ///
    /// A line is indented deeper or shallower than any open block allows.
    E005,

    /// Expected a mapping key.
    ///
    /// A line inside a mapping has no `key: value` shape.
    E006,

    /// Duplicate mapping key.
    E007,

    /// Invalid escape sequence in a double-quoted scalar.
    E008,

    // =========================================================================
    // Selector Errors (E1xx)
    // =========================================================================
    /// Unexpected token in a selector expression.
    E100,

    /// Incomplete selector expression.
    ///
    /// The expression ended before an operand or a closing parenthesis.
    E101,

    /// Selector nested too deeply.
    ///
    /// Parentheses and operators may nest at most
    /// [`MAX_SELECTOR_DEPTH`](crate::MAX_SELECTOR_DEPTH) levels.
    E102,

    // =========================================================================
    // Spec Structure Errors (E2xx)
    // =========================================================================
    /// The document root is not a mapping.
    E200,

    /// A `constraints` or `directives` section is not a sequence.
    E201,

    /// An entry is not a single-key mapping naming its kind.
    E202,

    /// A required parameter is missing.
    E203,

    /// A parameter has the wrong type or an unrecognized value.
    E204,

    /// Orientation directions contradict each other.
    E205,
}

impl ErrorCode {
    /// Returns the numeric code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E003 => "E003",
            ErrorCode::E004 => "E004",
            ErrorCode::E005 => "E005",
            ErrorCode::E006 => "E006",
            ErrorCode::E007 => "E007",
            ErrorCode::E008 => "E008",
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            ErrorCode::E203 => "E203",
            ErrorCode::E204 => "E204",
            ErrorCode::E205 => "E205",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "unterminated quoted scalar",
            ErrorCode::E002 => "unexpected character",
            ErrorCode::E003 => "tab in indentation",
            ErrorCode::E004 => "unclosed flow collection",
            ErrorCode::E005 => "inconsistent indentation",
            ErrorCode::E006 => "expected mapping key",
            ErrorCode::E007 => "duplicate mapping key",
            ErrorCode::E008 => "invalid escape sequence",
            ErrorCode::E100 => "unexpected token in selector",
            ErrorCode::E101 => "incomplete selector",
            ErrorCode::E102 => "selector nested too deeply",
            ErrorCode::E200 => "document root is not a mapping",
            ErrorCode::E201 => "section is not a sequence",
            ErrorCode::E202 => "malformed entry",
            ErrorCode::E203 => "missing parameter",
            ErrorCode::E204 => "invalid parameter value",
            ErrorCode::E205 => "contradictory directions",
        }
    }

    /// Returns `true` for codes produced while reading the document itself.
    pub fn is_syntax(&self) -> bool {
        self.as_str().starts_with("E0") || self.as_str().starts_with("E1")
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::E001.to_string(), "E001");
        assert_eq!(ErrorCode::E101.to_string(), "E101");
        assert_eq!(ErrorCode::E205.to_string(), "E205");
    }

    #[test]
    fn test_syntax_codes() {
        assert!(ErrorCode::E004.is_syntax());
        assert!(ErrorCode::E100.is_syntax());
        assert!(!ErrorCode::E203.is_syntax());
    }
}
