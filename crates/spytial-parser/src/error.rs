//! Error and diagnostic system for the Spytial spec parser.
//!
//! Every problem found while reading a spec is reported as a [`Diagnostic`]
//! carrying a severity, an optional [`ErrorCode`], labelled source spans and
//! optional help text. Fatal problems are returned wrapped in a
//! [`ParseError`]; warnings travel next to the parsed spec.
//!
//! # Example
//!
//! ```
//! # use spytial_parser::error::{Diagnostic, ErrorCode};
//! # use spytial_parser::Span;
//! let diag = Diagnostic::error("`size` needs a `width` or a `height`")
//!     .with_code(ErrorCode::E203)
//!     .with_label(Span::new(14..18), "declared here")
//!     .with_help("add `width: 40` or `height: 40`");
//! assert!(diag.severity().is_error());
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod label;
mod parse_error;
mod severity;

pub(crate) use collector::DiagnosticCollector;
pub(crate) use parse_error::Result;

pub use diagnostic::Diagnostic;
pub use error_code::ErrorCode;
pub use label::Label;
pub use parse_error::ParseError;
pub use severity::Severity;
