//! # Spytial Parser
//!
//! Reads Spytial layout specs: a small YAML-style document with a
//! `constraints` section and a `directives` section, where every entry
//! names one kind and its parameters. Selector parameters are parsed into
//! relational [`Expr`] trees up front, so a spec that parses cleanly only
//! fails later if its selectors name things the instance does not have.
//!
//! ## Usage
//!
//! ```
//! # use spytial_parser::{parse, generate, ParseError};
//!
//! fn main() -> Result<(), ParseError> {
//!     let source = r#"
//! constraints:
//!   - orientation:
//!       selector: left
//!       directions: [left, below]
//! directives:
//!   - attribute:
//!       field: key
//! "#;
//!
//!     let parsed = parse(source)?;
//!     assert_eq!(parsed.spec().constraints().len(), 1);
//!     assert!(parsed.warnings().is_empty());
//!
//!     let text = generate(parsed.spec());
//!     assert!(parse(&text)?.spec().is_equivalent(parsed.spec()));
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod spec;

mod document;
mod elaborate;
mod generate;
mod selector;
mod span;

pub use error::{Diagnostic, ParseError};
pub use generate::generate;
pub use selector::{Expr, MAX_SELECTOR_DEPTH, Selector, parse_selector};
pub use span::{Span, Spanned};
pub use spec::LayoutSpec;

/// A successfully parsed spec together with the warnings raised while
/// reading it.
#[derive(Debug, Clone)]
pub struct ParsedSpec {
    spec: LayoutSpec,
    warnings: Vec<Diagnostic>,
}

impl ParsedSpec {
    pub fn spec(&self) -> &LayoutSpec {
        &self.spec
    }

    /// Non-fatal diagnostics, such as unknown kinds or parameters.
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    pub fn into_parts(self) -> (LayoutSpec, Vec<Diagnostic>) {
        (self.spec, self.warnings)
    }
}

/// Parse spec text into a [`LayoutSpec`].
///
/// Parsing runs in two stages:
///
/// 1. **Read** - Turn the text into a document tree, rejecting malformed
///    structure such as unterminated quotes or tab indentation.
/// 2. **Elaborate** - Turn each entry into a typed constraint or directive,
///    parsing selectors and checking required parameters.
///
/// An empty document yields an empty spec. Unknown kinds are kept as opaque
/// entries and reported as warnings.
///
/// # Errors
///
/// Returns a [`ParseError`] holding every fatal diagnostic found. Use
/// [`ParseError::is_syntax_error`] to tell malformed text apart from a
/// well-formed document with invalid entries.
pub fn parse(source: &str) -> Result<ParsedSpec, ParseError> {
    let root = document::read_document(source)?;
    let (spec, warnings) = elaborate::elaborate(&root)?;
    Ok(ParsedSpec { spec, warnings })
}
