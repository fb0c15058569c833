//! Error types for Spytial operations.
//!
//! [`SpytialError`] gathers the failures of every stage behind the
//! [`LayoutBuilder`](crate::LayoutBuilder) facade.

use std::io;

use thiserror::Error;

use spytial_core::instance::InstanceError;
use spytial_parser::ParseError;

use crate::{eval::EvaluationError, layout::LayoutError, temporal::TemporalError};

/// The main error type for Spytial operations.
///
/// # Diagnostic Variants
///
/// The `Parse` variant keeps the spec text next to the parse error so the
/// diagnostics' spans can be rendered against it.
#[derive(Debug, Error)]
pub enum SpytialError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{err}")]
    Parse { err: ParseError, src: String },

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("Temporal error: {0}")]
    Temporal(#[from] TemporalError),

    #[error("Instance error: {0}")]
    Instance(#[from] InstanceError),
}

impl SpytialError {
    /// Create a new `Parse` error with the associated source text.
    pub fn new_parse_error(err: ParseError, src: impl Into<String>) -> Self {
        Self::Parse {
            err,
            src: src.into(),
        }
    }
}
