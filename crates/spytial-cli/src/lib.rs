//! CLI logic for the Spytial layout tool.
//!
//! `spytial layout` reads a spec and a TOML data instance and writes the
//! computed layout as TOML; `spytial fmt` prints a spec in canonical form.

pub mod error_adapter;

mod args;
mod config;

pub use args::{Args, Command};

use std::{fs, io};

use indexmap::IndexMap;
use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

use spytial::{LayoutBuilder, LayoutResult, SpytialError, instance::Instance};

/// Problems with CLI inputs and outputs that the library does not model.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Failed to read instance {path}: {message}")]
    Instance { path: String, message: String },

    #[error("Invalid projection `{0}`, expected `Type=Atom`")]
    Projection(String),

    #[error("Failed to serialize layout: {0}")]
    Serialize(String),
}

impl From<InputError> for SpytialError {
    fn from(err: InputError) -> Self {
        SpytialError::Io(io::Error::new(io::ErrorKind::InvalidData, err.to_string()))
    }
}

/// The document written by `spytial layout`.
#[derive(Debug, Serialize)]
struct LayoutDocument<'a> {
    warnings: Vec<String>,
    #[serde(flatten)]
    layout: &'a LayoutResult,
}

/// Run the Spytial CLI application
///
/// # Errors
///
/// Returns `SpytialError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Spec parse errors
/// - Malformed instances or projections
/// - Strict-mode layout errors
pub fn run(args: &Args) -> Result<(), SpytialError> {
    let mut app_config = config::load_config(args.config.as_ref())?;

    match &args.command {
        Command::Layout {
            spec,
            instance,
            output,
            projections,
            strict,
        } => {
            info!(spec_path = spec.as_str(), instance_path = instance.as_str(); "Laying out instance");
            if *strict {
                app_config.layout.strict = true;
            }
            let builder = LayoutBuilder::new(app_config);

            let source = fs::read_to_string(spec)?;
            let parsed = builder.parse(&source)?;
            for warning in parsed.warnings() {
                warn!(spec_path = spec.as_str(); "{}", warning.message());
            }

            let instance = load_instance(instance)?;
            let projections = parse_projections(projections)?;
            let outcome = builder.layout(parsed.spec(), &instance, &projections)?;

            let document = LayoutDocument {
                warnings: outcome.warnings.iter().map(ToString::to_string).collect(),
                layout: &outcome.layout,
            };
            let text =
                toml::to_string(&document).map_err(|err| InputError::Serialize(err.to_string()))?;
            write_output(output.as_deref(), &text)?;
            info!(nodes = outcome.layout.nodes.len(); "Layout written");
        }
        Command::Fmt { spec, output } => {
            info!(spec_path = spec.as_str(); "Formatting spec");
            let builder = LayoutBuilder::new(app_config);
            let source = fs::read_to_string(spec)?;
            let parsed = builder.parse(&source)?;
            write_output(output.as_deref(), &spytial_parser::generate(parsed.spec()))?;
        }
    }

    Ok(())
}

fn load_instance(path: &str) -> Result<Instance, SpytialError> {
    let content = fs::read_to_string(path)?;
    let instance = toml::from_str(&content).map_err(|err| InputError::Instance {
        path: path.to_string(),
        message: err.to_string(),
    })?;
    Ok(instance)
}

/// Parse `Type=Atom` pairs; a later pick for the same type wins.
fn parse_projections(values: &[String]) -> Result<IndexMap<String, String>, InputError> {
    values
        .iter()
        .map(|value| match value.split_once('=') {
            Some((sig, atom)) if !sig.trim().is_empty() && !atom.trim().is_empty() => {
                Ok((sig.trim().to_string(), atom.trim().to_string()))
            }
            _ => Err(InputError::Projection(value.clone())),
        })
        .collect()
}

fn write_output(path: Option<&str>, text: &str) -> Result<(), SpytialError> {
    match path {
        Some(path) => fs::write(path, text)?,
        None => print!("{text}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_projections() {
        let values = vec!["Time=T1".to_string(), " State = S0 ".to_string()];
        let projections = parse_projections(&values).unwrap();
        assert_eq!(projections["Time"], "T1");
        assert_eq!(projections["State"], "S0");

        for bad in ["Time", "=T1", "Time="] {
            assert!(matches!(
                parse_projections(&[bad.to_string()]),
                Err(InputError::Projection(_))
            ));
        }
    }
}
