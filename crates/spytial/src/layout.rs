//! Layout generation: from a spec and an instance to a [`LayoutResult`].
//!
//! The generator works in fixed phases. Nodes start as every atom of the
//! (possibly projected) instance, relation tuples become candidate edges,
//! then directives and constraints hide, convert, group, decorate and
//! position them. Selector failures skip the owning entry with a warning
//! unless strict mode is on.

mod cyclic;
mod generator;
mod result;

pub use result::{
    EdgeKind, EdgeLayout, GroupLayout, LayoutConstraint, LayoutResult, LayoutWarning, NodeLayout,
    ProjectionChoice,
};

use indexmap::IndexMap;
use log::{debug, info};
use thiserror::Error;

use spytial_core::instance::{DataInstance, InstanceError};
use spytial_parser::{LayoutSpec, spec::EntryId};

use crate::{config::LayoutConfig, eval::EvaluationError};

use generator::{Generator, Warnings};

/// Errors that abort layout generation.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("entry {entry}: cannot evaluate `{selector}`: {source}")]
    Evaluation {
        entry: EntryId,
        selector: String,
        #[source]
        source: EvaluationError,
    },

    #[error("projection failed: {0}")]
    Projection(#[from] InstanceError),
}

/// A layout together with the warnings raised while computing it.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOutcome {
    pub layout: LayoutResult,
    pub warnings: Vec<LayoutWarning>,
}

/// Compute the layout of `instance` under `spec`.
///
/// `projections` maps a projected type to the atom the caller picked for
/// it; types without a valid pick use their first atom.
///
/// # Errors
///
/// In strict mode, the first selector that fails to evaluate aborts with
/// [`LayoutError::Evaluation`]. A failing projection of the instance always
/// aborts with [`LayoutError::Projection`].
///
/// # Examples
///
/// ```
/// # use indexmap::IndexMap;
/// # use spytial::{config::LayoutConfig, layout::generate_layout};
/// # use spytial_core::instance::{Atom, Instance};
/// let instance = Instance::new(
///     vec![Atom::new("a", "Node"), Atom::new("b", "Node")],
///     vec![("next".to_string(), vec![vec!["a".to_string(), "b".to_string()]])],
/// )
/// .unwrap();
/// let spec = spytial_parser::parse(
///     "constraints:\n  - orientation:\n      selector: next\n      directions: [right]\n",
/// )
/// .unwrap()
/// .into_parts()
/// .0;
///
/// let outcome = generate_layout(&spec, &instance, &IndexMap::new(), &LayoutConfig::default()).unwrap();
/// assert_eq!(outcome.layout.nodes.len(), 2);
/// assert_eq!(outcome.layout.constraints.len(), 1);
/// assert!(outcome.warnings.is_empty());
/// ```
pub fn generate_layout(
    spec: &LayoutSpec,
    instance: &dyn DataInstance,
    projections: &IndexMap<String, String>,
    config: &LayoutConfig,
) -> Result<LayoutOutcome, LayoutError> {
    info!(
        atoms = instance.atoms().len(),
        relations = instance.relations().len(),
        entries = spec.constraints().len() + spec.directives().len();
        "Generating layout",
    );

    let mut warnings = Warnings::default();
    let choices = generator::choose_projections(spec, instance, projections, config, &mut warnings)?;

    let projected = if choices.is_empty() {
        None
    } else {
        let chosen: Vec<String> = choices.iter().map(|choice| choice.chosen.clone()).collect();
        match instance.apply_projections(&chosen) {
            Some(result) => Some(result?),
            None => {
                warnings.push(
                    None,
                    "the instance does not support projection; showing every atom",
                );
                None
            }
        }
    };
    let instance: &dyn DataInstance = match &projected {
        Some(projected) => {
            debug!(atoms = projected.atoms().len(); "Using projected instance");
            projected
        }
        None => instance,
    };

    Generator::new(spec, instance, config, warnings).run(choices)
}
