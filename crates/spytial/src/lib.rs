//! Spytial - selector-driven layout for relational data instances
//!
//! A layout spec names, with small relational selector expressions, which
//! atoms and tuples of a data instance should be positioned, grouped,
//! hidden or decorated. This library parses such specs, evaluates their
//! selectors against an instance, and produces a [`LayoutResult`] with
//! nodes, edges, groups and relative position constraints for an external
//! solver and renderer. It also routes edges over solved node rectangles
//! and produces position hints that keep successive layouts stable.

pub mod config;
pub mod eval;
pub mod layout;
pub mod routing;
pub mod temporal;

mod error;

pub use spytial_core::{geometry, instance, value};
pub use spytial_parser::{LayoutSpec, ParsedSpec};

pub use error::SpytialError;
pub use layout::{LayoutOutcome, LayoutResult};

use indexmap::IndexMap;
use log::{debug, info, trace};

use spytial_core::{geometry::Bounds, instance::DataInstance, value::SelectorValue};

use config::AppConfig;
use eval::Evaluator;
use routing::EdgeRouter;
use temporal::{PolicyOptions, TemporalPolicy};

/// Builder for parsing specs and laying out instances.
///
/// # Examples
///
/// ```rust
/// use indexmap::IndexMap;
/// use spytial::{LayoutBuilder, config::AppConfig, instance::{Atom, Instance}};
///
/// let instance = Instance::new(
///     vec![Atom::new("Alice", "Person"), Atom::new("25", "Int")],
///     vec![("age".to_string(), vec![vec!["Alice".to_string(), "25".to_string()]])],
/// )
/// .expect("valid instance");
///
/// let builder = LayoutBuilder::new(AppConfig::default());
/// let parsed = builder
///     .parse("directives:\n  - attribute:\n      field: age\n")
///     .expect("Failed to parse");
///
/// let outcome = builder
///     .layout(parsed.spec(), &instance, &IndexMap::new())
///     .expect("Failed to lay out");
/// assert_eq!(outcome.layout.node("Alice").unwrap().attributes["age"], ["25"]);
///
/// // Or use default config
/// let builder = LayoutBuilder::default();
/// ```
#[derive(Debug, Default)]
pub struct LayoutBuilder {
    config: AppConfig,
}

impl LayoutBuilder {
    /// Create a new layout builder with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Parse spec text.
    ///
    /// # Errors
    ///
    /// Returns [`SpytialError::Parse`] with every syntax and validation
    /// diagnostic found in the text.
    pub fn parse(&self, source: &str) -> Result<ParsedSpec, SpytialError> {
        info!("Parsing layout spec");
        let parsed = spytial_parser::parse(source)
            .map_err(|err| SpytialError::new_parse_error(err, source))?;
        debug!(
            constraints = parsed.spec().constraints().len(),
            directives = parsed.spec().directives().len(),
            warnings = parsed.warnings().len();
            "Spec parsed successfully",
        );
        trace!(spec:? = parsed.spec(); "Parsed spec");
        Ok(parsed)
    }

    /// Evaluate one selector expression against `instance`.
    ///
    /// # Errors
    ///
    /// Returns [`SpytialError::Evaluation`] for malformed expressions and
    /// unknown identifiers.
    pub fn evaluate(
        &self,
        instance: &dyn DataInstance,
        selector: &str,
    ) -> Result<SelectorValue, SpytialError> {
        Ok(Evaluator::new(instance).evaluate(selector)?)
    }

    /// Lay out `instance` under `spec`, with the caller's projection picks.
    ///
    /// # Errors
    ///
    /// Returns [`SpytialError::Layout`] when strict mode aborts on a failing
    /// selector or the instance cannot be projected.
    pub fn layout(
        &self,
        spec: &LayoutSpec,
        instance: &dyn DataInstance,
        projections: &IndexMap<String, String>,
    ) -> Result<LayoutOutcome, SpytialError> {
        Ok(layout::generate_layout(
            spec,
            instance,
            projections,
            &self.config.layout,
        )?)
    }

    /// An edge router over solved node rectangles.
    pub fn router(&self, bounds: IndexMap<String, Bounds>) -> EdgeRouter {
        EdgeRouter::new(bounds, self.config.routing)
    }

    /// The configured temporal policy.
    ///
    /// # Errors
    ///
    /// Returns [`SpytialError::Temporal`] for unknown policy names or
    /// missing options.
    pub fn temporal_policy(
        &self,
        options: PolicyOptions,
    ) -> Result<Box<dyn TemporalPolicy>, SpytialError> {
        Ok(temporal::resolve_temporal_policy(
            &self.config.temporal.policy,
            options,
        )?)
    }
}
