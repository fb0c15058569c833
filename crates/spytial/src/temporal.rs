//! Temporal reconciliation between successive layouts.
//!
//! When an instance changes, the new layout should not jump around
//! needlessly. A [`TemporalPolicy`] turns the previous node positions and
//! the solver's default seeds into one position hint per node, plus the
//! iteration budget the solver should spend refining them.
//!
//! Previous positions are always passed in through [`HintArgs`]; no policy
//! retains state between calls.

use std::{fmt, str::FromStr};

use indexmap::{IndexMap, IndexSet};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use spytial_core::geometry::{Bounds, Point};

/// Anchor spread below which no scale can be estimated.
const DEGENERATE_SPREAD: f32 = 1e-6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("unknown temporal policy `{0}` (expected baseline, transport_pan_zoom or change_emphasis)")]
    UnknownPolicy(String),

    #[error("temporal policy `{policy}` requires the `{option}` option")]
    MissingOption {
        policy: PolicyKind,
        option: &'static str,
    },
}

/// The available temporal policies, named as in configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Keep prior positions where they exist.
    #[default]
    Baseline,
    /// Keep prior positions after a uniform scale and translation.
    TransportPanZoom,
    /// Let changed nodes move freely.
    ChangeEmphasis,
}

impl FromStr for PolicyKind {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "baseline" => Ok(Self::Baseline),
            "transport_pan_zoom" => Ok(Self::TransportPanZoom),
            "change_emphasis" => Ok(Self::ChangeEmphasis),
            _ => Err(TemporalError::UnknownPolicy(s.to_string())),
        }
    }
}

impl From<PolicyKind> for &'static str {
    fn from(val: PolicyKind) -> Self {
        match val {
            PolicyKind::Baseline => "baseline",
            PolicyKind::TransportPanZoom => "transport_pan_zoom",
            PolicyKind::ChangeEmphasis => "change_emphasis",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &'static str = (*self).into();
        write!(f, "{s}")
    }
}

/// Free-form policy options, as they appear in a JSON or TOML document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolicyOptions {
    pub changed_ids: Option<Vec<String>>,
}

/// A uniform scale followed by a translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub scale: f32,
    pub translate: Point,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl ViewTransform {
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            translate: Point::default(),
        }
    }

    pub fn apply(self, point: Point) -> Point {
        point.scale(self.scale).add_point(self.translate)
    }
}

/// How much work the solver should spend starting from the hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationMode {
    /// Hints are close to final; refine briefly.
    Reduced,
    /// Run a full solve.
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hint {
    pub id: String,
    pub position: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HintSet {
    /// One hint per requested node, in request order.
    pub hints: Vec<Hint>,
    pub iteration_mode: IterationMode,
    /// The view transform the caller should apply after the re-layout.
    pub transform: ViewTransform,
}

/// Inputs to [`TemporalPolicy::make_hints`].
#[derive(Debug, Clone, Copy)]
pub struct HintArgs<'a> {
    pub prev_positions: &'a IndexMap<String, Point>,
    pub prev_transform: ViewTransform,
    /// The node ids of the new layout.
    pub nodes: &'a [String],
    pub default_seeds: &'a IndexMap<String, Point>,
    pub viewport: Option<Bounds>,
}

impl HintArgs<'_> {
    /// The default seed of `id`, falling back to the viewport centre and then the origin.
    fn seed(&self, id: &str) -> Point {
        self.default_seeds
            .get(id)
            .copied()
            .or_else(|| self.viewport.map(Bounds::center))
            .unwrap_or_default()
    }

    fn hints(&self, mut position: impl FnMut(&str) -> Point) -> Vec<Hint> {
        self.nodes
            .iter()
            .map(|id| Hint {
                id: id.clone(),
                position: position(id),
            })
            .collect()
    }
}

/// A strategy producing position hints from a previous layout.
pub trait TemporalPolicy: fmt::Debug {
    fn kind(&self) -> PolicyKind;

    /// Produce exactly one hint for every id in `args.nodes`.
    fn make_hints(&self, args: &HintArgs<'_>) -> HintSet;
}

/// Prior position when known, default seed otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct Baseline;

impl TemporalPolicy for Baseline {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Baseline
    }

    fn make_hints(&self, args: &HintArgs<'_>) -> HintSet {
        let hints = args.hints(|id| {
            args.prev_positions
                .get(id)
                .copied()
                .unwrap_or_else(|| args.seed(id))
        });
        HintSet {
            hints,
            iteration_mode: IterationMode::Reduced,
            transform: args.prev_transform,
        }
    }
}

/// Maps the whole previous layout onto the new default seeds with one
/// uniform scale and translation, estimated by least squares over the nodes
/// present in both.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportPanZoom;

impl TransportPanZoom {
    /// Least-squares `scale` and `translate` mapping each `from` onto its `to`.
    ///
    /// Fewer than two anchors, or anchors that all coincide, give the identity.
    pub fn estimate(anchors: &[(Point, Point)]) -> ViewTransform {
        if anchors.len() < 2 {
            return ViewTransform::identity();
        }

        let count = anchors.len() as f32;
        let (sum_from, sum_to) = anchors.iter().fold(
            (Point::default(), Point::default()),
            |(from_acc, to_acc), (from, to)| (from_acc.add_point(*from), to_acc.add_point(*to)),
        );
        let mean_from = sum_from.scale(1.0 / count);
        let mean_to = sum_to.scale(1.0 / count);

        let (mut covariance, mut spread) = (0.0f32, 0.0f32);
        for (from, to) in anchors {
            let p = from.sub_point(mean_from);
            let q = to.sub_point(mean_to);
            covariance += p.x() * q.x() + p.y() * q.y();
            spread += p.x() * p.x() + p.y() * p.y();
        }

        let scale = covariance / spread;
        if spread <= DEGENERATE_SPREAD || !scale.is_finite() || scale <= 0.0 {
            return ViewTransform::identity();
        }
        ViewTransform {
            scale,
            translate: mean_to.sub_point(mean_from.scale(scale)),
        }
    }
}

impl TemporalPolicy for TransportPanZoom {
    fn kind(&self) -> PolicyKind {
        PolicyKind::TransportPanZoom
    }

    fn make_hints(&self, args: &HintArgs<'_>) -> HintSet {
        let anchors: Vec<(Point, Point)> = args
            .nodes
            .iter()
            .filter_map(|id| {
                let prev = args.prev_positions.get(id)?;
                let seed = args.default_seeds.get(id)?;
                Some((*prev, *seed))
            })
            .collect();
        let transform = Self::estimate(&anchors);
        debug!(
            anchors = anchors.len(),
            scale = transform.scale;
            "Estimated pan/zoom transform",
        );

        let hints = args.hints(|id| match args.prev_positions.get(id) {
            Some(prev) => transform.apply(*prev),
            None => args.seed(id),
        });
        HintSet {
            hints,
            iteration_mode: IterationMode::Reduced,
            transform,
        }
    }
}

/// Changed nodes, and nodes without a prior position, start from their
/// default seed; every other node keeps its prior position.
#[derive(Debug, Clone, Default)]
pub struct ChangeEmphasis {
    changed: IndexSet<String>,
}

impl ChangeEmphasis {
    pub fn new(changed: impl IntoIterator<Item = String>) -> Self {
        Self {
            changed: changed.into_iter().collect(),
        }
    }

    pub fn is_changed(&self, id: &str) -> bool {
        self.changed.contains(id)
    }
}

impl TemporalPolicy for ChangeEmphasis {
    fn kind(&self) -> PolicyKind {
        PolicyKind::ChangeEmphasis
    }

    fn make_hints(&self, args: &HintArgs<'_>) -> HintSet {
        let hints = args.hints(|id| match args.prev_positions.get(id) {
            Some(prev) if !self.is_changed(id) => *prev,
            _ => args.seed(id),
        });
        HintSet {
            hints,
            iteration_mode: IterationMode::Default,
            transform: args.prev_transform,
        }
    }
}

/// Look up a policy by name.
///
/// # Errors
///
/// Returns [`TemporalError::UnknownPolicy`] for names other than
/// `baseline`, `transport_pan_zoom` and `change_emphasis`, and
/// [`TemporalError::MissingOption`] when `change_emphasis` is requested
/// without `changedIds`.
///
/// # Examples
///
/// ```
/// # use indexmap::IndexMap;
/// # use spytial::temporal::{HintArgs, IterationMode, PolicyOptions, ViewTransform, resolve_temporal_policy};
/// # use spytial_core::geometry::Point;
/// let policy = resolve_temporal_policy("baseline", PolicyOptions::default()).unwrap();
///
/// let prev = IndexMap::from([("a".to_string(), Point::new(10.0, 10.0))]);
/// let seeds = IndexMap::from([("b".to_string(), Point::new(50.0, 0.0))]);
/// let nodes = ["a".to_string(), "b".to_string()];
/// let hints = policy.make_hints(&HintArgs {
///     prev_positions: &prev,
///     prev_transform: ViewTransform::identity(),
///     nodes: &nodes,
///     default_seeds: &seeds,
///     viewport: None,
/// });
///
/// assert_eq!(hints.iteration_mode, IterationMode::Reduced);
/// assert_eq!(hints.hints[0].position, Point::new(10.0, 10.0));
/// assert_eq!(hints.hints[1].position, Point::new(50.0, 0.0));
///
/// assert!(resolve_temporal_policy("stable", PolicyOptions::default()).is_err());
/// ```
pub fn resolve_temporal_policy(
    name: &str,
    options: PolicyOptions,
) -> Result<Box<dyn TemporalPolicy>, TemporalError> {
    let kind: PolicyKind = name.parse()?;
    debug!(policy = name; "Resolved temporal policy");
    Ok(match kind {
        PolicyKind::Baseline => Box::new(Baseline),
        PolicyKind::TransportPanZoom => Box::new(TransportPanZoom),
        PolicyKind::ChangeEmphasis => {
            let changed = options.changed_ids.ok_or(TemporalError::MissingOption {
                policy: kind,
                option: "changedIds",
            })?;
            Box::new(ChangeEmphasis::new(changed))
        }
    })
}
