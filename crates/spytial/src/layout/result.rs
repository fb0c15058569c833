//! The layout produced for one spec and one instance.
//!
//! A [`LayoutResult`] carries everything an external solver and renderer
//! need: sized and decorated nodes, styled edges, groups, the relative
//! position constraints to satisfy, and the projection choices that were
//! applied. Positions themselves are not solved here.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use spytial_parser::spec::{AlignDirection, EntryId};

fn entry_index<S: Serializer>(entry: &EntryId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(entry.index() as u64)
}

/// A node for one visible or hidden atom.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeLayout {
    pub id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub label: String,
    pub width: f64,
    pub height: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// False when an icon replaces the label.
    pub show_label: bool,
    /// Attribute values keyed by `name` or `name[mid]…`, in insertion order.
    pub attributes: IndexMap<String, Vec<String>>,
    pub hidden: bool,
}

/// Where an edge came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// A tuple of an instance relation.
    Relation,
    /// A tuple produced by an `inferredEdge` selector.
    Inferred,
    /// Membership of a key node in its group.
    Group,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeLayout {
    /// `name:a->b`, listing every atom of the tuple.
    pub id: String,
    pub relation_name: String,
    pub kind: EdgeKind,
    pub source: String,
    /// A node id, or a group id for [`EdgeKind::Group`] edges.
    pub target: String,
    pub label: String,
    pub color: String,
    pub style: String,
    pub weight: f64,
    pub show_label: bool,
    pub hidden: bool,
    #[serde(skip)]
    pub(crate) tuple: Vec<String>,
}

impl EdgeLayout {
    pub(crate) fn new(relation_name: &str, kind: EdgeKind, tuple: Vec<String>) -> Self {
        let label = match tuple.len() {
            0..=2 => relation_name.to_string(),
            _ => format!(
                "{relation_name}{}",
                tuple[1..tuple.len() - 1]
                    .iter()
                    .map(|mid| format!("[{mid}]"))
                    .collect::<String>()
            ),
        };
        Self {
            id: format!("{relation_name}:{}", tuple.join("->")),
            relation_name: relation_name.to_string(),
            kind,
            source: tuple.first().cloned().unwrap_or_default(),
            target: tuple.last().cloned().unwrap_or_default(),
            label,
            color: "black".to_string(),
            style: "solid".to_string(),
            weight: 1.0,
            show_label: true,
            hidden: false,
            tuple,
        }
    }

    /// The atoms of the tuple this edge was built from.
    pub fn tuple(&self) -> &[String] {
        &self.tuple
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupLayout {
    pub id: String,
    pub name: String,
    /// The atom whose field produced the group, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_node: Option<String>,
    pub members: Vec<String>,
    pub show_label: bool,
}

/// A relative position requirement handed to the external solver.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayoutConstraint {
    /// `left` sits at least `min_separation` to the left of `right`.
    LeftOf {
        #[serde(serialize_with = "entry_index")]
        entry: EntryId,
        left: String,
        right: String,
        min_separation: f64,
    },
    /// `top` sits at least `min_separation` above `bottom`.
    Above {
        #[serde(serialize_with = "entry_index")]
        entry: EntryId,
        top: String,
        bottom: String,
        min_separation: f64,
    },
    /// Both nodes share a row (`horizontal`) or a column (`vertical`).
    Align {
        #[serde(serialize_with = "entry_index")]
        entry: EntryId,
        #[serde(serialize_with = "axis_name")]
        axis: AlignDirection,
        first: String,
        second: String,
    },
}

fn axis_name<S: Serializer>(axis: &AlignDirection, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(axis.as_str())
}

impl LayoutConstraint {
    pub fn entry(&self) -> EntryId {
        match self {
            LayoutConstraint::LeftOf { entry, .. }
            | LayoutConstraint::Above { entry, .. }
            | LayoutConstraint::Align { entry, .. } => *entry,
        }
    }

    /// The two node ids this constraint relates.
    pub fn nodes(&self) -> (&str, &str) {
        match self {
            LayoutConstraint::LeftOf { left, right, .. } => (left, right),
            LayoutConstraint::Above { top, bottom, .. } => (top, bottom),
            LayoutConstraint::Align { first, second, .. } => (first, second),
        }
    }
}

/// The atom chosen for one projected type, and the atoms to choose from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectionChoice {
    pub sig: String,
    pub chosen: String,
    pub atoms: Vec<String>,
}

/// Everything computed for one spec and one instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutResult {
    pub nodes: Vec<NodeLayout>,
    pub edges: Vec<EdgeLayout>,
    pub groups: Vec<GroupLayout>,
    pub constraints: Vec<LayoutConstraint>,
    pub projections: Vec<ProjectionChoice>,
}

impl LayoutResult {
    pub fn node(&self, id: &str) -> Option<&NodeLayout> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn visible_nodes(&self) -> impl Iterator<Item = &NodeLayout> {
        self.nodes.iter().filter(|node| !node.hidden)
    }

    pub fn visible_edges(&self) -> impl Iterator<Item = &EdgeLayout> {
        self.edges.iter().filter(|edge| !edge.hidden)
    }
}

/// A problem that was skipped rather than failing the layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutWarning {
    /// The entry that raised the warning, if any.
    pub entry: Option<EntryId>,
    pub message: String,
}

impl std::fmt::Display for LayoutWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.entry {
            Some(entry) => write!(f, "entry {entry}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}
