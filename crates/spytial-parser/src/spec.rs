//! The typed layout spec model.
//!
//! A [`LayoutSpec`] holds two ordered lists of entries. Constraints describe
//! structure, position and visibility; directives describe decoration. Every
//! known kind has a typed payload validated during parsing. Kinds the parser
//! does not recognize are kept as [`UnknownEntry`] with their raw parameters.

use std::fmt;

use indexmap::IndexMap;

use crate::selector::Selector;

/// Identifier of an entry, unique within one parsed spec and assigned in
/// source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(usize);

impl EntryId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The two top-level sections of a spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Constraints,
    Directives,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Constraints => "constraints",
            Section::Directives => "directives",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An untyped parameter value, as written in the spec.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Scalar(String),
    Seq(Vec<RawValue>),
    Map(IndexMap<String, RawValue>),
}

impl RawValue {
    pub fn scalar(text: impl Into<String>) -> Self {
        RawValue::Scalar(text.into())
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            RawValue::Scalar(text) => Some(text),
            _ => None,
        }
    }
}

/// An entry whose kind is not recognized.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownEntry {
    pub kind: String,
    pub params: RawValue,
}

/// A spec entry: a kind-specific payload with its id and leading comment.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecEntry<K> {
    id: EntryId,
    kind: K,
    comment: Option<String>,
}

impl<K> SpecEntry<K> {
    pub fn new(id: EntryId, kind: K, comment: Option<String>) -> Self {
        Self { id, kind, comment }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    /// The comment lines written directly above the entry, joined with `\n`.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

/// Relative position requested by an orientation constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Above,
    Below,
    DirectlyLeft,
    DirectlyRight,
    DirectlyAbove,
    DirectlyBelow,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::Left,
        Direction::Right,
        Direction::Above,
        Direction::Below,
        Direction::DirectlyLeft,
        Direction::DirectlyRight,
        Direction::DirectlyAbove,
        Direction::DirectlyBelow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Above => "above",
            Direction::Below => "below",
            Direction::DirectlyLeft => "directlyLeft",
            Direction::DirectlyRight => "directlyRight",
            Direction::DirectlyAbove => "directlyAbove",
            Direction::DirectlyBelow => "directlyBelow",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == text)
    }

    /// The direction with the `directly` qualifier removed.
    pub fn base(&self) -> Direction {
        match self {
            Direction::DirectlyLeft => Direction::Left,
            Direction::DirectlyRight => Direction::Right,
            Direction::DirectlyAbove => Direction::Above,
            Direction::DirectlyBelow => Direction::Below,
            other => *other,
        }
    }

    pub fn is_direct(&self) -> bool {
        self.base() != *self
    }

    pub fn opposite(&self) -> Direction {
        match self.base() {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Above => Direction::Below,
            _ => Direction::Above,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis shared by aligned nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlignDirection {
    /// Same vertical position (a row).
    Horizontal,
    /// Same horizontal position (a column).
    Vertical,
}

impl AlignDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlignDirection::Horizontal => "horizontal",
            AlignDirection::Vertical => "vertical",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "horizontal" => Some(AlignDirection::Horizontal),
            "vertical" => Some(AlignDirection::Vertical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    Clockwise,
    Counterclockwise,
}

impl Rotation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rotation::Clockwise => "clockwise",
            Rotation::Counterclockwise => "counterclockwise",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "clockwise" => Some(Rotation::Clockwise),
            "counterclockwise" => Some(Rotation::Counterclockwise),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrientationConstraint {
    pub selector: Selector,
    pub directions: Vec<Direction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignConstraint {
    pub selector: Selector,
    pub direction: AlignDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CyclicConstraint {
    pub selector: Selector,
    pub direction: Rotation,
}

/// Groups the atoms reached through column `add_to_group` of relation
/// `field`, keyed by the atom in column `group_on`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupByField {
    pub field: String,
    pub group_on: usize,
    pub add_to_group: usize,
    pub selector: Option<Selector>,
}

/// Groups the atoms matched by a selector under a fixed name.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBySelector {
    pub selector: Selector,
    pub name: String,
    pub add_edge: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SizeConstraint {
    pub selector: Selector,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HideAtom {
    pub selector: Selector,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Orientation(OrientationConstraint),
    Align(AlignConstraint),
    Cyclic(CyclicConstraint),
    GroupByField(GroupByField),
    GroupBySelector(GroupBySelector),
    Size(SizeConstraint),
    HideAtom(HideAtom),
    Unknown(UnknownEntry),
}

impl Constraint {
    pub fn kind_name(&self) -> &str {
        match self {
            Constraint::Orientation(_) => "orientation",
            Constraint::Align(_) => "align",
            Constraint::Cyclic(_) => "cyclic",
            Constraint::GroupByField(_) => "groupfield",
            Constraint::GroupBySelector(_) => "groupselector",
            Constraint::Size(_) => "size",
            Constraint::HideAtom(_) => "hideAtom",
            Constraint::Unknown(unknown) => &unknown.kind,
        }
    }
}

/// Shows a relation as node attributes instead of edges.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDirective {
    pub field: String,
    pub selector: Option<Selector>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HideFieldDirective {
    pub field: String,
    pub selector: Option<Selector>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IconDirective {
    pub selector: Selector,
    pub path: String,
    pub show_labels: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtomColorDirective {
    pub selector: Selector,
    pub value: String,
}

/// Styles, or hides, the edges of one relation.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeStyleDirective {
    pub field: String,
    pub value: String,
    /// Restricts by source atom.
    pub selector: Option<Selector>,
    /// Restricts by whole tuple.
    pub filter: Option<Selector>,
    pub style: Option<String>,
    pub weight: Option<f64>,
    pub show_label: Option<bool>,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionDirective {
    pub sig: String,
    pub order_by: Option<Selector>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    HideDisconnected,
    HideDisconnectedBuiltIns,
}

impl Flag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::HideDisconnected => "hideDisconnected",
            Flag::HideDisconnectedBuiltIns => "hideDisconnectedBuiltIns",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "hideDisconnected" => Some(Flag::HideDisconnected),
            "hideDisconnectedBuiltIns" => Some(Flag::HideDisconnectedBuiltIns),
            _ => None,
        }
    }
}

/// Adds edges that are not stored in the instance, computed by a selector.
#[derive(Debug, Clone, PartialEq)]
pub struct InferredEdgeDirective {
    pub name: String,
    pub selector: Selector,
    pub color: Option<String>,
    pub style: Option<String>,
    pub weight: Option<f64>,
}

/// Attaches selector-computed attributes to the atoms matched by `to_tag`.
#[derive(Debug, Clone, PartialEq)]
pub struct TagDirective {
    pub to_tag: Selector,
    pub name: String,
    pub value: Selector,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Attribute(AttributeDirective),
    HideField(HideFieldDirective),
    Icon(IconDirective),
    AtomColor(AtomColorDirective),
    EdgeColor(EdgeStyleDirective),
    Projection(ProjectionDirective),
    Flag(Flag),
    InferredEdge(InferredEdgeDirective),
    Tag(TagDirective),
    Unknown(UnknownEntry),
}

impl Directive {
    pub fn kind_name(&self) -> &str {
        match self {
            Directive::Attribute(_) => "attribute",
            Directive::HideField(_) => "hideField",
            Directive::Icon(_) => "icon",
            Directive::AtomColor(_) => "atomColor",
            Directive::EdgeColor(_) => "edgeColor",
            Directive::Projection(_) => "projection",
            Directive::Flag(_) => "flag",
            Directive::InferredEdge(_) => "inferredEdge",
            Directive::Tag(_) => "tag",
            Directive::Unknown(unknown) => &unknown.kind,
        }
    }
}

/// A parsed layout spec.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutSpec {
    constraints: Vec<SpecEntry<Constraint>>,
    directives: Vec<SpecEntry<Directive>>,
    next_id: usize,
}

impl LayoutSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constraints(&self) -> &[SpecEntry<Constraint>] {
        &self.constraints
    }

    pub fn directives(&self) -> &[SpecEntry<Directive>] {
        &self.directives
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty() && self.directives.is_empty()
    }

    /// Appends a constraint and returns its fresh id.
    pub fn push_constraint(&mut self, kind: Constraint, comment: Option<String>) -> EntryId {
        let id = self.fresh_id();
        self.constraints.push(SpecEntry::new(id, kind, comment));
        id
    }

    /// Appends a directive and returns its fresh id.
    pub fn push_directive(&mut self, kind: Directive, comment: Option<String>) -> EntryId {
        let id = self.fresh_id();
        self.directives.push(SpecEntry::new(id, kind, comment));
        id
    }

    /// Returns a copy of the spec without the entry `id`.
    pub fn without(&self, id: EntryId) -> LayoutSpec {
        LayoutSpec {
            constraints: self
                .constraints
                .iter()
                .filter(|entry| entry.id() != id)
                .cloned()
                .collect(),
            directives: self
                .directives
                .iter()
                .filter(|entry| entry.id() != id)
                .cloned()
                .collect(),
            next_id: self.next_id,
        }
    }

    pub fn has_flag(&self, flag: Flag) -> bool {
        self.directives
            .iter()
            .any(|entry| *entry.kind() == Directive::Flag(flag))
    }

    /// Compares kinds, parameters and comments, ignoring entry ids.
    pub fn is_equivalent(&self, other: &LayoutSpec) -> bool {
        fn same<K: PartialEq>(a: &[SpecEntry<K>], b: &[SpecEntry<K>]) -> bool {
            a.len() == b.len()
                && a
                    .iter()
                    .zip(b)
                    .all(|(x, y)| x.kind() == y.kind() && x.comment() == y.comment())
        }
        same(&self.constraints, &other.constraints) && same(&self.directives, &other.directives)
    }

    fn fresh_id(&mut self) -> EntryId {
        let id = EntryId::new(self.next_id);
        self.next_id += 1;
        id
    }
}
