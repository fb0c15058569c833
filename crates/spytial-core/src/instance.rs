//! The relational data model a layout is computed from.
//!
//! A data instance is a set of [`Atom`]s plus named [`Relation`]s whose
//! [`Tuple`]s reference atoms by id. The instance itself is owned by an
//! external editor; the layout pipeline only reads it through the
//! [`DataInstance`] trait. [`Instance`] is the concrete, validated
//! implementation used by the CLI and by tests.

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Type names treated as built-ins by the `hideDisconnectedBuiltIns` flag.
pub const BUILTIN_TYPES: &[&str] = &["Int", "seq/Int", "String"];

/// Returns true if `type_name` is one of the [`BUILTIN_TYPES`].
pub fn is_builtin_type(type_name: &str) -> bool {
    BUILTIN_TYPES.contains(&type_name)
}

/// Errors raised while building or projecting an [`Instance`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstanceError {
    #[error("atom `{0}` is defined more than once")]
    DuplicateAtom(String),

    #[error("relation `{relation}` references unknown atom `{atom}`")]
    UnknownAtom { relation: String, atom: String },

    #[error("relation `{relation}` has arity {expected} but a tuple of arity {found}")]
    ArityMismatch {
        relation: String,
        expected: usize,
        found: usize,
    },

    #[error("relation `{0}` must have arity of at least 1")]
    EmptyTuple(String),

    #[error("relation `{0}` is defined more than once")]
    DuplicateRelation(String),

    #[error("cannot project over unknown atom `{0}`")]
    UnknownProjectionAtom(String),
}

/// An indivisible labeled entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Atom {
    id: String,
    #[serde(rename = "type")]
    type_name: String,
    label: String,
}

impl Atom {
    /// Creates an atom whose label equals its id.
    pub fn new(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            type_name: type_name.into(),
        }
    }

    /// Replaces the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// An ordered list of atom ids with their parallel type names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Tuple {
    atoms: Vec<String>,
    types: Vec<String>,
}

impl Tuple {
    /// Creates a tuple. `types` must be parallel to `atoms`.
    pub fn new(atoms: Vec<String>, types: Vec<String>) -> Self {
        debug_assert_eq!(atoms.len(), types.len());
        Self { atoms, types }
    }

    pub fn atoms(&self) -> &[String] {
        &self.atoms
    }

    pub fn types(&self) -> &[String] {
        &self.types
    }

    pub fn arity(&self) -> usize {
        self.atoms.len()
    }

    /// First atom of the tuple, the edge source.
    pub fn first(&self) -> &str {
        &self.atoms[0]
    }

    /// Last atom of the tuple, the edge target.
    pub fn last(&self) -> &str {
        &self.atoms[self.atoms.len() - 1]
    }
}

/// A named set of fixed-arity tuples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relation {
    name: String,
    arity: usize,
    tuples: Vec<Tuple>,
}

impl Relation {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }
}

/// Read access to a data instance.
///
/// Implemented by whatever owns the instance (an editor, an importer, a
/// test fixture). The layout pipeline never mutates an instance.
pub trait DataInstance {
    /// All atoms, in the instance's own order.
    fn atoms(&self) -> &[Atom];

    /// All relations, in the instance's own order.
    fn relations(&self) -> &[Relation];

    /// Looks up an atom by id.
    fn atom(&self, id: &str) -> Option<&Atom> {
        self.atoms().iter().find(|atom| atom.id() == id)
    }

    /// Looks up a relation by name.
    fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations().iter().find(|rel| rel.name() == name)
    }

    /// Produces the projected sub-instance for the chosen atoms.
    ///
    /// Collaborators that cannot project return `None`, which is the default.
    fn apply_projections(&self, _atom_ids: &[String]) -> Option<Result<Instance, InstanceError>> {
        None
    }
}

/// A validated, in-memory data instance.
///
/// # Examples
///
/// ```
/// # use spytial_core::instance::{Atom, DataInstance, Instance};
/// let instance = Instance::new(
///     vec![Atom::new("Alice", "Person"), Atom::new("25", "Int")],
///     vec![("age".to_string(), vec![vec!["Alice".to_string(), "25".to_string()]])],
/// )
/// .unwrap();
///
/// assert_eq!(instance.relation("age").unwrap().arity(), 2);
/// assert_eq!(instance.relation("age").unwrap().tuples()[0].types(), ["Person", "Int"]);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "InstanceDocument")]
pub struct Instance {
    atoms: Vec<Atom>,
    relations: Vec<Relation>,
    #[serde(skip)]
    atom_index: HashMap<String, usize>,
}

impl Eq for Instance {}

impl Instance {
    /// Builds an instance, validating atom ids, tuple arities and references.
    ///
    /// Relations without tuples get arity 2; use [`Instance::with_arities`]
    /// to declare a different arity for empty relations.
    ///
    /// # Errors
    ///
    /// Returns an [`InstanceError`] for duplicate atoms or relations, tuples
    /// of inconsistent arity, empty tuples, or tuples naming unknown atoms.
    pub fn new(
        atoms: Vec<Atom>,
        relations: impl IntoIterator<Item = (String, Vec<Vec<String>>)>,
    ) -> Result<Self, InstanceError> {
        Self::with_arities(
            atoms,
            relations
                .into_iter()
                .map(|(name, tuples)| (name, None, tuples)),
        )
    }

    /// Like [`Instance::new`], with an optional declared arity per relation.
    pub fn with_arities(
        atoms: Vec<Atom>,
        relations: impl IntoIterator<Item = (String, Option<usize>, Vec<Vec<String>>)>,
    ) -> Result<Self, InstanceError> {
        let mut atom_index = HashMap::with_capacity(atoms.len());
        for (idx, atom) in atoms.iter().enumerate() {
            if atom_index.insert(atom.id.clone(), idx).is_some() {
                return Err(InstanceError::DuplicateAtom(atom.id.clone()));
            }
        }

        let mut seen_relations = HashSet::new();
        let mut built = Vec::new();
        for (name, declared_arity, raw_tuples) in relations {
            if !seen_relations.insert(name.clone()) {
                return Err(InstanceError::DuplicateRelation(name));
            }

            let arity = declared_arity
                .or_else(|| raw_tuples.first().map(Vec::len))
                .unwrap_or(2);
            if arity == 0 {
                return Err(InstanceError::EmptyTuple(name));
            }

            let mut unique: IndexSet<Vec<String>> = IndexSet::new();
            for raw in raw_tuples {
                if raw.len() != arity {
                    return Err(InstanceError::ArityMismatch {
                        relation: name,
                        expected: arity,
                        found: raw.len(),
                    });
                }
                if let Some(unknown) = raw.iter().find(|id| !atom_index.contains_key(*id)) {
                    return Err(InstanceError::UnknownAtom {
                        relation: name,
                        atom: unknown.clone(),
                    });
                }
                unique.insert(raw);
            }

            let tuples = unique
                .into_iter()
                .map(|ids| {
                    let types = ids
                        .iter()
                        .map(|id| atoms[atom_index[id]].type_name.clone())
                        .collect();
                    Tuple::new(ids, types)
                })
                .collect();

            built.push(Relation {
                name,
                arity,
                tuples,
            });
        }

        Ok(Self {
            atoms,
            relations: built,
            atom_index,
        })
    }

    /// Projects the instance over the chosen atoms.
    ///
    /// For every chosen atom, atoms sharing its type are removed. Tuples
    /// mentioning an atom of a projected type survive only when the chosen
    /// atom occupies that column, and lose the column. Tuples reduced to
    /// nothing disappear, as do relations left without any column.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::UnknownProjectionAtom`] if a chosen id is not
    /// an atom of this instance.
    pub fn project(&self, chosen: &[String]) -> Result<Instance, InstanceError> {
        let mut chosen_by_type: IndexMap<&str, &str> = IndexMap::new();
        for id in chosen {
            let atom = self
                .atom(id)
                .ok_or_else(|| InstanceError::UnknownProjectionAtom(id.clone()))?;
            chosen_by_type.entry(atom.type_name()).or_insert(atom.id());
        }

        let atoms: Vec<Atom> = self
            .atoms
            .iter()
            .filter(|atom| !chosen_by_type.contains_key(atom.type_name()))
            .cloned()
            .collect();

        let mut relations = Vec::with_capacity(self.relations.len());
        for relation in &self.relations {
            let mut arity = None;
            let mut tuples: Vec<Vec<String>> = Vec::new();

            'tuples: for tuple in &relation.tuples {
                let mut kept = Vec::with_capacity(tuple.arity());
                for (atom, type_name) in tuple.atoms.iter().zip(&tuple.types) {
                    match chosen_by_type.get(type_name.as_str()) {
                        Some(selected) if *selected == atom.as_str() => {}
                        Some(_) => continue 'tuples,
                        None => kept.push(atom.clone()),
                    }
                }
                if kept.is_empty() {
                    continue;
                }
                match arity {
                    None => arity = Some(kept.len()),
                    Some(expected) if expected != kept.len() => {
                        warn!(
                            relation = relation.name.as_str(),
                            expected,
                            found = kept.len();
                            "Dropping projected tuple of inconsistent arity",
                        );
                        continue;
                    }
                    Some(_) => {}
                }
                tuples.push(kept);
            }

            let projected_columns = relation
                .tuples
                .first()
                .map(|tuple| {
                    tuple
                        .types
                        .iter()
                        .filter(|ty| chosen_by_type.contains_key(ty.as_str()))
                        .count()
                })
                .unwrap_or(0);
            let arity = arity.unwrap_or(relation.arity - projected_columns);
            if arity == 0 {
                continue;
            }
            relations.push((relation.name.clone(), Some(arity), tuples));
        }

        debug!(
            chosen_len = chosen_by_type.len(),
            atoms_len = atoms.len();
            "Projected instance",
        );

        Instance::with_arities(atoms, relations)
    }
}

impl DataInstance for Instance {
    fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    fn relations(&self) -> &[Relation] {
        &self.relations
    }

    fn atom(&self, id: &str) -> Option<&Atom> {
        self.atom_index.get(id).map(|idx| &self.atoms[*idx])
    }

    fn apply_projections(&self, atom_ids: &[String]) -> Option<Result<Instance, InstanceError>> {
        Some(self.project(atom_ids))
    }
}

/// Serialized form of an [`Instance`].
#[derive(Debug, Deserialize)]
struct InstanceDocument {
    #[serde(default)]
    atoms: Vec<AtomDocument>,
    #[serde(default)]
    relations: Vec<RelationDocument>,
}

#[derive(Debug, Deserialize)]
struct AtomDocument {
    id: String,
    #[serde(rename = "type")]
    type_name: String,
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RelationDocument {
    name: String,
    arity: Option<usize>,
    #[serde(default)]
    tuples: Vec<Vec<String>>,
}

impl TryFrom<InstanceDocument> for Instance {
    type Error = InstanceError;

    fn try_from(doc: InstanceDocument) -> Result<Self, Self::Error> {
        let atoms = doc
            .atoms
            .into_iter()
            .map(|atom| {
                let base = Atom::new(atom.id, atom.type_name);
                match atom.label {
                    Some(label) => base.with_label(label),
                    None => base,
                }
            })
            .collect();
        Instance::with_arities(
            atoms,
            doc.relations
                .into_iter()
                .map(|rel| (rel.name, rel.arity, rel.tuples)),
        )
    }
}
