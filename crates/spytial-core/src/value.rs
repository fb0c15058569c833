//! The uniform result of evaluating a selector expression.

use indexmap::IndexSet;
use serde::Serialize;

/// A set of same-arity tuples of atom ids.
///
/// Unary values represent atom sets as singleton tuples. Tuples keep the
/// order in which they were first inserted, which in turn follows the
/// iteration order of the instance they were computed from.
///
/// # Examples
///
/// ```
/// # use spytial_core::value::SelectorValue;
/// let mut value = SelectorValue::empty(2);
/// value.insert(vec!["a".to_string(), "b".to_string()]);
/// value.insert(vec!["a".to_string(), "b".to_string()]);
///
/// assert_eq!(value.len(), 1);
/// assert!(value.contains(&["a".to_string(), "b".to_string()]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectorValue {
    arity: usize,
    tuples: IndexSet<Vec<String>>,
}

impl SelectorValue {
    /// Creates an empty value of the given arity.
    pub fn empty(arity: usize) -> Self {
        Self {
            arity,
            tuples: IndexSet::new(),
        }
    }

    /// Creates a value from tuples, skipping any whose length differs from `arity`.
    pub fn from_tuples(arity: usize, tuples: impl IntoIterator<Item = Vec<String>>) -> Self {
        let mut value = Self::empty(arity);
        for tuple in tuples {
            value.insert(tuple);
        }
        value
    }

    /// Creates a unary value from atom ids.
    pub fn unary<S: Into<String>>(atoms: impl IntoIterator<Item = S>) -> Self {
        Self::from_tuples(1, atoms.into_iter().map(|atom| vec![atom.into()]))
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Iterates over tuples in insertion order.
    pub fn tuples(&self) -> impl Iterator<Item = &[String]> + '_ {
        self.tuples.iter().map(Vec::as_slice)
    }

    /// Adds a tuple; returns false for duplicates or tuples of the wrong arity.
    pub fn insert(&mut self, tuple: Vec<String>) -> bool {
        if tuple.len() != self.arity {
            return false;
        }
        self.tuples.insert(tuple)
    }

    pub fn contains(&self, tuple: &[String]) -> bool {
        self.tuples.contains(tuple)
    }

    /// Ids of every atom in the first column, without repetition.
    pub fn first_column(&self) -> IndexSet<&str> {
        self.tuples
            .iter()
            .filter_map(|tuple| tuple.first().map(String::as_str))
            .collect()
    }

    /// Ids of every atom mentioned anywhere in the value, without repetition.
    pub fn atoms(&self) -> IndexSet<&str> {
        self.tuples
            .iter()
            .flat_map(|tuple| tuple.iter().map(String::as_str))
            .collect()
    }

    /// Returns true if a unary value contains `atom`.
    pub fn contains_atom(&self, atom: &str) -> bool {
        self.arity == 1 && self.tuples.contains(&[atom.to_string()][..])
    }
}
