//! Selector evaluation against a data instance.
//!
//! Every expression evaluates to a [`SelectorValue`]. Evaluation is a
//! structural recursion over the parsed [`Expr`]; the instance is only read.
//! The only hard failure is an identifier that resolves to nothing.

use std::collections::HashMap;

use log::{trace, warn};
use thiserror::Error;

use spytial_core::{instance::DataInstance, value::SelectorValue};
use spytial_parser::{Expr, Selector, parse_selector};

/// Errors raised while evaluating a selector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("unknown identifier `{0}` in selector")]
    UnknownIdentifier(String),

    #[error("invalid selector: {0}")]
    Syntax(String),
}

/// Evaluates selectors against one instance snapshot.
///
/// # Examples
///
/// ```
/// # use spytial::eval::Evaluator;
/// # use spytial_core::instance::{Atom, Instance};
/// let instance = Instance::new(
///     vec![Atom::new("A", "Node"), Atom::new("B", "Node"), Atom::new("C", "Node")],
///     vec![(
///         "next".to_string(),
///         vec![
///             vec!["A".to_string(), "B".to_string()],
///             vec!["B".to_string(), "C".to_string()],
///         ],
///     )],
/// )
/// .unwrap();
///
/// let evaluator = Evaluator::new(&instance);
/// let reachable = evaluator.evaluate("A.^next").unwrap();
/// assert_eq!(reachable.len(), 2);
/// assert!(reachable.contains_atom("C"));
/// ```
#[derive(Clone, Copy)]
pub struct Evaluator<'a> {
    instance: &'a dyn DataInstance,
}

impl<'a> Evaluator<'a> {
    pub fn new(instance: &'a dyn DataInstance) -> Self {
        Self { instance }
    }

    /// The instance this evaluator reads.
    pub fn instance(&self) -> &'a dyn DataInstance {
        self.instance
    }

    /// Parse and evaluate selector text.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::Syntax`] for malformed text and
    /// [`EvaluationError::UnknownIdentifier`] for names that match no
    /// relation, type, constant or atom.
    pub fn evaluate(&self, text: &str) -> Result<SelectorValue, EvaluationError> {
        let selector =
            parse_selector(text).map_err(|diag| EvaluationError::Syntax(diag.message().to_string()))?;
        self.evaluate_selector(&selector)
    }

    pub fn evaluate_selector(&self, selector: &Selector) -> Result<SelectorValue, EvaluationError> {
        let value = self.evaluate_expr(selector.expr())?;
        trace!(selector = selector.source(), tuples = value.len(); "Evaluated selector");
        Ok(value)
    }

    /// Evaluate an already parsed expression.
    pub fn evaluate_expr(&self, expr: &Expr) -> Result<SelectorValue, EvaluationError> {
        match expr {
            Expr::Name(name) => self.resolve(name),
            Expr::Univ => Ok(self.shadowed("univ").unwrap_or_else(|| self.univ())),
            Expr::Wildcard => Ok(self.shadowed("_").unwrap_or_else(|| self.univ())),
            Expr::None => Ok(self
                .shadowed("none")
                .unwrap_or_else(|| SelectorValue::empty(0))),
            Expr::Iden => Ok(self.shadowed("iden").unwrap_or_else(|| self.iden())),
            Expr::Union(lhs, rhs) => {
                let (lhs, rhs) = (self.evaluate_expr(lhs)?, self.evaluate_expr(rhs)?);
                Ok(union(lhs, rhs))
            }
            Expr::Difference(lhs, rhs) => {
                let (lhs, rhs) = (self.evaluate_expr(lhs)?, self.evaluate_expr(rhs)?);
                Ok(difference(lhs, &rhs))
            }
            Expr::Intersection(lhs, rhs) => {
                let (lhs, rhs) = (self.evaluate_expr(lhs)?, self.evaluate_expr(rhs)?);
                Ok(intersection(lhs, &rhs))
            }
            Expr::Product(lhs, rhs) => {
                let (lhs, rhs) = (self.evaluate_expr(lhs)?, self.evaluate_expr(rhs)?);
                Ok(product(&lhs, &rhs))
            }
            Expr::Join(lhs, rhs) => {
                let (lhs, rhs) = (self.evaluate_expr(lhs)?, self.evaluate_expr(rhs)?);
                Ok(join(&lhs, &rhs))
            }
            Expr::Transpose(inner) => Ok(transpose(&self.evaluate_expr(inner)?)),
            Expr::Closure(inner) => {
                let value = self.evaluate_expr(inner)?;
                Ok(closure(&value, self.instance.atoms().len()))
            }
            Expr::ReflexiveClosure(inner) => {
                let value = self.evaluate_expr(inner)?;
                if value.arity() != 2 && !value.is_empty() {
                    return Ok(SelectorValue::empty(value.arity()));
                }
                let closed = closure(&value, self.instance.atoms().len());
                Ok(union(closed, self.iden()))
            }
        }
    }

    /// Resolve a name: relation, then type, then reserved constant, then atom id.
    fn resolve(&self, name: &str) -> Result<SelectorValue, EvaluationError> {
        if let Some(value) = self.shadowed(name) {
            return Ok(value);
        }
        match name {
            "univ" | "_" => return Ok(self.univ()),
            "none" => return Ok(SelectorValue::empty(0)),
            "iden" => return Ok(self.iden()),
            _ => {}
        }
        if self.instance.atom(name).is_some() {
            return Ok(SelectorValue::unary([name]));
        }
        Err(EvaluationError::UnknownIdentifier(name.to_string()))
    }

    /// A relation or type carrying a name, which takes precedence over constants.
    fn shadowed(&self, name: &str) -> Option<SelectorValue> {
        if let Some(relation) = self.instance.relation(name) {
            return Some(SelectorValue::from_tuples(
                relation.arity(),
                relation.tuples().iter().map(|tuple| tuple.atoms().to_vec()),
            ));
        }
        let mut of_type = self
            .instance
            .atoms()
            .iter()
            .filter(|atom| atom.type_name() == name)
            .map(|atom| atom.id())
            .peekable();
        of_type.peek()?;
        Some(SelectorValue::unary(of_type))
    }

    fn univ(&self) -> SelectorValue {
        SelectorValue::unary(self.instance.atoms().iter().map(|atom| atom.id()))
    }

    fn iden(&self) -> SelectorValue {
        SelectorValue::from_tuples(
            2,
            self.instance
                .atoms()
                .iter()
                .map(|atom| vec![atom.id().to_string(), atom.id().to_string()]),
        )
    }
}

/// Reconciles operand arities for a set operator. Empty operands adopt the
/// other side's arity; otherwise a mismatch yields `None`.
fn set_arity(op: &str, lhs: &SelectorValue, rhs: &SelectorValue) -> Option<usize> {
    if lhs.arity() == rhs.arity() {
        Some(lhs.arity())
    } else if rhs.is_empty() {
        Some(lhs.arity())
    } else if lhs.is_empty() {
        Some(rhs.arity())
    } else {
        warn!(
            op,
            lhs_arity = lhs.arity(),
            rhs_arity = rhs.arity();
            "Set operator applied to values of different arity",
        );
        None
    }
}

fn union(lhs: SelectorValue, rhs: SelectorValue) -> SelectorValue {
    match set_arity("+", &lhs, &rhs) {
        Some(arity) => SelectorValue::from_tuples(
            arity,
            lhs.tuples().chain(rhs.tuples()).map(<[String]>::to_vec),
        ),
        None => SelectorValue::empty(lhs.arity()),
    }
}

fn difference(lhs: SelectorValue, rhs: &SelectorValue) -> SelectorValue {
    match set_arity("-", &lhs, rhs) {
        Some(_) => SelectorValue::from_tuples(
            lhs.arity(),
            lhs.tuples()
                .filter(|tuple| !rhs.contains(tuple))
                .map(<[String]>::to_vec),
        ),
        None => SelectorValue::empty(lhs.arity()),
    }
}

fn intersection(lhs: SelectorValue, rhs: &SelectorValue) -> SelectorValue {
    match set_arity("&", &lhs, rhs) {
        Some(arity) => SelectorValue::from_tuples(
            arity,
            lhs.tuples()
                .filter(|tuple| rhs.contains(tuple))
                .map(<[String]>::to_vec),
        ),
        None => SelectorValue::empty(lhs.arity()),
    }
}

fn product(lhs: &SelectorValue, rhs: &SelectorValue) -> SelectorValue {
    let arity = lhs.arity() + rhs.arity();
    let mut value = SelectorValue::empty(arity);
    for left in lhs.tuples() {
        for right in rhs.tuples() {
            value.insert(left.iter().chain(right).cloned().collect());
        }
    }
    value
}

/// Relational join: the last column of `lhs` is matched against the first
/// column of `rhs` and both are dropped from the result.
fn join(lhs: &SelectorValue, rhs: &SelectorValue) -> SelectorValue {
    if lhs.arity() == 0 || rhs.arity() == 0 || lhs.arity() + rhs.arity() < 3 {
        return SelectorValue::empty((lhs.arity() + rhs.arity()).saturating_sub(2));
    }
    let arity = lhs.arity() + rhs.arity() - 2;

    let mut by_first: HashMap<&str, Vec<&[String]>> = HashMap::new();
    for tuple in rhs.tuples() {
        by_first.entry(tuple[0].as_str()).or_default().push(tuple);
    }

    let mut value = SelectorValue::empty(arity);
    for left in lhs.tuples() {
        let (last, head) = match left.split_last() {
            Some(split) => split,
            None => continue,
        };
        let Some(matches) = by_first.get(last.as_str()) else {
            continue;
        };
        for right in matches {
            value.insert(head.iter().chain(&right[1..]).cloned().collect());
        }
    }
    value
}

fn transpose(value: &SelectorValue) -> SelectorValue {
    SelectorValue::from_tuples(
        value.arity(),
        value
            .tuples()
            .map(|tuple| tuple.iter().rev().cloned().collect()),
    )
}

/// Transitive closure of a binary value, iterating at most `bound` times.
fn closure(value: &SelectorValue, bound: usize) -> SelectorValue {
    if value.arity() != 2 {
        return SelectorValue::empty(value.arity());
    }
    let mut result = value.clone();
    for _ in 0..bound {
        let step = join(&result, value);
        let before = result.len();
        for tuple in step.tuples() {
            result.insert(tuple.to_vec());
        }
        if result.len() == before {
            break;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use spytial_core::instance::{Atom, Instance};

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn tree() -> Instance {
        let atoms = (0..5).map(|i| Atom::new(format!("Node{i}"), "Node")).collect();
        Instance::new(
            atoms,
            vec![
                (
                    "left".to_string(),
                    vec![ids(&["Node0", "Node1"]), ids(&["Node1", "Node3"])],
                ),
                (
                    "right".to_string(),
                    vec![ids(&["Node0", "Node2"]), ids(&["Node1", "Node4"])],
                ),
            ],
        )
        .unwrap()
    }

    fn people() -> Instance {
        Instance::new(
            vec![
                Atom::new("Alice", "Person"),
                Atom::new("Bob", "Person"),
                Atom::new("25", "Int"),
                Atom::new("30", "Int"),
            ],
            vec![
                (
                    "age".to_string(),
                    vec![ids(&["Alice", "25"]), ids(&["Bob", "30"])],
                ),
                (
                    "score".to_string(),
                    vec![ids(&["Alice", "Bob", "25"])],
                ),
            ],
        )
        .unwrap()
    }

    fn eval(instance: &Instance, text: &str) -> SelectorValue {
        Evaluator::new(instance).evaluate(text).unwrap()
    }

    #[test]
    fn test_name_resolution_order() {
        let instance = people();
        assert_eq!(eval(&instance, "age").arity(), 2);
        assert_eq!(eval(&instance, "Person"), SelectorValue::unary(["Alice", "Bob"]));
        assert_eq!(eval(&instance, "Alice"), SelectorValue::unary(["Alice"]));
        assert_eq!(eval(&instance, "25"), SelectorValue::unary(["25"]));
        assert_eq!(eval(&instance, "univ").len(), 4);
        assert_eq!(eval(&instance, "_").len(), 4);
        assert_eq!(eval(&instance, "iden").len(), 4);
        assert!(eval(&instance, "none").is_empty());
    }

    #[test]
    fn test_relation_shadows_constant() {
        let instance = Instance::new(
            vec![Atom::new("a", "T"), Atom::new("b", "T")],
            vec![("iden".to_string(), vec![ids(&["a", "b"])])],
        )
        .unwrap();
        assert_eq!(eval(&instance, "iden"), SelectorValue::from_tuples(2, [ids(&["a", "b"])]));
    }

    #[test]
    fn test_unknown_identifier() {
        let instance = people();
        let err = Evaluator::new(&instance).evaluate("Person.height").unwrap_err();
        assert_eq!(err, EvaluationError::UnknownIdentifier("height".to_string()));
        assert!(err.to_string().contains("height"));
    }

    #[test]
    fn test_syntax_error() {
        let instance = people();
        let err = Evaluator::new(&instance).evaluate("age .").unwrap_err();
        assert!(matches!(err, EvaluationError::Syntax(_)));
    }

    #[test]
    fn test_join() {
        let instance = people();
        assert_eq!(eval(&instance, "Alice.age"), SelectorValue::unary(["25"]));
        assert_eq!(eval(&instance, "age.30"), SelectorValue::unary(["Bob"]));
        let ternary = eval(&instance, "Alice.score");
        assert_eq!(ternary, SelectorValue::from_tuples(2, [ids(&["Bob", "25"])]));
        assert_eq!(eval(&instance, "score.25").arity(), 2);
    }

    #[test]
    fn test_join_without_matches_is_empty() {
        let instance = people();
        let value = eval(&instance, "age.age");
        assert!(value.is_empty());
        assert_eq!(value.arity(), 2);
        assert!(eval(&instance, "Alice.Bob").is_empty());
    }

    #[test]
    fn test_set_operators() {
        let instance = people();
        assert_eq!(eval(&instance, "Alice + Bob"), SelectorValue::unary(["Alice", "Bob"]));
        assert_eq!(eval(&instance, "Person - Alice"), SelectorValue::unary(["Bob"]));
        assert_eq!(eval(&instance, "Person & Alice"), SelectorValue::unary(["Alice"]));
        assert_eq!(eval(&instance, "Person + none"), SelectorValue::unary(["Alice", "Bob"]));
        assert_eq!(eval(&instance, "none + age").arity(), 2);
    }

    #[test]
    fn test_mismatched_set_operator_is_empty() {
        let instance = people();
        let value = eval(&instance, "Person + age");
        assert!(value.is_empty());
        assert_eq!(value.arity(), 1);
    }

    #[test]
    fn test_product_and_transpose() {
        let instance = people();
        let product = eval(&instance, "Alice -> 25");
        assert_eq!(product, SelectorValue::from_tuples(2, [ids(&["Alice", "25"])]));
        assert_eq!(eval(&instance, "~age").tuples().next(), Some(&ids(&["25", "Alice"])[..]));
        assert_eq!(
            eval(&instance, "~score"),
            SelectorValue::from_tuples(3, [ids(&["25", "Bob", "Alice"])])
        );
    }

    #[test]
    fn test_closures() {
        let instance = tree();
        let descendants = eval(&instance, "Node0.^(left + right)");
        assert_eq!(descendants.len(), 4);
        assert!(!descendants.contains_atom("Node0"));

        let reflexive = eval(&instance, "Node0.*(left + right)");
        assert_eq!(reflexive.len(), 5);
        assert!(reflexive.contains_atom("Node0"));

        assert_eq!(eval(&instance, "left^"), eval(&instance, "^left"));
        assert!(eval(&instance, "^Node").is_empty());
    }

    #[test]
    fn test_closure_terminates_on_cycles() {
        let instance = Instance::new(
            vec![Atom::new("a", "T"), Atom::new("b", "T")],
            vec![("next".to_string(), vec![ids(&["a", "b"]), ids(&["b", "a"])])],
        )
        .unwrap();
        assert_eq!(eval(&instance, "^next").len(), 4);
    }

    #[test]
    fn test_evaluation_is_repeatable() {
        let instance = tree();
        let evaluator = Evaluator::new(&instance);
        let first = evaluator.evaluate("^(left + right) - iden").unwrap();
        let second = evaluator.evaluate("^(left + right) - iden").unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.tuples().collect::<Vec<_>>(),
            second.tuples().collect::<Vec<_>>()
        );
    }
}
