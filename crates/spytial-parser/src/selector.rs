//! Selector expressions: a small relational algebra over atoms and tuples.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! union        := intersection (('+' | '-') intersection)*
//! intersection := product ('&' product)*
//! product      := join ('->' join)*
//! join         := unary ('.' unary)*
//! unary        := ('~' | '^' | '*') unary | primary ('~' | '^' | '*')*
//! primary      := '(' union ')' | identifier
//! ```
//!
//! Identifiers made of letters, digits, `_`, `$`, `/` and `'` name relations,
//! types or atoms. `univ`, `none`, `iden` and `_` are reserved constants.

use std::{fmt, str::FromStr};

use winnow::{
    Parser as _,
    ascii::multispace0,
    combinator::{alt, cut_err, delimited, fail, not, opt, preceded, terminated},
    error::{ContextError, ErrMode, ModalResult},
    stream::{LocatingSlice, Location, Stateful},
    token::{literal, one_of, take_while},
};

use crate::{
    error::{Diagnostic, ErrorCode, Result},
    span::Span,
};

/// A parsed selector expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// A relation, type or atom, resolved against the instance at evaluation time.
    Name(String),
    /// Every atom.
    Univ,
    /// The empty set.
    None,
    /// The identity relation over every atom.
    Iden,
    /// `_`, a placeholder matching any single atom.
    Wildcard,
    Union(Box<Expr>, Box<Expr>),
    Difference(Box<Expr>, Box<Expr>),
    Intersection(Box<Expr>, Box<Expr>),
    Product(Box<Expr>, Box<Expr>),
    Join(Box<Expr>, Box<Expr>),
    Transpose(Box<Expr>),
    Closure(Box<Expr>),
    ReflexiveClosure(Box<Expr>),
}

impl Expr {
    pub fn name(name: impl Into<String>) -> Self {
        Expr::Name(name.into())
    }

    /// Returns the identifier if this expression is a bare name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Expr::Name(name) => Some(name),
            _ => None,
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Union(..) | Expr::Difference(..) => 1,
            Expr::Intersection(..) => 2,
            Expr::Product(..) => 3,
            Expr::Join(..) => 4,
            Expr::Transpose(_) | Expr::Closure(_) | Expr::ReflexiveClosure(_) => 5,
            Expr::Name(_) | Expr::Univ | Expr::None | Expr::Iden | Expr::Wildcard => 6,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }

    fn fmt_binary(
        f: &mut fmt::Formatter<'_>,
        lhs: &Expr,
        op: &str,
        rhs: &Expr,
        precedence: u8,
    ) -> fmt::Result {
        lhs.fmt_operand(f, precedence)?;
        write!(f, "{op}")?;
        // Binary operators are left-associative.
        rhs.fmt_operand(f, precedence + 1)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Name(name) => write!(f, "{name}"),
            Expr::Univ => write!(f, "univ"),
            Expr::None => write!(f, "none"),
            Expr::Iden => write!(f, "iden"),
            Expr::Wildcard => write!(f, "_"),
            Expr::Union(l, r) => Self::fmt_binary(f, l, " + ", r, 1),
            Expr::Difference(l, r) => Self::fmt_binary(f, l, " - ", r, 1),
            Expr::Intersection(l, r) => Self::fmt_binary(f, l, " & ", r, 2),
            Expr::Product(l, r) => Self::fmt_binary(f, l, " -> ", r, 3),
            Expr::Join(l, r) => Self::fmt_binary(f, l, ".", r, 4),
            Expr::Transpose(e) => {
                write!(f, "~")?;
                e.fmt_operand(f, 5)
            }
            Expr::Closure(e) => {
                write!(f, "^")?;
                e.fmt_operand(f, 5)
            }
            Expr::ReflexiveClosure(e) => {
                write!(f, "*")?;
                e.fmt_operand(f, 5)
            }
        }
    }
}

/// A selector as written in the spec, together with its parsed form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    source: String,
    expr: Expr,
}

impl Selector {
    /// The expression text, trimmed.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl FromStr for Selector {
    type Err = Diagnostic;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_selector(s)
    }
}

/// Deepest nesting accepted in one selector, counting parentheses and
/// operator applications.
pub const MAX_SELECTOR_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
struct SelectorContext {
    message: &'static str,
    help: Option<&'static str>,
}

/// Parentheses and prefix operators open at the current position.
#[derive(Debug, Clone, Copy, Default)]
struct Nesting(usize);

type Input<'a> = Stateful<LocatingSlice<&'a str>, Nesting>;
type PResult<O> = ModalResult<O, ContextError<SelectorContext>>;

const EXPECTED_OPERAND: SelectorContext = SelectorContext {
    message: "expected an operand",
    help: Some("operands are relation, type or atom names, or a parenthesized expression"),
};

const EXPECTED_CLOSE_PAREN: SelectorContext = SelectorContext {
    message: "expected `)`",
    help: Some("close the parenthesized expression"),
};

const TOO_DEEP: SelectorContext = SelectorContext {
    message: "selector nested too deeply",
    help: Some("split the expression or drop redundant parentheses"),
};

/// An expression with the height of its tree.
struct Tree {
    expr: Expr,
    height: usize,
}

impl Tree {
    fn leaf(expr: Expr) -> Self {
        Self { expr, height: 1 }
    }

    fn unary(op: char, operand: Tree) -> Self {
        Self {
            height: operand.height + 1,
            expr: apply_unary(op, operand.expr),
        }
    }

    fn binary(make: fn(Box<Expr>, Box<Expr>) -> Expr, lhs: Tree, rhs: Tree) -> Self {
        Self {
            height: lhs.height.max(rhs.height) + 1,
            expr: make(Box::new(lhs.expr), Box::new(rhs.expr)),
        }
    }
}

fn too_deep<O>(input: &mut Input<'_>) -> PResult<O> {
    cut_err(fail.context(TOO_DEEP)).parse_next(input)
}

/// Rejects trees taller than [`MAX_SELECTOR_DEPTH`].
fn checked(input: &mut Input<'_>, tree: Tree) -> PResult<Tree> {
    if tree.height > MAX_SELECTOR_DEPTH {
        return too_deep(input);
    }
    Ok(tree)
}

/// Runs `parser` one nesting level deeper.
fn nested<'a>(
    input: &mut Input<'a>,
    parser: impl FnOnce(&mut Input<'a>) -> PResult<Tree>,
) -> PResult<Tree> {
    if input.state.0 >= MAX_SELECTOR_DEPTH {
        return too_deep(input);
    }
    input.state.0 += 1;
    let result = parser(input);
    input.state.0 -= 1;
    result
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '/' | '\'')
}

fn identifier(input: &mut Input<'_>) -> PResult<Tree> {
    take_while(1.., is_identifier_char)
        .map(|ident: &str| {
            Tree::leaf(match ident {
                "univ" => Expr::Univ,
                "none" => Expr::None,
                "iden" => Expr::Iden,
                "_" => Expr::Wildcard,
                _ => Expr::Name(ident.to_string()),
            })
        })
        .parse_next(input)
}

fn primary(input: &mut Input<'_>) -> PResult<Tree> {
    if opt(('(', multispace0)).parse_next(input)?.is_some() {
        return nested(input, |input| {
            cut_err(terminated(
                union.context(EXPECTED_OPERAND),
                (multispace0, ')').context(EXPECTED_CLOSE_PAREN),
            ))
            .parse_next(input)
        });
    }
    identifier(input)
}

fn unary_operator(input: &mut Input<'_>) -> PResult<char> {
    one_of(['~', '^', '*']).parse_next(input)
}

fn apply_unary(op: char, expr: Expr) -> Expr {
    match op {
        '~' => Expr::Transpose(Box::new(expr)),
        '^' => Expr::Closure(Box::new(expr)),
        _ => Expr::ReflexiveClosure(Box::new(expr)),
    }
}

fn unary(input: &mut Input<'_>) -> PResult<Tree> {
    if let Some(op) = opt(terminated(unary_operator, multispace0)).parse_next(input)? {
        let operand = nested(input, |input| {
            cut_err(unary).context(EXPECTED_OPERAND).parse_next(input)
        })?;
        return checked(input, Tree::unary(op, operand));
    }

    let mut tree = primary(input)?;
    while let Some(op) = opt(preceded(multispace0, unary_operator)).parse_next(input)? {
        tree = checked(input, Tree::unary(op, tree))?;
    }
    Ok(tree)
}

fn binary_operand<'a>(
    operand: fn(&mut Input<'a>) -> PResult<Tree>,
) -> impl FnMut(&mut Input<'a>) -> PResult<Tree> {
    move |input: &mut Input<'a>| {
        preceded(multispace0, cut_err(operand).context(EXPECTED_OPERAND)).parse_next(input)
    }
}

fn join(input: &mut Input<'_>) -> PResult<Tree> {
    let mut tree = unary(input)?;
    while opt(delimited(multispace0, '.', multispace0))
        .parse_next(input)?
        .is_some()
    {
        let rhs = binary_operand(unary).parse_next(input)?;
        tree = checked(input, Tree::binary(Expr::Join, tree, rhs))?;
    }
    Ok(tree)
}

fn product(input: &mut Input<'_>) -> PResult<Tree> {
    let mut tree = join(input)?;
    while opt(preceded(multispace0, literal("->")))
        .parse_next(input)?
        .is_some()
    {
        let rhs = binary_operand(join).parse_next(input)?;
        tree = checked(input, Tree::binary(Expr::Product, tree, rhs))?;
    }
    Ok(tree)
}

fn intersection(input: &mut Input<'_>) -> PResult<Tree> {
    let mut tree = product(input)?;
    while opt(preceded(multispace0, '&')).parse_next(input)?.is_some() {
        let rhs = binary_operand(product).parse_next(input)?;
        tree = checked(input, Tree::binary(Expr::Intersection, tree, rhs))?;
    }
    Ok(tree)
}

fn union(input: &mut Input<'_>) -> PResult<Tree> {
    let mut tree = intersection(input)?;
    while let Some(op) = opt(preceded(
        multispace0,
        alt(('+', terminated('-', not('>')))),
    ))
    .parse_next(input)?
    {
        let rhs = binary_operand(intersection).parse_next(input)?;
        let make = match op {
            '+' => Expr::Union,
            _ => Expr::Difference,
        };
        tree = checked(input, Tree::binary(make, tree, rhs))?;
    }
    Ok(tree)
}

/// Parse a selector expression.
///
/// # Example
///
/// ```
/// # use spytial_parser::{parse_selector, Expr};
/// let selector = parse_selector("Node . ^left").unwrap();
/// assert!(matches!(selector.expr(), Expr::Join(..)));
/// assert!(parse_selector("left . ").is_err());
/// ```
pub fn parse_selector(text: &str) -> Result<Selector> {
    parse_selector_at(text, 0)
}

/// Parse a selector embedded in larger text starting at byte `offset`, so
/// diagnostics point into the enclosing document.
pub(crate) fn parse_selector_at(text: &str, offset: usize) -> Result<Selector> {
    let mut input = Stateful {
        input: LocatingSlice::new(text),
        state: Nesting::default(),
    };
    let parsed = delimited(
        multispace0,
        union.context(EXPECTED_OPERAND),
        multispace0,
    )
    .parse_next(&mut input);

    let error_pos = input.current_token_start();
    match parsed {
        Ok(tree) if error_pos == text.len() => Ok(Selector {
            source: text.trim().to_string(),
            expr: tree.expr,
        }),
        Ok(_) => {
            let span = Span::new(offset + error_pos..offset + text.len());
            Err(Diagnostic::error(format!(
                "unexpected `{}` in selector `{}`",
                text[error_pos..].trim_end(),
                text.trim()
            ))
            .with_code(ErrorCode::E100)
            .with_label(span, ErrorCode::E100.description())
            .with_help("join operands with `.`, `->`, `+`, `-` or `&`"))
        }
        Err(err) => Err(convert_err_mode(err, text, offset, error_pos)),
    }
}

fn convert_err_mode(
    err: ErrMode<ContextError<SelectorContext>>,
    text: &str,
    offset: usize,
    error_pos: usize,
) -> Diagnostic {
    let context_error = match err {
        ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => ctx,
        ErrMode::Incomplete(_) => ContextError::new(),
    };

    let at_end = text[error_pos..].trim().is_empty();
    let code = if context_error.context().any(|ctx| *ctx == TOO_DEEP) {
        ErrorCode::E102
    } else if at_end {
        ErrorCode::E101
    } else {
        ErrorCode::E100
    };
    let span = Span::new(offset + error_pos..offset + (error_pos + 1).min(text.len()));

    let message = match context_error.context().next() {
        Some(ctx) => ctx.message,
        None => code.description(),
    };
    let mut diag = Diagnostic::error(format!("{message} in selector `{}`", text.trim()))
        .with_code(code)
        .with_label(span, code.description());
    if let Some(help) = context_error.context().next().and_then(|ctx| ctx.help) {
        diag = diag.with_help(help);
    }
    diag
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Expr {
        parse_selector(text)
            .unwrap_or_else(|err| panic!("failed to parse `{text}`: {err}"))
            .expr()
            .clone()
    }

    fn name(n: &str) -> Box<Expr> {
        Box::new(Expr::name(n))
    }

    #[test]
    fn test_identifiers_and_constants() {
        assert_eq!(parse("Node"), Expr::name("Node"));
        assert_eq!(parse("seq/Int"), Expr::name("seq/Int"));
        assert_eq!(parse("Node$0"), Expr::name("Node$0"));
        assert_eq!(parse("25"), Expr::name("25"));
        assert_eq!(parse("univ"), Expr::Univ);
        assert_eq!(parse("none"), Expr::None);
        assert_eq!(parse("iden"), Expr::Iden);
        assert_eq!(parse("_"), Expr::Wildcard);
    }

    #[test]
    fn test_precedence() {
        // `.` binds tighter than `->`, which binds tighter than `&`, then `+`.
        assert_eq!(
            parse("a + b & c -> d . e"),
            Expr::Union(
                name("a"),
                Box::new(Expr::Intersection(
                    name("b"),
                    Box::new(Expr::Product(name("c"), Box::new(Expr::Join(name("d"), name("e"))))),
                )),
            )
        );
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(
            parse("a - b + c"),
            Expr::Union(Box::new(Expr::Difference(name("a"), name("b"))), name("c"))
        );
    }

    #[test]
    fn test_difference_versus_product() {
        assert_eq!(parse("a->b"), Expr::Product(name("a"), name("b")));
        assert_eq!(parse("a-b"), Expr::Difference(name("a"), name("b")));
    }

    #[test]
    fn test_prefix_and_postfix_unary() {
        assert_eq!(parse("^left"), Expr::Closure(name("left")));
        assert_eq!(parse("left^"), Expr::Closure(name("left")));
        assert_eq!(parse("~r"), Expr::Transpose(name("r")));
        assert_eq!(parse("r*"), Expr::ReflexiveClosure(name("r")));
        assert_eq!(
            parse("Node.^(left + right)"),
            Expr::Join(
                name("Node"),
                Box::new(Expr::Closure(Box::new(Expr::Union(name("left"), name("right"))))),
            )
        );
    }

    #[test]
    fn test_whitespace_is_insignificant() {
        assert_eq!(parse("  Node3   ->Node1 "), parse("Node3 -> Node1"));
        assert_eq!(parse_selector(" a . b ").unwrap().source(), "a . b");
    }

    #[test]
    fn test_incomplete_selector() {
        let err = parse_selector("left . ").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E101));

        let err = parse_selector("(a + b").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E101));

        let err = parse_selector("").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E101));
    }

    #[test]
    fn test_unexpected_token() {
        let err = parse_selector("a b").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E100));
        assert_eq!(err.primary_span(), Some(Span::new(2..3)));

        let err = parse_selector("a + )").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E100));
    }

    #[test]
    fn test_nesting_limit() {
        let parens = |n: usize| format!("{}a{}", "(".repeat(n), ")".repeat(n));
        assert_eq!(parse(&parens(MAX_SELECTOR_DEPTH)), Expr::name("a"));

        for text in [
            parens(400),
            format!("{}a", "~".repeat(400)),
            format!("a{}", "^".repeat(400)),
            format!("a{}", " + a".repeat(400)),
        ] {
            let err = parse_selector(&text).unwrap_err();
            assert_eq!(err.code(), Some(ErrorCode::E102), "{text}");
        }
    }

    #[test]
    fn test_nesting_limit_counts_operators() {
        let chain = |n: usize| format!("a{}", ".b".repeat(n));
        assert!(parse_selector(&chain(MAX_SELECTOR_DEPTH - 1)).is_ok());
        let err = parse_selector(&chain(MAX_SELECTOR_DEPTH)).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E102));
    }

    #[test]
    fn test_offsets_point_into_document() {
        let err = parse_selector_at("a b", 100).unwrap_err();
        assert_eq!(err.primary_span(), Some(Span::new(102..103)));
    }

    #[test]
    fn test_display_uses_minimal_parentheses() {
        let expr = parse("(a + b) . c");
        assert_eq!(expr.to_string(), "(a + b).c");
        assert_eq!(parse("a - (b - c)").to_string(), "a - (b - c)");
        assert_eq!(parse("~(a.b)").to_string(), "~(a.b)");
    }
}
