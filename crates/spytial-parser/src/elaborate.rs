//! Turns a document tree into a typed [`LayoutSpec`].

use indexmap::IndexMap;
use log::debug;

use crate::{
    document::{MapEntry, Node, SeqItem, Value},
    error::{Diagnostic, DiagnosticCollector, ErrorCode, ParseError},
    selector::{Selector, parse_selector_at},
    spec::*,
    span::{Span, Spanned},
};

const CONSTRAINT_KINDS: [&str; 10] = [
    "orientation",
    "align",
    "cyclic",
    "group",
    "groupfield",
    "groupselector",
    "groups",
    "size",
    "hideAtom",
    // Accepted spelling of `hideAtom` in older specs.
    "hideatom",
];

const DIRECTIVE_KINDS: [&str; 9] = [
    "attribute",
    "hideField",
    "icon",
    "atomColor",
    "edgeColor",
    "projection",
    "flag",
    "inferredEdge",
    "tag",
];

/// Convert a document node to a raw value, dropping spans and quoting.
pub(crate) fn to_raw(node: &Node) -> RawValue {
    match node.inner() {
        Value::Null => RawValue::Null,
        Value::Scalar(scalar) if scalar.is_null() => RawValue::Null,
        Value::Scalar(scalar) => RawValue::Scalar(scalar.text.clone()),
        Value::Seq(items) => RawValue::Seq(items.iter().map(|item| to_raw(&item.node)).collect()),
        Value::Map(entries) => RawValue::Map(
            entries
                .iter()
                .map(|entry| (entry.key.inner().clone(), to_raw(&entry.value)))
                .collect::<IndexMap<_, _>>(),
        ),
    }
}

/// Typed access to the parameters of one entry.
///
/// Every accessor records the key as used; whatever remains unused when
/// [`Params::finish`] is called is reported as an unknown parameter.
struct Params<'a> {
    kind: &'a str,
    kind_span: Span,
    entries: &'a [MapEntry],
    used: Vec<bool>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Params<'a> {
    fn new(kind: &'a Spanned<String>, node: &'a Node) -> Result<Self, Diagnostic> {
        let entries: &'a [MapEntry] = match node.inner() {
            Value::Map(entries) => entries,
            Value::Null => &[],
            other => {
                return Err(Diagnostic::error(format!(
                    "`{}` expects a mapping of parameters, found {}",
                    **kind,
                    other.shape()
                ))
                .with_code(ErrorCode::E204)
                .with_label(node.span(), ErrorCode::E204.description())
                .with_help("nest the parameters under the kind, one `name: value` per line"));
            }
        };
        Ok(Self {
            kind: kind.inner(),
            kind_span: kind.span(),
            entries,
            used: vec![false; entries.len()],
            diagnostics: Vec::new(),
        })
    }

    fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| *entry.key == name)
    }

    /// Look up `name`, treating explicit nulls as absent.
    fn get(&mut self, name: &str) -> Option<&'a Node> {
        let index = self.entries.iter().position(|entry| *entry.key == name)?;
        self.used[index] = true;
        let node = &self.entries[index].value;
        match node.inner() {
            Value::Null => None,
            Value::Scalar(scalar) if scalar.is_null() => None,
            _ => Some(node),
        }
    }

    fn missing(&mut self, name: &str) {
        self.diagnostics.push(
            Diagnostic::error(format!("`{}` requires parameter `{name}`", self.kind))
                .with_code(ErrorCode::E203)
                .with_label(self.kind_span, ErrorCode::E203.description())
                .with_help(format!("add `{name}: ...` under `{}`", self.kind)),
        );
    }

    fn invalid(&mut self, name: &str, node: &Node, expected: &str) {
        self.diagnostics.push(
            Diagnostic::error(format!(
                "parameter `{name}` of `{}` must be {expected}",
                self.kind
            ))
            .with_code(ErrorCode::E204)
            .with_label(node.span(), ErrorCode::E204.description()),
        );
    }

    fn scalar_text(&mut self, name: &str, node: &'a Node) -> Option<(&'a str, usize)> {
        match node.inner() {
            Value::Scalar(scalar) => Some((&scalar.text, node.span().start() + scalar.content_offset())),
            _ => {
                self.invalid(name, node, "a scalar");
                None
            }
        }
    }

    fn optional_string(&mut self, name: &str) -> Option<String> {
        let node = self.get(name)?;
        self.scalar_text(name, node).map(|(text, _)| text.to_string())
    }

    fn required_string(&mut self, name: &str) -> Option<String> {
        if self.get(name).is_none() {
            self.missing(name);
            return None;
        }
        self.optional_string(name)
    }

    fn parse_selector(&mut self, name: &str, node: &'a Node) -> Option<Selector> {
        let (text, offset) = self.scalar_text(name, node)?;
        match parse_selector_at(text, offset) {
            Ok(selector) => Some(selector),
            Err(diag) => {
                self.diagnostics.push(diag);
                None
            }
        }
    }

    fn required_selector(&mut self, name: &str) -> Option<Selector> {
        match self.get(name) {
            Some(node) => self.parse_selector(name, node),
            None => {
                self.missing(name);
                None
            }
        }
    }

    /// `Ok(None)` when absent, `Err(())` when present but malformed.
    fn optional_selector(&mut self, name: &str) -> Result<Option<Selector>, ()> {
        match self.get(name) {
            Some(node) => self.parse_selector(name, node).map(Some).ok_or(()),
            None => Ok(None),
        }
    }

    fn optional_bool(&mut self, name: &str) -> Result<Option<bool>, ()> {
        let Some(node) = self.get(name) else {
            return Ok(None);
        };
        let (text, _) = self.scalar_text(name, node).ok_or(())?;
        match text.to_ascii_lowercase().as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => {
                self.invalid(name, node, "`true` or `false`");
                Err(())
            }
        }
    }

    fn optional_number(&mut self, name: &str) -> Result<Option<f64>, ()> {
        let Some(node) = self.get(name) else {
            return Ok(None);
        };
        let (text, _) = self.scalar_text(name, node).ok_or(())?;
        match text.trim().parse::<f64>() {
            Ok(value) if value.is_finite() && value >= 0.0 => Ok(Some(value)),
            _ => {
                self.invalid(name, node, "a non-negative number");
                Err(())
            }
        }
    }

    fn index_or(&mut self, name: &str, default: usize) -> Result<usize, ()> {
        let Some(node) = self.get(name) else {
            return Ok(default);
        };
        let (text, _) = self.scalar_text(name, node).ok_or(())?;
        text.trim().parse::<usize>().map_err(|_| {
            self.invalid(name, node, "a column index (0, 1, 2, ...)");
        })
    }

    /// A sequence of scalars; a single scalar is read as a one-item list.
    fn string_list(&mut self, name: &str) -> Result<Option<Vec<Spanned<String>>>, ()> {
        let Some(node) = self.get(name) else {
            return Ok(None);
        };
        match node.inner() {
            Value::Scalar(scalar) => Ok(Some(vec![Spanned::new(scalar.text.clone(), node.span())])),
            Value::Seq(items) => {
                let mut values = Vec::with_capacity(items.len());
                for SeqItem { node: item, .. } in items {
                    match item.inner() {
                        Value::Scalar(scalar) => {
                            values.push(Spanned::new(scalar.text.clone(), item.span()))
                        }
                        _ => {
                            self.invalid(name, item, "a list of words");
                            return Err(());
                        }
                    }
                }
                Ok(Some(values))
            }
            _ => {
                self.invalid(name, node, "a list of words");
                Err(())
            }
        }
    }

    fn error(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Report unused parameters as warnings and hand back all diagnostics.
    fn finish(mut self) -> Vec<Diagnostic> {
        for (entry, used) in self.entries.iter().zip(&self.used) {
            if !used {
                self.diagnostics.push(
                    Diagnostic::warning(format!(
                        "unknown parameter `{}` on `{}` ignored",
                        *entry.key, self.kind
                    ))
                    .with_label(entry.key.span(), "unknown parameter"),
                );
            }
        }
        self.diagnostics
    }
}

fn orientation(params: &mut Params<'_>) -> Option<Constraint> {
    let selector = params.required_selector("selector");
    let words = match params.string_list("directions") {
        Ok(Some(words)) if !words.is_empty() => words,
        Ok(_) => {
            params.missing("directions");
            return None;
        }
        Err(()) => return None,
    };

    let mut directions: Vec<Direction> = Vec::new();
    for word in &words {
        match Direction::parse(word) {
            Some(direction) if !directions.contains(&direction) => directions.push(direction),
            Some(_) => {}
            None => {
                params.error(
                    Diagnostic::error(format!("unknown direction `{}`", **word))
                        .with_code(ErrorCode::E204)
                        .with_label(word.span(), ErrorCode::E204.description())
                        .with_help(format!(
                            "valid directions: {}",
                            Direction::ALL.map(|d| d.as_str()).join(", ")
                        )),
                );
                return None;
            }
        }
    }

    for (i, a) in directions.iter().enumerate() {
        if let Some(b) = directions[i + 1..].iter().find(|b| b.base() == a.opposite()) {
            let span = words
                .first()
                .map(|w| w.span())
                .unwrap_or_default()
                .union(words.last().map(|w| w.span()).unwrap_or_default());
            params.error(
                Diagnostic::error(format!("orientation directions `{a}` and `{b}` contradict each other"))
                    .with_code(ErrorCode::E205)
                    .with_label(span, ErrorCode::E205.description())
                    .with_help("split this into two orientation constraints with different selectors"),
            );
            return None;
        }
    }

    Some(Constraint::Orientation(OrientationConstraint {
        selector: selector?,
        directions,
    }))
}

fn align(params: &mut Params<'_>) -> Option<Constraint> {
    let selector = params.required_selector("selector");
    let node = match params.get("direction") {
        Some(node) => node,
        None => {
            params.missing("direction");
            return None;
        }
    };
    let (text, _) = params.scalar_text("direction", node)?;
    let Some(direction) = AlignDirection::parse(text) else {
        params.invalid("direction", node, "`horizontal` or `vertical`");
        return None;
    };
    Some(Constraint::Align(AlignConstraint {
        selector: selector?,
        direction,
    }))
}

fn cyclic(params: &mut Params<'_>) -> Option<Constraint> {
    let selector = params.required_selector("selector");
    let direction = match params.get("direction") {
        None => Rotation::default(),
        Some(node) => {
            let (text, _) = params.scalar_text("direction", node)?;
            match Rotation::parse(text) {
                Some(rotation) => rotation,
                None => {
                    params.invalid("direction", node, "`clockwise` or `counterclockwise`");
                    return None;
                }
            }
        }
    };
    Some(Constraint::Cyclic(CyclicConstraint {
        selector: selector?,
        direction,
    }))
}

fn group_by_field(params: &mut Params<'_>) -> Option<Constraint> {
    let field = params.required_string("field");
    let group_on = params.index_or("groupOn", 0).ok();
    let add_to_group = params.index_or("addToGroup", 1).ok();
    let selector = params.optional_selector("selector").ok();
    Some(Constraint::GroupByField(GroupByField {
        field: field?,
        group_on: group_on?,
        add_to_group: add_to_group?,
        selector: selector?,
    }))
}

fn group_by_selector(params: &mut Params<'_>) -> Option<Constraint> {
    let selector = params.required_selector("selector");
    let name = params.required_string("name");
    let add_edge = params.optional_bool("addEdge").ok();
    Some(Constraint::GroupBySelector(GroupBySelector {
        selector: selector?,
        name: name?,
        add_edge: add_edge?.unwrap_or(false),
    }))
}

fn group(kind: &str, params: &mut Params<'_>) -> Option<Constraint> {
    match kind {
        "groupfield" => group_by_field(params),
        "groupselector" | "groups" => group_by_selector(params),
        _ if params.has("field") => group_by_field(params),
        _ if params.has("selector") => group_by_selector(params),
        _ => {
            params.missing("field` or `selector");
            None
        }
    }
}

fn size(params: &mut Params<'_>) -> Option<Constraint> {
    let selector = params.required_selector("selector");
    let width = params.optional_number("width").ok()?;
    let height = params.optional_number("height").ok()?;
    if width.is_none() && height.is_none() {
        params.missing("width` or `height");
        return None;
    }
    Some(Constraint::Size(SizeConstraint {
        selector: selector?,
        width,
        height,
    }))
}

fn hide_atom(params: &mut Params<'_>) -> Option<Constraint> {
    let selector = params.required_selector("selector")?;
    Some(Constraint::HideAtom(HideAtom { selector }))
}

fn attribute(params: &mut Params<'_>) -> Option<Directive> {
    let field = params.required_string("field");
    let selector = params.optional_selector("selector").ok()?;
    Some(Directive::Attribute(AttributeDirective {
        field: field?,
        selector,
    }))
}

fn hide_field(params: &mut Params<'_>) -> Option<Directive> {
    let field = params.required_string("field");
    let selector = params.optional_selector("selector").ok()?;
    Some(Directive::HideField(HideFieldDirective {
        field: field?,
        selector,
    }))
}

fn icon(params: &mut Params<'_>) -> Option<Directive> {
    let selector = params.required_selector("selector");
    let path = params.required_string("path");
    let show_labels = params.optional_bool("showLabels").ok()?;
    Some(Directive::Icon(IconDirective {
        selector: selector?,
        path: path?,
        show_labels: show_labels.unwrap_or(false),
    }))
}

fn atom_color(params: &mut Params<'_>) -> Option<Directive> {
    let selector = params.required_selector("selector");
    let value = params.required_string("value");
    Some(Directive::AtomColor(AtomColorDirective {
        selector: selector?,
        value: value?,
    }))
}

fn edge_color(params: &mut Params<'_>) -> Option<Directive> {
    let field = params.required_string("field");
    let value = params.required_string("value");
    let selector = params.optional_selector("selector").ok();
    let filter = params.optional_selector("filter").ok();
    let style = params.optional_string("style");
    let weight = params.optional_number("weight").ok();
    let show_label = params.optional_bool("showLabel").ok();
    let hidden = params.optional_bool("hidden").ok();
    Some(Directive::EdgeColor(EdgeStyleDirective {
        field: field?,
        value: value?,
        selector: selector?,
        filter: filter?,
        style,
        weight: weight?,
        show_label: show_label?,
        hidden: hidden?.unwrap_or(false),
    }))
}

fn projection(params: &mut Params<'_>) -> Option<Directive> {
    let sig = params.required_string("sig");
    let order_by = params.optional_selector("orderBy").ok()?;
    Some(Directive::Projection(ProjectionDirective { sig: sig?, order_by }))
}

fn inferred_edge(params: &mut Params<'_>) -> Option<Directive> {
    let name = params.required_string("name");
    let selector = params.required_selector("selector");
    let color = params.optional_string("color");
    let style = params.optional_string("style");
    let weight = params.optional_number("weight").ok();
    Some(Directive::InferredEdge(InferredEdgeDirective {
        name: name?,
        selector: selector?,
        color,
        style,
        weight: weight?,
    }))
}

fn tag(params: &mut Params<'_>) -> Option<Directive> {
    let to_tag = params.required_selector("toTag");
    let name = params.required_string("name");
    let value = params.required_selector("value");
    Some(Directive::Tag(TagDirective {
        to_tag: to_tag?,
        name: name?,
        value: value?,
    }))
}

/// `flag` takes its value directly: `flag: hideDisconnected`.
fn flag(kind: &Spanned<String>, node: &Node) -> Result<Directive, Diagnostic> {
    let invalid = || {
        Diagnostic::error(format!("`{}` must be `hideDisconnected` or `hideDisconnectedBuiltIns`", **kind))
            .with_code(ErrorCode::E204)
            .with_label(node.span(), ErrorCode::E204.description())
    };
    match node.inner() {
        Value::Scalar(scalar) => Flag::parse(&scalar.text).map(Directive::Flag).ok_or_else(invalid),
        Value::Null => Err(Diagnostic::error("`flag` requires a value")
            .with_code(ErrorCode::E203)
            .with_label(kind.span(), ErrorCode::E203.description())
            .with_help("write `flag: hideDisconnected` or `flag: hideDisconnectedBuiltIns`")),
        _ => Err(invalid()),
    }
}

enum Elaborated {
    Constraint(Constraint),
    Directive(Directive),
}

struct Elaborator {
    diagnostics: DiagnosticCollector,
    spec: LayoutSpec,
}

impl Elaborator {
    fn new() -> Self {
        Self {
            diagnostics: DiagnosticCollector::new(),
            spec: LayoutSpec::new(),
        }
    }

    fn section_items<'n>(&mut self, key: &Spanned<String>, node: &'n Node) -> &'n [SeqItem] {
        match node.inner() {
            Value::Seq(items) => items,
            Value::Null => &[],
            Value::Scalar(scalar) if scalar.is_null() => &[],
            other => {
                self.diagnostics.emit(
                    Diagnostic::error(format!(
                        "`{}` must be a sequence of entries, found {}",
                        **key,
                        other.shape()
                    ))
                    .with_code(ErrorCode::E201)
                    .with_label(node.span(), ErrorCode::E201.description())
                    .with_help("start each entry on its own line with `- `"),
                );
                &[]
            }
        }
    }

    fn elaborate_root(&mut self, root: &Node) {
        let entries = match root.inner() {
            Value::Map(entries) => entries,
            Value::Null => return,
            other => {
                self.diagnostics.emit(
                    Diagnostic::error(format!(
                        "a layout spec must be a mapping, found {}",
                        other.shape()
                    ))
                    .with_code(ErrorCode::E200)
                    .with_label(root.span(), ErrorCode::E200.description())
                    .with_help("start the spec with `constraints:` and/or `directives:`"),
                );
                return;
            }
        };

        for entry in entries {
            let section = match entry.key.as_str() {
                "constraints" => Section::Constraints,
                "directives" => Section::Directives,
                other => {
                    self.diagnostics.emit(
                        Diagnostic::warning(format!("unknown top-level section `{other}` ignored"))
                            .with_label(entry.key.span(), "unknown section"),
                    );
                    continue;
                }
            };
            for item in self.section_items(&entry.key, &entry.value) {
                self.elaborate_item(section, item);
            }
        }
    }

    fn elaborate_item(&mut self, section: Section, item: &SeqItem) {
        let (kind, params) = match item.node.inner() {
            Value::Map(entries) if entries.len() == 1 => (&entries[0].key, &entries[0].value),
            other => {
                self.diagnostics.emit(
                    Diagnostic::error(format!(
                        "each entry must be a single-key mapping naming its kind, found {}",
                        match other {
                            Value::Map(entries) => format!("a mapping with {} keys", entries.len()),
                            other => other.shape().to_string(),
                        }
                    ))
                    .with_code(ErrorCode::E202)
                    .with_label(item.node.span(), ErrorCode::E202.description())
                    .with_help("write `- kindName:` and nest the parameters below it"),
                );
                return;
            }
        };
        let comment = item.comment.clone();

        let Some(elaborated) = self.elaborate_kind(section, kind, params) else {
            return;
        };

        let canonical = match &elaborated {
            Elaborated::Constraint(_) => Section::Constraints,
            Elaborated::Directive(_) => Section::Directives,
        };
        if canonical != section && !matches!(kind.as_str(), "size" | "hideAtom" | "hideatom") {
            self.diagnostics.emit(
                Diagnostic::warning(format!(
                    "`{}` belongs in `{canonical}`; moved from `{section}`",
                    **kind
                ))
                .with_label(kind.span(), "misplaced entry"),
            );
        }

        match elaborated {
            Elaborated::Constraint(constraint) => {
                self.spec.push_constraint(constraint, comment);
            }
            Elaborated::Directive(directive) => {
                self.spec.push_directive(directive, comment);
            }
        }
    }

    fn elaborate_kind(
        &mut self,
        section: Section,
        kind: &Spanned<String>,
        params_node: &Node,
    ) -> Option<Elaborated> {
        let name = kind.as_str();

        if name == "flag" {
            return match flag(kind, params_node) {
                Ok(directive) => Some(Elaborated::Directive(directive)),
                Err(diag) => {
                    self.diagnostics.emit(diag);
                    None
                }
            };
        }

        if !CONSTRAINT_KINDS.contains(&name) && !DIRECTIVE_KINDS.contains(&name) {
            let label = match section {
                Section::Constraints => "constraint",
                Section::Directives => "directive",
            };
            self.diagnostics.emit(
                Diagnostic::warning(format!("unknown {label} kind `{name}`; entry kept unchanged"))
                    .with_label(kind.span(), "unknown kind"),
            );
            let unknown = UnknownEntry {
                kind: name.to_string(),
                params: to_raw(params_node),
            };
            return Some(match section {
                Section::Constraints => Elaborated::Constraint(Constraint::Unknown(unknown)),
                Section::Directives => Elaborated::Directive(Directive::Unknown(unknown)),
            });
        }

        let mut params = match Params::new(kind, params_node) {
            Ok(params) => params,
            Err(diag) => {
                self.diagnostics.emit(diag);
                return None;
            }
        };

        let elaborated = match name {
            "orientation" => orientation(&mut params).map(Elaborated::Constraint),
            "align" => align(&mut params).map(Elaborated::Constraint),
            "cyclic" => cyclic(&mut params).map(Elaborated::Constraint),
            "group" | "groupfield" | "groupselector" | "groups" => {
                group(name, &mut params).map(Elaborated::Constraint)
            }
            "size" => size(&mut params).map(Elaborated::Constraint),
            "hideAtom" | "hideatom" => hide_atom(&mut params).map(Elaborated::Constraint),
            "attribute" => attribute(&mut params).map(Elaborated::Directive),
            "hideField" => hide_field(&mut params).map(Elaborated::Directive),
            "icon" => icon(&mut params).map(Elaborated::Directive),
            "atomColor" => atom_color(&mut params).map(Elaborated::Directive),
            "edgeColor" => edge_color(&mut params).map(Elaborated::Directive),
            "projection" => projection(&mut params).map(Elaborated::Directive),
            "inferredEdge" => inferred_edge(&mut params).map(Elaborated::Directive),
            _ => tag(&mut params).map(Elaborated::Directive),
        };

        for diag in params.finish() {
            self.diagnostics.emit(diag);
        }
        elaborated
    }

    fn finish(self) -> Result<(LayoutSpec, Vec<Diagnostic>), ParseError> {
        let Self { diagnostics, spec } = self;
        let warnings = diagnostics.finish()?;
        debug!(
            constraints = spec.constraints().len(),
            directives = spec.directives().len(),
            warnings = warnings.len();
            "Elaborated layout spec",
        );
        Ok((spec, warnings))
    }
}

/// Build a typed spec from a document tree.
pub(crate) fn elaborate(root: &Node) -> Result<(LayoutSpec, Vec<Diagnostic>), ParseError> {
    let mut elaborator = Elaborator::new();
    elaborator.elaborate_root(root);
    elaborator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::read_document;

    fn elaborate_text(src: &str) -> Result<(LayoutSpec, Vec<Diagnostic>), ParseError> {
        elaborate(&read_document(src).unwrap())
    }

    #[test]
    fn test_group_variants() {
        let (spec, warnings) = elaborate_text(
            "constraints:\n  - group:\n      field: children\n      groupOn: 1\n      addToGroup: 2\n  - group:\n      selector: Red\n      name: reds\n      addEdge: true\n  - groups:\n      selector: Blue\n      name: blues\n",
        )
        .unwrap();
        assert!(warnings.is_empty());
        assert_eq!(
            *spec.constraints()[0].kind(),
            Constraint::GroupByField(GroupByField {
                field: "children".into(),
                group_on: 1,
                add_to_group: 2,
                selector: None,
            })
        );
        assert!(matches!(
            spec.constraints()[1].kind(),
            Constraint::GroupBySelector(GroupBySelector { add_edge: true, .. })
        ));
        assert!(matches!(
            spec.constraints()[2].kind(),
            Constraint::GroupBySelector(GroupBySelector { add_edge: false, .. })
        ));
    }

    #[test]
    fn test_unknown_parameter_warns() {
        let (spec, warnings) =
            elaborate_text("constraints:\n  - hideAtom:\n      selector: Int\n      colour: red\n")
                .unwrap();
        assert_eq!(spec.constraints().len(), 1);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message().contains("colour"));
        assert!(warnings[0].severity().is_warning());
    }

    #[test]
    fn test_missing_parameters_are_collected() {
        let err = elaborate_text(
            "constraints:\n  - align:\n      selector: Node\n  - size:\n      selector: Node\n",
        )
        .unwrap_err();
        assert_eq!(err.diagnostics().len(), 2);
        assert!(err.has_code(ErrorCode::E203));
        assert!(!err.is_syntax_error());
    }

    #[test]
    fn test_contradictory_directions() {
        let err = elaborate_text(
            "constraints:\n  - orientation:\n      selector: r\n      directions: [left, directlyRight]\n",
        )
        .unwrap_err();
        assert!(err.has_code(ErrorCode::E205));
    }

    #[test]
    fn test_bad_selector_is_located_in_document() {
        let src = "constraints:\n  - hideAtom:\n      selector: 'a . '\n";
        let err = elaborate_text(src).unwrap_err();
        let diag = &err.diagnostics()[0];
        assert_eq!(diag.code(), Some(ErrorCode::E101));
        let span = diag.primary_span().unwrap();
        assert!(span.start() > src.find("'a").unwrap());
        assert!(err.is_syntax_error());
    }

    #[test]
    fn test_flag_forms() {
        let (spec, _) = elaborate_text("directives:\n  - flag: hideDisconnectedBuiltIns\n").unwrap();
        assert!(spec.has_flag(Flag::HideDisconnectedBuiltIns));

        let err = elaborate_text("directives:\n  - flag: everything\n").unwrap_err();
        assert!(err.has_code(ErrorCode::E204));
    }

    #[test]
    fn test_malformed_entries() {
        let err = elaborate_text("constraints:\n  - just-a-word\n").unwrap_err();
        assert!(err.has_code(ErrorCode::E202));

        let err = elaborate_text("constraints: 3\n").unwrap_err();
        assert!(err.has_code(ErrorCode::E201));

        let err = elaborate_text("- a\n").unwrap_err();
        assert!(err.has_code(ErrorCode::E200));
    }

    #[test]
    fn test_unknown_section_warns() {
        let (spec, warnings) = elaborate_text("layout:\n  - a\n").unwrap();
        assert!(spec.is_empty());
        assert!(warnings[0].message().contains("layout"));
    }
}
