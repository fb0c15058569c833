use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use log::{debug, info, warn};

use spytial_core::{
    color::Color,
    instance::{DataInstance, is_builtin_type},
    value::SelectorValue,
};
use spytial_parser::{
    Expr, LayoutSpec, Selector,
    spec::{
        AlignDirection, Constraint, Direction, Directive, EntryId, Flag, GroupByField,
        GroupBySelector,
    },
};

use super::{
    EdgeKind, EdgeLayout, GroupLayout, LayoutConstraint, LayoutError, LayoutOutcome,
    LayoutResult, LayoutWarning, NodeLayout, ProjectionChoice, cyclic,
};
use crate::{config::LayoutConfig, eval::Evaluator};

/// Collected warnings, each also logged as it is raised.
#[derive(Debug, Default)]
pub(super) struct Warnings(Vec<LayoutWarning>);

impl Warnings {
    pub(super) fn push(&mut self, entry: Option<EntryId>, message: impl Into<String>) {
        let warning = LayoutWarning {
            entry,
            message: message.into(),
        };
        warn!(entry:? = warning.entry; "{}", warning.message);
        self.0.push(warning);
    }
}

/// Evaluate an expression, turning failures into warnings unless `strict`.
fn evaluate_or_warn(
    evaluator: &Evaluator<'_>,
    strict: bool,
    warnings: &mut Warnings,
    entry: EntryId,
    text: &str,
    expr: &Expr,
) -> Result<Option<SelectorValue>, LayoutError> {
    match evaluator.evaluate_expr(expr) {
        Ok(value) => Ok(Some(value)),
        Err(source) if strict => Err(LayoutError::Evaluation {
            entry,
            selector: text.to_string(),
            source,
        }),
        Err(err) => {
            warnings.push(Some(entry), format!("skipped `{text}`: {err}"));
            Ok(None)
        }
    }
}

/// Pick one atom per projected type, in directive order.
pub(super) fn choose_projections(
    spec: &LayoutSpec,
    instance: &dyn DataInstance,
    requested: &IndexMap<String, String>,
    config: &LayoutConfig,
    warnings: &mut Warnings,
) -> Result<Vec<ProjectionChoice>, LayoutError> {
    let evaluator = Evaluator::new(instance);
    let mut choices: Vec<ProjectionChoice> = Vec::new();

    for entry in spec.directives() {
        let Directive::Projection(projection) = entry.kind() else {
            continue;
        };
        if choices.iter().any(|choice| choice.sig == projection.sig) {
            warnings.push(
                Some(entry.id()),
                format!("type `{}` is already projected", projection.sig),
            );
            continue;
        }

        let mut atoms: Vec<String> = instance
            .atoms()
            .iter()
            .filter(|atom| atom.type_name() == projection.sig)
            .map(|atom| atom.id().to_string())
            .collect();
        if atoms.is_empty() {
            warnings.push(
                Some(entry.id()),
                format!("no atoms of type `{}` to project over", projection.sig),
            );
            continue;
        }

        if let Some(order_by) = &projection.order_by {
            let ordering = Expr::Closure(Box::new(order_by.expr().clone()));
            let reach = evaluate_or_warn(
                &evaluator,
                config.strict,
                warnings,
                entry.id(),
                order_by.source(),
                &ordering,
            )?;
            match reach {
                Some(reach) if reach.arity() == 2 => {
                    // Rank each atom by how many atoms precede it.
                    let rank = |atom: &String| {
                        atoms
                            .iter()
                            .filter(|other| reach.contains(&[(*other).clone(), atom.clone()]))
                            .count()
                    };
                    let ranks: HashMap<String, usize> =
                        atoms.iter().map(|atom| (atom.clone(), rank(atom))).collect();
                    atoms.sort_by_key(|atom| ranks[atom]);
                }
                Some(_) => warnings.push(
                    Some(entry.id()),
                    format!("`orderBy` of `{}` must be a binary relation", projection.sig),
                ),
                None => {}
            }
        }

        let chosen = match requested.get(&projection.sig) {
            Some(pick) if atoms.contains(pick) => pick.clone(),
            Some(pick) => {
                warnings.push(
                    Some(entry.id()),
                    format!(
                        "`{pick}` is not an atom of type `{}`; using `{}`",
                        projection.sig, atoms[0]
                    ),
                );
                atoms[0].clone()
            }
            None => atoms[0].clone(),
        };
        debug!(sig = projection.sig.as_str(), chosen = chosen.as_str(); "Projection chosen");
        choices.push(ProjectionChoice {
            sig: projection.sig.clone(),
            chosen,
            atoms,
        });
    }
    Ok(choices)
}

/// `name[mid]…` key and value for the trailing columns of a tuple.
fn attribute_entry(instance: &dyn DataInstance, name: &str, rest: &[String]) -> Option<(String, String)> {
    fn label(instance: &dyn DataInstance, id: &str) -> String {
        match instance.atom(id) {
            Some(atom) => atom.label().to_string(),
            None => id.to_string(),
        }
    }

    let (value, interior) = rest.split_last()?;
    let key = interior.iter().fold(name.to_string(), |mut key, mid| {
        key.push('[');
        key.push_str(&label(instance, mid));
        key.push(']');
        key
    });
    Some((key, label(instance, value)))
}

/// Appends a value under its key once per distinct tuple of value atoms, so
/// atoms sharing a label still contribute one value each.
fn add_attribute(
    nodes: &mut IndexMap<String, NodeLayout>,
    added: &mut HashSet<(String, String, Vec<String>)>,
    atom: &str,
    (key, value): (String, String),
    rest: &[String],
) {
    let Some(node) = nodes.get_mut(atom) else {
        return;
    };
    if added.insert((atom.to_string(), key.clone(), rest.to_vec())) {
        node.attributes.entry(key).or_default().push(value);
    }
}

pub(super) struct Generator<'a> {
    spec: &'a LayoutSpec,
    config: &'a LayoutConfig,
    evaluator: Evaluator<'a>,
    nodes: IndexMap<String, NodeLayout>,
    edges: Vec<EdgeLayout>,
    groups: Vec<GroupLayout>,
    constraints: Vec<LayoutConstraint>,
    warnings: Warnings,
    grouped: HashSet<String>,
    attribute_values: HashSet<(String, String, Vec<String>)>,
}

impl<'a> Generator<'a> {
    pub(super) fn new(
        spec: &'a LayoutSpec,
        instance: &'a dyn DataInstance,
        config: &'a LayoutConfig,
        warnings: Warnings,
    ) -> Self {
        let nodes = instance
            .atoms()
            .iter()
            .map(|atom| {
                let node = NodeLayout {
                    id: atom.id().to_string(),
                    type_name: atom.type_name().to_string(),
                    label: atom.label().to_string(),
                    width: config.default_node_width,
                    height: config.default_node_height,
                    color: None,
                    icon: None,
                    show_label: true,
                    attributes: IndexMap::new(),
                    hidden: false,
                };
                (node.id.clone(), node)
            })
            .collect();

        Self {
            spec,
            config,
            evaluator: Evaluator::new(instance),
            nodes,
            edges: Vec::new(),
            groups: Vec::new(),
            constraints: Vec::new(),
            warnings,
            grouped: HashSet::new(),
            attribute_values: HashSet::new(),
        }
    }

    pub(super) fn run(mut self, projections: Vec<ProjectionChoice>) -> Result<LayoutOutcome, LayoutError> {
        self.hide_atoms()?;
        self.collect_edges()?;
        self.apply_attributes()?;
        self.apply_tags()?;
        self.add_inferred_edges()?;
        self.style_edges()?;
        self.apply_groups()?;
        self.hide_disconnected();
        self.hide_dangling_edges();
        self.decorate_nodes()?;
        self.apply_positions()?;
        Ok(self.finish(projections))
    }

    fn instance(&self) -> &'a dyn DataInstance {
        self.evaluator.instance()
    }

    fn evaluate(&mut self, entry: EntryId, selector: &Selector) -> Result<Option<SelectorValue>, LayoutError> {
        evaluate_or_warn(
            &self.evaluator,
            self.config.strict,
            &mut self.warnings,
            entry,
            selector.source(),
            selector.expr(),
        )
    }

    /// First-column atoms of an optional selector; `Ok(None)` for "all", `Err`
    /// wraps a strict failure and a lenient failure yields `Ok(Some(None))`.
    fn optional_sources(
        &mut self,
        entry: EntryId,
        selector: Option<&Selector>,
    ) -> Result<Option<Option<IndexSet<String>>>, LayoutError> {
        let Some(selector) = selector else {
            return Ok(Some(None));
        };
        Ok(self.evaluate(entry, selector)?.map(|value| {
            Some(
                value
                    .first_column()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            )
        }))
    }

    fn check_relation(&mut self, entry: EntryId, field: &str) -> bool {
        if self.instance().relation(field).is_some() {
            return true;
        }
        self.warnings.push(
            Some(entry),
            format!("the instance has no relation `{field}`"),
        );
        false
    }

    /// The color text to use; invalid colors are kept as written after a warning.
    fn valid_color(&mut self, entry: EntryId, value: &str) -> String {
        match Color::new(value) {
            Ok(color) => color.as_str().to_string(),
            Err(err) => {
                self.warnings.push(Some(entry), err);
                value.to_string()
            }
        }
    }

    fn hide_atoms(&mut self) -> Result<(), LayoutError> {
        let spec = self.spec;
        for entry in spec.constraints() {
            let Constraint::HideAtom(hide) = entry.kind() else {
                continue;
            };
            let Some(value) = self.evaluate(entry.id(), &hide.selector)? else {
                continue;
            };
            for atom in value.first_column() {
                if let Some(node) = self.nodes.get_mut(atom) {
                    node.hidden = true;
                }
            }
        }
        Ok(())
    }

    fn collect_edges(&mut self) -> Result<(), LayoutError> {
        let spec = self.spec;
        let mut hidden_fields: Vec<(&str, Option<IndexSet<String>>)> = Vec::new();
        for entry in spec.directives() {
            let Directive::HideField(hide) = entry.kind() else {
                continue;
            };
            if !self.check_relation(entry.id(), &hide.field) {
                continue;
            }
            if let Some(sources) = self.optional_sources(entry.id(), hide.selector.as_ref())? {
                hidden_fields.push((&hide.field, sources));
            }
        }

        for relation in self.instance().relations() {
            if relation.arity() < 2 {
                continue;
            }
            for tuple in relation.tuples() {
                let hidden = hidden_fields.iter().any(|(field, sources)| {
                    *field == relation.name()
                        && sources
                            .as_ref()
                            .is_none_or(|sources| sources.contains(tuple.first()))
                });
                if !hidden {
                    self.edges.push(EdgeLayout::new(
                        relation.name(),
                        EdgeKind::Relation,
                        tuple.atoms().to_vec(),
                    ));
                }
            }
        }
        debug!(edges = self.edges.len(); "Collected candidate edges");
        Ok(())
    }

    /// Turn relation edges into attributes on their source node.
    fn apply_attributes(&mut self) -> Result<(), LayoutError> {
        let spec = self.spec;
        let instance = self.instance();
        for entry in spec.directives() {
            let Directive::Attribute(attribute) = entry.kind() else {
                continue;
            };
            if !self.check_relation(entry.id(), &attribute.field) {
                continue;
            }
            let Some(sources) = self.optional_sources(entry.id(), attribute.selector.as_ref())? else {
                continue;
            };

            let nodes = &mut self.nodes;
            let added = &mut self.attribute_values;
            self.edges.retain(|edge| {
                let converted = edge.kind == EdgeKind::Relation
                    && edge.relation_name == attribute.field
                    && sources
                        .as_ref()
                        .is_none_or(|sources| sources.contains(&edge.source));
                if converted {
                    let rest = &edge.tuple()[1..];
                    if let Some(entry) = attribute_entry(instance, &attribute.field, rest) {
                        add_attribute(nodes, added, &edge.source, entry, rest);
                    }
                }
                !converted
            });
        }
        Ok(())
    }

    fn apply_tags(&mut self) -> Result<(), LayoutError> {
        let spec = self.spec;
        let instance = self.instance();
        for entry in spec.directives() {
            let Directive::Tag(tag) = entry.kind() else {
                continue;
            };
            let Some(targets) = self.evaluate(entry.id(), &tag.to_tag)? else {
                continue;
            };
            let Some(values) = self.evaluate(entry.id(), &tag.value)? else {
                continue;
            };
            if values.arity() < 2 {
                self.warnings.push(
                    Some(entry.id()),
                    format!(
                        "tag `{}` needs a value of arity 2 or more, `{}` has arity {}",
                        tag.name,
                        tag.value.source(),
                        values.arity()
                    ),
                );
                continue;
            }

            for target in targets.first_column() {
                for tuple in values.tuples().filter(|tuple| tuple[0] == target) {
                    let rest = &tuple[1..];
                    if let Some(entry) = attribute_entry(instance, &tag.name, rest) {
                        add_attribute(&mut self.nodes, &mut self.attribute_values, target, entry, rest);
                    }
                }
            }
        }
        Ok(())
    }

    fn add_inferred_edges(&mut self) -> Result<(), LayoutError> {
        let spec = self.spec;
        for entry in spec.directives() {
            let Directive::InferredEdge(inferred) = entry.kind() else {
                continue;
            };
            let Some(value) = self.evaluate(entry.id(), &inferred.selector)? else {
                continue;
            };
            if value.arity() < 2 {
                self.warnings.push(
                    Some(entry.id()),
                    format!(
                        "inferred edge `{}` needs tuples of arity 2 or more",
                        inferred.name
                    ),
                );
                continue;
            }
            let color = inferred
                .color
                .as_deref()
                .map(|color| self.valid_color(entry.id(), color));

            for tuple in value.tuples() {
                let mut edge = EdgeLayout::new(&inferred.name, EdgeKind::Inferred, tuple.to_vec());
                if let Some(color) = &color {
                    edge.color = color.clone();
                }
                if let Some(style) = &inferred.style {
                    edge.style = style.clone();
                }
                if let Some(weight) = inferred.weight {
                    edge.weight = weight;
                }
                self.edges.push(edge);
            }
        }
        Ok(())
    }

    fn style_edges(&mut self) -> Result<(), LayoutError> {
        let spec = self.spec;
        for entry in spec.directives() {
            let Directive::EdgeColor(style) = entry.kind() else {
                continue;
            };
            let Some(sources) = self.optional_sources(entry.id(), style.selector.as_ref())? else {
                continue;
            };
            let filter = match &style.filter {
                Some(filter) => match self.evaluate(entry.id(), filter)? {
                    Some(value) => Some(value),
                    None => continue,
                },
                None => None,
            };
            let color = self.valid_color(entry.id(), &style.value);

            let mut styled = 0;
            for edge in self
                .edges
                .iter_mut()
                .filter(|edge| edge.kind != EdgeKind::Group && edge.relation_name == style.field)
            {
                let selected = sources
                    .as_ref()
                    .is_none_or(|sources| sources.contains(&edge.source));
                let filtered = filter
                    .as_ref()
                    .is_none_or(|filter| filter.contains(edge.tuple()));
                if !(selected && filtered) {
                    continue;
                }
                edge.color = color.clone();
                if let Some(line) = &style.style {
                    edge.style = line.clone();
                }
                if let Some(weight) = style.weight {
                    edge.weight = weight;
                }
                if let Some(show_label) = style.show_label {
                    edge.show_label = show_label;
                }
                if style.hidden {
                    edge.hidden = true;
                }
                styled += 1;
            }
            debug!(entry = entry.id().index(), field = style.field.as_str(), styled; "Styled edges");
        }
        Ok(())
    }

    fn apply_groups(&mut self) -> Result<(), LayoutError> {
        let spec = self.spec;
        for entry in spec.constraints() {
            match entry.kind() {
                Constraint::GroupByField(group) => self.group_by_field(entry.id(), group)?,
                Constraint::GroupBySelector(group) => self.group_by_selector(entry.id(), group)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn group_by_field(&mut self, entry: EntryId, group: &GroupByField) -> Result<(), LayoutError> {
        let Some(relation) = self.instance().relation(&group.field) else {
            self.check_relation(entry, &group.field);
            return Ok(());
        };
        let arity = relation.arity();
        if group.group_on >= arity || group.add_to_group >= arity || group.group_on == group.add_to_group {
            self.warnings.push(
                Some(entry),
                format!(
                    "cannot group `{}` (arity {arity}) on column {} adding column {}",
                    group.field, group.group_on, group.add_to_group
                ),
            );
            return Ok(());
        }
        let Some(sources) = self.optional_sources(entry, group.selector.as_ref())? else {
            return Ok(());
        };

        let mut members_by_key: IndexMap<&str, Vec<String>> = IndexMap::new();
        let mut grouped_tuples: HashSet<&[String]> = HashSet::new();
        for tuple in relation.tuples() {
            if !sources
                .as_ref()
                .is_none_or(|sources| sources.contains(tuple.first()))
            {
                continue;
            }
            let atoms = tuple.atoms();
            let members = members_by_key.entry(atoms[group.group_on].as_str()).or_default();
            if !members.contains(&atoms[group.add_to_group]) {
                members.push(atoms[group.add_to_group].clone());
            }
            grouped_tuples.insert(atoms);
        }

        self.edges.retain(|edge| {
            !(edge.kind == EdgeKind::Relation
                && edge.relation_name == group.field
                && grouped_tuples.contains(edge.tuple()))
        });

        for (key, members) in members_by_key {
            let id = format!("{key}.{}", group.field);
            self.grouped.extend(members.iter().cloned());
            self.edges.push(EdgeLayout::new(
                &group.field,
                EdgeKind::Group,
                vec![key.to_string(), id.clone()],
            ));
            self.groups.push(GroupLayout {
                id: id.clone(),
                name: id,
                key_node: Some(key.to_string()),
                members,
                show_label: true,
            });
        }
        Ok(())
    }

    fn group_by_selector(&mut self, entry: EntryId, group: &GroupBySelector) -> Result<(), LayoutError> {
        let Some(value) = self.evaluate(entry, &group.selector)? else {
            return Ok(());
        };
        match value.arity() {
            1 => {
                let members: Vec<String> = value.atoms().into_iter().map(str::to_string).collect();
                self.grouped.extend(members.iter().cloned());
                self.groups.push(GroupLayout {
                    id: group.name.clone(),
                    name: group.name.clone(),
                    key_node: None,
                    members,
                    show_label: true,
                });
            }
            2 => {
                let mut members_by_key: IndexMap<&str, Vec<String>> = IndexMap::new();
                for tuple in value.tuples() {
                    let members = members_by_key.entry(tuple[0].as_str()).or_default();
                    if !members.contains(&tuple[1]) {
                        members.push(tuple[1].clone());
                    }
                }
                for (key, members) in members_by_key {
                    let id = format!("{}:{key}", group.name);
                    self.grouped.extend(members.iter().cloned());
                    if group.add_edge {
                        self.edges.push(EdgeLayout::new(
                            &group.name,
                            EdgeKind::Group,
                            vec![key.to_string(), id.clone()],
                        ));
                    }
                    self.groups.push(GroupLayout {
                        id,
                        name: group.name.clone(),
                        key_node: Some(key.to_string()),
                        members,
                        show_label: true,
                    });
                }
            }
            arity => self.warnings.push(
                Some(entry),
                format!(
                    "group `{}` needs a selector of arity 1 or 2, `{}` has arity {arity}",
                    group.name,
                    group.selector.source()
                ),
            ),
        }
        Ok(())
    }

    fn is_visible(&self, id: &str) -> bool {
        self.nodes.get(id).is_some_and(|node| !node.hidden)
    }

    fn hide_disconnected(&mut self) {
        let hide_all = self.spec.has_flag(Flag::HideDisconnected);
        let hide_builtins = self.spec.has_flag(Flag::HideDisconnectedBuiltIns);
        if !hide_all && !hide_builtins {
            return;
        }

        let mut connected: HashSet<String> = self.grouped.clone();
        for edge in &self.edges {
            if edge.hidden || !self.is_visible(&edge.source) {
                continue;
            }
            if edge.kind == EdgeKind::Group {
                connected.insert(edge.source.clone());
            } else if self.is_visible(&edge.target) {
                connected.insert(edge.source.clone());
                connected.insert(edge.target.clone());
            }
        }

        let mut hidden = 0;
        for node in self.nodes.values_mut() {
            if node.hidden || connected.contains(&node.id) {
                continue;
            }
            if hide_all || is_builtin_type(&node.type_name) {
                node.hidden = true;
                hidden += 1;
            }
        }
        debug!(hidden; "Hid disconnected nodes");
    }

    fn hide_dangling_edges(&mut self) {
        let nodes = &self.nodes;
        let visible = |id: &str| nodes.get(id).is_some_and(|node| !node.hidden);
        for edge in &mut self.edges {
            if !visible(&edge.source) || (edge.kind != EdgeKind::Group && !visible(&edge.target)) {
                edge.hidden = true;
            }
        }
    }

    fn decorate_nodes(&mut self) -> Result<(), LayoutError> {
        let spec = self.spec;
        let mut colored: HashMap<String, (EntryId, String)> = HashMap::new();
        for entry in spec.directives() {
            match entry.kind() {
                Directive::AtomColor(atom_color) => {
                    let Some(value) = self.evaluate(entry.id(), &atom_color.selector)? else {
                        continue;
                    };
                    let color = self.valid_color(entry.id(), &atom_color.value);
                    for atom in value.first_column() {
                        let Some(node) = self.nodes.get_mut(atom) else {
                            continue;
                        };
                        if let Some((previous, old)) =
                            colored.insert(atom.to_string(), (entry.id(), color.clone()))
                        {
                            if old != color {
                                self.warnings.push(
                                    Some(entry.id()),
                                    format!(
                                        "atom `{atom}` is colored `{old}` by entry {previous} and `{color}` here; using `{color}`"
                                    ),
                                );
                            }
                        }
                        node.color = Some(color.clone());
                    }
                }
                Directive::Icon(icon) => {
                    let Some(value) = self.evaluate(entry.id(), &icon.selector)? else {
                        continue;
                    };
                    for atom in value.first_column() {
                        if let Some(node) = self.nodes.get_mut(atom) {
                            node.icon = Some(icon.path.clone());
                            node.show_label = icon.show_labels;
                        }
                    }
                }
                _ => {}
            }
        }

        let mut sized: HashMap<String, EntryId> = HashMap::new();
        for entry in spec.constraints() {
            let Constraint::Size(size) = entry.kind() else {
                continue;
            };
            let Some(value) = self.evaluate(entry.id(), &size.selector)? else {
                continue;
            };
            for atom in value.first_column() {
                let Some(node) = self.nodes.get_mut(atom) else {
                    continue;
                };
                let changes = size.width.is_some_and(|width| width != node.width)
                    || size.height.is_some_and(|height| height != node.height);
                if let Some(previous) = sized.insert(atom.to_string(), entry.id()) {
                    if changes {
                        self.warnings.push(
                            Some(entry.id()),
                            format!("atom `{atom}` is also sized by entry {previous}; using this size"),
                        );
                    }
                }
                if let Some(width) = size.width {
                    node.width = width;
                }
                if let Some(height) = size.height {
                    node.height = height;
                }
            }
        }
        Ok(())
    }

    /// Add a constraint unless it repeats one, relates a node to itself, or
    /// mentions a hidden or unknown node.
    fn push_constraint(&mut self, constraint: LayoutConstraint) {
        let (first, second) = constraint.nodes();
        if first == second || !self.is_visible(first) || !self.is_visible(second) {
            return;
        }
        if !self.constraints.contains(&constraint) {
            self.constraints.push(constraint);
        }
    }

    fn left_of(&self, entry: EntryId, left: &str, right: &str) -> LayoutConstraint {
        LayoutConstraint::LeftOf {
            entry,
            left: left.to_string(),
            right: right.to_string(),
            min_separation: self.config.min_separation,
        }
    }

    fn above(&self, entry: EntryId, top: &str, bottom: &str) -> LayoutConstraint {
        LayoutConstraint::Above {
            entry,
            top: top.to_string(),
            bottom: bottom.to_string(),
            min_separation: self.config.min_separation,
        }
    }

    fn align(entry: EntryId, axis: AlignDirection, first: &str, second: &str) -> LayoutConstraint {
        LayoutConstraint::Align {
            entry,
            axis,
            first: first.to_string(),
            second: second.to_string(),
        }
    }

    /// Pairs `(first, last)` of a value of arity 2 or more, or `None` with a warning.
    fn pairs(&mut self, entry: EntryId, kind: &str, value: &SelectorValue) -> Option<Vec<(String, String)>> {
        if value.arity() < 2 {
            self.warnings.push(
                Some(entry),
                format!("`{kind}` needs a selector of arity 2 or more, found arity {}", value.arity()),
            );
            return None;
        }
        Some(
            value
                .tuples()
                .filter_map(|tuple| Some((tuple.first()?.clone(), tuple.last()?.clone())))
                .collect(),
        )
    }

    fn apply_positions(&mut self) -> Result<(), LayoutError> {
        let spec = self.spec;
        for entry in spec.constraints() {
            let id = entry.id();
            match entry.kind() {
                Constraint::Orientation(orientation) => {
                    let Some(value) = self.evaluate(id, &orientation.selector)? else {
                        continue;
                    };
                    let Some(pairs) = self.pairs(id, "orientation", &value) else {
                        continue;
                    };
                    for (source, target) in &pairs {
                        for direction in &orientation.directions {
                            let constraint = match direction.base() {
                                Direction::Right => self.left_of(id, source, target),
                                Direction::Left => self.left_of(id, target, source),
                                Direction::Below => self.above(id, source, target),
                                _ => self.above(id, target, source),
                            };
                            self.push_constraint(constraint);
                            if direction.is_direct() {
                                let axis = match direction.base() {
                                    Direction::Left | Direction::Right => AlignDirection::Horizontal,
                                    _ => AlignDirection::Vertical,
                                };
                                self.push_constraint(Self::align(id, axis, source, target));
                            }
                        }
                    }
                }
                Constraint::Align(align) => {
                    let Some(value) = self.evaluate(id, &align.selector)? else {
                        continue;
                    };
                    let pairs: Vec<(String, String)> = if value.arity() == 1 {
                        let atoms: Vec<&str> = value.atoms().into_iter().collect();
                        atoms
                            .windows(2)
                            .map(|pair| (pair[0].to_string(), pair[1].to_string()))
                            .collect()
                    } else {
                        match self.pairs(id, "align", &value) {
                            Some(pairs) => pairs,
                            None => continue,
                        }
                    };
                    for (first, second) in &pairs {
                        self.push_constraint(Self::align(id, align.direction, first, second));
                    }
                }
                Constraint::Cyclic(circle) => {
                    let Some(value) = self.evaluate(id, &circle.selector)? else {
                        continue;
                    };
                    let Some(pairs) = self.pairs(id, "cyclic", &value) else {
                        continue;
                    };
                    let fragments =
                        cyclic::fragments(pairs.iter().map(|(s, t)| (s.as_str(), t.as_str())));
                    for fragment in &fragments {
                        for placement in cyclic::placements(fragment, circle.direction) {
                            let constraint = match placement {
                                cyclic::Placement::LeftOf(left, right) => {
                                    self.left_of(id, &left, &right)
                                }
                                cyclic::Placement::Above(top, bottom) => {
                                    self.above(id, &top, &bottom)
                                }
                            };
                            self.push_constraint(constraint);
                        }
                    }
                }
                Constraint::Unknown(unknown) => {
                    debug!(kind = unknown.kind.as_str(); "Ignoring unknown constraint");
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn finish(mut self, projections: Vec<ProjectionChoice>) -> LayoutOutcome {
        let nodes = &self.nodes;
        for group in &mut self.groups {
            group
                .members
                .retain(|member| nodes.get(member).is_some_and(|node| !node.hidden));
        }
        self.groups.retain(|group| !group.members.is_empty());

        let groups: HashSet<&str> = self.groups.iter().map(|group| group.id.as_str()).collect();
        for edge in &mut self.edges {
            if edge.kind == EdgeKind::Group && !groups.contains(edge.target.as_str()) {
                edge.hidden = true;
            }
        }

        let layout = LayoutResult {
            nodes: self.nodes.into_values().collect(),
            edges: self.edges,
            groups: self.groups,
            constraints: self.constraints,
            projections,
        };
        info!(
            nodes = layout.visible_nodes().count(),
            edges = layout.visible_edges().count(),
            groups = layout.groups.len(),
            constraints = layout.constraints.len(),
            warnings = self.warnings.0.len();
            "Layout generated",
        );
        LayoutOutcome {
            layout,
            warnings: self.warnings.0,
        }
    }
}
