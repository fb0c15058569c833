use indexmap::IndexMap;
use spytial::{
    LayoutBuilder, SpytialError,
    config::{AppConfig, LayoutConfig},
    geometry::{Bounds, Point, Size},
    instance::{Atom, Instance},
    layout::{EdgeKind, LayoutConstraint, LayoutError},
    temporal::{IterationMode, PolicyOptions},
};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn relation(name: &str, tuples: &[&[&str]]) -> (String, Vec<Vec<String>>) {
    (
        name.to_string(),
        tuples.iter().map(|tuple| strings(tuple)).collect(),
    )
}

fn people() -> Instance {
    Instance::new(
        vec![
            Atom::new("Alice", "Person"),
            Atom::new("Bob", "Person"),
            Atom::new("Carol", "Person"),
            Atom::new("25", "Int"),
            Atom::new("30", "Int"),
            Atom::new("7", "Int"),
        ],
        vec![relation("age", &[&["Alice", "25"], &["Bob", "30"]])],
    )
    .expect("valid instance")
}

fn tree() -> Instance {
    Instance::new(
        (0..5).map(|i| Atom::new(format!("Node{i}"), "Node")).collect(),
        vec![
            relation("left", &[&["Node3", "Node1"], &["Node4", "Node2"]]),
            relation("right", &[&["Node3", "Node4"], &["Node1", "Node0"]]),
        ],
    )
    .expect("valid instance")
}

fn layout_with(
    builder: &LayoutBuilder,
    spec: &str,
    instance: &Instance,
) -> spytial::LayoutOutcome {
    let parsed = builder.parse(spec).expect("Failed to parse");
    builder
        .layout(parsed.spec(), instance, &IndexMap::new())
        .expect("Failed to lay out")
}

fn layout(spec: &str, instance: &Instance) -> spytial::LayoutOutcome {
    layout_with(&LayoutBuilder::default(), spec, instance)
}

#[test]
fn test_tag_attaches_values_to_each_person() {
    let spec = r#"
directives:
  - tag:
      toTag: Person
      name: age
      value: age
"#;
    let outcome = layout(spec, &people());
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);

    let alice = outcome.layout.node("Alice").unwrap();
    let bob = outcome.layout.node("Bob").unwrap();
    assert_eq!(alice.attributes["age"], ["25"]);
    assert_eq!(bob.attributes["age"], ["30"]);
    assert!(outcome.layout.node("Carol").unwrap().attributes.is_empty());

    // Tags leave the relation edges in place.
    assert_eq!(outcome.layout.visible_edges().count(), 2);
}

#[test]
fn test_edge_filter_hides_only_matching_tuple() {
    let spec = r#"
directives:
  - edgeColor:
      field: left
      value: '#000000'
      filter: 'Node3 -> Node1'
      hidden: true
"#;
    let outcome = layout(spec, &tree());
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);

    let left: Vec<&str> = outcome
        .layout
        .visible_edges()
        .filter(|edge| edge.relation_name == "left")
        .map(|edge| edge.id.as_str())
        .collect();
    assert_eq!(left, vec!["left:Node4->Node2"]);

    let right: Vec<_> = outcome
        .layout
        .visible_edges()
        .filter(|edge| edge.relation_name == "right")
        .collect();
    assert_eq!(right.len(), 2);
    assert!(right.iter().all(|edge| edge.color == "black"));
}

#[test]
fn test_edge_selector_and_filter_intersect() {
    let spec = r#"
directives:
  - edgeColor:
      field: right
      value: red
      selector: Node1
      filter: right
"#;
    let outcome = layout(spec, &tree());
    let colors: Vec<(&str, &str)> = outcome
        .layout
        .edges
        .iter()
        .filter(|edge| edge.relation_name == "right")
        .map(|edge| (edge.id.as_str(), edge.color.as_str()))
        .collect();
    assert_eq!(
        colors,
        vec![("right:Node3->Node4", "black"), ("right:Node1->Node0", "red")]
    );
}

#[test]
fn test_attribute_removes_edges() {
    let spec = r#"
directives:
  - attribute:
      field: age
  - flag: hideDisconnectedBuiltIns
"#;
    let outcome = layout(spec, &people());
    assert_eq!(outcome.layout.edges.len(), 0);
    assert_eq!(outcome.layout.node("Bob").unwrap().attributes["age"], ["30"]);

    // With the edges gone every Int is disconnected; people stay.
    let visible: Vec<&str> = outcome
        .layout
        .visible_nodes()
        .map(|node| node.id.as_str())
        .collect();
    assert_eq!(visible, vec!["Alice", "Bob", "Carol"]);
}

#[test]
fn test_orientation_and_hidden_atoms() {
    let spec = r#"
constraints:
  - orientation:
      selector: left
      directions: [below]
  - hideAtom:
      selector: Node4
"#;
    let outcome = layout(spec, &tree());
    assert_eq!(outcome.layout.constraints.len(), 1);
    match &outcome.layout.constraints[0] {
        LayoutConstraint::Above {
            top,
            bottom,
            min_separation,
            ..
        } => {
            assert_eq!((top.as_str(), bottom.as_str()), ("Node3", "Node1"));
            assert_eq!(*min_separation, 15.0);
        }
        other => panic!("Expected an above constraint, got {other:?}"),
    }

    assert!(outcome.layout.node("Node4").unwrap().hidden);
    let hidden: Vec<&str> = outcome
        .layout
        .edges
        .iter()
        .filter(|edge| edge.hidden)
        .map(|edge| edge.id.as_str())
        .collect();
    assert_eq!(hidden, vec!["left:Node4->Node2", "right:Node3->Node4"]);
}

#[test]
fn test_directly_adds_alignment() {
    let spec = r#"
constraints:
  - orientation:
      selector: right
      directions: [directlyRight]
"#;
    let outcome = layout(spec, &tree());
    let aligned = outcome
        .layout
        .constraints
        .iter()
        .filter(|constraint| matches!(constraint, LayoutConstraint::Align { .. }))
        .count();
    assert_eq!(aligned, 2);
    assert_eq!(outcome.layout.constraints.len(), 4);
}

#[test]
fn test_unknown_selector_is_skipped_unless_strict() {
    let spec = "constraints:\n  - orientation:\n      selector: missing\n      directions: [left]\n";

    let outcome = layout(spec, &tree());
    assert!(outcome.layout.constraints.is_empty());
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].entry.is_some());
    assert!(outcome.warnings[0].message.contains("missing"));

    let strict = LayoutBuilder::new(AppConfig {
        layout: LayoutConfig {
            strict: true,
            ..LayoutConfig::default()
        },
        ..AppConfig::default()
    });
    let parsed = strict.parse(spec).unwrap();
    let err = strict
        .layout(parsed.spec(), &tree(), &IndexMap::new())
        .unwrap_err();
    match err {
        SpytialError::Layout(LayoutError::Evaluation { selector, .. }) => {
            assert_eq!(selector, "missing");
        }
        other => panic!("Expected an evaluation error, got {other:?}"),
    }
}

#[test]
fn test_group_by_field() {
    let instance = Instance::new(
        vec![
            Atom::new("P0", "Parent"),
            Atom::new("C0", "Child"),
            Atom::new("C1", "Child"),
        ],
        vec![relation("children", &[&["P0", "C0"], &["P0", "C1"]])],
    )
    .unwrap();
    let spec = "constraints:\n  - group:\n      field: children\n";
    let outcome = layout(spec, &instance);

    assert_eq!(outcome.layout.groups.len(), 1);
    let group = &outcome.layout.groups[0];
    assert_eq!(group.id, "P0.children");
    assert_eq!(group.key_node.as_deref(), Some("P0"));
    assert_eq!(group.members, strings(&["C0", "C1"]));

    assert_eq!(outcome.layout.edges.len(), 1);
    let edge = &outcome.layout.edges[0];
    assert_eq!(edge.kind, EdgeKind::Group);
    assert_eq!((edge.source.as_str(), edge.target.as_str()), ("P0", "P0.children"));
    assert!(!edge.hidden);
}

#[test]
fn test_projection_over_time() {
    let instance = Instance::new(
        vec![
            Atom::new("T2", "Time"),
            Atom::new("T0", "Time"),
            Atom::new("T1", "Time"),
            Atom::new("S0", "State"),
            Atom::new("A", "Val"),
            Atom::new("B", "Val"),
        ],
        vec![
            relation("next", &[&["T0", "T1"], &["T1", "T2"]]),
            relation("at", &[&["S0", "T0", "A"], &["S0", "T1", "B"]]),
        ],
    )
    .unwrap();
    let spec = "directives:\n  - projection:\n      sig: Time\n      orderBy: next\n";
    let builder = LayoutBuilder::default();
    let parsed = builder.parse(spec).unwrap();
    let picks = IndexMap::from([("Time".to_string(), "T1".to_string())]);
    let outcome = builder.layout(parsed.spec(), &instance, &picks).unwrap();

    let projection = &outcome.layout.projections[0];
    assert_eq!(projection.sig, "Time");
    assert_eq!(projection.chosen, "T1");
    assert_eq!(projection.atoms, strings(&["T0", "T1", "T2"]));

    let nodes: Vec<&str> = outcome.layout.nodes.iter().map(|node| node.id.as_str()).collect();
    assert_eq!(nodes, vec!["S0", "A", "B"]);
    let edges: Vec<&str> = outcome.layout.edges.iter().map(|edge| edge.id.as_str()).collect();
    assert_eq!(edges, vec!["at:S0->B"]);
}

#[test]
fn test_layout_is_deterministic() {
    let spec = r#"
constraints:
  - orientation:
      selector: left
      directions: [left, below]
  - cyclic:
      selector: right
  - group:
      selector: Node3 + Node4
      name: upper
directives:
  - atomColor:
      selector: Node0
      value: teal
  - inferredEdge:
      name: grandchild
      selector: left.right + right.right
"#;
    let first = layout(spec, &tree());
    let second = layout(spec, &tree());
    assert_eq!(first, second);

    let first = toml::to_string(&first.layout).expect("serializable layout");
    let second = toml::to_string(&second.layout).expect("serializable layout");
    assert_eq!(first, second);
}

#[test]
fn test_router_routes_visible_edges() {
    let builder = LayoutBuilder::default();
    let outcome = layout_with(&builder, "", &tree());

    // A vertical column: Node3 above Node1 above Node0, Node4 and Node2 to the right.
    let cell = Size::new(40.0, 20.0);
    let bounds: IndexMap<String, Bounds> = [
        ("Node3", 0.0, 0.0),
        ("Node1", 0.0, 60.0),
        ("Node0", 0.0, 120.0),
        ("Node4", 100.0, 0.0),
        ("Node2", 100.0, 60.0),
    ]
    .into_iter()
    .map(|(id, x, y)| (id.to_string(), Bounds::new_from_top_left(Point::new(x, y), cell)))
    .collect();

    let routed = builder.router(bounds).route_edges(&outcome.layout);
    assert_eq!(routed.len(), 4);
    assert!(routed.iter().all(|edge| edge.points.len() >= 2));
}

#[test]
fn test_temporal_policy_from_config() {
    let config: AppConfig = toml::from_str("[temporal]\npolicy = \"change_emphasis\"\n").unwrap();
    let builder = LayoutBuilder::new(config);

    assert!(matches!(
        builder.temporal_policy(PolicyOptions::default()),
        Err(SpytialError::Temporal(_))
    ));

    let policy = builder
        .temporal_policy(PolicyOptions {
            changed_ids: Some(strings(&["a"])),
        })
        .unwrap();
    let prev = IndexMap::from([("a".to_string(), Point::new(1.0, 1.0))]);
    let seeds = IndexMap::from([("a".to_string(), Point::new(9.0, 9.0))]);
    let nodes = strings(&["a"]);
    let hints = policy.make_hints(&spytial::temporal::HintArgs {
        prev_positions: &prev,
        prev_transform: Default::default(),
        nodes: &nodes,
        default_seeds: &seeds,
        viewport: None,
    });
    assert_eq!(hints.iteration_mode, IterationMode::Default);
    assert_eq!(hints.hints[0].position, Point::new(9.0, 9.0));
}

fn aligned(outcome: &spytial::LayoutOutcome) -> Vec<(&str, &str, &str)> {
    outcome
        .layout
        .constraints
        .iter()
        .filter_map(|constraint| match constraint {
            LayoutConstraint::Align {
                axis, first, second, ..
            } => Some((axis.as_str(), first.as_str(), second.as_str())),
            _ => None,
        })
        .collect()
}

#[test]
fn test_size_overrides_defaults_and_warns_on_conflict() {
    let spec = r#"
constraints:
  - size:
      selector: Person
      width: 40
      height: 30
  - size:
      selector: Alice
      width: 80
"#;
    let outcome = layout(spec, &people());

    let alice = outcome.layout.node("Alice").unwrap();
    assert_eq!((alice.width, alice.height), (80.0, 30.0));
    let bob = outcome.layout.node("Bob").unwrap();
    assert_eq!((bob.width, bob.height), (40.0, 30.0));
    let untouched = outcome.layout.node("25").unwrap();
    assert_eq!((untouched.width, untouched.height), (100.0, 60.0));

    assert_eq!(outcome.warnings.len(), 1, "{:?}", outcome.warnings);
    assert!(outcome.warnings[0].message.contains("`Alice`"));
    assert!(outcome.warnings[0].entry.is_some());
}

#[test]
fn test_repeated_size_without_change_is_silent() {
    let spec = r#"
constraints:
  - size:
      selector: Person
      width: 40
  - size:
      selector: Bob
      width: 40
"#;
    let outcome = layout(spec, &people());
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    assert_eq!(outcome.layout.node("Bob").unwrap().width, 40.0);
}

#[test]
fn test_hide_field_drops_relation_edges() {
    let spec = "directives:\n  - hideField:\n      field: left\n";
    let outcome = layout(spec, &tree());
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);

    let relations: Vec<&str> = outcome
        .layout
        .edges
        .iter()
        .map(|edge| edge.relation_name.as_str())
        .collect();
    assert_eq!(relations, vec!["right", "right"]);
}

#[test]
fn test_hide_field_with_selector_keeps_other_sources() {
    let spec = r#"
directives:
  - hideField:
      field: left
      selector: Node3
"#;
    let outcome = layout(spec, &tree());
    let left: Vec<&str> = outcome
        .layout
        .edges
        .iter()
        .filter(|edge| edge.relation_name == "left")
        .map(|edge| edge.id.as_str())
        .collect();
    assert_eq!(left, vec!["left:Node4->Node2"]);
    assert_eq!(outcome.layout.edges.len(), 3);
}

#[test]
fn test_icon_replaces_label_unless_requested() {
    let spec = r#"
directives:
  - icon:
      selector: Person
      path: person.svg
  - icon:
      selector: Int
      path: number.svg
      showLabels: true
"#;
    let outcome = layout(spec, &people());
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);

    let carol = outcome.layout.node("Carol").unwrap();
    assert_eq!(carol.icon.as_deref(), Some("person.svg"));
    assert!(!carol.show_label);

    let number = outcome.layout.node("7").unwrap();
    assert_eq!(number.icon.as_deref(), Some("number.svg"));
    assert!(number.show_label);
}

#[test]
fn test_align_unary_selector_chains_atoms() {
    let spec = r#"
constraints:
  - align:
      selector: Person
      direction: horizontal
"#;
    let outcome = layout(spec, &people());
    assert_eq!(
        aligned(&outcome),
        vec![("horizontal", "Alice", "Bob"), ("horizontal", "Bob", "Carol")]
    );
}

#[test]
fn test_align_binary_selector_pairs_tuple_ends() {
    let spec = r#"
constraints:
  - align:
      selector: age
      direction: vertical
"#;
    let outcome = layout(spec, &people());
    assert_eq!(
        aligned(&outcome),
        vec![("vertical", "Alice", "25"), ("vertical", "Bob", "30")]
    );
}

#[test]
fn test_group_by_binary_selector_adds_group_edges() {
    let instance = Instance::new(
        vec![
            Atom::new("P0", "Parent"),
            Atom::new("P1", "Parent"),
            Atom::new("C0", "Child"),
            Atom::new("C1", "Child"),
            Atom::new("C2", "Child"),
        ],
        vec![relation(
            "children",
            &[&["P0", "C0"], &["P0", "C1"], &["P1", "C2"]],
        )],
    )
    .unwrap();
    let spec = r#"
constraints:
  - group:
      selector: children
      name: kids
      addEdge: true
"#;
    let outcome = layout(spec, &instance);
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);

    let groups: Vec<(&str, Option<&str>, &[String])> = outcome
        .layout
        .groups
        .iter()
        .map(|group| {
            assert_eq!(group.name, "kids");
            (group.id.as_str(), group.key_node.as_deref(), group.members.as_slice())
        })
        .collect();
    assert_eq!(
        groups,
        vec![
            ("kids:P0", Some("P0"), strings(&["C0", "C1"]).as_slice()),
            ("kids:P1", Some("P1"), strings(&["C2"]).as_slice()),
        ]
    );

    let group_edges: Vec<(&str, &str, &str)> = outcome
        .layout
        .edges
        .iter()
        .filter(|edge| edge.kind == EdgeKind::Group)
        .map(|edge| {
            (
                edge.relation_name.as_str(),
                edge.source.as_str(),
                edge.target.as_str(),
            )
        })
        .collect();
    assert_eq!(
        group_edges,
        vec![("kids", "P0", "kids:P0"), ("kids", "P1", "kids:P1")]
    );
}

#[test]
fn test_hide_disconnected_hides_every_type() {
    let spec = "directives:\n  - flag: hideDisconnected\n";
    let outcome = layout(spec, &people());

    let visible: Vec<&str> = outcome
        .layout
        .visible_nodes()
        .map(|node| node.id.as_str())
        .collect();
    assert_eq!(visible, vec!["Alice", "Bob", "25", "30"]);
    assert!(outcome.layout.node("Carol").unwrap().hidden);
    assert!(outcome.layout.node("7").unwrap().hidden);
}

#[test]
fn test_attribute_keys_name_interior_columns() {
    let instance = Instance::new(
        vec![
            Atom::new("Alice", "Person"),
            Atom::new("Math", "Course"),
            Atom::new("A", "Grade"),
            Atom::new("Row1", "Row"),
            Atom::new("Col2", "Column"),
            Atom::new("S4", "Seat"),
        ],
        vec![
            relation("grade", &[&["Alice", "Math", "A"]]),
            relation("seat", &[&["Alice", "Row1", "Col2", "S4"]]),
        ],
    )
    .unwrap();
    let spec = r#"
directives:
  - attribute:
      field: grade
  - attribute:
      field: seat
"#;
    let outcome = layout(spec, &instance);
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    assert!(outcome.layout.edges.is_empty());

    let alice = outcome.layout.node("Alice").unwrap();
    let keys: Vec<&str> = alice.attributes.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["grade[Math]", "seat[Row1][Col2]"]);
    assert_eq!(alice.attributes["grade[Math]"], ["A"]);
    assert_eq!(alice.attributes["seat[Row1][Col2]"], ["S4"]);
}

#[test]
fn test_attribute_keeps_values_sharing_a_label() {
    let instance = Instance::new(
        vec![
            Atom::new("Alice", "Person"),
            Atom::new("Score0", "Score").with_label("7"),
            Atom::new("Score1", "Score").with_label("7"),
        ],
        vec![relation(
            "scores",
            &[&["Alice", "Score0"], &["Alice", "Score1"]],
        )],
    )
    .unwrap();
    let spec = "directives:\n  - attribute:\n      field: scores\n";
    let outcome = layout(spec, &instance);

    let alice = outcome.layout.node("Alice").unwrap();
    assert_eq!(alice.attributes["scores"], ["7", "7"]);
}
