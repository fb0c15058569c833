use spytial_parser::error::ErrorCode;
use spytial_parser::spec::{
    AlignDirection, Constraint, Directive, Direction, Flag, Rotation,
};
use spytial_parser::{Expr, generate, parse};

const FULL_SPEC: &str = r#"
constraints:
  # keep children under their parent
  - orientation:
      selector: left
      directions: [left, below]
  - orientation:
      selector: 'Node3 -> Node1'
      directions:
        - directlyAbove
  - align:
      selector: Node0 -> Node1
      direction: horizontal
  - cyclic:
      selector: next
      direction: counterclockwise
  - group:
      field: children
      groupOn: 1
      addToGroup: 2
  - group:
      selector: Person & ~age.Int
      name: ageless
      addEdge: true
  - size:
      selector: Person
      width: 120
      height: 80.5
  - hideAtom:
      selector: Int - Person.age
directives:
  - attribute:
      field: age
  - hideField:
      field: secret
      selector: Person
  - icon:
      selector: Person
      path: icons/person.svg
      showLabels: true
  - atomColor:
      selector: Person
      value: '#ff8800'
  - edgeColor:
      field: left
      value: red
      filter: Node3 -> Node1
      style: dashed
      weight: 2
      showLabel: false
      hidden: true
  - projection:
      sig: Time
      orderBy: next
  - flag: hideDisconnectedBuiltIns
  - inferredEdge:
      name: grandchild
      selector: left.left + right.right
      color: blue
  - tag:
      toTag: Person
      name: age
      value: age
"#;

#[test]
fn test_full_spec_parses() {
    let parsed = parse(FULL_SPEC).expect("Failed to parse");
    assert!(
        parsed.warnings().is_empty(),
        "Unexpected warnings: {:?}",
        parsed.warnings()
    );

    let spec = parsed.spec();
    assert_eq!(spec.constraints().len(), 8);
    assert_eq!(spec.directives().len(), 9);

    let first = &spec.constraints()[0];
    assert_eq!(first.comment(), Some("keep children under their parent"));
    match first.kind() {
        Constraint::Orientation(c) => {
            assert_eq!(c.selector.expr(), &Expr::name("left"));
            assert_eq!(c.directions, vec![Direction::Left, Direction::Below]);
        }
        other => panic!("Expected orientation, got {other:?}"),
    }

    match spec.constraints()[2].kind() {
        Constraint::Align(c) => assert_eq!(c.direction, AlignDirection::Horizontal),
        other => panic!("Expected align, got {other:?}"),
    }
    match spec.constraints()[3].kind() {
        Constraint::Cyclic(c) => assert_eq!(c.direction, Rotation::Counterclockwise),
        other => panic!("Expected cyclic, got {other:?}"),
    }
    match spec.constraints()[4].kind() {
        Constraint::GroupByField(c) => {
            assert_eq!(c.field, "children");
            assert_eq!((c.group_on, c.add_to_group), (1, 2));
        }
        other => panic!("Expected field group, got {other:?}"),
    }
    match spec.constraints()[6].kind() {
        Constraint::Size(c) => {
            assert_eq!(c.width, Some(120.0));
            assert_eq!(c.height, Some(80.5));
        }
        other => panic!("Expected size, got {other:?}"),
    }

    match spec.directives()[4].kind() {
        Directive::EdgeColor(d) => {
            assert_eq!(d.field, "left");
            assert_eq!(d.filter.as_ref().map(|s| s.source()), Some("Node3 -> Node1"));
            assert_eq!(d.show_label, Some(false));
            assert!(d.hidden);
        }
        other => panic!("Expected edge color, got {other:?}"),
    }
    assert!(spec.has_flag(Flag::HideDisconnectedBuiltIns));
    assert!(!spec.has_flag(Flag::HideDisconnected));
}

#[test]
fn test_generated_text_parses_to_equivalent_spec() {
    let original = parse(FULL_SPEC).expect("Failed to parse");
    let text = generate(original.spec());
    let reparsed = parse(&text).unwrap_or_else(|err| panic!("Generated text failed: {err}\n{text}"));

    assert!(reparsed.warnings().is_empty());
    assert!(
        reparsed.spec().is_equivalent(original.spec()),
        "Round trip changed the spec:\n{text}"
    );
    // Generation is a fixed point once canonical.
    assert_eq!(generate(reparsed.spec()), text);
}

#[test]
fn test_generated_text_is_canonical() {
    let parsed = parse(
        "directives:\n- size: {selector: Person, width: 40}\n- atomColor: {selector: Person, value: '#000'}\n",
    )
    .expect("Failed to parse");
    assert_eq!(
        generate(parsed.spec()),
        "constraints:\n  - size:\n      selector: Person\n      width: 40\ndirectives:\n  - atomColor:\n      selector: Person\n      value: '#000'\n"
    );
}

#[test]
fn test_size_and_hide_atom_under_directives_move_silently() {
    let parsed = parse(
        "directives:\n  - size:\n      selector: A\n      height: 10\n  - hideAtom:\n      selector: B\n",
    )
    .expect("Failed to parse");
    assert!(parsed.warnings().is_empty());
    assert_eq!(parsed.spec().constraints().len(), 2);
    assert!(parsed.spec().directives().is_empty());
}

#[test]
fn test_other_misplaced_kinds_move_with_warning() {
    let parsed = parse("constraints:\n  - attribute:\n      field: age\n").expect("Failed to parse");
    assert_eq!(parsed.spec().directives().len(), 1);
    assert_eq!(parsed.warnings().len(), 1);
    assert!(parsed.warnings()[0].message().contains("attribute"));
}

#[test]
fn test_unknown_kind_is_kept_and_warned() {
    let source = "constraints:\n  - spiral:\n      selector: next\n      turns: 3\n";
    let parsed = parse(source).expect("Unknown kinds should not fail");

    assert_eq!(parsed.warnings().len(), 1);
    assert!(parsed.warnings()[0].severity().is_warning());
    assert!(parsed.warnings()[0].message().contains("spiral"));

    match parsed.spec().constraints()[0].kind() {
        Constraint::Unknown(unknown) => assert_eq!(unknown.kind, "spiral"),
        other => panic!("Expected unknown entry, got {other:?}"),
    }

    let text = generate(parsed.spec());
    assert_eq!(text, source);
}

#[test]
fn test_syntax_errors_are_distinct_from_invalid_entries() {
    let syntax = parse("constraints:\n  - orientation: {selector: left\n").unwrap_err();
    assert!(syntax.is_syntax_error());
    assert!(syntax.has_code(ErrorCode::E004));

    let selector = parse("constraints:\n  - orientation:\n      selector: left +\n      directions: [left]\n")
        .unwrap_err();
    assert!(selector.is_syntax_error());
    assert!(selector.has_code(ErrorCode::E101));

    let invalid = parse("constraints:\n  - orientation:\n      directions: [left]\n").unwrap_err();
    assert!(!invalid.is_syntax_error());
    assert!(invalid.has_code(ErrorCode::E203));
    assert!(invalid.to_string().starts_with("invalid spec:"));
}

#[test]
fn test_all_errors_are_reported_together() {
    let err = parse(
        "constraints:\n  - align:\n      selector: a\n  - orientation:\n      selector: b\n      directions: [left, right]\n",
    )
    .unwrap_err();
    assert!(err.has_code(ErrorCode::E203));
    assert!(err.has_code(ErrorCode::E205));
    assert_eq!(err.diagnostics().len(), 2);
}

#[test]
fn test_error_spans_point_into_source() {
    let source = "constraints:\n  - align:\n      selector: a\n      direction: diagonal\n";
    let err = parse(source).unwrap_err();
    let span = err.diagnostics()[0]
        .primary_span()
        .expect("Diagnostic should carry a span");
    assert_eq!(&source[span.start()..span.end()], "diagonal");
}

#[test]
fn test_empty_and_comment_only_documents() {
    for source in ["", "\n\n", "# nothing here\n", "constraints: []\ndirectives: []\n"] {
        let parsed = parse(source).expect("Failed to parse");
        assert!(parsed.spec().is_empty(), "{source:?} should be empty");
        assert_eq!(generate(parsed.spec()), "");
    }
}

#[test]
fn test_byte_order_mark_is_ignored() {
    let parsed = parse("\u{feff}constraints:\n  - align:\n      selector: a\n      direction: vertical\n")
        .expect("Failed to parse");
    assert!(parsed.warnings().is_empty());
    assert_eq!(parsed.spec().constraints().len(), 1);
}

#[test]
fn test_deeply_nested_selector_is_rejected() {
    let selector = format!("{}a{}", "(".repeat(400), ")".repeat(400));
    let source = format!("constraints:\n  - align:\n      selector: '{selector}'\n      direction: vertical\n");
    let err = parse(&source).unwrap_err();
    assert!(err.is_syntax_error());
    assert!(err.has_code(ErrorCode::E102));
}
