use std::{fs, path::Path};

use tempfile::{TempDir, tempdir};

use spytial::SpytialError;
use spytial_cli::{Args, Command, run};

const TREE_INSTANCE: &str = r#"
[[atoms]]
id = "Node0"
type = "Node"

[[atoms]]
id = "Node1"
type = "Node"

[[atoms]]
id = "Node2"
type = "Node"

[[atoms]]
id = "Node3"
type = "Node"

[[atoms]]
id = "Node4"
type = "Node"
label = "leaf"

[[relations]]
name = "left"
tuples = [["Node3", "Node1"], ["Node4", "Node2"]]

[[relations]]
name = "right"
tuples = [["Node3", "Node4"], ["Node1", "Node0"]]
"#;

const TREE_SPEC: &str = r#"
constraints:
  # children below parents
  - orientation:
      selector: left + right
      directions: [below]
directives:
  - edgeColor:
      field: left
      value: '#000000'
      filter: 'Node3 -> Node1'
      hidden: true
  - atomColor:
      selector: Node0
      value: nope
"#;

fn write(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write fixture");
    path.to_string_lossy().to_string()
}

fn layout_args(spec: String, instance: String, output: &Path) -> Args {
    Args {
        command: Command::Layout {
            spec,
            instance,
            output: Some(output.to_string_lossy().to_string()),
            projections: Vec::new(),
            strict: false,
        },
        config: None,
        log_level: "off".to_string(),
    }
}

fn read_table(path: &Path) -> toml::Table {
    let text = fs::read_to_string(path).expect("Failed to read output");
    toml::from_str(&text).expect("Output is not valid TOML")
}

#[test]
fn e2e_layout_writes_toml() {
    let dir = tempdir().expect("Failed to create temp directory");
    let spec = write(&dir, "tree.spytial", TREE_SPEC);
    let instance = write(&dir, "tree.toml", TREE_INSTANCE);
    let output = dir.path().join("layout.toml");

    run(&layout_args(spec, instance, &output)).expect("Layout failed");

    let table = read_table(&output);
    let nodes = table["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 5);
    assert_eq!(nodes[4]["label"].as_str(), Some("leaf"));

    let hidden: Vec<&str> = table["edges"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|edge| edge["hidden"].as_bool() == Some(true))
        .map(|edge| edge["id"].as_str().unwrap())
        .collect();
    assert_eq!(hidden, vec!["left:Node3->Node1"]);

    assert_eq!(table["constraints"].as_array().unwrap().len(), 4);

    // The invalid color is reported but kept.
    let warnings = table["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(nodes[0]["color"].as_str(), Some("nope"));
}

#[test]
fn e2e_layout_with_projection() {
    let dir = tempdir().expect("Failed to create temp directory");
    let spec = write(
        &dir,
        "time.spytial",
        "directives:\n  - projection:\n      sig: Time\n",
    );
    let instance = write(
        &dir,
        "time.toml",
        r#"
atoms = [
    { id = "T0", type = "Time" },
    { id = "T1", type = "Time" },
    { id = "S", type = "State" },
    { id = "A", type = "Val" },
    { id = "B", type = "Val" },
]
relations = [
    { name = "at", tuples = [["S", "T0", "A"], ["S", "T1", "B"]] },
]
"#,
    );
    let output = dir.path().join("layout.toml");

    let mut args = layout_args(spec, instance, &output);
    if let Command::Layout { projections, .. } = &mut args.command {
        projections.push("Time=T1".to_string());
    }
    run(&args).expect("Layout failed");

    let table = read_table(&output);
    let projection = &table["projections"].as_array().unwrap()[0];
    assert_eq!(projection["chosen"].as_str(), Some("T1"));
    let edges = table["edges"].as_array().unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0]["id"].as_str(), Some("at:S->B"));
}

#[test]
fn e2e_strict_layout_fails_on_unknown_selector() {
    let dir = tempdir().expect("Failed to create temp directory");
    let spec = write(
        &dir,
        "bad.spytial",
        "constraints:\n  - align:\n      selector: nothing\n      direction: vertical\n",
    );
    let instance = write(&dir, "tree.toml", TREE_INSTANCE);
    let output = dir.path().join("layout.toml");

    let mut args = layout_args(spec, instance, &output);
    run(&args).expect("Lenient layout should succeed");

    if let Command::Layout { strict, .. } = &mut args.command {
        *strict = true;
    }
    assert!(matches!(run(&args), Err(SpytialError::Layout(_))));
}

#[test]
fn e2e_invalid_inputs_fail() {
    let dir = tempdir().expect("Failed to create temp directory");
    let instance = write(&dir, "tree.toml", TREE_INSTANCE);
    let output = dir.path().join("layout.toml");

    let broken_spec = write(
        &dir,
        "broken.spytial",
        "constraints:\n  - orientation:\n      selector: left\n      directions: [diagonal]\n",
    );
    let err = run(&layout_args(broken_spec, instance.clone(), &output)).unwrap_err();
    assert!(matches!(err, SpytialError::Parse { .. }));

    let spec = write(&dir, "tree.spytial", TREE_SPEC);
    let broken_instance = write(
        &dir,
        "broken.toml",
        "[[atoms]]\nid = \"a\"\ntype = \"A\"\n\n[[relations]]\nname = \"r\"\ntuples = [[\"a\", \"missing\"]]\n",
    );
    let err = run(&layout_args(spec.clone(), broken_instance, &output)).unwrap_err();
    assert!(matches!(err, SpytialError::Io(_)));

    let mut args = layout_args(spec, instance, &output);
    if let Command::Layout { projections, .. } = &mut args.command {
        projections.push("Time".to_string());
    }
    assert!(matches!(run(&args), Err(SpytialError::Io(_))));
    assert!(!output.exists());
}

#[test]
fn e2e_fmt_is_stable() {
    let dir = tempdir().expect("Failed to create temp directory");
    let spec = write(&dir, "tree.spytial", TREE_SPEC);
    let first = dir.path().join("first.spytial");
    let second = dir.path().join("second.spytial");

    let fmt = |input: String, output: &Path| Args {
        command: Command::Fmt {
            spec: input,
            output: Some(output.to_string_lossy().to_string()),
        },
        config: None,
        log_level: "off".to_string(),
    };

    run(&fmt(spec, &first)).expect("Format failed");
    run(&fmt(first.to_string_lossy().to_string(), &second)).expect("Format failed");

    let first = fs::read_to_string(first).unwrap();
    let second = fs::read_to_string(second).unwrap();
    assert_eq!(first, second);
    assert!(first.contains("# children below parents"));
    assert!(first.contains("edgeColor:"));
}
