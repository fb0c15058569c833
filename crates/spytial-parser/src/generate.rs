//! Renders a [`LayoutSpec`] back to spec text.
//!
//! Output is canonical: block style, two-space indentation, known kinds in
//! their own section, defaults omitted, and scalars quoted only when the
//! reader would otherwise see something different.

use indexmap::IndexMap;

use crate::spec::*;

fn number(value: f64) -> RawValue {
    RawValue::Scalar(value.to_string())
}

fn selector_raw(selector: &crate::Selector) -> RawValue {
    RawValue::scalar(selector.source())
}

#[derive(Default)]
struct ParamsBuilder(IndexMap<String, RawValue>);

impl ParamsBuilder {
    fn set(mut self, key: &str, value: RawValue) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    fn set_opt(self, key: &str, value: Option<RawValue>) -> Self {
        match value {
            Some(value) => self.set(key, value),
            None => self,
        }
    }

    fn set_if(self, key: &str, condition: bool, value: RawValue) -> Self {
        if condition { self.set(key, value) } else { self }
    }

    fn build(self) -> RawValue {
        RawValue::Map(self.0)
    }
}

/// Kind key and parameters of a constraint, as written in spec text.
fn constraint_raw(constraint: &Constraint) -> (String, RawValue) {
    let params = ParamsBuilder::default();
    match constraint {
        Constraint::Orientation(c) => (
            "orientation".into(),
            params
                .set("selector", selector_raw(&c.selector))
                .set(
                    "directions",
                    RawValue::Seq(c.directions.iter().map(|d| RawValue::scalar(d.as_str())).collect()),
                )
                .build(),
        ),
        Constraint::Align(c) => (
            "align".into(),
            params
                .set("selector", selector_raw(&c.selector))
                .set("direction", RawValue::scalar(c.direction.as_str()))
                .build(),
        ),
        Constraint::Cyclic(c) => (
            "cyclic".into(),
            params
                .set("selector", selector_raw(&c.selector))
                .set("direction", RawValue::scalar(c.direction.as_str()))
                .build(),
        ),
        Constraint::GroupByField(c) => (
            "group".into(),
            params
                .set("field", RawValue::scalar(&c.field))
                .set_if("groupOn", c.group_on != 0, RawValue::scalar(c.group_on.to_string()))
                .set_if(
                    "addToGroup",
                    c.add_to_group != 1,
                    RawValue::scalar(c.add_to_group.to_string()),
                )
                .set_opt("selector", c.selector.as_ref().map(selector_raw))
                .build(),
        ),
        Constraint::GroupBySelector(c) => (
            "group".into(),
            params
                .set("selector", selector_raw(&c.selector))
                .set("name", RawValue::scalar(&c.name))
                .set_if("addEdge", c.add_edge, RawValue::scalar("true"))
                .build(),
        ),
        Constraint::Size(c) => (
            "size".into(),
            params
                .set("selector", selector_raw(&c.selector))
                .set_opt("width", c.width.map(number))
                .set_opt("height", c.height.map(number))
                .build(),
        ),
        Constraint::HideAtom(c) => (
            "hideAtom".into(),
            params.set("selector", selector_raw(&c.selector)).build(),
        ),
        Constraint::Unknown(unknown) => (unknown.kind.clone(), unknown.params.clone()),
    }
}

/// Kind key and parameters of a directive, as written in spec text.
fn directive_raw(directive: &Directive) -> (String, RawValue) {
    let params = ParamsBuilder::default();
    match directive {
        Directive::Attribute(d) => (
            "attribute".into(),
            params
                .set("field", RawValue::scalar(&d.field))
                .set_opt("selector", d.selector.as_ref().map(selector_raw))
                .build(),
        ),
        Directive::HideField(d) => (
            "hideField".into(),
            params
                .set("field", RawValue::scalar(&d.field))
                .set_opt("selector", d.selector.as_ref().map(selector_raw))
                .build(),
        ),
        Directive::Icon(d) => (
            "icon".into(),
            params
                .set("selector", selector_raw(&d.selector))
                .set("path", RawValue::scalar(&d.path))
                .set_if("showLabels", d.show_labels, RawValue::scalar("true"))
                .build(),
        ),
        Directive::AtomColor(d) => (
            "atomColor".into(),
            params
                .set("selector", selector_raw(&d.selector))
                .set("value", RawValue::scalar(&d.value))
                .build(),
        ),
        Directive::EdgeColor(d) => (
            "edgeColor".into(),
            params
                .set("field", RawValue::scalar(&d.field))
                .set("value", RawValue::scalar(&d.value))
                .set_opt("selector", d.selector.as_ref().map(selector_raw))
                .set_opt("filter", d.filter.as_ref().map(selector_raw))
                .set_opt("style", d.style.as_deref().map(RawValue::scalar))
                .set_opt("weight", d.weight.map(number))
                .set_opt("showLabel", d.show_label.map(|b| RawValue::scalar(b.to_string())))
                .set_if("hidden", d.hidden, RawValue::scalar("true"))
                .build(),
        ),
        Directive::Projection(d) => (
            "projection".into(),
            params
                .set("sig", RawValue::scalar(&d.sig))
                .set_opt("orderBy", d.order_by.as_ref().map(selector_raw))
                .build(),
        ),
        Directive::Flag(flag) => ("flag".into(), RawValue::scalar(flag.as_str())),
        Directive::InferredEdge(d) => (
            "inferredEdge".into(),
            params
                .set("name", RawValue::scalar(&d.name))
                .set("selector", selector_raw(&d.selector))
                .set_opt("color", d.color.as_deref().map(RawValue::scalar))
                .set_opt("style", d.style.as_deref().map(RawValue::scalar))
                .set_opt("weight", d.weight.map(number))
                .build(),
        ),
        Directive::Tag(d) => (
            "tag".into(),
            params
                .set("toTag", selector_raw(&d.to_tag))
                .set("name", RawValue::scalar(&d.name))
                .set("value", selector_raw(&d.value))
                .build(),
        ),
        Directive::Unknown(unknown) => (unknown.kind.clone(), unknown.params.clone()),
    }
}

/// Returns `true` if `text` reads back unchanged as a plain scalar in both
/// block and flow position.
fn is_plain_safe(text: &str) -> bool {
    let Some(first) = text.chars().next() else {
        return false;
    };
    !text.starts_with(char::is_whitespace)
        && !text.ends_with(char::is_whitespace)
        && !"-?:,[]{}#&*!|>'\"%@`~^".contains(first)
        && !text.contains([',', '[', ']', '{', '}', '#', ':', '\n', '\r', '\t'])
        && !matches!(text, "null" | "Null" | "NULL")
}

fn write_scalar(out: &mut String, text: &str) {
    if is_plain_safe(text) {
        out.push_str(text);
    } else if text.contains(|c: char| c.is_control()) {
        out.push('"');
        for c in text.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                '\r' => out.push_str("\\r"),
                '\0' => out.push_str("\\0"),
                c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
                c => out.push(c),
            }
        }
        out.push('"');
    } else {
        out.push('\'');
        out.push_str(&text.replace('\'', "''"));
        out.push('\'');
    }
}

fn is_flow_friendly(items: &[RawValue]) -> bool {
    items.iter().all(|item| matches!(item, RawValue::Scalar(_)))
}

/// Write what follows `key:` or `-`: an inline value with its newline, or a
/// newline followed by a nested block.
fn write_after_indicator(out: &mut String, value: &RawValue, indent: usize) {
    match value {
        RawValue::Null => out.push('\n'),
        RawValue::Scalar(text) => {
            out.push(' ');
            write_scalar(out, text);
            out.push('\n');
        }
        RawValue::Seq(items) if items.is_empty() => out.push_str(" []\n"),
        RawValue::Map(map) if map.is_empty() => out.push_str(" {}\n"),
        RawValue::Seq(items) if is_flow_friendly(items) => {
            out.push_str(" [");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                if let RawValue::Scalar(text) = item {
                    write_scalar(out, text);
                }
            }
            out.push_str("]\n");
        }
        RawValue::Seq(items) => {
            out.push('\n');
            write_seq(out, items, indent + 2);
        }
        RawValue::Map(map) => {
            out.push('\n');
            write_map(out, map, indent + 2);
        }
    }
}

fn write_map(out: &mut String, map: &IndexMap<String, RawValue>, indent: usize) {
    for (key, value) in map {
        out.push_str(&" ".repeat(indent));
        write_scalar(out, key);
        out.push(':');
        write_after_indicator(out, value, indent);
    }
}

fn write_seq_item(out: &mut String, value: &RawValue, indent: usize) {
    match value {
        RawValue::Map(map) if !map.is_empty() => {
            // The first key shares the line with the dash.
            let mut body = String::new();
            write_map(&mut body, map, indent + 2);
            out.push_str(&" ".repeat(indent));
            out.push_str("- ");
            out.push_str(&body[indent + 2..]);
        }
        other => {
            out.push_str(&" ".repeat(indent));
            out.push('-');
            write_after_indicator(out, other, indent);
        }
    }
}

fn write_seq(out: &mut String, items: &[RawValue], indent: usize) {
    for item in items {
        write_seq_item(out, item, indent);
    }
}

fn write_comment(out: &mut String, comment: Option<&str>, indent: usize) {
    let Some(comment) = comment else {
        return;
    };
    for line in comment.split('\n') {
        out.push_str(&" ".repeat(indent));
        out.push('#');
        if !line.is_empty() {
            out.push(' ');
            out.push_str(line);
        }
        out.push('\n');
    }
}

fn write_section<K>(
    out: &mut String,
    section: Section,
    entries: &[SpecEntry<K>],
    to_raw: impl Fn(&K) -> (String, RawValue),
) {
    if entries.is_empty() {
        return;
    }
    out.push_str(section.as_str());
    out.push_str(":\n");
    for entry in entries {
        write_comment(out, entry.comment(), 2);
        let (kind, params) = to_raw(entry.kind());
        let mut item = IndexMap::new();
        item.insert(kind, params);
        write_seq_item(out, &RawValue::Map(item), 2);
    }
}

/// Render a spec as text that parses back to an equivalent spec.
///
/// # Example
///
/// ```
/// # use spytial_parser::{generate, parse};
/// let parsed = parse("directives:\n  # keep builtins tidy\n  - flag: hideDisconnectedBuiltIns\n").unwrap();
/// let text = generate(parsed.spec());
/// assert_eq!(text, "directives:\n  # keep builtins tidy\n  - flag: hideDisconnectedBuiltIns\n");
/// assert!(parse(&text).unwrap().spec().is_equivalent(parsed.spec()));
/// ```
pub fn generate(spec: &LayoutSpec) -> String {
    let mut out = String::new();
    write_section(&mut out, Section::Constraints, spec.constraints(), constraint_raw);
    write_section(&mut out, Section::Directives, spec.directives(), directive_raw);
    out
}
