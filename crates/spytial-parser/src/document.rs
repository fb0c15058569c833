//! A comment-aware reader for the YAML subset spec files are written in.
//!
//! Supported: block mappings and sequences nested by space indentation,
//! single-line flow sequences `[a, b]` and mappings `{a: b}`, plain,
//! single-quoted and double-quoted scalars, and `#` comments. Comment lines
//! directly above a sequence item are kept with that item.
//!
//! Lines are classified first; block structure is then rebuilt from
//! indentation, and the value part of each line is parsed with winnow.

use winnow::{
    Parser as _,
    ascii::{space0, space1},
    combinator::{alt, cut_err, delimited, eof, opt, peek, preceded, repeat, separated, terminated},
    error::{AddContext, ContextError, ErrMode, ModalResult},
    stream::{LocatingSlice, Location, Stream},
    token::{none_of, one_of, take_while},
};

use crate::{
    error::{Diagnostic, ErrorCode, Result},
    span::{Span, Spanned},
};

/// A node of the document tree with its source span.
pub(crate) type Node = Spanned<Value>;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    Null,
    Scalar(Scalar),
    Seq(Vec<SeqItem>),
    Map(Vec<MapEntry>),
}

impl Value {
    /// Human readable shape, for diagnostics.
    pub(crate) fn shape(&self) -> &'static str {
        match self {
            Value::Null => "an empty value",
            Value::Scalar(_) => "a scalar",
            Value::Seq(_) => "a sequence",
            Value::Map(_) => "a mapping",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Scalar {
    pub text: String,
    pub style: ScalarStyle,
}

impl Scalar {
    /// Returns `true` for plain scalars that spell a null.
    pub(crate) fn is_null(&self) -> bool {
        self.style == ScalarStyle::Plain && matches!(self.text.as_str(), "null" | "Null" | "NULL" | "~")
    }

    /// Bytes between the start of the node span and the first content byte.
    pub(crate) fn content_offset(&self) -> usize {
        match self.style {
            ScalarStyle::Plain => 0,
            ScalarStyle::SingleQuoted | ScalarStyle::DoubleQuoted => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SeqItem {
    pub node: Node,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MapEntry {
    pub key: Spanned<String>,
    pub value: Node,
}

/// Rich diagnostic information attached to winnow errors via `.context()`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DocContext {
    code: ErrorCode,
    message: &'static str,
    help: Option<&'static str>,
    /// The error span covers from `start` to the error position.
    start: usize,
}

type Input<'a> = LocatingSlice<&'a str>;
type PResult<O> = ModalResult<O, ContextError<DocContext>>;

fn escape(input: &mut Input<'_>) -> PResult<char> {
    let start = input.current_token_start();
    preceded(
        '\\',
        cut_err(alt((
            one_of(['n', 't', 'r', '0', '\\', '/', '"']).map(|c| match c {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                '0' => '\0',
                other => other,
            }),
            preceded('u', take_while(4, |c: char| c.is_ascii_hexdigit()))
                .verify_map(|hex: &str| u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)),
        )))
        .context(DocContext {
            code: ErrorCode::E008,
            message: "invalid escape sequence",
            help: Some("valid escapes: `\\n`, `\\t`, `\\r`, `\\0`, `\\\\`, `\\/`, `\\\"`, `\\uXXXX`"),
            start,
        }),
    )
    .parse_next(input)
}

fn double_quoted(input: &mut Input<'_>) -> PResult<Node> {
    let start = input.current_token_start();
    '"'.parse_next(input)?;
    let text = cut_err(terminated(
        repeat(0.., alt((escape, none_of(['"', '\\'])))).fold(String::new, |mut acc, c| {
            acc.push(c);
            acc
        }),
        '"',
    ))
    .context(DocContext {
        code: ErrorCode::E001,
        message: "unterminated double-quoted scalar",
        help: Some("add closing `\"`"),
        start,
    })
    .parse_next(input)?;
    let end = input.current_token_start();
    Ok(Spanned::new(
        Value::Scalar(Scalar {
            text,
            style: ScalarStyle::DoubleQuoted,
        }),
        Span::new(start..end),
    ))
}

fn single_quoted(input: &mut Input<'_>) -> PResult<Node> {
    let start = input.current_token_start();
    '\''.parse_next(input)?;
    let text = cut_err(terminated(
        repeat(0.., alt(("''".value('\''), none_of(['\''])))).fold(String::new, |mut acc, c| {
            acc.push(c);
            acc
        }),
        '\'',
    ))
    .context(DocContext {
        code: ErrorCode::E001,
        message: "unterminated single-quoted scalar",
        help: Some("add closing `'`; write `''` for a literal quote"),
        start,
    })
    .parse_next(input)?;
    let end = input.current_token_start();
    Ok(Spanned::new(
        Value::Scalar(Scalar {
            text,
            style: ScalarStyle::SingleQuoted,
        }),
        Span::new(start..end),
    ))
}

fn quoted(input: &mut Input<'_>) -> PResult<Node> {
    alt((double_quoted, single_quoted)).parse_next(input)
}

fn plain_node(input: &mut Input<'_>, text: &str, start: usize) -> Node {
    let end = input.current_token_start();
    Spanned::new(
        Value::Scalar(Scalar {
            text: text.to_string(),
            style: ScalarStyle::Plain,
        }),
        Span::new(start..end),
    )
}

fn block_plain_tail(input: &mut Input<'_>) -> PResult<()> {
    repeat(
        0..,
        alt((
            none_of([' ', '\t']).void(),
            (space1, peek(none_of(['#', ' ', '\t']))).void(),
        )),
    )
    .parse_next(input)
}

/// A plain scalar running to the end of the line or to a ` #` comment.
fn block_plain(input: &mut Input<'_>) -> PResult<Node> {
    let start = input.current_token_start();
    let text = (none_of([' ', '\t', '#', '[', '{', '\'', '"']), block_plain_tail)
        .take()
        .parse_next(input)?;
    Ok(plain_node(input, text, start))
}

const FLOW_INDICATORS: [char; 7] = [',', '[', ']', '{', '}', ':', '#'];

fn flow_plain_tail(input: &mut Input<'_>) -> PResult<()> {
    repeat(
        0..,
        alt((
            none_of(|c: char| c == ' ' || c == '\t' || FLOW_INDICATORS.contains(&c)).void(),
            (
                space1,
                peek(none_of(|c: char| {
                    c == ' ' || c == '\t' || FLOW_INDICATORS.contains(&c)
                })),
            )
                .void(),
        )),
    )
    .parse_next(input)
}

/// A plain scalar inside a flow collection, stopping at indicators.
fn flow_plain(input: &mut Input<'_>) -> PResult<Node> {
    let start = input.current_token_start();
    let text = (
        none_of(|c: char| {
            c == ' ' || c == '\t' || c == '\'' || c == '"' || FLOW_INDICATORS.contains(&c)
        }),
        flow_plain_tail,
    )
        .take()
        .parse_next(input)?;
    Ok(plain_node(input, text, start))
}

fn flow_value(input: &mut Input<'_>) -> PResult<Node> {
    alt((flow_sequence, flow_mapping, quoted, flow_plain)).parse_next(input)
}

fn flow_sequence(input: &mut Input<'_>) -> PResult<Node> {
    let start = input.current_token_start();
    '['.parse_next(input)?;
    let items: Vec<Node> = cut_err(terminated(
        separated(0.., delimited(space0, flow_value, space0), ','),
        (space0, opt((',', space0)), ']'),
    ))
    .context(DocContext {
        code: ErrorCode::E004,
        message: "unclosed flow sequence",
        help: Some("close the sequence with `]` on the same line"),
        start,
    })
    .parse_next(input)?;
    let end = input.current_token_start();
    let items = items
        .into_iter()
        .map(|node| SeqItem {
            node,
            comment: None,
        })
        .collect();
    Ok(Spanned::new(Value::Seq(items), Span::new(start..end)))
}

fn flow_key(input: &mut Input<'_>) -> PResult<Spanned<String>> {
    let node = alt((quoted, flow_plain)).parse_next(input)?;
    let span = node.span();
    match node.into_inner() {
        Value::Scalar(scalar) => Ok(Spanned::new(scalar.text, span)),
        _ => Err(ErrMode::Backtrack(ContextError::new())),
    }
}

fn flow_pair(input: &mut Input<'_>) -> PResult<MapEntry> {
    let key = preceded(space0, flow_key).parse_next(input)?;
    (space0, ':', space0).parse_next(input)?;
    let value_start = input.current_token_start();
    let value = opt(flow_value)
        .parse_next(input)?
        .unwrap_or_else(|| Spanned::new(Value::Null, Span::new(value_start..value_start)));
    space0.parse_next(input)?;
    Ok(MapEntry { key, value })
}

fn flow_mapping(input: &mut Input<'_>) -> PResult<Node> {
    let start = input.current_token_start();
    '{'.parse_next(input)?;
    let entries: Vec<MapEntry> = cut_err(terminated(
        separated(0.., flow_pair, ','),
        (space0, opt((',', space0)), '}'),
    ))
    .context(DocContext {
        code: ErrorCode::E004,
        message: "unclosed flow mapping",
        help: Some("close the mapping with `}` on the same line"),
        start,
    })
    .parse_next(input)?;

    for (i, entry) in entries.iter().enumerate() {
        if entries[..i].iter().any(|prev| prev.key == entry.key) {
            return Err(ErrMode::Cut(ContextError::new().add_context(
                input,
                &input.checkpoint(),
                DocContext {
                    code: ErrorCode::E007,
                    message: "duplicate mapping key",
                    help: Some("each key may appear once per mapping"),
                    start: entry.key.span().start(),
                },
            )));
        }
    }

    let end = input.current_token_start();
    Ok(Spanned::new(Value::Map(entries), Span::new(start..end)))
}

fn trailing_comment(input: &mut Input<'_>) -> PResult<()> {
    ('#', take_while(0.., |_: char| true)).void().parse_next(input)
}

fn block_value(input: &mut Input<'_>) -> PResult<Node> {
    terminated(
        alt((flow_sequence, flow_mapping, quoted, block_plain)),
        (space0, opt(trailing_comment), eof),
    )
    .parse_next(input)
}

fn convert_err_mode(err: ErrMode<ContextError<DocContext>>, error_pos: usize) -> Diagnostic {
    let context_error = match err {
        ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => ctx,
        ErrMode::Incomplete(_) => ContextError::new(),
    };

    if let Some(DocContext {
        code,
        message,
        help,
        start,
    }) = context_error.context().next()
    {
        let span = Span::new(*start..error_pos.max(*start + 1));
        let mut diag = Diagnostic::error(*message)
            .with_code(*code)
            .with_label(span, code.description());
        if let Some(help) = help {
            diag = diag.with_help(*help);
        }
        return diag;
    }

    let span = Span::new(error_pos..error_pos + 1);
    Diagnostic::error("unexpected character after value")
        .with_code(ErrorCode::E002)
        .with_label(span, ErrorCode::E002.description())
        .with_help("quote the value if it contains `#`, `[` or `{`")
}

/// Parse the value part of one line, located at `offset..end` in `src`.
fn parse_inline(src: &str, offset: usize, end: usize) -> Result<Node> {
    let mut input = LocatingSlice::new(&src[..end]);
    input.next_slice(offset);
    block_value
        .parse_next(&mut input)
        .map_err(|err| convert_err_mode(err, input.current_token_start()))
}

/// A `key:` prefix on a line.
struct KeyLine<'a> {
    key: Spanned<String>,
    rest: &'a str,
    rest_offset: usize,
}

fn plain_key(input: &mut Input<'_>) -> PResult<String> {
    (
        none_of([' ', '\t', '#', '-', '[', ']', '{', '}', '\'', '"', ':']),
        take_while(0.., |c: char| c != ':' && c != '#'),
    )
        .take()
        .map(|key: &str| key.trim_end().to_string())
        .parse_next(input)
}

fn key_colon(input: &mut Input<'_>) -> PResult<()> {
    (space0, ':', peek(alt((eof.void(), one_of([' ', '\t']).void()))))
        .void()
        .parse_next(input)
}

/// Split `content` into a mapping key and the value text after the colon.
fn split_key<'a>(src: &str, content: &'a str, offset: usize) -> Option<KeyLine<'a>> {
    let mut input = LocatingSlice::new(&src[..offset + content.len()]);
    input.next_slice(offset);

    let key = match alt((
        quoted.verify_map(|node: Node| {
            let span = node.span();
            match node.into_inner() {
                Value::Scalar(scalar) => Some(Spanned::new(scalar.text, span)),
                _ => None,
            }
        }),
        plain_key.with_span().map(|(key, range)| Spanned::new(key, Span::new(range))),
    ))
    .parse_next(&mut input)
    {
        Ok(key) => key,
        Err(_) => return None,
    };
    key_colon.parse_next(&mut input).ok()?;

    let colon_end = input.current_token_start() - offset;
    let after = &content[colon_end..];
    let rest = after.trim_start();
    let rest_offset = offset + colon_end + (after.len() - rest.len());
    let rest = if rest.starts_with('#') { "" } else { rest };
    Some(KeyLine {
        key,
        rest,
        rest_offset,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Blank,
    Comment,
    Content,
}

const BYTE_ORDER_MARK: char = '\u{feff}';

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    /// Absolute offset of `content` in the source.
    offset: usize,
    indent: usize,
    content: &'a str,
    kind: LineKind,
}

impl Line<'_> {
    fn span(&self) -> Span {
        Span::new(self.offset..self.offset + self.content.len())
    }

    fn comment_text(&self) -> &str {
        let text = self.content.strip_prefix('#').unwrap_or(self.content);
        text.strip_prefix(' ').unwrap_or(text).trim_end()
    }

    fn is_seq_item(&self) -> bool {
        self.content == "-" || self.content.starts_with("- ") || self.content.starts_with("-\t")
    }
}

fn split_lines(src: &str) -> Result<Vec<Line<'_>>> {
    let mut lines = Vec::new();
    // Offsets stay relative to `src`, byte order mark included.
    let (body, mut line_start) = match src.strip_prefix(BYTE_ORDER_MARK) {
        Some(rest) => (rest, BYTE_ORDER_MARK.len_utf8()),
        None => (src, 0),
    };
    for raw in body.split_inclusive('\n') {
        let line = raw.trim_end_matches(['\n', '\r']);
        let body = line.trim_start_matches([' ', '\t']);
        let indent = line.len() - body.len();
        let content = body.trim_end();

        let kind = if content.is_empty() {
            LineKind::Blank
        } else if content.starts_with('#') {
            LineKind::Comment
        } else {
            LineKind::Content
        };

        if kind == LineKind::Content {
            if let Some(tab) = line[..indent].find('\t') {
                let at = line_start + tab;
                return Err(Diagnostic::error("tab character in indentation")
                    .with_code(ErrorCode::E003)
                    .with_label(Span::new(at..at + 1), ErrorCode::E003.description())
                    .with_help("indent with spaces"));
            }
        }

        lines.push(Line {
            offset: line_start + indent,
            indent,
            content,
            kind,
        });
        line_start += raw.len();
    }
    Ok(lines)
}

fn indentation_error(line: &Line<'_>) -> Diagnostic {
    Diagnostic::error("inconsistent indentation")
        .with_code(ErrorCode::E005)
        .with_label(line.span(), ErrorCode::E005.description())
        .with_help("align this line with its siblings or its parent's children")
}

struct Reader<'a> {
    src: &'a str,
    lines: Vec<Line<'a>>,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(src: &'a str) -> Result<Self> {
        Ok(Self {
            src,
            lines: split_lines(src)?,
            pos: 0,
        })
    }

    /// Index of the next content line, without consuming it.
    fn peek(&self) -> Option<usize> {
        (self.pos..self.lines.len()).find(|&i| self.lines[i].kind == LineKind::Content)
    }

    /// Comment lines immediately above line `idx`, joined with newlines.
    fn comment_before(&self, idx: usize) -> Option<String> {
        let mut parts = Vec::new();
        for line in self.lines[..idx].iter().rev() {
            if line.kind != LineKind::Comment {
                break;
            }
            parts.push(line.comment_text());
        }
        if parts.is_empty() {
            return None;
        }
        parts.reverse();
        Some(parts.join("\n"))
    }

    fn null_at(offset: usize) -> Node {
        Spanned::new(Value::Null, Span::new(offset..offset))
    }

    /// Parse the block whose first line is the next content line, indented by `indent`.
    fn parse_block(&mut self, indent: usize) -> Result<Node> {
        let Some(idx) = self.peek() else {
            return Ok(Self::null_at(self.src.len()));
        };
        let line = self.lines[idx];
        if line.is_seq_item() {
            self.parse_seq(indent)
        } else if split_key(self.src, line.content, line.offset).is_some() {
            self.parse_map(indent)
        } else {
            self.pos = idx + 1;
            parse_inline(self.src, line.offset, line.offset + line.content.len())
        }
    }

    fn parse_map(&mut self, indent: usize) -> Result<Node> {
        let mut entries: Vec<MapEntry> = Vec::new();
        let mut span: Option<Span> = None;

        while let Some(idx) = self.peek() {
            let line = self.lines[idx];
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(indentation_error(&line));
            }
            if line.is_seq_item() {
                break;
            }
            let Some(KeyLine {
                key,
                rest,
                rest_offset,
            }) = split_key(self.src, line.content, line.offset)
            else {
                return Err(Diagnostic::error("expected `key: value`")
                    .with_code(ErrorCode::E006)
                    .with_label(line.span(), ErrorCode::E006.description())
                    .with_help("every line of a mapping must start with a key followed by `:`"));
            };
            if let Some(first) = entries.iter().find(|entry| entry.key == key) {
                return Err(Diagnostic::error(format!("duplicate mapping key `{}`", *key))
                    .with_code(ErrorCode::E007)
                    .with_label(key.span(), "duplicate key")
                    .with_secondary_label(first.key.span(), "first defined here"));
            }
            self.pos = idx + 1;

            let value = if rest.is_empty() {
                match self.peek().map(|next| self.lines[next]) {
                    Some(next) if next.indent > indent => self.parse_block(next.indent)?,
                    Some(next) if next.indent == indent && next.is_seq_item() => {
                        self.parse_seq(indent)?
                    }
                    _ => Self::null_at(key.span().end()),
                }
            } else {
                parse_inline(self.src, rest_offset, line.offset + line.content.len())?
            };

            let entry_span = key.span().union(value.span());
            span = Some(span.map_or(entry_span, |s| s.union(entry_span)));
            entries.push(MapEntry { key, value });
        }

        Ok(Spanned::new(Value::Map(entries), span.unwrap_or_default()))
    }

    fn parse_seq(&mut self, indent: usize) -> Result<Node> {
        let mut items = Vec::new();
        let mut span: Option<Span> = None;

        while let Some(idx) = self.peek() {
            let line = self.lines[idx];
            if line.indent != indent || !line.is_seq_item() {
                if line.indent > indent {
                    return Err(indentation_error(&line));
                }
                break;
            }
            let comment = self.comment_before(idx);

            let after_dash = &line.content[1..];
            let rest = after_dash.trim_start_matches([' ', '\t']);
            let gap = after_dash.len() - rest.len();

            let node = if rest.is_empty() || rest.starts_with('#') {
                self.pos = idx + 1;
                match self.peek().map(|next| self.lines[next]) {
                    Some(next) if next.indent > indent => self.parse_block(next.indent)?,
                    _ => Self::null_at(line.offset + 1),
                }
            } else {
                // Re-read the remainder of the line as if it started its own block.
                let nested_indent = indent + 1 + gap;
                self.lines[idx] = Line {
                    offset: line.offset + 1 + gap,
                    indent: nested_indent,
                    content: rest,
                    kind: LineKind::Content,
                };
                self.parse_block(nested_indent)?
            };

            let item_span = Span::new(line.offset..line.offset + 1).union(node.span());
            span = Some(span.map_or(item_span, |s| s.union(item_span)));
            items.push(SeqItem { node, comment });
        }

        Ok(Spanned::new(Value::Seq(items), span.unwrap_or_default()))
    }
}

/// Read a whole document. An empty document reads as [`Value::Null`].
pub(crate) fn read_document(src: &str) -> Result<Node> {
    let mut reader = Reader::new(src)?;
    let Some(first) = reader.peek() else {
        return Ok(Reader::null_at(0));
    };
    let indent = reader.lines[first].indent;
    let node = reader.parse_block(indent)?;
    if let Some(extra) = reader.peek() {
        return Err(indentation_error(&reader.lines[extra]));
    }
    Ok(node)
}
