//! In-memory YAML document tree and its serializer
//!
//! The renderer builds a [`Mapping`] tree and serializes it here, so quoting
//! and field omission are decided per node instead of by string splicing.
//! Output is block-style YAML with two-space indentation; short string lists
//! use flow style (`["a", "b"]`).
//!
//! Scalars tagged [`Scalar::Plain`] are written bare only when they cannot be
//! read back as anything other than the same string by a YAML 1.1 or 1.2
//! parser. Everything else is double-quoted; `serde_yaml` produces the
//! escaped form whenever it picks double quotes itself.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write;

const INDENT: usize = 2;

static PLAIN_SAFE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_/][A-Za-z0-9_./-]*|([0-9]+(ms|[smhdwy]))+)$")
        .expect("plain scalar pattern is valid")
});

const RESERVED_WORDS: &[&str] = &[
    "y", "n", "yes", "no", "on", "off", "true", "false", "null",
];

/// Leaf value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    /// Written bare when safe, quoted otherwise
    Plain(String),
    /// Always double-quoted
    Quoted(String),
    Int(u64),
}

/// Document node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Scalar(Scalar),
    Map(Mapping),
    /// Block sequence, one `- ` item per line
    List(Vec<Node>),
    /// Inline sequence of scalars
    Flow(Vec<Scalar>),
}

impl Node {
    pub fn plain(value: impl Into<String>) -> Self {
        Node::Scalar(Scalar::Plain(value.into()))
    }

    pub fn quoted(value: impl Into<String>) -> Self {
        Node::Scalar(Scalar::Quoted(value.into()))
    }

    pub fn int(value: u64) -> Self {
        Node::Scalar(Scalar::Int(value))
    }

    /// Inline list with every item double-quoted
    pub fn flow_quoted<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Node::Flow(
            items
                .into_iter()
                .map(|s| Scalar::Quoted(s.into()))
                .collect(),
        )
    }
}

impl From<Mapping> for Node {
    fn from(mapping: Mapping) -> Self {
        Node::Map(mapping)
    }
}

/// Ordered mapping; keys are emitted in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    entries: Vec<(String, Node)>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Node>) -> &mut Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serialize a document rooted at a mapping
pub fn emit(root: &Mapping) -> String {
    let mut out = String::new();
    write_mapping(&mut out, root, 0, false);
    out
}

/// Whether a string may be written without quotes
pub fn is_plain_safe(value: &str) -> bool {
    PLAIN_SAFE_RE.is_match(value)
        && !RESERVED_WORDS
            .iter()
            .any(|w| w.eq_ignore_ascii_case(value))
}

fn pad(out: &mut String, indent: usize) {
    out.extend(std::iter::repeat(' ').take(indent));
}

fn write_mapping(out: &mut String, mapping: &Mapping, indent: usize, inline_first: bool) {
    for (i, (key, value)) in mapping.entries.iter().enumerate() {
        if !(inline_first && i == 0) {
            pad(out, indent);
        }
        write_text(out, key, false);
        out.push(':');
        write_value(out, value, indent);
    }
}

fn write_value(out: &mut String, value: &Node, indent: usize) {
    match value {
        Node::Scalar(scalar) => {
            out.push(' ');
            write_scalar(out, scalar);
            out.push('\n');
        }
        Node::Flow(items) => {
            out.push(' ');
            write_flow(out, items);
            out.push('\n');
        }
        Node::Map(mapping) if mapping.is_empty() => out.push_str(" {}\n"),
        Node::List(items) if items.is_empty() => out.push_str(" []\n"),
        Node::Map(mapping) => {
            out.push('\n');
            write_mapping(out, mapping, indent + INDENT, false);
        }
        Node::List(items) => {
            out.push('\n');
            write_list(out, items, indent + INDENT);
        }
    }
}

fn write_list(out: &mut String, items: &[Node], indent: usize) {
    for item in items {
        pad(out, indent);
        match item {
            Node::Map(mapping) if !mapping.is_empty() => {
                out.push_str("- ");
                write_mapping(out, mapping, indent + INDENT, true);
            }
            Node::List(nested) if !nested.is_empty() => {
                out.push_str("-\n");
                write_list(out, nested, indent + INDENT);
            }
            Node::Map(_) => out.push_str("- {}\n"),
            Node::List(_) => out.push_str("- []\n"),
            Node::Scalar(scalar) => {
                out.push_str("- ");
                write_scalar(out, scalar);
                out.push('\n');
            }
            Node::Flow(flow) => {
                out.push_str("- ");
                write_flow(out, flow);
                out.push('\n');
            }
        }
    }
}

fn write_flow(out: &mut String, items: &[Scalar]) {
    out.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_scalar(out, item);
    }
    out.push(']');
}

fn write_scalar(out: &mut String, scalar: &Scalar) {
    match scalar {
        Scalar::Plain(text) => write_text(out, text, false),
        Scalar::Quoted(text) => write_text(out, text, true),
        Scalar::Int(n) => {
            let _ = write!(out, "{}", n);
        }
    }
}

fn write_text(out: &mut String, text: &str, force_quotes: bool) {
    if !force_quotes && is_plain_safe(text) {
        out.push_str(text);
    } else {
        write_quoted(out, text);
    }
}

fn write_quoted(out: &mut String, text: &str) {
    match serde_yaml::to_string(text) {
        Ok(encoded) if is_inline_double_quoted(&encoded) => {
            out.push_str(encoded.trim_end_matches('\n'))
        }
        // serde_yaml chose plain, single-quoted or block style
        _ => escape_double_quoted(out, text),
    }
}

fn is_inline_double_quoted(encoded: &str) -> bool {
    let body = encoded.strip_suffix('\n').unwrap_or(encoded);
    body.len() >= 2 && body.starts_with('"') && body.ends_with('"') && !body.contains('\n')
}

/// YAML 1.2 `c-printable`
fn is_printable(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r'
            | '\u{20}'..='\u{7e}'
            | '\u{85}'
            | '\u{a0}'..='\u{d7ff}'
            | '\u{e000}'..='\u{fffd}'
            | '\u{10000}'..='\u{10ffff}'
    )
}

fn escape_double_quoted(out: &mut String, text: &str) {
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // line breaks in YAML 1.1 and the byte-order mark
            '\u{85}' | '\u{2028}' | '\u{2029}' | '\u{feff}' => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c if !is_printable(c) => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_safety() {
        for ok in ["30s", "1h30m", "/custom", "replace", "__tmp_hash", "instance"] {
            assert!(is_plain_safe(ok), "{ok} should be plain");
        }
        for quoted in [
            "", "123", "0x1F", "1.5", "true", "Yes", "off", "null", "a b", "a:b", "-x", "#c",
            "2024-01-01", "a\"b", ".inf", "~",
        ] {
            assert!(!is_plain_safe(quoted), "{quoted} should be quoted");
        }
    }

    #[test]
    fn test_nested_layout() {
        let mut job = Mapping::new();
        job.insert("job_name", Node::quoted("node"));
        let mut static_config = Mapping::new();
        static_config.insert("targets", Node::flow_quoted(["a:1", "b:2"]));
        job.insert("static_configs", Node::List(vec![static_config.into()]));

        let mut root = Mapping::new();
        root.insert("scrape_configs", Node::List(vec![job.into()]));

        let expected = "\
scrape_configs:
  - job_name: \"node\"
    static_configs:
      - targets: [\"a:1\", \"b:2\"]
";
        assert_eq!(emit(&root), expected);
    }

    #[test]
    fn test_empty_collections() {
        let mut root = Mapping::new();
        root.insert("labels", Mapping::new());
        root.insert("items", Node::List(vec![]));
        root.insert("flow", Node::Flow(vec![]));
        assert_eq!(emit(&root), "labels: {}\nitems: []\nflow: []\n");
    }

    #[test]
    fn test_quoted_escapes_parse_back() {
        let nasty = "say \"hi\"\\ now\nnext\tline\u{7}\u{2028}end: # not a comment";
        let mut root = Mapping::new();
        root.insert("value", Node::quoted(nasty));
        root.insert("key with: colon", Node::plain("x"));
        root.insert("count", Node::int(7));

        let text = emit(&root);
        let parsed: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();
        assert_eq!(parsed["value"].as_str(), Some(nasty));
        assert_eq!(parsed["key with: colon"].as_str(), Some("x"));
        assert_eq!(parsed["count"].as_u64(), Some(7));
    }

    #[test]
    fn test_non_printable_characters_parse_back() {
        let values = [
            "job\u{FFFE}x",
            "job\u{FFFF}x",
            "nul\u{0}del\u{7f}c1\u{9f}",
            "surrogate-edge\u{d7ff}\u{e000}",
            "nel\u{85}nbsp\u{a0}bom\u{feff}",
            "astral \u{1F600}",
        ];
        for value in values {
            let mut root = Mapping::new();
            root.insert("job_name", Node::quoted(value));
            let text = emit(&root);
            let parsed: serde_yaml::Value = serde_yaml::from_str(&text)
                .unwrap_or_else(|e| panic!("{:?} failed to parse: {}", text, e));
            assert_eq!(parsed["job_name"].as_str(), Some(value));
        }
    }

    #[test]
    fn test_escaper_covers_every_non_printable() {
        let mut text = String::new();
        for c in ['\u{0}', '\u{8}', '\u{1b}', '\u{7f}', '\u{80}', '\u{9f}', '\u{fffe}', '\u{ffff}'] {
            let mut out = String::new();
            escape_double_quoted(&mut out, &format!("a{}b", c));
            assert!(out.chars().all(|c| c == '\n' || is_printable(c)), "{:?}", out);
            text.push(c);
        }
        let mut out = String::new();
        escape_double_quoted(&mut out, &text);
        let parsed: String = serde_yaml::from_str(&out).unwrap();
        assert_eq!(parsed, text);
    }

    #[test]
    fn test_plain_falls_back_to_quotes() {
        let mut root = Mapping::new();
        root.insert("a", Node::plain("true"));
        root.insert("b", Node::plain("30s"));
        assert_eq!(emit(&root), "a: \"true\"\nb: 30s\n");
    }
}
