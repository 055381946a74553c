//! Plain-text extraction from rich issue content
//!
//! Two input shapes reach the corpus:
//! - structured ADF trees (see [`Node`]), walked iteratively with depth and
//!   node-count guards
//! - legacy markup strings, stripped by [`strip_markup`]
//!
//! [`extract_field`] picks the right mode for a raw JSON field.

mod markup;
mod node;

pub use markup::strip_markup;
pub use node::{Node, NodeKind};

use serde_json::Value;

use markup::normalize_whitespace;

/// Traversal guards. Exceeding either truncates the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractLimits {
    /// Nodes deeper than this (root = 1) are skipped with their subtree
    pub max_depth: usize,
    /// Traversal stops after visiting this many nodes
    pub max_nodes: usize,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self {
            max_depth: 256,
            max_nodes: 100_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub text: String,
    /// Some content was skipped because a limit was hit
    pub truncated: bool,
}

enum Step<'a> {
    Enter(&'a Node, usize),
    Leave,
}

/// Extract with default limits.
pub fn extract_plain_text(node: &Node) -> String {
    extract_with(node, ExtractLimits::default()).text
}

/// Depth-first, document-order text of a tree.
///
/// Block kinds sit on their own lines; inline boundaries add nothing.
/// Unknown kinds contribute their children only.
pub fn extract_with(root: &Node, limits: ExtractLimits) -> Extracted {
    let mut out = String::new();
    let mut truncated = false;
    let mut visited = 0usize;
    let mut stack = vec![Step::Enter(root, 1)];

    while let Some(step) = stack.pop() {
        let (node, depth) = match step {
            Step::Enter(node, depth) => (node, depth),
            Step::Leave => {
                break_line(&mut out);
                continue;
            }
        };
        if depth > limits.max_depth {
            truncated = true;
            continue;
        }
        visited += 1;
        if visited > limits.max_nodes {
            truncated = true;
            break;
        }

        let block = node.kind.is_block();
        if block {
            break_line(&mut out);
            stack.push(Step::Leave);
        }
        push_inline(node, &mut out);
        stack.extend(
            node.content
                .iter()
                .rev()
                .map(|child| Step::Enter(child, depth + 1)),
        );
    }

    Extracted {
        text: normalize_whitespace(&out),
        truncated,
    }
}

/// Text a single node contributes on its own, children excluded.
fn push_inline(node: &Node, out: &mut String) {
    match node.kind {
        NodeKind::HardBreak => out.push('\n'),
        NodeKind::Mention => {
            if let Some(t) = node.attr_str("text") {
                out.push_str(t);
            } else if let Some(id) = node.attr_str("id") {
                out.push('@');
                out.push_str(id);
            }
        }
        NodeKind::Emoji => {
            if let Some(t) = node.attr_str("text").or_else(|| node.attr_str("shortName")) {
                out.push_str(t);
            }
        }
        NodeKind::InlineCard => {
            if let Some(url) = node.attr_str("url") {
                out.push_str(url);
            }
        }
        NodeKind::Status => {
            if let Some(t) = node.attr_str("text") {
                out.push_str(t);
            }
        }
        NodeKind::Date => {
            let day = node
                .attr_str("timestamp")
                .and_then(|ts| ts.parse::<i64>().ok())
                .and_then(chrono::DateTime::from_timestamp_millis);
            if let Some(day) = day {
                out.push_str(&day.format("%Y-%m-%d").to_string());
            }
        }
        _ => {
            if let Some(text) = &node.text {
                out.push_str(text);
            }
        }
    }
}

fn break_line(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

/// Extract a raw JSON field of unknown shape.
///
/// Strings are legacy markup, objects are ADF, arrays are concatenated with
/// blank lines. Anything else is empty.
pub fn extract_field(value: &Value) -> Extracted {
    match value {
        Value::String(s) => Extracted {
            text: strip_markup(s),
            truncated: false,
        },
        Value::Object(_) => match Node::from_value(value) {
            Some(node) => extract_with(&node, ExtractLimits::default()),
            None => Extracted::default(),
        },
        Value::Array(items) => {
            let mut truncated = false;
            let parts: Vec<String> = items
                .iter()
                .map(extract_field)
                .filter_map(|e| {
                    truncated |= e.truncated;
                    (!e.text.is_empty()).then_some(e.text)
                })
                .collect();
            Extracted {
                text: parts.join("\n\n"),
                truncated,
            }
        }
        _ => Extracted::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn para(children: Vec<Node>) -> Node {
        Node::new(NodeKind::Paragraph, children)
    }

    fn attrs(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn hello_world() {
        let tree = para(vec![Node::text("Hello"), Node::text(" world")]);
        assert_eq!(extract_plain_text(&tree), "Hello world");
    }

    #[test]
    fn paragraphs_on_separate_lines() {
        let doc = Node::new(
            NodeKind::Doc,
            vec![para(vec![Node::text("one")]), para(vec![Node::text("two")])],
        );
        assert_eq!(extract_plain_text(&doc), "one\ntwo");
    }

    #[test]
    fn list_items_and_table_rows_break() {
        let list = Node::new(
            NodeKind::BulletList,
            vec![
                Node::new(NodeKind::ListItem, vec![para(vec![Node::text("a")])]),
                Node::new(NodeKind::ListItem, vec![para(vec![Node::text("b")])]),
            ],
        );
        let row = |cells: &[&str]| {
            Node::new(
                NodeKind::TableRow,
                cells
                    .iter()
                    .map(|c| Node::new(NodeKind::TableCell, vec![Node::text(*c)]))
                    .collect(),
            )
        };
        let table = Node::new(NodeKind::Table, vec![row(&["k", "v"]), row(&["x", "y"])]);
        let doc = Node::new(NodeKind::Doc, vec![list, table]);
        assert_eq!(extract_plain_text(&doc), "a\nb\nkv\nxy");
    }

    #[test]
    fn hard_break_inside_paragraph() {
        let tree = para(vec![
            Node::text("line1"),
            Node::new(NodeKind::HardBreak, vec![]),
            Node::text("line2"),
        ]);
        assert_eq!(extract_plain_text(&tree), "line1\nline2");
    }

    #[test]
    fn inline_attribute_nodes() {
        let tree = para(vec![
            Node::text("ping "),
            Node::new(NodeKind::Mention, vec![]).with_attrs(attrs(json!({"text": "@ann"}))),
            Node::text(" see "),
            Node::new(NodeKind::InlineCard, vec![])
                .with_attrs(attrs(json!({"url": "https://x.org/1"}))),
            Node::text(" "),
            Node::new(NodeKind::Emoji, vec![]).with_attrs(attrs(json!({"shortName": ":+1:"}))),
            Node::text(" due "),
            Node::new(NodeKind::Date, vec![])
                .with_attrs(attrs(json!({"timestamp": "1582156800000"}))),
        ]);
        assert_eq!(
            extract_plain_text(&tree),
            "ping @ann see https://x.org/1 :+1: due 2020-02-20"
        );
    }

    #[test]
    fn unknown_kinds_walk_children() {
        let tree = Node::new(
            NodeKind::Other("expand".to_string()),
            vec![para(vec![Node::text("hidden")])],
        );
        assert_eq!(extract_plain_text(&tree), "hidden");
    }

    #[test]
    fn depth_limit_truncates() {
        let limits = ExtractLimits {
            max_depth: 3,
            max_nodes: 1000,
        };
        let tree = para(vec![
            Node::text("top"),
            Node::new(
                NodeKind::Other("x".into()),
                vec![Node::new(NodeKind::Other("y".into()), vec![Node::text("deep")])],
            ),
        ]);
        let out = extract_with(&tree, limits);
        assert_eq!(out.text, "top");
        assert!(out.truncated);
    }

    #[test]
    fn node_budget_truncates() {
        let limits = ExtractLimits {
            max_depth: 10,
            max_nodes: 3,
        };
        let tree = para(vec![
            Node::text("a"),
            Node::text("b"),
            Node::text("c"),
            Node::text("d"),
        ]);
        let out = extract_with(&tree, limits);
        assert_eq!(out.text, "ab");
        assert!(out.truncated);
    }

    #[test]
    fn hundred_thousand_levels_deep() {
        let mut node = Node::text("bottom");
        for _ in 0..100_000 {
            node = Node::new(NodeKind::Blockquote, vec![node]);
        }
        let out = extract_with(&node, ExtractLimits::default());
        assert!(out.truncated);
        assert_eq!(out.text, "");
    }

    #[test]
    fn wide_tree_within_budget() {
        let children: Vec<Node> = (0..1000).map(|i| para(vec![Node::text(i.to_string())])).collect();
        let out = extract_with(&Node::new(NodeKind::Doc, children), ExtractLimits::default());
        assert!(!out.truncated);
        assert_eq!(out.text.lines().count(), 1000);
    }

    #[test]
    fn field_string_is_markup() {
        let out = extract_field(&json!("<p>Fix <b>NPE</b></p>"));
        assert_eq!(out.text, "Fix NPE");
    }

    #[test]
    fn field_object_is_adf() {
        let value = json!({
            "type": "doc",
            "version": 1,
            "content": [
                {"type": "heading", "attrs": {"level": 2}, "content": [{"type": "text", "text": "Steps"}]},
                {"type": "orderedList", "content": [
                    {"type": "listItem", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "run"}]}]},
                    {"type": "listItem", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "crash"}]}]}
                ]},
                {"type": "codeBlock", "content": [{"type": "text", "text": "java.lang.NullPointerException"}]}
            ]
        });
        assert_eq!(
            extract_field(&value).text,
            "Steps\nrun\ncrash\njava.lang.NullPointerException"
        );
    }

    #[test]
    fn field_array_and_scalars() {
        let out = extract_field(&json!(["first", {"type": "paragraph", "content": [{"type": "text", "text": "second"}]}, ""]));
        assert_eq!(out.text, "first\n\nsecond");
        assert_eq!(extract_field(&json!(null)).text, "");
        assert_eq!(extract_field(&json!(12)).text, "");
    }
}
