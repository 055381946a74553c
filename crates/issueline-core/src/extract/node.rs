//! Structured-content tree (Atlassian Document Format)
//!
//! ```json
//! {"type": "paragraph", "content": [{"type": "text", "text": "Hello"}]}
//! ```
//!
//! Each node owns its children. Dropping is iterative so a degenerate,
//! deeply nested tree cannot overflow the stack.

use serde_json::{Map, Value};

/// Conversion from JSON stops descending past this depth.
const MAX_CONVERT_DEPTH: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Doc,
    Paragraph,
    Heading,
    Text,
    HardBreak,
    BulletList,
    OrderedList,
    ListItem,
    Table,
    TableRow,
    TableHeader,
    TableCell,
    Blockquote,
    CodeBlock,
    Panel,
    Rule,
    Mention,
    Emoji,
    InlineCard,
    Date,
    Status,
    /// Kind this crate does not know; children are still walked
    Other(String),
}

impl NodeKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "doc" => Self::Doc,
            "paragraph" => Self::Paragraph,
            "heading" => Self::Heading,
            "text" => Self::Text,
            "hardBreak" => Self::HardBreak,
            "bulletList" => Self::BulletList,
            "orderedList" => Self::OrderedList,
            "listItem" => Self::ListItem,
            "table" => Self::Table,
            "tableRow" => Self::TableRow,
            "tableHeader" => Self::TableHeader,
            "tableCell" => Self::TableCell,
            "blockquote" => Self::Blockquote,
            "codeBlock" => Self::CodeBlock,
            "panel" => Self::Panel,
            "rule" => Self::Rule,
            "mention" => Self::Mention,
            "emoji" => Self::Emoji,
            "inlineCard" => Self::InlineCard,
            "date" => Self::Date,
            "status" => Self::Status,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Doc => "doc",
            Self::Paragraph => "paragraph",
            Self::Heading => "heading",
            Self::Text => "text",
            Self::HardBreak => "hardBreak",
            Self::BulletList => "bulletList",
            Self::OrderedList => "orderedList",
            Self::ListItem => "listItem",
            Self::Table => "table",
            Self::TableRow => "tableRow",
            Self::TableHeader => "tableHeader",
            Self::TableCell => "tableCell",
            Self::Blockquote => "blockquote",
            Self::CodeBlock => "codeBlock",
            Self::Panel => "panel",
            Self::Rule => "rule",
            Self::Mention => "mention",
            Self::Emoji => "emoji",
            Self::InlineCard => "inlineCard",
            Self::Date => "date",
            Self::Status => "status",
            Self::Other(name) => name,
        }
    }

    /// Block kinds start and end on their own line.
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            Self::Doc
                | Self::Paragraph
                | Self::Heading
                | Self::ListItem
                | Self::TableRow
                | Self::Blockquote
                | Self::CodeBlock
                | Self::Panel
                | Self::Rule
        )
    }
}

#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub text: Option<String>,
    pub attrs: Option<Map<String, Value>>,
    pub content: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind, content: Vec<Node>) -> Self {
        Self {
            kind,
            text: None,
            attrs: None,
            content,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Text,
            text: Some(text.into()),
            attrs: None,
            content: Vec::new(),
        }
    }

    pub fn with_attrs(mut self, attrs: Map<String, Value>) -> Self {
        self.attrs = Some(attrs);
        self
    }

    /// String attribute, if present.
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.as_ref()?.get(name)?.as_str()
    }

    /// Build a tree from ADF JSON.
    ///
    /// Bare strings become text nodes and arrays become an untyped container,
    /// so loosely shaped payloads still convert. Objects without `type` are
    /// treated as unknown kinds. Returns `None` for null, numbers and booleans.
    pub fn from_value(value: &Value) -> Option<Self> {
        convert(value, 0)
    }
}

fn convert(value: &Value, depth: usize) -> Option<Node> {
    match value {
        Value::String(s) => Some(Node::text(s.as_str())),
        Value::Array(items) => Some(Node::new(
            NodeKind::Other(String::new()),
            children(items, depth),
        )),
        Value::Object(obj) => {
            let kind = obj
                .get("type")
                .and_then(Value::as_str)
                .map(NodeKind::from_name)
                .unwrap_or_else(|| NodeKind::Other(String::new()));
            let content = match obj.get("content") {
                Some(Value::Array(items)) => children(items, depth),
                Some(other) => children(std::slice::from_ref(other), depth),
                None => Vec::new(),
            };
            Some(Node {
                kind,
                text: obj.get("text").and_then(Value::as_str).map(String::from),
                attrs: obj.get("attrs").and_then(Value::as_object).cloned(),
                content,
            })
        }
        _ => None,
    }
}

fn children(items: &[Value], depth: usize) -> Vec<Node> {
    if depth >= MAX_CONVERT_DEPTH {
        log::debug!("ADF nesting deeper than {MAX_CONVERT_DEPTH}, dropping subtree");
        return Vec::new();
    }
    items
        .iter()
        .filter_map(|item| convert(item, depth + 1))
        .collect()
}

impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.content);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.content);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_names_roundtrip() {
        for name in [
            "doc",
            "paragraph",
            "heading",
            "text",
            "hardBreak",
            "bulletList",
            "orderedList",
            "listItem",
            "table",
            "tableRow",
            "tableHeader",
            "tableCell",
            "blockquote",
            "codeBlock",
            "panel",
            "rule",
            "mention",
            "emoji",
            "inlineCard",
            "date",
            "status",
        ] {
            let kind = NodeKind::from_name(name);
            assert!(!matches!(kind, NodeKind::Other(_)), "{name}");
            assert_eq!(kind.name(), name);
        }
    }

    #[test]
    fn unknown_kind_kept_by_name() {
        let kind = NodeKind::from_name("expand");
        assert_eq!(kind, NodeKind::Other("expand".to_string()));
        assert_eq!(kind.name(), "expand");
        assert!(!kind.is_block());
    }

    #[test]
    fn from_value_basic() {
        let value = json!({
            "type": "doc",
            "version": 1,
            "content": [{
                "type": "paragraph",
                "content": [
                    {"type": "text", "text": "Hi", "marks": [{"type": "strong"}]},
                    {"type": "mention", "attrs": {"id": "42", "text": "@ann"}}
                ]
            }]
        });
        let node = Node::from_value(&value).unwrap();
        assert_eq!(node.kind, NodeKind::Doc);
        let para = &node.content[0];
        assert_eq!(para.kind, NodeKind::Paragraph);
        assert_eq!(para.content[0].text.as_deref(), Some("Hi"));
        assert_eq!(para.content[1].attr_str("text"), Some("@ann"));
    }

    #[test]
    fn from_value_loose_shapes() {
        let node = Node::from_value(&json!(["a", {"text": "b"}, 3, null])).unwrap();
        assert_eq!(node.content.len(), 2);
        assert_eq!(node.content[0].kind, NodeKind::Text);
        assert_eq!(node.content[1].text.as_deref(), Some("b"));
        assert!(Node::from_value(&json!(null)).is_none());
        assert!(Node::from_value(&json!(42)).is_none());
    }

    #[test]
    fn deep_tree_drops_without_overflow() {
        let mut node = Node::text("leaf");
        for _ in 0..200_000 {
            node = Node::new(NodeKind::Paragraph, vec![node]);
        }
        drop(node);
    }
}
