//! Legacy markup (HTML) → plain text

use scraper::{Html, Node as HtmlNode};

/// Elements whose boundaries become line breaks
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "pre", "blockquote",
    "table", "ul", "ol", "hr", "section", "article",
];

/// Elements whose text is never content
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "head", "title"];

/// Strip tags from a markup fragment, keeping text in document order.
///
/// Entities are decoded. Block-level elements start a new line; runs of
/// spaces collapse and blank lines are limited to one in a row.
pub fn strip_markup(markup: &str) -> String {
    if markup.trim().is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(markup);
    let mut out = String::with_capacity(markup.len());

    for node in fragment.root_element().descendants() {
        match node.value() {
            HtmlNode::Text(text) => {
                let skipped = node.ancestors().any(|a| {
                    a.value()
                        .as_element()
                        .is_some_and(|e| SKIPPED_ELEMENTS.contains(&e.name()))
                });
                if !skipped {
                    out.push_str(text);
                }
            }
            HtmlNode::Element(elem) if BLOCK_ELEMENTS.contains(&elem.name()) => {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }

    normalize_whitespace(&out)
}

/// Collapse horizontal whitespace, trim lines, keep at most one blank line
/// between paragraphs, trim the ends.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;
    for line in text.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run > 0 { "\n\n" } else { "\n" });
        }
        out.push_str(&collapsed);
        blank_run = 0;
    }
    out
}
