//! Derived fields attached to every corpus record
//!
//! [`HeuristicDeriver`] is purely extractive: no model, no network. Other
//! generators can be plugged in through [`DerivedFieldGenerator`].

use serde::{Deserialize, Serialize};

/// `short_summary` is cut to this many characters
const SUMMARY_MAX_CHARS: usize = 200;

/// Label → case-insensitive keywords. Order is the output order.
const KEYWORD_LABELS: &[(&str, &[&str])] = &[
    ("performance", &["memory", "oom", "latency", "throughput"]),
    ("security", &["vulnerability", "xss", "csrf", "exploit", "security"]),
    ("build", &["build", "maven", "gradle", "compile", "dependency"]),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Derived {
    pub short_summary: String,
    pub keyword_labels: Vec<String>,
    pub qna: Vec<Qna>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qna {
    pub q: String,
    pub a: String,
}

/// Plain-text inputs, already extracted.
#[derive(Debug, Clone, Copy)]
pub struct DeriveInput<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub comment_bodies: &'a [&'a str],
}

pub trait DerivedFieldGenerator: Send + Sync {
    fn derive(&self, input: &DeriveInput<'_>) -> Derived;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicDeriver;

impl DerivedFieldGenerator for HeuristicDeriver {
    fn derive(&self, input: &DeriveInput<'_>) -> Derived {
        let mut combined = String::from(input.description);
        for body in input.comment_bodies {
            combined.push_str("\n\n");
            combined.push_str(body);
        }
        Derived {
            short_summary: short_summary(input.description),
            keyword_labels: keyword_labels(&combined),
            qna: qna(input.title, input.description),
        }
    }
}

fn first_paragraph(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|l| !l.is_empty())
}

/// First non-empty line, cut at a word boundary with `...` when too long.
pub fn short_summary(text: &str) -> String {
    let Some(first) = first_paragraph(text) else {
        return String::new();
    };
    let Some((cut, _)) = first.char_indices().nth(SUMMARY_MAX_CHARS) else {
        return first.to_string();
    };
    let head = &first[..cut];
    let head = match head.rfind(' ') {
        Some(space) if space > 0 => &head[..space],
        _ => head,
    };
    format!("{}...", head.trim_end())
}

/// Labels whose keyword table matches anywhere in `text`.
pub fn keyword_labels(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let lower = text.to_lowercase();
    KEYWORD_LABELS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|kw| lower.contains(kw)))
        .map(|(label, _)| label.to_string())
        .collect()
}

/// One question from the title, answered by the first description paragraph.
pub fn qna(title: &str, description: &str) -> Vec<Qna> {
    let title = title.trim();
    match first_paragraph(description) {
        Some(answer) if !title.is_empty() => vec![Qna {
            q: title.to_string(),
            a: answer.to_string(),
        }],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_is_first_non_empty_line() {
        assert_eq!(short_summary("\n\n  First line  \nsecond"), "First line");
        assert_eq!(short_summary(""), "");
        assert_eq!(short_summary(" \n "), "");
    }

    #[test]
    fn long_summary_cut_at_word_boundary() {
        let line = "word ".repeat(60);
        let summary = short_summary(&line);
        assert!(summary.ends_with("..."));
        let body = summary.trim_end_matches("...");
        assert!(body.chars().count() <= SUMMARY_MAX_CHARS);
        assert!(body.ends_with("word"));
    }

    #[test]
    fn long_summary_without_spaces() {
        let line = "x".repeat(250);
        let summary = short_summary(&line);
        assert_eq!(summary, format!("{}...", "x".repeat(200)));
    }

    #[test]
    fn summary_cut_respects_char_boundaries() {
        let line = "é".repeat(300);
        assert_eq!(short_summary(&line).chars().count(), 203);
    }

    #[test]
    fn keyword_labels_case_insensitive_in_table_order() {
        assert_eq!(
            keyword_labels("Maven BUILD fails with OOM"),
            vec!["performance".to_string(), "build".to_string()]
        );
        assert_eq!(keyword_labels("Possible XSS in web UI"), vec!["security".to_string()]);
        assert!(keyword_labels("typo in docs").is_empty());
    }

    #[test]
    fn qna_requires_title_and_description() {
        assert_eq!(
            qna(" Why does it crash? ", "\nBecause of a race.\nDetails follow."),
            vec![Qna {
                q: "Why does it crash?".to_string(),
                a: "Because of a race.".to_string()
            }]
        );
        assert!(qna("", "answer").is_empty());
        assert!(qna("title", "").is_empty());
    }

    #[test]
    fn heuristic_deriver_looks_at_comments_for_labels() {
        let derived = HeuristicDeriver.derive(&DeriveInput {
            title: "Slow query",
            description: "Query takes minutes.",
            comment_bodies: &["Latency regression since 3.1", "gradle upgrade helped"],
        });
        assert_eq!(derived.short_summary, "Query takes minutes.");
        assert_eq!(derived.keyword_labels, vec!["performance", "build"]);
        assert_eq!(derived.qna.len(), 1);
    }
}
