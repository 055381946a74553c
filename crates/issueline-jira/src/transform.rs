//! Raw Jira issue → corpus record

use std::io;
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use issueline_core::{RawStore, extract_field};

use crate::corpus::CorpusWriter;
use crate::derive::{DeriveInput, Derived, DerivedFieldGenerator};
use crate::schema::{Named, RawIssue, UserRef};
use crate::stats::TransformStats;

/// One line of `{project}.jsonl`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub id: Option<String>,
    pub project: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    pub labels: Vec<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub resolved_at: Option<String>,
    pub description: String,
    pub comments: Vec<CorpusComment>,
    pub derived: Derived,
    pub raw_meta: RawMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusComment {
    pub author: Option<String>,
    pub created: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMeta {
    /// Jira's numeric issue id, as sent
    pub raw_id: Option<String>,
}

fn name(named: Option<Named>) -> Option<String> {
    named.and_then(|n| n.name)
}

fn display_name(user: Option<UserRef>) -> Option<String> {
    user.and_then(|u| u.display_name)
}

/// Build the corpus record for one raw issue.
///
/// `project` fills in when the payload does not name its project. Returns
/// the record and whether any rich-text field hit an extraction limit.
pub fn transform_issue(
    raw: &Value,
    project: &str,
    deriver: &dyn DerivedFieldGenerator,
) -> Result<(CorpusRecord, bool), serde_json::Error> {
    let issue = RawIssue::deserialize(raw)?;
    let fields = issue.fields;

    let description = extract_field(&fields.description);
    let mut truncated = description.truncated;

    let comments: Vec<CorpusComment> = fields
        .comment
        .map(|page| page.comments)
        .unwrap_or_default()
        .into_iter()
        .map(|c| {
            let body = extract_field(&c.body);
            truncated |= body.truncated;
            CorpusComment {
                author: display_name(c.author),
                created: c.created,
                body: body.text,
            }
        })
        .collect();

    let title = fields.summary;
    let bodies: Vec<&str> = comments.iter().map(|c| c.body.as_str()).collect();
    let derived = deriver.derive(&DeriveInput {
        title: title.as_deref().unwrap_or_default(),
        description: &description.text,
        comment_bodies: &bodies,
    });

    let record = CorpusRecord {
        id: issue.key,
        project: fields
            .project
            .and_then(|p| p.key)
            .or_else(|| Some(project.to_string())),
        title,
        status: name(fields.status),
        priority: name(fields.priority),
        assignee: display_name(fields.assignee),
        reporter: display_name(fields.reporter),
        labels: fields.labels,
        created_at: fields.created,
        updated_at: fields.updated,
        resolved_at: fields.resolutiondate,
        description: description.text,
        comments,
        derived,
        raw_meta: RawMeta { raw_id: issue.id },
    };
    Ok((record, truncated))
}

/// Transform every stored raw issue of `project` into `out_path`.
///
/// Returns `Ok(None)` when the project has no raw directory. Unreadable or
/// malformed raw files are skipped and counted, never fatal.
pub fn transform_project(
    raw: &RawStore,
    project: &str,
    out_path: &Path,
    deriver: &dyn DerivedFieldGenerator,
) -> io::Result<Option<TransformStats>> {
    let start = Instant::now();
    let paths = match raw.list(project) {
        Ok(paths) => paths,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut stats = TransformStats {
        project: project.to_string(),
        ..Default::default()
    };
    let mut writer = CorpusWriter::create(out_path)?;

    for path in &paths {
        let value = match RawStore::read(path) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Skipping malformed raw file {}: {e}", path.display());
                stats.skipped += 1;
                continue;
            }
        };
        match transform_issue(&value, project, deriver) {
            Ok((record, truncated)) => {
                if truncated {
                    log::debug!("{}: extraction truncated", path.display());
                    stats.truncated += 1;
                }
                writer.write(&record)?;
            }
            Err(e) => {
                log::warn!("Error transforming {}, skipping: {e}", path.display());
                stats.skipped += 1;
            }
        }
    }

    stats.records = writer.finalize()?;
    stats.elapsed = start.elapsed();
    Ok(Some(stats))
}
