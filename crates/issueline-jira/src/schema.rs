//! Jira REST API v2 response shapes
//!
//! Only the fields the pipeline reads are typed. Everything is optional so a
//! partial or unusual payload still deserializes; issues themselves stay as
//! raw JSON until the transform phase.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `GET /search` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub start_at: Option<u64>,
    pub max_results: Option<u32>,
    pub total: Option<u64>,
    /// Only sent by some deployments
    pub is_last: Option<bool>,
    #[serde(default)]
    pub issues: Vec<Value>,
}

impl SearchResponse {
    /// Whether another page follows this one.
    ///
    /// An empty page ends the listing. Otherwise an explicit `isLast` wins,
    /// then `startAt + len < total`, then "a full page means more".
    pub fn has_more(&self, requested_start: u64, page_size: u32) -> bool {
        let len = self.issues.len() as u64;
        if len == 0 {
            return false;
        }
        if let Some(is_last) = self.is_last {
            return !is_last;
        }
        let start = self.start_at.unwrap_or(requested_start);
        match self.total {
            Some(total) => start + len < total,
            None => len >= u64::from(self.max_results.unwrap_or(page_size).max(1)),
        }
    }
}

/// Typed view of one issue for the transform phase
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawIssue {
    pub id: Option<String>,
    pub key: Option<String>,
    pub fields: IssueFields,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IssueFields {
    pub summary: Option<String>,
    pub project: Option<ProjectRef>,
    pub status: Option<Named>,
    pub priority: Option<Named>,
    pub assignee: Option<UserRef>,
    pub reporter: Option<UserRef>,
    #[serde(deserialize_with = "null_as_default")]
    pub labels: Vec<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub resolutiondate: Option<String>,
    /// Markup string (v2) or ADF document (v3)
    pub description: Value,
    pub comment: Option<CommentPage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProjectRef {
    pub key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Named {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserRef {
    pub display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommentPage {
    #[serde(deserialize_with = "null_as_default")]
    pub comments: Vec<RawComment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawComment {
    pub author: Option<UserRef>,
    pub created: Option<String>,
    pub body: Value,
}

/// `null` reads as the type's default, like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(value: Value) -> SearchResponse {
        serde_json::from_value(value).unwrap()
    }

    fn issues(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({"key": format!("P-{i}")})).collect()
    }

    #[test]
    fn total_decides_without_is_last() {
        let resp = page(json!({"startAt": 0, "maxResults": 2, "total": 3, "issues": issues(2)}));
        assert!(resp.has_more(0, 2));
        let resp = page(json!({"startAt": 2, "maxResults": 2, "total": 3, "issues": issues(1)}));
        assert!(!resp.has_more(2, 2));
    }

    #[test]
    fn is_last_wins_over_total() {
        let resp = page(json!({"startAt": 0, "total": 100, "isLast": true, "issues": issues(2)}));
        assert!(!resp.has_more(0, 2));
        let resp = page(json!({"startAt": 0, "total": 1, "isLast": false, "issues": issues(2)}));
        assert!(resp.has_more(0, 2));
    }

    #[test]
    fn full_page_heuristic_without_metadata() {
        assert!(page(json!({"issues": issues(50)})).has_more(0, 50));
        assert!(!page(json!({"issues": issues(49)})).has_more(0, 50));
        // Server capped the page below the requested size
        assert!(page(json!({"maxResults": 20, "issues": issues(20)})).has_more(0, 50));
    }

    #[test]
    fn empty_page_never_has_more() {
        let resp = page(json!({"startAt": 0, "total": 10, "isLast": false, "issues": []}));
        assert!(!resp.has_more(0, 50));
        assert!(!page(json!({})).has_more(0, 50));
    }

    #[test]
    fn issue_fields_tolerate_nulls() {
        let issue: RawIssue = serde_json::from_value(json!({
            "id": "10001",
            "key": "HDFS-1",
            "fields": {
                "summary": "NPE on startup",
                "status": {"name": "Open"},
                "priority": null,
                "assignee": null,
                "labels": null,
                "description": null,
                "comment": {"comments": [{"author": {"displayName": "Ann"}, "body": "+1"}]}
            }
        }))
        .unwrap();
        assert_eq!(issue.key.as_deref(), Some("HDFS-1"));
        assert!(issue.fields.priority.is_none());
        assert!(issue.fields.labels.is_empty());
        assert!(issue.fields.description.is_null());
        let comments = issue.fields.comment.unwrap().comments;
        assert_eq!(comments[0].author.as_ref().unwrap().display_name.as_deref(), Some("Ann"));
    }
}
