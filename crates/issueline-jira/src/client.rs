//! Jira REST client implementing [`ItemSource`]
//!
//! Listing goes through `/search` with a stable JQL ordering, details through
//! `/issue/{key}`. Every request runs inside the core retry loop.

use chrono::Utc;
use serde_json::Value;

use issueline_core::{
    Attempt, FetchError, ItemSource, Page, ReqwestTransport, RetryPolicy, Sleeper, ThreadSleeper,
    Transport, retry_with_backoff,
};

use crate::config::Config;
use crate::schema::SearchResponse;

pub struct JiraClient {
    base_url: String,
    transport: Box<dyn Transport>,
    sleeper: Box<dyn Sleeper>,
    retry: RetryPolicy,
}

impl JiraClient {
    /// Production client over reqwest.
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let transport = ReqwestTransport::new(&config.http)?;
        Ok(Self::with_transport(
            &config.base_url,
            Box::new(transport),
            Box::new(ThreadSleeper),
            config.retry,
        ))
    }

    pub fn with_transport(
        base_url: &str,
        transport: Box<dyn Transport>,
        sleeper: Box<dyn Sleeper>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            sleeper,
            retry,
        }
    }

    /// GET with retries, then decode the body as JSON.
    fn get_json(&self, label: &str, url: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        let body = retry_with_backoff(
            label,
            &self.retry,
            self.sleeper.as_ref(),
            &mut rand::thread_rng(),
            |_| Attempt::from_transport(self.transport.get(url, query), Utc::now()),
        )?;
        serde_json::from_str(&body).map_err(|e| FetchError::Malformed(format!("{label}: {e}")))
    }
}

/// JQL listing every issue of a project, oldest first.
///
/// Ordering by creation keeps offsets stable: issues created mid-run append
/// at the end instead of shifting pages already consumed.
pub fn project_jql(project: &str) -> String {
    format!("project = \"{project}\" ORDER BY created ASC, key ASC")
}

fn check_identifier(kind: &str, value: &str) -> Result<(), FetchError> {
    let ok = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(FetchError::Request(format!("invalid {kind}: {value:?}")))
    }
}

impl ItemSource for JiraClient {
    fn fetch_page(&self, project: &str, start: u64, page_size: u32) -> Result<Page, FetchError> {
        check_identifier("project key", project)?;
        let url = format!("{}/search", self.base_url);
        let query = [
            ("jql", project_jql(project)),
            ("startAt", start.to_string()),
            ("maxResults", page_size.to_string()),
            ("fields", "*all".to_string()),
        ];
        let label = format!("{project} search@{start}");
        let value = self.get_json(&label, &url, &query)?;
        let response: SearchResponse = serde_json::from_value(value)
            .map_err(|e| FetchError::Malformed(format!("{label}: {e}")))?;
        let has_more = response.has_more(start, page_size);
        log::debug!(
            "{label}: {} issues (total {:?}, more: {has_more})",
            response.issues.len(),
            response.total
        );
        Ok(Page {
            items: response.issues,
            has_more,
        })
    }

    fn fetch_item(&self, _project: &str, key: &str) -> Result<Value, FetchError> {
        check_identifier("issue key", key)?;
        let url = format!("{}/issue/{key}", self.base_url);
        self.get_json(key, &url, &[("fields", "*all".to_string())])
    }
}
