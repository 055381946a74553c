//! Jira pipeline configuration

use std::collections::HashSet;
use std::path::PathBuf;

use issueline_core::{HttpConfig, PipelineOptions, RetryPolicy};

pub const DEFAULT_BASE_URL: &str = "https://issues.apache.org/jira/rest/api/2";

/// Runtime configuration for the Jira pipeline
#[derive(Debug, Clone)]
pub struct Config {
    /// REST API v2 root, without trailing `/search`
    pub base_url: String,
    /// Project keys, processed in this order
    pub projects: Vec<String>,
    pub page_size: u32,
    /// Newly stored issues per project per run; `None` = unlimited
    pub max_issues: Option<usize>,
    /// Re-fetch each issue from `/issue/{key}` instead of storing the search hit
    pub fetch_detail: bool,
    pub http: HttpConfig,
    pub retry: RetryPolicy,
    /// Raw issues land in `{raw_dir}/{project}/{key}.json`
    pub raw_dir: PathBuf,
    /// Corpus output, `{jsonl_dir}/{project}.jsonl`
    pub jsonl_dir: PathBuf,
    /// Checkpoints, `{checkpoint_dir}/{project}.json`
    pub checkpoint_dir: PathBuf,
    /// Projects fetched in parallel
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            projects: Vec::new(),
            page_size: 50,
            max_issues: None,
            fetch_detail: true,
            http: HttpConfig::default(),
            retry: RetryPolicy::default(),
            raw_dir: PathBuf::from("output/raw"),
            jsonl_dir: PathBuf::from("output/jsonl"),
            checkpoint_dir: PathBuf::from("output/checkpoints"),
            workers: 1,
        }
    }
}

impl Config {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            page_size: self.page_size.max(1),
            max_items: self.max_issues,
            fetch_detail: self.fetch_detail,
        }
    }

    pub fn jsonl_path(&self, project: &str) -> PathBuf {
        self.jsonl_dir.join(format!("{project}.jsonl"))
    }

    /// Configured projects in order, each key once.
    pub fn unique_projects(&self) -> Vec<String> {
        dedup_projects(&self.projects)
    }
}

/// Drop repeated project keys, keeping first occurrences in order.
///
/// A project must have a single writer; a repeated key would run two
/// workers over the same checkpoint and raw directory.
pub fn dedup_projects(projects: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(projects.len());
    let mut unique = Vec::with_capacity(projects.len());
    for project in projects {
        if seen.insert(project.as_str()) {
            unique.push(project.clone());
        } else {
            log::warn!("Ignoring duplicate project {project}");
        }
    }
    unique
}
