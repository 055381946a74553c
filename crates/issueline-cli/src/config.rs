//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use issueline_core::{BackoffPolicy, HttpConfig, RetryPolicy};
use issueline_jira::config::{DEFAULT_BASE_URL, dedup_projects};

/// Global configuration for issueline
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub projects: Vec<String>,
    pub jira: JiraConfig,
    pub http: HttpSection,
    pub backoff: BackoffSection,
    pub output: OutputConfig,
    pub workers: WorkersConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            projects: ["HADOOP", "SPARK", "KAFKA"].map(String::from).to_vec(),
            jira: JiraConfig::default(),
            http: HttpSection::default(),
            backoff: BackoffSection::default(),
            output: OutputConfig::default(),
            workers: WorkersConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JiraConfig {
    pub base_url: String,
    pub page_size: u32,
    /// 0 = unlimited
    pub max_issues_per_project: usize,
    pub fetch_detail: bool,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: 50,
            max_issues_per_project: 0,
            fetch_detail: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub user_agent: String,
}

impl Default for HttpSection {
    fn default() -> Self {
        let http = HttpConfig::default();
        Self {
            timeout_secs: http.timeout.as_secs(),
            max_attempts: RetryPolicy::default().max_attempts,
            user_agent: http.user_agent,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct BackoffSection {
    pub base_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_fraction: f64,
    pub max_retry_after_secs: u64,
}

impl Default for BackoffSection {
    fn default() -> Self {
        let policy = BackoffPolicy::default();
        Self {
            base_ms: policy.base.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            jitter_fraction: policy.jitter_fraction,
            max_retry_after_secs: policy.max_retry_after.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub raw_dir: PathBuf,
    pub jsonl_dir: PathBuf,
    pub checkpoint_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("output/raw"),
            jsonl_dir: PathBuf::from("output/jsonl"),
            checkpoint_dir: PathBuf::from("output/checkpoints"),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    /// Projects fetched in parallel
    pub projects: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self { projects: 1 }
    }
}

/// Command-line values that win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub projects: Option<Vec<String>>,
    pub limit: Option<usize>,
    pub page_size: Option<u32>,
    pub max_attempts: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub workers: Option<usize>,
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./issueline.toml (current directory)
    /// 2. ~/.config/issueline/config.toml (platform config dir)
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("issueline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "issueline") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Effective pipeline configuration after command-line overrides.
    pub fn resolve(&self, overrides: &Overrides) -> issueline_jira::Config {
        let max_issues = overrides
            .limit
            .unwrap_or(self.jira.max_issues_per_project);
        let timeout_secs = overrides.timeout_secs.unwrap_or(self.http.timeout_secs);

        issueline_jira::Config {
            base_url: self.jira.base_url.clone(),
            projects: dedup_projects(overrides.projects.as_deref().unwrap_or(&self.projects)),
            page_size: overrides.page_size.unwrap_or(self.jira.page_size),
            max_issues: (max_issues > 0).then_some(max_issues),
            fetch_detail: self.jira.fetch_detail,
            http: HttpConfig {
                timeout: Duration::from_secs(timeout_secs),
                user_agent: self.http.user_agent.clone(),
            },
            retry: RetryPolicy {
                max_attempts: overrides.max_attempts.unwrap_or(self.http.max_attempts),
                backoff: BackoffPolicy {
                    base: Duration::from_millis(self.backoff.base_ms),
                    max_delay: Duration::from_millis(self.backoff.max_delay_ms),
                    jitter_fraction: self.backoff.jitter_fraction,
                    max_retry_after: Duration::from_secs(self.backoff.max_retry_after_secs),
                },
            },
            raw_dir: self.output.raw_dir.clone(),
            jsonl_dir: self.output.jsonl_dir.clone(),
            checkpoint_dir: self.output.checkpoint_dir.clone(),
            workers: overrides.workers.unwrap_or(self.workers.projects).max(1),
        }
    }
}
