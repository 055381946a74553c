//! issueline Jira - Apache Jira provider
//!
//! Fetches issues project by project from the Jira REST API v2 into raw JSON
//! files, resuming from per-project checkpoints, then transforms the raw
//! files into one JSONL corpus file per project.
//!
//! # Example
//!
//! ```no_run
//! use issueline_jira::{Config, run_fetch, run_transform};
//! use issueline_core::ProgressContext;
//!
//! let config = Config {
//!     projects: vec!["HADOOP".to_string()],
//!     max_issues: Some(100),
//!     ..Default::default()
//! };
//! let progress = ProgressContext::new();
//! let fetched = run_fetch(&config, &progress, &|| false).expect("fetch failed");
//! let written = run_transform(&config, &progress).expect("transform failed");
//! println!("{} new issues, {} records", fetched.fetched(), written.records());
//! ```

pub mod client;
pub mod config;
pub mod corpus;
pub mod derive;
pub mod runner;
pub mod schema;
pub mod stats;
pub mod transform;

// Re-exports for convenience
pub use client::JiraClient;
pub use config::Config;
pub use derive::{Derived, DerivedFieldGenerator, HeuristicDeriver, Qna};
pub use runner::{ExitStatus, run_fetch, run_transform};
pub use stats::{FetchSummary, TransformSummary};
pub use transform::CorpusRecord;
