//! Pipeline orchestration: fetch phase and transform phase

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use rayon::prelude::*;

use issueline_core::{
    CheckpointStore, ItemSource, JsonFileBackend, ProgressContext, ProjectRun, RawStore,
    fmt_num, run_project,
};

use crate::client::JiraClient;
use crate::config::Config;
use crate::derive::HeuristicDeriver;
use crate::stats::{FatalProject, FetchSummary, TransformSummary};
use crate::transform::transform_project;

/// Process exit status derived from a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    /// A project aborted or hit a storage error
    Failure,
    /// Stopped by SIGINT/SIGTERM
    Interrupted,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Interrupted => 130,
        }
    }

    /// Failures outrank interruption: a sibling's fatal error also
    /// interrupts the remaining projects.
    pub fn of_fetch(summary: &FetchSummary) -> Self {
        if !summary.fatal.is_empty() || summary.any_aborted() {
            Self::Failure
        } else if summary.any_interrupted() {
            Self::Interrupted
        } else {
            Self::Success
        }
    }
}

fn build_pool(workers: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .context("Failed to create thread pool")
}

/// Fetch every configured project from Jira.
pub fn run_fetch(
    config: &Config,
    progress: &ProgressContext,
    cancel: &(dyn Fn() -> bool + Sync),
) -> Result<FetchSummary> {
    if config.projects.is_empty() {
        log::warn!("No projects configured");
        return Ok(FetchSummary::default());
    }
    let client = JiraClient::new(config).context("Failed to build HTTP client")?;
    run_fetch_with(config, &client, progress, cancel)
}

/// Fetch phase over any [`ItemSource`].
///
/// Projects run in parallel on `config.workers` threads, each sequentially
/// through its own checkpoint. A storage error in one project cancels the
/// others at their next page or item.
pub fn run_fetch_with(
    config: &Config,
    source: &dyn ItemSource,
    progress: &ProgressContext,
    cancel: &(dyn Fn() -> bool + Sync),
) -> Result<FetchSummary> {
    let start = Instant::now();
    let projects = config.unique_projects();
    if projects.is_empty() {
        log::warn!("No projects configured");
        return Ok(FetchSummary::default());
    }

    fs::create_dir_all(&config.raw_dir).with_context(|| {
        format!("Failed to create raw directory {}", config.raw_dir.display())
    })?;
    fs::create_dir_all(&config.checkpoint_dir).with_context(|| {
        format!(
            "Failed to create checkpoint directory {}",
            config.checkpoint_dir.display()
        )
    })?;

    let checkpoints = CheckpointStore::new(JsonFileBackend::new(&config.checkpoint_dir));
    let raw = RawStore::new(&config.raw_dir);
    let options = config.pipeline_options();

    let fatal_seen = AtomicBool::new(false);
    let stop = || cancel() || fatal_seen.load(Ordering::Relaxed);

    log::info!(
        "Fetching {} projects with {} workers (page size {}, limit {})",
        projects.len(),
        config.workers.max(1),
        options.page_size,
        options
            .max_items
            .map_or_else(|| "none".to_string(), fmt_num)
    );
    let stage = progress.stage_line("fetch");
    stage.set_message(format!("{} projects", projects.len()));

    let pool = build_pool(config.workers)?;
    let results: Vec<_> = pool.install(|| {
        projects
            .par_iter()
            .map(|project| {
                let pb = progress.project_line(project);
                let run = ProjectRun {
                    project,
                    source,
                    checkpoints: &checkpoints,
                    raw: &raw,
                    options,
                    cancel: &stop,
                };
                let result = run_project(&run, &pb);
                pb.finish_and_clear();
                if let Err(e) = &result {
                    log::error!("{project}: fatal: {e}");
                    fatal_seen.store(true, Ordering::Relaxed);
                }
                (project.clone(), result)
            })
            .collect()
    });
    stage.finish_and_clear();

    let mut summary = FetchSummary::default();
    for (project, result) in results {
        match result {
            Ok(outcome) => summary.outcomes.push(outcome),
            Err(e) => summary.fatal.push(FatalProject {
                project,
                error: e.to_string(),
            }),
        }
    }
    summary.elapsed = start.elapsed();
    Ok(summary)
}

/// Transform the raw issues of every configured project into JSONL.
pub fn run_transform(config: &Config, progress: &ProgressContext) -> Result<TransformSummary> {
    let start = Instant::now();
    let raw = RawStore::new(&config.raw_dir);
    let deriver = HeuristicDeriver;
    let projects = config.unique_projects();

    let stage = progress.stage_line("transform");
    let pool = build_pool(config.workers)?;
    let results: Vec<_> = pool.install(|| {
        projects
            .par_iter()
            .map(|project| -> Result<_> {
                let out = config.jsonl_path(project);
                stage.set_message(project.clone());
                let stats = transform_project(&raw, project, &out, &deriver)
                    .with_context(|| format!("Failed to transform {project} into {}", out.display()))?;
                if stats.is_some() {
                    log::info!("Wrote JSONL: {}", out.display());
                }
                Ok((project.clone(), stats))
            })
            .collect::<Result<_>>()
    })?;
    stage.finish_and_clear();

    let mut summary = TransformSummary::default();
    for (project, stats) in results {
        match stats {
            Some(stats) => summary.projects.push(stats),
            None => summary.missing.push(project),
        }
    }
    summary.elapsed = start.elapsed();
    Ok(summary)
}
