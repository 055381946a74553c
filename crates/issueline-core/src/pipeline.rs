//! Per-project resume state machine
//!
//! ```text
//! PAGING(start) ──fetch page──▶ ITEM_FETCH(start, page, i) ──all items──▶ record_page_done
//!      ▲                              │                                         │
//!      └──────── has_more ────────────┼─────────────────────────────────────────┘
//!                                     ▼
//!                                   DONE
//! ```
//!
//! Write order per item: raw record, then `record_item_done`. Per page: every
//! item resolved, then `record_page_done(start + len)`. A run stopped at any
//! point leaves a checkpoint that names only durable work, so the next run
//! re-enters at `last_start` and skips what is already on disk.

use std::fmt;
use std::io;

use indicatif::ProgressBar;
use serde_json::Value;

use crate::checkpoint::{CheckpointBackend, CheckpointError, CheckpointStore};
use crate::error::FetchError;
use crate::raw_store::{RawStore, RawStoreError};

/// One listing page.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Value>,
    pub has_more: bool,
}

/// Remote listing and detail lookups, with retries already applied.
pub trait ItemSource: Send + Sync {
    fn fetch_page(&self, project: &str, start: u64, page_size: u32) -> Result<Page, FetchError>;

    fn fetch_item(&self, project: &str, key: &str) -> Result<Value, FetchError>;
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub page_size: u32,
    /// Stop after this many newly stored items
    pub max_items: Option<usize>,
    /// Re-fetch each item from the detail endpoint instead of storing the
    /// listing payload
    pub fetch_detail: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_items: None,
            fetch_detail: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectStatus {
    /// Listing reported no more pages
    Completed,
    /// `max_items` new items stored
    LimitReached,
    /// Cancel predicate tripped
    Interrupted,
    /// A page could not be fetched
    Aborted(String),
}

impl ProjectStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::LimitReached => "limit",
            Self::Interrupted => "interrupted",
            Self::Aborted(_) => "aborted",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aborted(reason) => write!(f, "aborted: {reason}"),
            other => f.write_str(other.label()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectOutcome {
    pub project: String,
    pub fetched: usize,
    pub skipped: usize,
    pub failed: usize,
    pub pages: usize,
    /// `last_start` when the run ended
    pub final_offset: u64,
    pub status: ProjectStatus,
}

impl ProjectOutcome {
    fn new(project: &str, offset: u64) -> Self {
        Self {
            project: project.to_string(),
            fetched: 0,
            skipped: 0,
            failed: 0,
            pages: 0,
            final_offset: offset,
            status: ProjectStatus::Completed,
        }
    }
}

/// Storage failures. Unlike fetch failures these end the whole run.
#[derive(Debug)]
pub enum PipelineError {
    Checkpoint(CheckpointError),
    RawStore(io::Error),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checkpoint(e) => write!(f, "{e}"),
            Self::RawStore(e) => write!(f, "raw store IO: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Checkpoint(e) => Some(e),
            Self::RawStore(e) => Some(e),
        }
    }
}

impl From<RawStoreError> for PipelineError {
    fn from(e: RawStoreError) -> Self {
        match e {
            RawStoreError::Io(e) => Self::RawStore(e),
            other => Self::RawStore(io::Error::new(io::ErrorKind::InvalidData, other)),
        }
    }
}

impl From<CheckpointError> for PipelineError {
    fn from(e: CheckpointError) -> Self {
        Self::Checkpoint(e)
    }
}

/// Everything one project run needs.
pub struct ProjectRun<'a, B> {
    pub project: &'a str,
    pub source: &'a dyn ItemSource,
    pub checkpoints: &'a CheckpointStore<B>,
    pub raw: &'a RawStore,
    pub options: PipelineOptions,
    /// Polled before every page and every item
    pub cancel: &'a (dyn Fn() -> bool + Sync),
}

enum State {
    Paging { start: u64 },
    ItemFetch { start: u64, page: Page, index: usize },
    Done(ProjectStatus),
}

enum ItemResult {
    Stored,
    Skipped,
    Failed,
}

/// Drive one project from its checkpoint to `DONE`.
///
/// Fetch failures never escape: an item failure is counted and the page goes
/// on, a page failure ends the project as [`ProjectStatus::Aborted`].
/// Checkpoint and raw-store I/O errors are returned.
pub fn run_project<B: CheckpointBackend>(
    run: &ProjectRun<'_, B>,
    pb: &ProgressBar,
) -> Result<ProjectOutcome, PipelineError> {
    let project = run.project;
    let removed = run
        .raw
        .cleanup_tmp_files(project)
        .map_err(PipelineError::RawStore)?;
    if removed > 0 {
        log::info!("{project}: removed {removed} stale tmp files");
    }

    let checkpoint = run.checkpoints.load(project)?;
    if checkpoint.last_start > 0 || !checkpoint.downloaded_keys.is_empty() {
        log::info!(
            "{project}: resuming at offset {} ({} items already stored)",
            checkpoint.last_start,
            checkpoint.downloaded_keys.len()
        );
    }

    let mut outcome = ProjectOutcome::new(project, checkpoint.last_start);
    let mut state = State::Paging {
        start: checkpoint.last_start,
    };

    loop {
        state = match state {
            State::Paging { start } => {
                if (run.cancel)() {
                    State::Done(ProjectStatus::Interrupted)
                } else if limit_reached(&run.options, outcome.fetched) {
                    State::Done(ProjectStatus::LimitReached)
                } else {
                    pb.set_message(format!("page @{start}"));
                    match run.source.fetch_page(project, start, run.options.page_size) {
                        Ok(page) if page.items.is_empty() => {
                            log::debug!("{project}: empty page at {start}");
                            State::Done(ProjectStatus::Completed)
                        }
                        Ok(page) => State::ItemFetch {
                            start,
                            page,
                            index: 0,
                        },
                        Err(e) => {
                            log::error!("{project}: page at offset {start} failed: {e}");
                            State::Done(ProjectStatus::Aborted(e.to_string()))
                        }
                    }
                }
            }
            State::ItemFetch { start, page, index } if index == page.items.len() => {
                let next = start + page.items.len() as u64;
                run.checkpoints.record_page_done(project, next)?;
                outcome.pages += 1;
                outcome.final_offset = next;
                log::debug!("{project}: page done, offset {next}");
                if page.has_more {
                    State::Paging { start: next }
                } else {
                    State::Done(ProjectStatus::Completed)
                }
            }
            State::ItemFetch { start, page, index } => {
                if (run.cancel)() {
                    State::Done(ProjectStatus::Interrupted)
                } else {
                    let result = process_item(run, &page.items[index], outcome.fetched)?;
                    match result {
                        Some(ItemResult::Stored) => {
                            outcome.fetched += 1;
                            pb.inc(1);
                        }
                        Some(ItemResult::Skipped) => outcome.skipped += 1,
                        Some(ItemResult::Failed) => outcome.failed += 1,
                        None => log::info!("{project}: item limit reached"),
                    }
                    match result {
                        None => State::Done(ProjectStatus::LimitReached),
                        Some(_) => State::ItemFetch {
                            start,
                            page,
                            index: index + 1,
                        },
                    }
                }
            }
            State::Done(status) => {
                outcome.status = status;
                break;
            }
        };
    }

    log::info!(
        "{project}: {} (fetched {}, skipped {}, failed {}, offset {})",
        outcome.status,
        outcome.fetched,
        outcome.skipped,
        outcome.failed,
        outcome.final_offset
    );
    Ok(outcome)
}

fn limit_reached(options: &PipelineOptions, fetched: usize) -> bool {
    options.max_items.is_some_and(|max| fetched >= max)
}

/// Resolve one listed item. `None` means the item needs fetching but the
/// limit forbids it.
fn process_item<B: CheckpointBackend>(
    run: &ProjectRun<'_, B>,
    listed: &Value,
    fetched: usize,
) -> Result<Option<ItemResult>, PipelineError> {
    let project = run.project;
    let Some(key) = listed.get("key").and_then(Value::as_str) else {
        log::warn!("{project}: listed item without a key, skipping");
        return Ok(Some(ItemResult::Failed));
    };

    if run.checkpoints.is_item_done(project, key)? {
        return Ok(Some(ItemResult::Skipped));
    }
    if limit_reached(&run.options, fetched) {
        return Ok(None);
    }

    let detail;
    let payload = if run.options.fetch_detail {
        match run.source.fetch_item(project, key) {
            Ok(value) => {
                detail = value;
                &detail
            }
            Err(e) => {
                log::warn!("{project}: {key} failed: {e}");
                return Ok(Some(ItemResult::Failed));
            }
        }
    } else {
        listed
    };

    match run.raw.write(project, key, payload) {
        Ok(_) => {}
        Err(e) if e.is_rejection() => {
            log::warn!("{project}: {key} rejected: {e}");
            return Ok(Some(ItemResult::Failed));
        }
        Err(e) => return Err(e.into()),
    }
    run.checkpoints.record_item_done(project, key)?;
    Ok(Some(ItemResult::Stored))
}
