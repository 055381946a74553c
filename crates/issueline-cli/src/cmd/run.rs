//! `issueline run` - fetch, then transform

use anyhow::Result;

use issueline_core::ProgressContext;
use issueline_jira::{Config, ExitStatus};

use super::{fetch, transform};

/// Transform still runs after failed projects so the corpus reflects
/// everything on disk. An interrupted fetch skips it.
pub fn run(config: &Config, progress: &ProgressContext) -> Result<ExitStatus> {
    let summary = fetch::fetch(config, progress)?;
    let status = ExitStatus::of_fetch(&summary);
    if status == ExitStatus::Interrupted {
        return Ok(status);
    }
    transform::transform(config, progress)?;
    Ok(status)
}
