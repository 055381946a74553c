//! `issueline fetch` - download raw issues

use anyhow::Result;

use issueline_core::{ProgressContext, is_shutdown_requested};
use issueline_jira::{Config, ExitStatus, FetchSummary, run_fetch};

pub fn run(config: &Config, progress: &ProgressContext) -> Result<ExitStatus> {
    let summary = fetch(config, progress)?;
    Ok(ExitStatus::of_fetch(&summary))
}

/// Fetch phase shared with `run`. Reports the summary before returning.
pub(crate) fn fetch(config: &Config, progress: &ProgressContext) -> Result<FetchSummary> {
    let summary = run_fetch(config, progress, &is_shutdown_requested)?;
    report(&summary, progress);
    if is_shutdown_requested() {
        log::warn!("Interrupted; rerun to resume from the last checkpoint");
    }
    Ok(summary)
}

fn report(summary: &FetchSummary, progress: &ProgressContext) {
    if summary.outcomes.is_empty() && summary.fatal.is_empty() {
        return;
    }
    if progress.is_tty() {
        progress.println(format!(
            "\n{}\nFetched {} issues ({} failed) in {:.1}s",
            summary.format_table(),
            summary.fetched(),
            summary.failed_items(),
            summary.elapsed.as_secs_f64()
        ));
    } else {
        summary.log();
    }
}
