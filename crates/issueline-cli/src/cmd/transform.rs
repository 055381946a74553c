//! `issueline transform` - raw issues to JSONL

use anyhow::Result;

use issueline_core::ProgressContext;
use issueline_jira::{Config, ExitStatus, TransformSummary, run_transform};

pub fn run(config: &Config, progress: &ProgressContext) -> Result<ExitStatus> {
    transform(config, progress)?;
    Ok(ExitStatus::Success)
}

pub(crate) fn transform(config: &Config, progress: &ProgressContext) -> Result<TransformSummary> {
    let summary = run_transform(config, progress)?;
    if progress.is_tty() {
        progress.println(format!(
            "\n{}\nWrote {} records to {} in {:.1}s",
            summary.format_table(),
            summary.records(),
            config.jsonl_dir.display(),
            summary.elapsed.as_secs_f64()
        ));
    } else {
        summary.log();
    }
    Ok(summary)
}
