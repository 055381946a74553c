//! `issueline status` - per-project checkpoint table

use anyhow::{Context, Result};

use issueline_core::{CheckpointBackend, JsonFileBackend};
use issueline_jira::stats::checkpoint_table;
use issueline_jira::{Config, ExitStatus};

/// Reads checkpoint documents directly; safe while a fetch is running.
pub fn run(config: &Config) -> Result<ExitStatus> {
    let rows = collect(config)?;
    if rows.is_empty() {
        eprintln!("No checkpoints in {}", config.checkpoint_dir.display());
    } else {
        eprintln!("\n{}", checkpoint_table(&rows));
    }
    Ok(ExitStatus::Success)
}

fn collect(config: &Config) -> Result<Vec<(String, issueline_core::Checkpoint)>> {
    let backend = JsonFileBackend::new(&config.checkpoint_dir);
    let projects = backend.projects().with_context(|| {
        format!(
            "Failed to list checkpoints in {}",
            config.checkpoint_dir.display()
        )
    })?;
    let mut rows = Vec::with_capacity(projects.len());
    for project in projects {
        let checkpoint = backend
            .read(&project)
            .with_context(|| format!("Failed to read checkpoint for {project}"))?
            .unwrap_or_default();
        rows.push((project, checkpoint));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use issueline_core::CheckpointStore;
    use tempfile::TempDir;

    #[test]
    fn collects_every_checkpoint() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            checkpoint_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let store = CheckpointStore::new(JsonFileBackend::new(dir.path()));
        store.record_item_done("SPARK", "SPARK-1").unwrap();
        store.record_page_done("SPARK", 50).unwrap();
        store.record_page_done("HIVE", 100).unwrap();

        let rows = collect(&config).unwrap();
        let summary: Vec<(&str, u64, usize)> = rows
            .iter()
            .map(|(p, cp)| (p.as_str(), cp.last_start, cp.downloaded_keys.len()))
            .collect();
        assert_eq!(summary, vec![("HIVE", 100, 0), ("SPARK", 50, 1)]);
    }

    #[test]
    fn missing_directory_has_no_rows() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            checkpoint_dir: dir.path().join("absent"),
            ..Default::default()
        };
        assert!(collect(&config).unwrap().is_empty());
    }
}
