//! Run summaries: per-project tables in TTY mode, log lines otherwise.

use std::time::Duration;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use issueline_core::{Checkpoint, ProjectOutcome, ProjectStatus, fmt_num};

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(
            header
                .iter()
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    table
}

fn status_cell(status: &ProjectStatus) -> Cell {
    let color = match status {
        ProjectStatus::Completed => Color::Green,
        ProjectStatus::LimitReached => Color::Blue,
        ProjectStatus::Interrupted => Color::Yellow,
        ProjectStatus::Aborted(_) => Color::Red,
    };
    Cell::new(status.label()).fg(color)
}

// =============================================================================
// Fetch
// =============================================================================

/// A project that stopped on a storage error rather than an outcome
#[derive(Debug, Clone)]
pub struct FatalProject {
    pub project: String,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct FetchSummary {
    pub outcomes: Vec<ProjectOutcome>,
    pub fatal: Vec<FatalProject>,
    pub elapsed: Duration,
}

impl FetchSummary {
    pub fn fetched(&self) -> usize {
        self.outcomes.iter().map(|o| o.fetched).sum()
    }

    pub fn failed_items(&self) -> usize {
        self.outcomes.iter().map(|o| o.failed).sum()
    }

    pub fn any_aborted(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| matches!(o.status, ProjectStatus::Aborted(_)))
    }

    pub fn any_interrupted(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.status == ProjectStatus::Interrupted)
    }

    pub fn format_table(&self) -> String {
        let mut table = new_table(&[
            "Project", "Fetched", "Skipped", "Failed", "Pages", "Offset", "Status",
        ]);
        for o in &self.outcomes {
            table.add_row(vec![
                Cell::new(&o.project),
                Cell::new(fmt_num(o.fetched)),
                Cell::new(fmt_num(o.skipped)),
                Cell::new(fmt_num(o.failed)),
                Cell::new(fmt_num(o.pages)),
                Cell::new(o.final_offset),
                status_cell(&o.status),
            ]);
        }
        for f in &self.fatal {
            table.add_row(vec![
                Cell::new(&f.project),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("error").fg(Color::Red),
            ]);
        }
        table.to_string()
    }

    pub fn log(&self) {
        log::info!("=== Fetch Summary ===");
        for o in &self.outcomes {
            log::info!(
                "{}: {} fetched, {} skipped, {} failed, {} pages, offset {} [{}]",
                o.project,
                fmt_num(o.fetched),
                fmt_num(o.skipped),
                fmt_num(o.failed),
                o.pages,
                o.final_offset,
                o.status
            );
        }
        for f in &self.fatal {
            log::error!("{}: {}", f.project, f.error);
        }
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
    }
}

// =============================================================================
// Transform
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct TransformStats {
    pub project: String,
    pub records: usize,
    /// Raw files that could not be read or transformed
    pub skipped: usize,
    /// Records where an extraction limit cut text short
    pub truncated: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
pub struct TransformSummary {
    pub projects: Vec<TransformStats>,
    /// Configured projects without raw data
    pub missing: Vec<String>,
    pub elapsed: Duration,
}

impl TransformSummary {
    pub fn records(&self) -> usize {
        self.projects.iter().map(|p| p.records).sum()
    }

    pub fn format_table(&self) -> String {
        let mut table = new_table(&["Project", "Records", "Skipped", "Truncated", "Time"]);
        for p in &self.projects {
            table.add_row(vec![
                Cell::new(&p.project),
                Cell::new(fmt_num(p.records)),
                Cell::new(fmt_num(p.skipped)),
                Cell::new(fmt_num(p.truncated)),
                Cell::new(format!("{:.1}s", p.elapsed.as_secs_f64())),
            ]);
        }
        for project in &self.missing {
            table.add_row(vec![
                Cell::new(project),
                Cell::new("no raw data").fg(Color::Yellow),
                Cell::new(""),
                Cell::new(""),
                Cell::new(""),
            ]);
        }
        table.to_string()
    }

    pub fn log(&self) {
        log::info!("=== Transform Summary ===");
        for p in &self.projects {
            log::info!(
                "{}: {} records, {} skipped, {} truncated [{:.1}s]",
                p.project,
                fmt_num(p.records),
                fmt_num(p.skipped),
                fmt_num(p.truncated),
                p.elapsed.as_secs_f64()
            );
        }
        for project in &self.missing {
            log::info!("{project}: no raw data, skipped");
        }
    }
}

// =============================================================================
// Checkpoint status
// =============================================================================

/// Table for the `status` command.
pub fn checkpoint_table(rows: &[(String, Checkpoint)]) -> String {
    let mut table = new_table(&["Project", "Offset", "Downloaded", "Updated"]);
    for (project, cp) in rows {
        table.add_row(vec![
            Cell::new(project),
            Cell::new(cp.last_start),
            Cell::new(fmt_num(cp.downloaded_keys.len())),
            Cell::new(
                cp.updated_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(project: &str, status: ProjectStatus) -> ProjectOutcome {
        ProjectOutcome {
            project: project.to_string(),
            fetched: 1_500,
            skipped: 3,
            failed: 1,
            pages: 30,
            final_offset: 1_504,
            status,
        }
    }

    #[test]
    fn fetch_summary_flags() {
        let summary = FetchSummary {
            outcomes: vec![
                outcome("HADOOP", ProjectStatus::Completed),
                outcome("SPARK", ProjectStatus::Aborted("HTTP 403".into())),
            ],
            ..Default::default()
        };
        assert_eq!(summary.fetched(), 3_000);
        assert_eq!(summary.failed_items(), 2);
        assert!(summary.any_aborted());
        assert!(!summary.any_interrupted());
    }

    #[test]
    fn fetch_table_lists_every_project() {
        let summary = FetchSummary {
            outcomes: vec![outcome("HADOOP", ProjectStatus::Completed)],
            fatal: vec![FatalProject {
                project: "KAFKA".to_string(),
                error: "disk full".to_string(),
            }],
            ..Default::default()
        };
        let table = summary.format_table();
        assert!(table.contains("HADOOP"));
        assert!(table.contains("1,500"));
        assert!(table.contains("completed"));
        assert!(table.contains("KAFKA"));
        assert!(table.contains("error"));
    }

    #[test]
    fn transform_table_marks_missing_projects() {
        let summary = TransformSummary {
            projects: vec![TransformStats {
                project: "HDFS".to_string(),
                records: 12,
                ..Default::default()
            }],
            missing: vec!["ZOOKEEPER".to_string()],
            ..Default::default()
        };
        assert_eq!(summary.records(), 12);
        let table = summary.format_table();
        assert!(table.contains("HDFS"));
        assert!(table.contains("no raw data"));
    }

    #[test]
    fn checkpoint_table_without_timestamp() {
        let cp = Checkpoint {
            last_start: 100,
            ..Default::default()
        };
        let table = checkpoint_table(&[("HIVE".to_string(), cp)]);
        assert!(table.contains("HIVE"));
        assert!(table.contains("100"));
    }
}
