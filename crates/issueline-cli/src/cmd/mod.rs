pub mod fetch;
pub mod run;
pub mod status;
pub mod transform;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use issueline_jira::Config;

/// Effective configuration as a two-column table.
pub fn config_table(config: &Config) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    let backoff = &config.retry.backoff;
    table.add_row(vec!["Jira base URL", &config.base_url]);
    table.add_row(vec![
        "Projects",
        &if config.projects.is_empty() {
            "none".to_string()
        } else {
            config.projects.join(", ")
        },
    ]);
    table.add_row(vec!["Page size", &config.page_size.to_string()]);
    table.add_row(vec![
        "Max issues per project",
        &config
            .max_issues
            .map_or_else(|| "unlimited".to_string(), |n| n.to_string()),
    ]);
    table.add_row(vec![
        "Fetch detail",
        if config.fetch_detail { "yes" } else { "no" },
    ]);
    table.add_row(vec![
        "Timeout",
        &format!("{}s", config.http.timeout.as_secs()),
    ]);
    table.add_row(vec!["User agent", &config.http.user_agent]);
    table.add_row(vec!["Max attempts", &config.retry.max_attempts.to_string()]);
    table.add_row(vec![
        "Backoff",
        &format!(
            "{}ms base, {}ms cap, {:.0}% jitter",
            backoff.base.as_millis(),
            backoff.max_delay.as_millis(),
            backoff.jitter_fraction * 100.0
        ),
    ]);
    table.add_row(vec![
        "Retry-After cap",
        &format!("{}s", backoff.max_retry_after.as_secs()),
    ]);
    table.add_row(vec!["Raw directory", &config.raw_dir.display().to_string()]);
    table.add_row(vec!["JSONL directory", &config.jsonl_dir.display().to_string()]);
    table.add_row(vec![
        "Checkpoint directory",
        &config.checkpoint_dir.display().to_string(),
    ]);
    table.add_row(vec!["Workers", &config.workers.to_string()]);
    table
}
