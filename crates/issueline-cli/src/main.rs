//! issueline - resumable Jira issue fetcher
//!
//! Pages through Jira projects, stores each issue as raw JSON with a
//! per-project checkpoint, and transforms the raw issues into a JSONL corpus.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use issueline_core::ProgressContext;
use issueline_jira::ExitStatus;

mod cmd;
mod config;

use config::{Config, Overrides};

#[derive(Parser)]
#[command(name = "issueline")]
#[command(about = "Resumable Jira issue fetcher and corpus builder")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file path (default: ./issueline.toml or ~/.config/issueline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Project keys (comma-separated), replacing the configured list
    #[arg(short, long, global = true, value_delimiter = ',')]
    projects: Option<Vec<String>>,

    /// Maximum newly stored issues per project (0 = unlimited)
    #[arg(short = 'l', long, global = true)]
    limit: Option<usize>,

    /// Issues per search page
    #[arg(long, global = true)]
    page_size: Option<u32>,

    /// Attempts per request, including the first
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Projects processed in parallel
    #[arg(short, long, global = true)]
    workers: Option<usize>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            projects: self.projects.clone(),
            limit: self.limit,
            page_size: self.page_size,
            max_attempts: self.max_attempts,
            timeout_secs: self.timeout,
            workers: self.workers,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Fetch, then transform into JSONL
    Run,
    /// Fetch raw issues only
    Fetch,
    /// Transform stored raw issues into JSONL
    Transform,
    /// Show per-project checkpoints
    Status,
    /// Show effective configuration
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = ProgressContext::new();

    // Logging:
    //   TTY:     quiet (warn) unless --debug, spinners show activity
    //   non-TTY: info unless --quiet/--debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = cli.quiet || is_tty;
    issueline_core::init_logging(issueline_core::Verbosity::from_flags(quiet, cli.debug), multi);

    match run(cli, &progress) {
        Ok(status) => ExitCode::from(status.code()),
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::from(ExitStatus::Failure.code())
        }
    }
}

fn run(cli: Cli, progress: &ProgressContext) -> Result<ExitStatus> {
    let file_config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    let config = file_config.resolve(&cli.overrides());

    match cli.command {
        Command::Run => {
            setup_signal_handler();
            cmd::run::run(&config, progress)
        }
        Command::Fetch => {
            setup_signal_handler();
            cmd::fetch::run(&config, progress)
        }
        Command::Transform => cmd::transform::run(&config, progress),
        Command::Status => cmd::status::run(&config),
        Command::Config => {
            eprintln!("\n{}", cmd::config_table(&config));
            Ok(ExitStatus::Success)
        }
    }
}

/// First SIGINT/SIGTERM asks workers to stop after the current unit of
/// work; a second one exits immediately.
fn setup_signal_handler() {
    use std::sync::atomic::Ordering;

    use issueline_core::shutdown_flag;

    // SAFETY: the handlers only touch an atomic and call `exit`.
    unsafe {
        signal_hook::low_level::register(signal_hook::consts::SIGTERM, || {
            if shutdown_flag().swap(true, Ordering::Relaxed) {
                std::process::exit(130);
            }
        })
        .expect("Failed to register SIGTERM handler");
        signal_hook::low_level::register(signal_hook::consts::SIGINT, || {
            if shutdown_flag().swap(true, Ordering::Relaxed) {
                std::process::exit(130);
            }
        })
        .expect("Failed to register SIGINT handler");
    }
}
