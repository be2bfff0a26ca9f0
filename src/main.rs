// batchreplace - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing (run / preview / validate subcommands)
// 2. Logging initialisation (debug mode support)
// 3. Job-config loading and validation
// 4. Dispatch to the scheduler, printing a summary and mapping the result to
//    a process exit code.

pub use batchreplace::config;
pub use batchreplace::core;
pub use batchreplace::platform;
pub use batchreplace::preview;
pub use batchreplace::scheduler;
pub use batchreplace::util;
pub use batchreplace::worker;

use clap::{Parser, Subcommand};
use core::model::{FileStatus, JobConfig, JobOptions, JobState, ObserverEvent};
use std::path::PathBuf;
use std::process::ExitCode;

/// batchreplace - batch text find/replace engine with ordered rulesets and
/// atomic rewrites.
///
/// Point it at a directory and a job config file to run an ordered cascade
/// of literal find/replace rules across every matching file, or use
/// `preview` to see what would change without writing anything.
#[derive(Parser, Debug)]
#[command(name = "batchreplace", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a job to completion, rewriting files in place.
    Run {
        /// Directory to search under.
        root: PathBuf,
        /// Path to a JSON ruleset file.
        config: PathBuf,
        #[command(flatten)]
        options: RunOptions,
    },
    /// Show what a job would do, without writing anything.
    Preview {
        /// Directory to search under.
        root: PathBuf,
        /// Path to a JSON ruleset file.
        config: PathBuf,
    },
    /// Validate a ruleset file and report every problem found.
    Validate {
        /// Directory to search under.
        root: PathBuf,
        /// Path to a JSON ruleset file.
        config: PathBuf,
    },
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct RunOptions {
    /// Compute and report changes without writing any file.
    #[arg(long)]
    dry_run: bool,
    /// Write a timestamped `.bak` copy of each file before rewriting it.
    #[arg(long)]
    backup: bool,
    /// Worker-pool width. 0 (default) resolves to min(available cores, 16).
    #[arg(short = 'j', long, default_value_t = 0)]
    jobs: usize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let cli_defaults = config::load_cli_defaults_from_platform();
    let config_log_level = cli_defaults.as_ref().and_then(|d| d.log_level.as_deref());
    util::logging::init(cli.debug, config_log_level);

    tracing::info!(version = util::constants::APP_VERSION, "batchreplace starting");

    match cli.command {
        Command::Run { root, config: path, options } => run_command(&root, &path, options),
        Command::Preview { root, config: path } => preview_command(&root, &path),
        Command::Validate { root, config: path } => validate_command(&root, &path),
    }
}

fn load_and_validate(root: &PathBuf, path: &PathBuf, options: JobOptions) -> Result<JobConfig, ExitCode> {
    let job_config = match config::load_job_config(path, root.clone(), options) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: failed to load '{}': {e}", path.display());
            return Err(ExitCode::FAILURE);
        }
    };

    if let Err(errors) = config::validate(&job_config) {
        eprintln!("Configuration is invalid:");
        for e in &errors {
            eprintln!("  - {e}");
        }
        return Err(ExitCode::FAILURE);
    }

    Ok(job_config)
}

fn validate_command(root: &PathBuf, path: &PathBuf) -> ExitCode {
    match load_and_validate(root, path, JobOptions::default()) {
        Ok(config) => {
            println!(
                "Configuration OK: {} rule(s), root '{}'",
                config.ruleset.rules.len(),
                config.root_directory.display()
            );
            ExitCode::SUCCESS
        }
        Err(code) => code,
    }
}

fn preview_command(root: &PathBuf, path: &PathBuf) -> ExitCode {
    let job_config = match load_and_validate(root, path, JobOptions::default()) {
        Ok(c) => c,
        Err(code) => return code,
    };

    match preview::build_preview(&job_config.root_directory, &job_config.filter, &job_config.ruleset) {
        Ok(report) => {
            println!(
                "Previewed {}/{} discovered files (risk: {:?})",
                report.files_sampled, report.total_files_discovered, report.risk
            );
            for warning in &report.warnings {
                println!("  warning: {warning}");
            }
            for file in &report.files {
                if !file.would_modify {
                    continue;
                }
                println!("  {} ({} change(s){})", file.path.display(), file.changes.len(), if file.truncated { ", truncated" } else { "" });
                for change in &file.changes {
                    println!(
                        "    {}:{}: [{}] '{}' -> '{}'",
                        change.line, change.column, change.rule_id, change.matched_text, change.replacement
                    );
                }
            }
            println!("Rule effectiveness:");
            for (rule_id, count) in &report.rule_effectiveness {
                println!("  {rule_id}: {count} match(es)");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: preview failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_command(root: &PathBuf, path: &PathBuf, options: RunOptions) -> ExitCode {
    let job_options = JobOptions {
        dry_run: options.dry_run,
        create_backup: options.backup,
        concurrency: options.jobs,
    };
    let job_config = match load_and_validate(root, path, job_options) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let handle = scheduler::run_job(job_config);

    loop {
        for event in handle.poll_events(64) {
            match event {
                ObserverEvent::Progress(p) => {
                    println!(
                        "[{:?}] {}/{} files, {} modified, {} replacement(s)",
                        p.phase, p.processed_files, p.total_files, p.modified_files, p.total_replacements
                    );
                }
                ObserverEvent::FileDone(result) => {
                    if result.status == FileStatus::Error {
                        eprintln!(
                            "error: {}: {}",
                            result.path.display(),
                            result.error_message.unwrap_or_default()
                        );
                    }
                }
                ObserverEvent::Warning(message) => eprintln!("warning: {message}"),
                ObserverEvent::StateChanged(state) => {
                    tracing::debug!(?state, "Job state changed");
                }
            }
        }
        if handle.state().is_terminal() {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(
            util::constants::SCHEDULER_POLL_INTERVAL_MS,
        ));
    }

    let stats = handle.stats();
    println!(
        "Done: {}/{} files processed, {} modified, {} replacement(s), {} error(s)",
        stats.processed_files, stats.total_files, stats.modified_files, stats.total_replacements, stats.errors
    );

    match handle.state() {
        JobState::Complete => ExitCode::SUCCESS,
        JobState::Cancelled => ExitCode::from(130),
        _ => ExitCode::FAILURE,
    }
}
