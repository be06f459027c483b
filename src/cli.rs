// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::errors::{CheckrunError, Result};
use crate::event::Event;

/// Command-line arguments for `checkrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "checkrun",
    version,
    about = "Run a repository's verification checks in parallel and report one verdict.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the job registry file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Checkrun.toml")]
    pub config: String,

    /// Use the built-in job registry instead of reading `--config`.
    #[arg(long)]
    pub builtin: bool,

    /// Kind of repository event that triggered this run.
    #[arg(long, value_enum, default_value = "push")]
    pub event: EventArg,

    /// Branch the event refers to (pushed branch or PR source branch).
    #[arg(long = "ref", value_name = "BRANCH")]
    pub git_ref: Option<String>,

    /// Commit SHA to check out.
    #[arg(long, value_name = "SHA")]
    pub sha: Option<String>,

    /// Pull request number (pull-request events only).
    #[arg(long, value_name = "NUMBER")]
    pub pr: Option<u64>,

    /// Read the event from a JSON file instead of `--event/--ref/--sha`.
    #[arg(long, value_name = "PATH", conflicts_with_all = ["git_ref", "sha", "pr"])]
    pub event_file: Option<String>,

    /// Repository URL or path to check out (overrides `[config].repository`).
    #[arg(long, value_name = "URL")]
    pub repo: Option<String>,

    /// Print the run report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Show at most this many trailing log lines per job in the text report.
    #[arg(long, value_name = "LINES", default_value_t = 20)]
    pub log_tail: usize,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CHECKRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the expanded job set, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Event kind as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum EventArg {
    Push,
    PullRequest,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    /// Build the repository event described by the arguments.
    pub fn to_event(&self) -> Result<Event> {
        if let Some(path) = &self.event_file {
            return Event::from_json_file(path);
        }

        let git_ref = self.git_ref.clone().ok_or_else(|| {
            CheckrunError::ConfigError("--ref is required unless --event-file is given".to_string())
        })?;
        let sha = self.sha.clone().ok_or_else(|| {
            CheckrunError::ConfigError("--sha is required unless --event-file is given".to_string())
        })?;

        let event = match self.event {
            EventArg::Push => {
                if self.pr.is_some() {
                    return Err(CheckrunError::ConfigError(
                        "--pr only applies to pull-request events".to_string(),
                    ));
                }
                Event::push(git_ref, sha)
            }
            EventArg::PullRequest => Event::pull_request(git_ref, sha, self.pr),
        };
        event.validate()?;
        Ok(event)
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
