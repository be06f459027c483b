// src/lib.rs

pub mod cancel;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod event;
pub mod exec;
pub mod job;
pub mod logging;
pub mod provision;
pub mod registry;
pub mod report;
pub mod trigger;
pub mod types;

use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::builtin_config;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{Dispatcher, Orchestrator, RuntimeOptions, Supervisor};
use crate::errors::{CheckrunError, Result};
use crate::exec::ShellCheckExecutor;
use crate::provision::ShellProvisioner;
use crate::registry::JobRegistry;
use crate::report::RunReport;
use crate::trigger::TriggerListener;

/// High-level entry point used by `main.rs`.
///
/// Loads the job registry, admits the event described by `args`, runs every
/// job and prints the report. Returns the process exit code: 0 iff the run
/// succeeded (or the event did not start a run).
pub async fn run(args: CliArgs) -> Result<i32> {
    let cfg = if args.builtin {
        builtin_config()?
    } else {
        load_and_validate(&args.config)?
    };
    let registry = Arc::new(JobRegistry::from_config(&cfg));
    info!(jobs = registry.len(), digest = %registry.digest(), "job registry loaded");

    if args.dry_run {
        print_dry_run(&cfg, &registry);
        return Ok(0);
    }

    let event = args.to_event()?;
    let repository = args
        .repo
        .clone()
        .or_else(|| cfg.settings.repository.clone())
        .ok_or_else(|| {
            CheckrunError::ConfigError(
                "no repository to check out; pass --repo or set [config].repository".to_string(),
            )
        })?;

    let provisioner = Arc::new(ShellProvisioner::new(
        cfg.provision.clone(),
        repository,
        cfg.settings.workspace_root.clone(),
    ));
    let executor = Arc::new(ShellCheckExecutor::new(cfg.capabilities.clone()));
    let orchestrator = Orchestrator::new(
        provisioner,
        executor,
        RuntimeOptions::from_settings(&cfg.settings),
    );
    let trigger = TriggerListener::from_config(&cfg, Arc::clone(&registry))?;
    let mut dispatcher = Dispatcher::new(
        trigger,
        Supervisor::new(cfg.settings.superseded_runs),
        orchestrator,
    );

    // Ctrl-C cancels in-flight runs; their jobs still report and clean up.
    {
        let canceller = dispatcher.canceller();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("interrupted; cancelling runs");
            canceller.cancel_all();
        });
    }

    let Some(handle) = dispatcher.submit(event.clone()) else {
        println!("event not admitted ({event}); nothing to run");
        return Ok(0);
    };

    let run = handle.wait().await?;
    let report = RunReport::from_run(&run);
    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render_text(args.log_tail));
    }
    Ok(report.exit_code())
}

/// Print the expanded job set without running anything.
fn print_dry_run(cfg: &ConfigFile, registry: &JobRegistry) {
    println!("checkrun dry-run");
    println!("  tracked_branches = {:?}", cfg.settings.tracked_branches);
    println!("  superseded_runs = {:?}", cfg.settings.superseded_runs);
    if let Some(t) = cfg.settings.run_timeout {
        println!("  run_timeout = {t:?}");
    }
    println!("  registry digest = {}", registry.digest());
    println!();

    println!("jobs ({}):", registry.len());
    for job in registry.iter() {
        println!("  - {} [{}]", job.name, job.runtime);
        for step in job.steps.iter() {
            println!("      step: {step}");
        }
        println!("      run: {}", job.run);
        if !job.capabilities.is_empty() {
            let caps: Vec<&str> = job.capabilities.iter().map(|c| c.name()).collect();
            println!("      capabilities: {}", caps.join(", "));
        }
        println!("      timeout: {:?}", job.timeout);
    }

    debug!("dry-run complete (no execution)");
}
