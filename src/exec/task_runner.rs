// src/exec/task_runner.rs

//! Production check executor: runs the job's command through the shell.

use std::process::ExitStatus;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::cancel::CancelSignal;
use crate::config::model::CapabilitySettings;
use crate::errors::ProvisioningError;
use crate::exec::backend::CheckExecutor;
use crate::exec::capability::{self, CapabilityGuard};
use crate::exec::command::{OutputCollector, kill_tree, shell_command};
use crate::job::JobResult;
use crate::provision::Environment;
use crate::registry::JobDefinition;
use crate::types::BoxFuture;

/// How long to keep reading output after the command has exited or been
/// killed.
const OUTPUT_GRACE: Duration = Duration::from_secs(2);

/// Runs checks as `sh -c <run>` inside the job workspace.
#[derive(Debug)]
pub struct ShellCheckExecutor {
    capabilities: CapabilitySettings,
    next_display: AtomicU32,
}

enum Finish {
    Exited(ExitStatus),
    WaitFailed(std::io::Error),
    TimedOut,
    Cancelled,
}

impl ShellCheckExecutor {
    pub fn new(capabilities: CapabilitySettings) -> Self {
        let base = capabilities.display_base;
        Self {
            capabilities,
            next_display: AtomicU32::new(base),
        }
    }

    async fn execute_inner(
        &self,
        job: &JobDefinition,
        env: &Environment,
        mut cancel: CancelSignal,
    ) -> JobResult {
        let start = Instant::now();

        let mut guards: Vec<CapabilityGuard> = Vec::new();
        for cap in job.capabilities.iter() {
            let display_number = self.next_display.fetch_add(1, Ordering::Relaxed);
            match capability::start(*cap, &self.capabilities, display_number, env).await {
                Ok(guard) => guards.push(guard),
                Err(message) => {
                    error!(job = %job.name, capability = %cap, error = %message, "capability failed to start");
                    shutdown_all(guards).await;
                    let err = ProvisioningError::new(&job.name, cap.name(), message);
                    return JobResult::provisioning_failed(err, start.elapsed());
                }
            }
        }

        let result = if cancel.is_cancelled() {
            JobResult::cancelled(&job.name, String::new(), start.elapsed())
        } else {
            run_check(job, env, &guards, &mut cancel, start).await
        };

        shutdown_all(guards).await;
        result
    }
}

impl CheckExecutor for ShellCheckExecutor {
    fn execute<'a>(
        &'a self,
        job: &'a JobDefinition,
        env: &'a Environment,
        cancel: CancelSignal,
    ) -> BoxFuture<'a, JobResult> {
        Box::pin(self.execute_inner(job, env, cancel))
    }
}

async fn shutdown_all(guards: Vec<CapabilityGuard>) {
    for guard in guards {
        guard.shutdown().await;
    }
}

async fn run_check(
    job: &JobDefinition,
    env: &Environment,
    guards: &[CapabilityGuard],
    cancel: &mut CancelSignal,
    start: Instant,
) -> JobResult {
    info!(job = %job.name, cmd = %job.run, timeout = ?job.timeout, "starting check");

    let mut cmd = shell_command(&job.run);
    cmd.current_dir(env.path());
    for (key, value) in env.vars().iter().chain(guards.iter().flat_map(|g| g.vars())) {
        cmd.env(key, value);
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            let err = ProvisioningError::new(&job.name, "spawn_check", format!("spawning `{}`: {e}", job.run));
            return JobResult::provisioning_failed(err, start.elapsed());
        }
    };

    let output = OutputCollector::attach(&mut child, &job.name);

    let finish = tokio::select! {
        waited = tokio::time::timeout(job.timeout, child.wait()) => match waited {
            Ok(Ok(status)) => Finish::Exited(status),
            Ok(Err(e)) => Finish::WaitFailed(e),
            Err(_) => Finish::TimedOut,
        },
        _ = cancel.cancelled() => Finish::Cancelled,
    };

    if matches!(finish, Finish::TimedOut | Finish::Cancelled) {
        if let Err(e) = kill_tree(&mut child).await {
            warn!(job = %job.name, error = %e, "failed to kill check process");
        }
    }

    let log = output.finish(OUTPUT_GRACE).await;

    match finish {
        Finish::Exited(status) => {
            let code = status.code().unwrap_or(-1);
            info!(job = %job.name, exit_code = code, success = status.success(), "check process exited");
            JobResult::from_exit(&job.name, code, log, start.elapsed())
        }
        Finish::WaitFailed(e) => {
            error!(job = %job.name, error = %e, "waiting for check process failed");
            JobResult::from_exit(&job.name, -1, format!("{log}\nwait failed: {e}"), start.elapsed())
        }
        Finish::TimedOut => {
            warn!(job = %job.name, timeout = ?job.timeout, "check exceeded its time budget; killed");
            JobResult::timed_out(&job.name, job.timeout, log, start.elapsed())
        }
        Finish::Cancelled => {
            info!(job = %job.name, "check cancelled; process killed");
            JobResult::cancelled(&job.name, log, start.elapsed())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::cancel_pair;
    use crate::job::{FailureCause, JobStatus};
    use crate::registry::RuntimeSpec;
    use crate::types::SideCapability;
    use std::collections::BTreeSet;

    fn job(run: &str, timeout: Duration) -> JobDefinition {
        JobDefinition::new(
            "check",
            RuntimeSpec::new("python", "3.9"),
            &[],
            run,
            BTreeSet::new(),
            timeout,
        )
    }

    fn env() -> (tempfile::TempDir, Environment) {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::at_path("check", dir.path());
        (dir, env)
    }

    fn executor() -> ShellCheckExecutor {
        ShellCheckExecutor::new(CapabilitySettings::default())
    }

    #[tokio::test]
    async fn exit_zero_succeeds_and_captures_output() {
        let (_dir, env) = env();
        let result = executor()
            .execute(&job("echo hello; echo warn 1>&2", Duration::from_secs(10)), &env, CancelSignal::never())
            .await;
        assert_eq!(result.status, JobStatus::Succeeded);
        assert_eq!(result.exit_code, Some(0));
        assert!(result.log.contains("hello"));
        assert!(result.log.contains("warn"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_check_failure() {
        let (_dir, env) = env();
        let result = executor()
            .execute(&job("exit 3", Duration::from_secs(10)), &env, CancelSignal::never())
            .await;
        assert_eq!(result.status, JobStatus::Failed);
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.cause, Some(FailureCause::CheckFailure));
    }

    #[tokio::test]
    async fn runs_inside_the_workspace_with_env_vars() {
        let (dir, env) = env();
        std::fs::write(dir.path().join("LICENSE"), "Copyright (c) 2026 Someone\n").unwrap();
        let env = env.with_var("CHECKRUN_JOB", "check");
        let result = executor()
            .execute(
                &job("grep 'Copyright (c) 2026' LICENSE && test \"$CHECKRUN_JOB\" = check", Duration::from_secs(10)),
                &env,
                CancelSignal::never(),
            )
            .await;
        assert_eq!(result.status, JobStatus::Succeeded, "log: {}", result.log);
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let (_dir, env) = env();
        let result = executor()
            .execute(&job("sleep 5", Duration::from_millis(200)), &env, CancelSignal::never())
            .await;
        assert_eq!(result.status, JobStatus::Failed);
        assert_eq!(result.exit_code, None);
        assert_eq!(result.cause, Some(FailureCause::Timeout { after_ms: 200 }));
        assert!(result.duration_ms < 5000);
    }

    #[tokio::test]
    async fn timeout_kills_background_descendants() {
        let (dir, env) = env();
        let result = executor()
            .execute(
                &job("(sleep 1; touch STILL_RUNNING); true", Duration::from_millis(200)),
                &env,
                CancelSignal::never(),
            )
            .await;
        assert_eq!(result.cause, Some(FailureCause::Timeout { after_ms: 200 }));
        assert!(result.duration_ms < 900, "took {}ms", result.duration_ms);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!dir.path().join("STILL_RUNNING").exists());
    }

    #[tokio::test]
    async fn cancellation_kills_the_command() {
        let (_dir, env) = env();
        let (handle, signal) = cancel_pair();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            handle.cancel();
        });
        let result = executor()
            .execute(&job("sleep 5", Duration::from_secs(30)), &env, signal)
            .await;
        assert_eq!(result.status, JobStatus::Errored);
        assert_eq!(result.cause, Some(FailureCause::Cancelled));
    }

    #[tokio::test]
    async fn display_is_exported_to_the_command() {
        let (_dir, env) = env();
        let settings = CapabilitySettings {
            virtual_display: "sleep 30".to_string(),
            display_base: 42,
            startup_delay: Duration::from_millis(50),
        };
        let mut def = job("test \"$DISPLAY\" = :42", Duration::from_secs(10));
        def.capabilities = BTreeSet::from([SideCapability::VirtualDisplay]);

        let result = ShellCheckExecutor::new(settings)
            .execute(&def, &env, CancelSignal::never())
            .await;
        assert_eq!(result.status, JobStatus::Succeeded, "log: {}", result.log);
    }

    #[tokio::test]
    async fn display_that_dies_errors_the_job() {
        let (_dir, env) = env();
        let settings = CapabilitySettings {
            virtual_display: "exit 1".to_string(),
            display_base: 7,
            startup_delay: Duration::from_millis(100),
        };
        let mut def = job("true", Duration::from_secs(10));
        def.capabilities = BTreeSet::from([SideCapability::VirtualDisplay]);

        let result = ShellCheckExecutor::new(settings)
            .execute(&def, &env, CancelSignal::never())
            .await;
        assert_eq!(result.status, JobStatus::Errored);
        assert!(matches!(
            result.cause,
            Some(FailureCause::Provisioning { ref step, .. }) if step == "virtual_display"
        ));
    }
}
