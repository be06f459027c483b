// src/provision/shell.rs

//! Production provisioner: renders each setup step from a shell template and
//! runs it in a fresh temporary workspace.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, anyhow};
use regex::{Captures, Regex};
use shell_escape::escape;
use tracing::{debug, info, warn};

use crate::config::model::ProvisionSettings;
use crate::errors::ProvisioningError;
use crate::event::Event;
use crate::exec::command::{OutputCollector, kill_tree, shell_command};
use crate::provision::{Environment, Provisioner};
use crate::registry::{JobDefinition, SetupStep};
use crate::types::BoxFuture;

const OUTPUT_GRACE: Duration = Duration::from_secs(2);

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z]+)\}").expect("valid placeholder regex"));

#[derive(Debug, Clone)]
pub struct ShellProvisioner {
    settings: ProvisionSettings,
    repository: String,
    workspace_root: Option<PathBuf>,
}

/// Output of a failed step, carried back to the job's log.
struct StepFailure {
    message: String,
    log: String,
}

impl ShellProvisioner {
    pub fn new(
        settings: ProvisionSettings,
        repository: impl Into<String>,
        workspace_root: Option<PathBuf>,
    ) -> Self {
        Self {
            settings,
            repository: repository.into(),
            workspace_root,
        }
    }

    /// Shell command for `step`, with placeholders filled in.
    ///
    /// Every substituted value is shell-quoted. Unknown placeholders are
    /// left as written.
    pub fn render(&self, step: &SetupStep, job: &JobDefinition, event: &Event) -> String {
        let (template, manifest) = match step {
            SetupStep::Checkout => (&self.settings.checkout, ""),
            SetupStep::InstallRuntime => (&self.settings.install_runtime, ""),
            SetupStep::InstallManifest { path } => {
                (&self.settings.install_manifest, path.as_str())
            }
        };
        PLACEHOLDER
            .replace_all(template, |caps: &Captures<'_>| {
                let value = match &caps[1] {
                    "repo" => self.repository.as_str(),
                    "sha" => event.commit.as_str(),
                    "ref" => event.git_ref.as_str(),
                    "job" => job.name.as_str(),
                    "runtime" => job.runtime.language.as_str(),
                    "version" => job.runtime.version.as_str(),
                    "manifest" => manifest,
                    _ => return caps[0].to_string(),
                };
                escape(Cow::Borrowed(value)).into_owned()
            })
            .into_owned()
    }

    async fn provision_inner(
        &self,
        job: &JobDefinition,
        event: &Event,
    ) -> Result<Environment, ProvisioningError> {
        let workspace = self
            .create_workspace(&job.name)
            .map_err(|e| ProvisioningError::new(&job.name, "workspace", format!("{e:#}")))?;
        let env = Environment::new(&job.name, workspace);
        debug!(job = %job.name, path = %env.path().display(), "workspace created");

        for step in job.steps.iter() {
            let cmd = self.render(step, job, event);
            info!(job = %job.name, step = %step, "running setup step");

            // Returning early drops `env`, which removes the workspace.
            if let Err(failure) = run_step(&cmd, env.path(), self.settings.step_timeout).await {
                warn!(job = %job.name, step = %step, error = %failure.message, "setup step failed");
                return Err(
                    ProvisioningError::new(&job.name, step.name(), failure.message)
                        .with_log(failure.log),
                );
            }
        }

        let env = env
            .with_var("CI", "true")
            .with_var("CHECKRUN_JOB", job.name.clone());
        Ok(self.with_bin_dirs(env))
    }

    fn create_workspace(&self, job: &str) -> anyhow::Result<tempfile::TempDir> {
        let prefix = format!("checkrun-{job}-");
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        match &self.workspace_root {
            Some(root) => {
                std::fs::create_dir_all(root)
                    .with_context(|| format!("creating workspace root {}", root.display()))?;
                builder
                    .tempdir_in(root)
                    .with_context(|| format!("creating workspace under {}", root.display()))
            }
            None => builder.tempdir().context("creating workspace in temp dir"),
        }
    }

    /// Prepend the workspace's bin dirs (e.g. the venv) to `PATH`.
    fn with_bin_dirs(&self, env: Environment) -> Environment {
        if self.settings.bin_dirs.is_empty() {
            return env;
        }
        let mut paths: Vec<PathBuf> = self
            .settings
            .bin_dirs
            .iter()
            .map(|dir| env.path().join(dir))
            .collect();
        if let Some(current) = std::env::var_os("PATH") {
            paths.extend(std::env::split_paths(&current));
        }
        match std::env::join_paths(paths) {
            Ok(joined) => {
                let joined = joined.to_string_lossy().into_owned();
                env.with_var("PATH", joined)
            }
            Err(e) => {
                warn!(job = %env.job(), error = %e, "could not extend PATH with bin dirs");
                env
            }
        }
    }
}

impl Provisioner for ShellProvisioner {
    fn provision<'a>(
        &'a self,
        job: &'a JobDefinition,
        event: &'a Event,
    ) -> BoxFuture<'a, Result<Environment, ProvisioningError>> {
        Box::pin(self.provision_inner(job, event))
    }
}

async fn run_step(cmd: &str, cwd: &Path, budget: Duration) -> Result<String, StepFailure> {
    let mut command = shell_command(cmd);
    command.current_dir(cwd);

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning `{cmd}`"))
        .map_err(|e| StepFailure {
            message: format!("{e:#}"),
            log: String::new(),
        })?;

    let output = OutputCollector::attach(&mut child, "setup");
    let waited = tokio::time::timeout(budget, child.wait()).await;
    if waited.is_err() {
        if let Err(e) = kill_tree(&mut child).await {
            debug!(error = %e, "failed to kill timed-out setup step");
        }
    }
    let log = output.finish(OUTPUT_GRACE).await;

    let outcome: anyhow::Result<()> = match waited {
        Ok(Ok(status)) if status.success() => Ok(()),
        Ok(Ok(status)) => Err(anyhow!("`{cmd}` exited with {status}")),
        Ok(Err(e)) => Err(e).with_context(|| format!("waiting for `{cmd}`")),
        Err(_) => Err(anyhow!("`{cmd}` did not finish within {budget:?}")),
    };

    match outcome {
        Ok(()) => Ok(log),
        Err(e) => Err(StepFailure {
            message: format!("{e:#}"),
            log,
        }),
    }
}
