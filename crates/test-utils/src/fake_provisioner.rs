use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use checkrun::errors::ProvisioningError;
use checkrun::event::Event;
use checkrun::provision::{Environment, Provisioner};
use checkrun::registry::JobDefinition;
use checkrun::types::BoxFuture;

/// A fake provisioner that:
/// - creates a real temporary workspace per job (so release can be checked)
/// - fails a chosen step of a chosen job
/// - records every workspace it handed out.
#[derive(Default)]
pub struct FakeProvisioner {
    faults: HashMap<String, String>,
    delay: Duration,
    workspaces: Arc<Mutex<Vec<(String, PathBuf)>>>,
    commits: Arc<Mutex<Vec<String>>>,
}

impl FakeProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `step` (`checkout`, `install_runtime`, `install_manifest`) fail
    /// for `job`.
    pub fn fail(mut self, job: &str, step: &str) -> Self {
        self.faults.insert(job.to_string(), step.to_string());
        self
    }

    /// Pause this long in every step.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// `(job, workspace path)` for every environment handed out.
    pub fn workspaces(&self) -> Vec<(String, PathBuf)> {
        self.workspaces.lock().unwrap().clone()
    }

    pub fn workspaces_handle(&self) -> Arc<Mutex<Vec<(String, PathBuf)>>> {
        Arc::clone(&self.workspaces)
    }

    /// Commits checked out, one entry per job.
    pub fn commits(&self) -> Vec<String> {
        self.commits.lock().unwrap().clone()
    }
}

impl Provisioner for FakeProvisioner {
    fn provision<'a>(
        &'a self,
        job: &'a JobDefinition,
        event: &'a Event,
    ) -> BoxFuture<'a, Result<Environment, ProvisioningError>> {
        Box::pin(async move {
            let dir = tempfile::Builder::new()
                .prefix(&format!("fake-{}-", job.name))
                .tempdir()
                .map_err(|e| ProvisioningError::new(&job.name, "workspace", e.to_string()))?;
            self.workspaces
                .lock()
                .unwrap()
                .push((job.name.clone(), dir.path().to_path_buf()));
            let env = Environment::new(&job.name, dir);

            for step in job.steps.iter() {
                tokio::time::sleep(self.delay).await;
                if self.faults.get(&job.name).map(String::as_str) == Some(step.name()) {
                    return Err(ProvisioningError::new(&job.name, step.name(), "injected failure")
                        .with_log(format!("{step}: injected failure")));
                }
            }

            self.commits.lock().unwrap().push(event.commit.clone());
            Ok(env.with_var("CHECKRUN_JOB", job.name.clone()))
        })
    }
}
