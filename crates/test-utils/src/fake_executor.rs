use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use checkrun::cancel::CancelSignal;
use checkrun::exec::CheckExecutor;
use checkrun::job::JobResult;
use checkrun::provision::Environment;
use checkrun::registry::JobDefinition;
use checkrun::types::BoxFuture;

/// What the scripted executor does for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Exit 0.
    Succeed,
    /// Exit with the given nonzero code.
    Fail(i32),
    /// Never finish; reported as a timeout once the job's budget elapses.
    Hang,
    /// Block until the run is cancelled.
    WaitForCancel,
}

/// A fake executor that:
/// - records which jobs were executed, and in which workspace
/// - returns a scripted result per job (default: success) without spawning
///   anything.
#[derive(Default)]
pub struct ScriptedExecutor {
    scripts: HashMap<String, Script>,
    delay: Duration,
    executed: Arc<Mutex<Vec<String>>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, job: &str, script: Script) -> Self {
        self.scripts.insert(job.to_string(), script);
        self
    }

    /// Pause before completing every job.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn executed_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.executed)
    }

    pub fn executed(&self) -> Vec<String> {
        let mut names = self.executed.lock().unwrap().clone();
        names.sort();
        names
    }
}

impl CheckExecutor for ScriptedExecutor {
    fn execute<'a>(
        &'a self,
        job: &'a JobDefinition,
        env: &'a Environment,
        mut cancel: CancelSignal,
    ) -> BoxFuture<'a, JobResult> {
        Box::pin(async move {
            self.executed.lock().unwrap().push(job.name.clone());
            assert!(env.path().exists(), "workspace of '{}' missing during execution", job.name);

            let script = self.scripts.get(&job.name).copied().unwrap_or(Script::Succeed);
            let log = format!("{} ran in {}", job.name, env.path().display());

            let work = async {
                tokio::time::sleep(self.delay).await;
                match script {
                    Script::Succeed => JobResult::from_exit(&job.name, 0, log.clone(), self.delay),
                    Script::Fail(code) => JobResult::from_exit(&job.name, code, log.clone(), self.delay),
                    Script::Hang => {
                        tokio::time::sleep(job.timeout).await;
                        JobResult::timed_out(&job.name, job.timeout, log.clone(), job.timeout)
                    }
                    Script::WaitForCancel => std::future::pending().await,
                }
            };

            tokio::select! {
                result = work => result,
                _ = cancel.cancelled() => JobResult::cancelled(&job.name, log.clone(), Duration::ZERO),
            }
        })
    }
}
