// src/report.rs

//! Reporting surface: per-job detail plus the run verdict, as a text table
//! or as JSON.

use std::fmt::Write as _;

use serde::Serialize;

use crate::engine::{Run, RunId, RunStatus};
use crate::errors::Result;
use crate::event::Event;
use crate::job::{JobResult, JobStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub succeeded: usize,
    pub failed: usize,
    pub errored: usize,
    /// Jobs that never reported (stalled run).
    pub missing: usize,
}

/// Final report of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub event: Event,
    pub status: RunStatus,
    pub registry_digest: String,
    /// Job results in registry order.
    pub jobs: Vec<JobResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
    pub summary: Summary,
}

impl RunReport {
    pub fn from_run(run: &Run) -> Self {
        let registry = run.registry();
        let mut jobs: Vec<JobResult> = run.results().to_vec();
        jobs.sort_by_key(|r| registry.position(&r.job).unwrap_or(usize::MAX));

        let missing: Vec<String> = run.missing_jobs().into_iter().map(str::to_string).collect();

        let mut summary = Summary {
            missing: missing.len(),
            ..Summary::default()
        };
        for job in jobs.iter() {
            match job.status {
                JobStatus::Succeeded => summary.succeeded += 1,
                JobStatus::Failed => summary.failed += 1,
                JobStatus::Errored => summary.errored += 1,
                _ => {}
            }
        }

        Self {
            run_id: run.id(),
            event: run.event().clone(),
            status: run.status(),
            registry_digest: registry.digest().to_string(),
            jobs,
            missing,
            summary,
        }
    }

    /// Process exit code: 0 iff the run succeeded.
    pub fn exit_code(&self) -> i32 {
        if self.status.is_success() { 0 } else { 1 }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Human-readable report. Logs of jobs that did not succeed are shown,
    /// trimmed to their last `log_tail` lines.
    pub fn render_text(&self, log_tail: usize) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "run {} for {}", self.run_id, self.event);
        let _ = writeln!(out);

        let width = self
            .jobs
            .iter()
            .map(|j| j.job.len())
            .chain(self.missing.iter().map(String::len))
            .max()
            .unwrap_or(0)
            .max("JOB".len());

        let _ = writeln!(out, "{:<width$}  {:<9}  {:>4}  {:>9}  DETAIL", "JOB", "STATUS", "EXIT", "DURATION");
        for job in self.jobs.iter() {
            let exit = job
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string());
            let detail = job.cause.as_ref().map(|c| c.to_string()).unwrap_or_default();
            let _ = writeln!(
                out,
                "{:<width$}  {:<9}  {:>4}  {:>9}  {}",
                job.job,
                job.status.as_str(),
                exit,
                format_duration(job.duration_ms),
                detail
            );
        }
        for name in self.missing.iter() {
            let _ = writeln!(out, "{:<width$}  {:<9}  {:>4}  {:>9}  never reported", name, "missing", "-", "-");
        }

        for job in self.jobs.iter().filter(|j| !j.passed() && !j.log.is_empty()) {
            let _ = writeln!(out);
            let _ = writeln!(out, "--- {} ({}) ---", job.job, job.status);
            for line in tail(&job.log, log_tail) {
                let _ = writeln!(out, "{line}");
            }
        }

        let _ = writeln!(out);
        let s = &self.summary;
        let _ = writeln!(
            out,
            "{} succeeded, {} failed, {} errored{}",
            s.succeeded,
            s.failed,
            s.errored,
            if s.missing > 0 { format!(", {} missing", s.missing) } else { String::new() }
        );
        let verdict = match self.status {
            RunStatus::Success => "SUCCESS",
            RunStatus::Stalled => "FAILURE (stalled)",
            _ => "FAILURE",
        };
        let _ = writeln!(out, "result: {verdict}");
        out
    }
}

fn tail(log: &str, n: usize) -> impl Iterator<Item = &str> {
    let lines: Vec<&str> = log.lines().collect();
    let skip = lines.len().saturating_sub(n);
    lines.into_iter().skip(skip)
}

fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{}m{:02}s", ms / 60_000, (ms % 60_000) / 1000)
    }
}
