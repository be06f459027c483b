// src/trigger.rs

//! Trigger Listener: decides which repository events start a run.

use std::sync::Arc;

use anyhow::Context;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::{debug, info};

use crate::config::model::ConfigFile;
use crate::engine::{Run, RunId};
use crate::errors::Result;
use crate::event::{Event, EventKind};
use crate::registry::JobRegistry;

/// Admits pushes to tracked branches and every pull request.
#[derive(Debug)]
pub struct TriggerListener {
    tracked: GlobSet,
    patterns: Vec<String>,
    registry: Arc<JobRegistry>,
    next_run_id: u64,
}

impl TriggerListener {
    /// `patterns` are globs over branch names; `*` does not cross `/`.
    pub fn new(patterns: &[String], registry: Arc<JobRegistry>) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .with_context(|| format!("invalid tracked branch pattern: {pattern}"))?;
            builder.add(glob);
        }
        let tracked = builder
            .build()
            .context("building tracked branch patterns")?;

        Ok(Self {
            tracked,
            patterns: patterns.to_vec(),
            registry,
            next_run_id: 1,
        })
    }

    pub fn from_config(cfg: &ConfigFile, registry: Arc<JobRegistry>) -> Result<Self> {
        Self::new(&cfg.settings.tracked_branches, registry)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn accepts(&self, event: &Event) -> bool {
        match event.kind {
            EventKind::Push => self.tracked.is_match(&event.git_ref),
            EventKind::PullRequest => true,
        }
    }

    /// Start a run for `event`, or `None` if it is not a trigger. Rejection
    /// is not an error.
    pub fn admit(&mut self, event: Event) -> Option<Run> {
        if !self.accepts(&event) {
            info!(event = %event, tracked = ?self.patterns, "event not admitted; branch is not tracked");
            return None;
        }

        let id = RunId(self.next_run_id);
        self.next_run_id += 1;
        debug!(run_id = %id, jobs = self.registry.len(), "instantiating run");
        info!(run_id = %id, event = %event, "event admitted");
        Some(Run::new(id, event, Arc::clone(&self.registry)))
    }
}
