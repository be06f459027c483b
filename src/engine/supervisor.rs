// src/engine/supervisor.rs

use std::collections::HashMap;

use tracing::info;

use crate::cancel::{CancelHandle, CancelSignal, cancel_pair};
use crate::event::Event;
use crate::types::SupersedeBehaviour;

use super::run::RunId;

/// Tracks in-flight runs and applies the superseded-run policy.
///
/// Runs are grouped by their event's supersede key (branch or pull
/// request). Under [`SupersedeBehaviour::Cancel`], registering a new run
/// cancels every in-flight run with the same key.
#[derive(Debug)]
pub struct Supervisor {
    behaviour: SupersedeBehaviour,
    active: HashMap<String, Vec<(RunId, CancelHandle)>>,
}

impl Supervisor {
    pub fn new(behaviour: SupersedeBehaviour) -> Self {
        Self {
            behaviour,
            active: HashMap::new(),
        }
    }

    pub fn behaviour(&self) -> SupersedeBehaviour {
        self.behaviour
    }

    /// Register a run about to start and return its cancellation signal.
    pub fn register(&mut self, event: &Event, run_id: RunId) -> CancelSignal {
        let key = event.supersede_key();
        let entries = self.active.entry(key.clone()).or_default();

        if self.behaviour == SupersedeBehaviour::Cancel {
            for (old, handle) in entries.drain(..) {
                info!(run_id = %old, superseded_by = %run_id, key = %key, "cancelling superseded run");
                handle.cancel();
            }
        }

        let (handle, signal) = cancel_pair();
        entries.push((run_id, handle));
        signal
    }

    /// Forget a run that has finished.
    pub fn finish(&mut self, event: &Event, run_id: RunId) {
        let key = event.supersede_key();
        if let Some(entries) = self.active.get_mut(&key) {
            entries.retain(|(id, _)| *id != run_id);
            if entries.is_empty() {
                self.active.remove(&key);
            }
        }
    }

    /// Cancel every in-flight run (e.g. on Ctrl-C).
    pub fn cancel_all(&mut self) {
        for (run_id, handle) in self.active.values().flatten() {
            info!(run_id = %run_id, "cancelling run");
            handle.cancel();
        }
    }

    pub fn active_runs(&self) -> usize {
        self.active.values().map(Vec::len).sum()
    }
}
