// src/registry/mod.rs

//! The Job Definition Set.
//!
//! - [`definition`] holds the immutable [`JobDefinition`] value type and its
//!   typed setup steps.
//! - [`matrix`] expands runtime-version matrices into concrete definitions.
//!
//! A [`JobRegistry`] is built once (from config or directly from
//! definitions) and shared read-only by every run through an `Arc`.

pub mod definition;
pub mod matrix;

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::model::ConfigFile;
use crate::errors::{CheckrunError, Result};

pub use definition::{JobDefinition, RuntimeSpec, SetupStep};

/// Immutable, ordered set of job definitions.
#[derive(Debug, Clone)]
pub struct JobRegistry {
    jobs: Vec<Arc<JobDefinition>>,
    digest: String,
}

impl JobRegistry {
    /// Build the registry from validated config, expanding matrices.
    ///
    /// Job order follows the config's (sorted) job names, then the declared
    /// version order within a matrix.
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let jobs = cfg
            .jobs
            .iter()
            .flat_map(|(name, spec)| matrix::expand(name, spec))
            .map(Arc::new)
            .collect();
        Self::from_arcs(jobs)
    }

    /// Build a registry from explicit definitions, rejecting duplicate names.
    pub fn from_definitions(defs: Vec<JobDefinition>) -> Result<Self> {
        if defs.is_empty() {
            return Err(CheckrunError::ConfigError(
                "job registry must contain at least one job".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for def in defs.iter() {
            if !seen.insert(def.name.as_str()) {
                return Err(CheckrunError::ConfigError(format!(
                    "duplicate job name '{}' in registry",
                    def.name
                )));
            }
        }
        Ok(Self::from_arcs(defs.into_iter().map(Arc::new).collect()))
    }

    fn from_arcs(jobs: Vec<Arc<JobDefinition>>) -> Self {
        let digest = compute_digest(&jobs);
        Self { jobs, digest }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<JobDefinition>> {
        self.jobs.iter()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<JobDefinition>> {
        self.jobs.iter().find(|j| j.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.jobs.iter().map(|j| j.name.as_str())
    }

    /// Position of a job in registry order (used to order reports).
    pub fn position(&self, name: &str) -> Option<usize> {
        self.jobs.iter().position(|j| j.name == name)
    }

    /// Hex blake3 fingerprint of the expanded definitions.
    ///
    /// Two registries with equal digests describe identical job sets, so
    /// runs of the same commit against them are comparable.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

fn compute_digest(jobs: &[Arc<JobDefinition>]) -> String {
    let mut hasher = blake3::Hasher::new();
    for job in jobs {
        for part in [
            job.name.as_str(),
            job.runtime.language.as_str(),
            job.runtime.version.as_str(),
            job.run.as_str(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update(b"\0");
        }
        for step in job.steps.iter() {
            hasher.update(step.to_string().as_bytes());
            hasher.update(b"\0");
        }
        for cap in job.capabilities.iter() {
            hasher.update(cap.name().as_bytes());
            hasher.update(b"\0");
        }
        hasher.update(&(job.timeout.as_millis() as u64).to_le_bytes());
        hasher.update(b"\x1e");
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::builtin_config;
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn def(name: &str, run: &str) -> JobDefinition {
        JobDefinition::new(
            name,
            RuntimeSpec::new("python", "3.9"),
            &[],
            run,
            BTreeSet::new(),
            Duration::from_secs(30),
        )
    }

    #[test]
    fn builtin_registry_expands_matrix() {
        let registry = JobRegistry::from_config(&builtin_config().unwrap());
        let names: Vec<_> = registry.names().collect();
        assert_eq!(
            names,
            vec!["black", "license-year", "mypy-3.8", "mypy-3.9", "pyflakes", "pytest"]
        );
        assert_eq!(registry.position("mypy-3.9"), Some(3));
        assert!(registry.get("mypy").is_none());
    }

    #[test]
    fn rejects_duplicate_names() {
        let result = JobRegistry::from_definitions(vec![def("a", "true"), def("a", "false")]);
        assert!(matches!(result, Err(CheckrunError::ConfigError(_))));
    }

    #[test]
    fn digest_tracks_definition_changes() {
        let a = JobRegistry::from_definitions(vec![def("a", "true"), def("b", "true")]).unwrap();
        let same = JobRegistry::from_definitions(vec![def("a", "true"), def("b", "true")]).unwrap();
        let changed =
            JobRegistry::from_definitions(vec![def("a", "true"), def("b", "false")]).unwrap();

        assert_eq!(a.digest(), same.digest());
        assert_ne!(a.digest(), changed.digest());
        assert_eq!(a.digest().len(), 64);
    }
}
