// src/registry/matrix.rs

//! Matrix expansion: one concrete [`JobDefinition`] per runtime version,
//! generated when the registry is built.

use crate::config::model::JobSpec;
use crate::registry::definition::{JobDefinition, RuntimeSpec};

/// Name of the concrete job for `base` at `version`.
///
/// Matrix jobs get a `-<version>` suffix; single-version jobs keep their
/// name unchanged.
pub fn expanded_name(base: &str, version: &str, matrix: bool) -> String {
    if matrix {
        format!("{base}-{version}")
    } else {
        base.to_string()
    }
}

/// Expand a validated job entry into concrete definitions, in version order.
pub fn expand(name: &str, spec: &JobSpec) -> Vec<JobDefinition> {
    spec.versions
        .iter()
        .map(|version| {
            JobDefinition::new(
                expanded_name(name, version, spec.matrix),
                RuntimeSpec::new(spec.runtime.clone(), version.clone()),
                &spec.manifests,
                spec.run.clone(),
                spec.capabilities.clone(),
                spec.timeout,
            )
        })
        .collect()
}
