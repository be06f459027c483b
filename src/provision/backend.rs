// src/provision/backend.rs

use crate::errors::ProvisioningError;
use crate::event::Event;
use crate::provision::Environment;
use crate::registry::JobDefinition;
use crate::types::BoxFuture;

/// Acquires an isolated environment for a job.
///
/// Implementations run the job's setup steps in order and stop at the first
/// failing one, returning a `ProvisioningError` that names it. Anything
/// acquired before the failure must be released before returning.
pub trait Provisioner: Send + Sync {
    fn provision<'a>(
        &'a self,
        job: &'a JobDefinition,
        event: &'a Event,
    ) -> BoxFuture<'a, Result<Environment, ProvisioningError>>;
}
