// src/registry/definition.rs

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::types::SideCapability;

/// Runtime a job needs, e.g. python 3.9.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RuntimeSpec {
    pub language: String,
    pub version: String,
}

impl RuntimeSpec {
    pub fn new(language: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for RuntimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.language, self.version)
    }
}

/// One typed provisioning step. Failures are attributed to the step that
/// raised them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum SetupStep {
    /// Check out the event's commit into the job workspace.
    Checkout,
    /// Install the job's pinned runtime.
    InstallRuntime,
    /// Install one dependency manifest.
    InstallManifest { path: String },
}

impl SetupStep {
    pub fn name(&self) -> &'static str {
        match self {
            SetupStep::Checkout => "checkout",
            SetupStep::InstallRuntime => "install_runtime",
            SetupStep::InstallManifest { .. } => "install_manifest",
        }
    }
}

impl fmt::Display for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupStep::InstallManifest { path } => write!(f, "install_manifest({path})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Immutable description of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobDefinition {
    pub name: String,
    pub runtime: RuntimeSpec,
    /// Always `Checkout`, `InstallRuntime`, then manifests in declared order.
    pub steps: Vec<SetupStep>,
    pub run: String,
    pub capabilities: BTreeSet<SideCapability>,
    #[serde(rename = "timeout_ms", serialize_with = "serialize_millis")]
    pub timeout: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl JobDefinition {
    pub fn new(
        name: impl Into<String>,
        runtime: RuntimeSpec,
        manifests: &[String],
        run: impl Into<String>,
        capabilities: BTreeSet<SideCapability>,
        timeout: Duration,
    ) -> Self {
        let mut steps = vec![SetupStep::Checkout, SetupStep::InstallRuntime];
        steps.extend(
            manifests
                .iter()
                .map(|path| SetupStep::InstallManifest { path: path.clone() }),
        );

        Self {
            name: name.into(),
            runtime,
            steps,
            run: run.into(),
            capabilities,
            timeout,
        }
    }

    pub fn requires(&self, capability: SideCapability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn manifests(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|step| match step {
            SetupStep::InstallManifest { path } => Some(path.as_str()),
            _ => None,
        })
    }
}
