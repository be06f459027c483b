// src/exec/capability.rs

//! Side-capabilities started around a job's run command.

use std::process::Stdio;

use tokio::process::Child;
use tracing::{debug, info, warn};

use crate::config::model::CapabilitySettings;
use crate::exec::command::{kill_tree, shell_command};
use crate::provision::Environment;
use crate::types::SideCapability;

/// A running side-capability. Torn down with [`CapabilityGuard::shutdown`],
/// or killed when dropped.
#[derive(Debug)]
pub struct CapabilityGuard {
    capability: SideCapability,
    child: Child,
    vars: Vec<(String, String)>,
}

impl CapabilityGuard {
    pub fn capability(&self) -> SideCapability {
        self.capability
    }

    /// Environment variables the run command needs to use the capability.
    pub fn vars(&self) -> &[(String, String)] {
        &self.vars
    }

    pub async fn shutdown(mut self) {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(capability = %self.capability, ?status, "capability already exited");
            }
            _ => {
                if let Err(e) = kill_tree(&mut self.child).await {
                    warn!(capability = %self.capability, error = %e, "failed to stop capability");
                }
            }
        }
    }
}

/// Start `capability` for the job owning `env`.
///
/// The virtual display is considered up when its process is still alive
/// after the configured startup delay.
pub async fn start(
    capability: SideCapability,
    settings: &CapabilitySettings,
    display_number: u32,
    env: &Environment,
) -> Result<CapabilityGuard, String> {
    match capability {
        SideCapability::VirtualDisplay => {
            let cmd = settings
                .virtual_display
                .replace("{display}", &display_number.to_string());

            // `exec` so that killing the shell's pid stops the server itself.
            let mut command = shell_command(&format!("exec {cmd}"));
            command
                .current_dir(env.path())
                .stdout(Stdio::null())
                .stderr(Stdio::null());

            let mut child = command
                .spawn()
                .map_err(|e| format!("spawning `{cmd}`: {e}"))?;

            tokio::time::sleep(settings.startup_delay).await;

            match child.try_wait() {
                Ok(None) => {
                    info!(job = %env.job(), display = display_number, "virtual display started");
                    Ok(CapabilityGuard {
                        capability,
                        child,
                        vars: vec![("DISPLAY".to_string(), format!(":{display_number}"))],
                    })
                }
                Ok(Some(status)) => Err(format!("`{cmd}` exited during startup ({status})")),
                Err(e) => Err(format!("checking `{cmd}`: {e}")),
            }
        }
    }
}
