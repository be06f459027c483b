// src/provision/environment.rs

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

/// An isolated execution environment for one job.
///
/// Owns the job's workspace directory. The directory is removed by
/// [`Environment::release`], or when the value is dropped on any other exit
/// path (error, cancellation, panic unwinding).
#[derive(Debug)]
pub struct Environment {
    job: String,
    workspace: Option<TempDir>,
    path: PathBuf,
    vars: Vec<(String, String)>,
}

impl Environment {
    /// Environment backed by a temporary workspace it owns.
    pub fn new(job: impl Into<String>, workspace: TempDir) -> Self {
        let path = workspace.path().to_path_buf();
        Self {
            job: job.into(),
            workspace: Some(workspace),
            path,
            vars: Vec::new(),
        }
    }

    /// Environment over an existing directory that it does not own.
    pub fn at_path(job: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self {
            job: job.into(),
            workspace: None,
            path: path.as_ref().to_path_buf(),
            vars: Vec::new(),
        }
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.vars.retain(|(k, _)| *k != key);
        self.vars.push((key, value.into()));
        self
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Variables exported to every command run in this environment.
    pub fn vars(&self) -> &[(String, String)] {
        &self.vars
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Tear the workspace down, reporting removal errors.
    pub fn release(mut self) -> io::Result<()> {
        match self.workspace.take() {
            Some(dir) => {
                debug!(job = %self.job, path = %self.path.display(), "releasing workspace");
                dir.close()
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_removes_owned_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();
        let env = Environment::new("black", dir);
        assert!(path.exists());
        env.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn drop_also_removes_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();
        drop(Environment::new("black", dir));
        assert!(!path.exists());
    }

    #[test]
    fn borrowed_path_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::at_path("black", dir.path());
        env.release().unwrap();
        assert!(dir.path().exists());
    }

    #[test]
    fn with_var_replaces_existing_key() {
        let env = Environment::at_path("x", "/tmp")
            .with_var("CI", "false")
            .with_var("CI", "true");
        assert_eq!(env.vars().len(), 1);
        assert_eq!(env.var("CI"), Some("true"));
    }
}
