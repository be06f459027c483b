// src/event.rs

//! Repository events that may start a run.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{CheckrunError, Result};

static COMMIT_SHA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{7,40}$").expect("valid commit sha regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Push,
    PullRequest,
}

/// A push or pull-request notification. Immutable once received.
///
/// JSON form (as accepted by `--event-file`):
///
/// ```json
/// { "kind": "pull_request", "ref": "fix-nick-colors", "commit": "9f2c1e0", "pr_number": 131 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    /// Pushed branch, or the source branch of a pull request.
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub commit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<u64>,
}

impl Event {
    pub fn push(branch: impl Into<String>, commit: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Push,
            git_ref: branch.into(),
            commit: commit.into(),
            pr_number: None,
        }
    }

    pub fn pull_request(
        source_branch: impl Into<String>,
        commit: impl Into<String>,
        pr_number: Option<u64>,
    ) -> Self {
        Self {
            kind: EventKind::PullRequest,
            git_ref: source_branch.into(),
            commit: commit.into(),
            pr_number,
        }
    }

    /// Load an event from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let event: Event = serde_json::from_str(&contents)?;
        event.validate().map_err(|e| {
            CheckrunError::ConfigError(format!("event file {:?}: {e}", path.as_ref()))
        })?;
        Ok(event)
    }

    /// Reject events whose commit is not an abbreviated or full hex SHA.
    pub fn validate(&self) -> Result<()> {
        if !COMMIT_SHA.is_match(&self.commit) {
            return Err(CheckrunError::ConfigError(format!(
                "commit {:?} is not a hex sha (7 to 40 characters)",
                self.commit
            )));
        }
        Ok(())
    }

    /// Key shared by events that supersede each other: the same pushed
    /// branch, or the same pull request.
    pub fn supersede_key(&self) -> String {
        match (self.kind, self.pr_number) {
            (EventKind::Push, _) => format!("push:{}", self.git_ref),
            (EventKind::PullRequest, Some(number)) => format!("pr:#{number}"),
            (EventKind::PullRequest, None) => format!("pr:{}", self.git_ref),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.commit.get(..7).unwrap_or(&self.commit);
        match (self.kind, self.pr_number) {
            (EventKind::Push, _) => write!(f, "push to {} @ {}", self.git_ref, short),
            (EventKind::PullRequest, Some(n)) => {
                write!(f, "pull request #{} ({}) @ {}", n, self.git_ref, short)
            }
            (EventKind::PullRequest, None) => {
                write!(f, "pull request ({}) @ {}", self.git_ref, short)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn supersede_keys() {
        assert_eq!(Event::push("master", "a").supersede_key(), "push:master");
        assert_eq!(
            Event::pull_request("feature", "a", Some(7)).supersede_key(),
            "pr:#7"
        );
        assert_eq!(
            Event::pull_request("feature", "a", None).supersede_key(),
            "pr:feature"
        );
        assert_ne!(
            Event::push("feature", "a").supersede_key(),
            Event::pull_request("feature", "a", None).supersede_key()
        );
    }

    #[test]
    fn loads_event_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "kind": "pull_request", "ref": "fix-colors", "commit": "9f2c1e0aa", "pr_number": 131 }}"#
        )
        .unwrap();

        let event = Event::from_json_file(file.path()).unwrap();
        assert_eq!(event, Event::pull_request("fix-colors", "9f2c1e0aa", Some(131)));
        assert_eq!(event.to_string(), "pull request #131 (fix-colors) @ 9f2c1e0");
    }

    #[test]
    fn rejects_empty_commit() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "kind": "push", "ref": "master", "commit": "" }}"#).unwrap();
        assert!(matches!(
            Event::from_json_file(file.path()),
            Err(CheckrunError::ConfigError(_))
        ));
    }

    #[test]
    fn commit_must_be_a_hex_sha() {
        assert!(Event::push("master", "9f2c1e0").validate().is_ok());
        assert!(Event::push("master", "9F2C1E0AB44D6E8C0F1A2B3C4D5E6F7081929394").validate().is_ok());
        assert!(Event::push("master", "abc123").validate().is_err());
        assert!(Event::push("master", "abc1234; touch PWNED").validate().is_err());
        assert!(Event::push("master", "$(id)abcdef").validate().is_err());
        assert!(Event::push("master", "g".repeat(40)).validate().is_err());
    }

    #[test]
    fn event_file_with_shell_in_commit_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "kind": "push", "ref": "master", "commit": "abc1234`id`" }}"#).unwrap();
        assert!(matches!(
            Event::from_json_file(file.path()),
            Err(CheckrunError::ConfigError(msg)) if msg.contains("hex sha")
        ));
    }
}
