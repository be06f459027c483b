use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Boxed future returned by the pluggable backends
/// ([`crate::provision::Provisioner`], [`crate::exec::CheckExecutor`]).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What to do with an in-flight run when a newer event arrives for the same
/// branch or pull request.
///
/// - `Independent`: let both runs complete (default).
/// - `Cancel`: cancel the older run's unfinished jobs; they are reported as
///   `errored` with a `Cancelled` cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SupersedeBehaviour {
    #[default]
    Independent,
    Cancel,
}

impl FromStr for SupersedeBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "independent" => Ok(SupersedeBehaviour::Independent),
            "cancel" => Ok(SupersedeBehaviour::Cancel),
            other => Err(format!(
                "invalid superseded_runs: {other} (expected \"independent\" or \"cancel\")"
            )),
        }
    }
}

/// Auxiliary facility a job's command needs while it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideCapability {
    /// An emulated X display (Xvfb) exported through `DISPLAY`.
    VirtualDisplay,
}

impl SideCapability {
    pub fn name(&self) -> &'static str {
        match self {
            SideCapability::VirtualDisplay => "virtual_display",
        }
    }
}

impl fmt::Display for SideCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse a duration string like `"500ms"`, `"30s"`, `"10m"` or `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let seconds = |factor: u64| {
        value
            .checked_mul(factor)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration '{s}' is too large"))
    };
    let duration = match unit.as_str() {
        "ms" => Duration::from_millis(value),
        "s" => Duration::from_secs(value),
        "m" => seconds(60)?,
        "h" => seconds(60 * 60)?,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    if duration.is_zero() {
        return Err(format!("duration '{s}' must be greater than zero"));
    }
    Ok(duration)
}
