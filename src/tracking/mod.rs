pub mod memory;
pub mod sqlite;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

pub use memory::MemoryTracker;
pub use sqlite::SqliteTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

impl FromStr for RunStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RUNNING" => Ok(RunStatus::Running),
            "FINISHED" => Ok(RunStatus::Finished),
            "FAILED" => Ok(RunStatus::Failed),
            other => Err(Error::Tracking(format!("unknown run status {}", other))),
        }
    }
}

/// A tracking run as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub name: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub metrics: BTreeMap<String, f64>,
}

impl RunRecord {
    fn start(name: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            status: RunStatus::Running,
            started_at: Utc::now(),
            ended_at: None,
            metrics: BTreeMap::new(),
        }
    }
}

/// Experiment tracking. At most one run is active at a time.
pub trait Tracker: Send {
    /// Starts a run and returns its id. Fails if a run is already active.
    fn start_run(&mut self, name: &str) -> Result<String>;

    fn active_run(&self) -> Option<&str>;

    /// Records a metric on the active run. A repeated key overwrites the value.
    fn log_metric(&mut self, key: &str, value: f64) -> Result<()>;

    fn end_run(&mut self, status: RunStatus) -> Result<()>;

    /// Stored runs, most recent first.
    fn list_runs(&self) -> Result<Vec<RunRecord>>;
}

fn no_active_run(action: &str) -> Error {
    tracing::error!("Cannot {} without an active tracking run", action);
    Error::Tracking(format!("cannot {} without an active run", action))
}

fn already_active(id: &str) -> Error {
    Error::Tracking(format!("run {} is still active", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [RunStatus::Running, RunStatus::Finished, RunStatus::Failed] {
            assert_eq!(status.to_string().parse::<RunStatus>().unwrap(), status);
        }
        assert!("DONE".parse::<RunStatus>().is_err());
    }
}
