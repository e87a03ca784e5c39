use chrono::Utc;

use crate::error::Result;
use crate::tracking::{already_active, no_active_run, RunRecord, RunStatus, Tracker};

/// Keeps runs in memory. Used by tests and by `--no-tracking` runs.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    runs: Vec<RunRecord>,
    active: Option<usize>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }
}

impl Tracker for MemoryTracker {
    fn start_run(&mut self, name: &str) -> Result<String> {
        if let Some(i) = self.active {
            return Err(already_active(&self.runs[i].id));
        }
        let run = RunRecord::start(name);
        let id = run.id.clone();
        self.active = Some(self.runs.len());
        self.runs.push(run);
        Ok(id)
    }

    fn active_run(&self) -> Option<&str> {
        self.active.map(|i| self.runs[i].id.as_str())
    }

    fn log_metric(&mut self, key: &str, value: f64) -> Result<()> {
        let i = self.active.ok_or_else(|| no_active_run("log a metric"))?;
        self.runs[i].metrics.insert(key.to_string(), value);
        Ok(())
    }

    fn end_run(&mut self, status: RunStatus) -> Result<()> {
        let i = self.active.take().ok_or_else(|| no_active_run("end a run"))?;
        let run = &mut self.runs[i];
        run.status = status;
        run.ended_at = Some(Utc::now());
        Ok(())
    }

    fn list_runs(&self) -> Result<Vec<RunRecord>> {
        Ok(self.runs.iter().rev().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_lifecycle() {
        let mut tracker = MemoryTracker::new();
        assert!(tracker.log_metric("x", 1.0).is_err());

        let id = tracker.start_run("fp2022").unwrap();
        assert_eq!(tracker.active_run(), Some(id.as_str()));
        assert!(tracker.start_run("again").is_err());

        tracker.log_metric("rows", 10.0).unwrap();
        tracker.end_run(RunStatus::Finished).unwrap();

        assert_eq!(tracker.active_run(), None);
        let runs = tracker.list_runs().unwrap();
        assert_eq!(runs[0].status, RunStatus::Finished);
        assert_eq!(runs[0].metrics["rows"], 10.0);
        assert!(runs[0].ended_at.is_some());
        assert!(tracker.end_run(RunStatus::Failed).is_err());
    }
}
