use chrono::{DateTime, Utc};
use std::fmt;

use crate::error::{Error, Result};
use crate::models::Table;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::operator::{elapsed_seconds, Step};
use crate::tracking::{MemoryTracker, RunStatus, Tracker};

/// Restricts a run to steps with `start <= ordinal < stop`. Ordinals are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunWindow {
    pub start: usize,
    pub stop: Option<usize>,
}

impl Default for RunWindow {
    fn default() -> Self {
        Self {
            start: 1,
            stop: None,
        }
    }
}

impl RunWindow {
    pub fn new(start: Option<usize>, stop: Option<usize>) -> Self {
        Self {
            start: start.unwrap_or(1),
            stop,
        }
    }

    pub fn contains(&self, ordinal: usize) -> bool {
        ordinal >= self.start && self.stop.map_or(true, |stop| ordinal < stop)
    }
}

/// Ordinal and name of each step, printable as a table.
#[derive(Debug, Clone, PartialEq)]
pub struct StepsSummary(pub Vec<(usize, String, &'static str)>);

impl fmt::Display for StepsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>4}  {:<30} {}", "Seq", "Step", "Operator")?;
        for (ordinal, name, kind) in &self.0 {
            writeln!(f, "{:>4}  {:<30} {}", ordinal, name, kind)?;
        }
        Ok(())
    }
}

/// Ordered steps sharing one context, with one tracking run per `run`.
pub struct Pipeline {
    name: String,
    version: String,
    steps: Vec<Step>,
    context: PipelineContext,
    tracker: Box<dyn Tracker>,
    run_id: Option<String>,
    created: DateTime<Utc>,
    started: Option<DateTime<Utc>>,
    stopped: Option<DateTime<Utc>>,
    duration: Option<f64>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            steps: Vec::new(),
            context: PipelineContext::default(),
            tracker: Box::new(MemoryTracker::new()),
            run_id: None,
            created: Utc::now(),
            started: None,
            stopped: None,
            duration: None,
        }
    }

    pub fn with_context(mut self, context: PipelineContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_tracker(mut self, tracker: Box<dyn Tracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub fn tracker(&self) -> &dyn Tracker {
        self.tracker.as_ref()
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn started(&self) -> Option<DateTime<Utc>> {
        self.started
    }

    pub fn stopped(&self) -> Option<DateTime<Utc>> {
        self.stopped
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn add_step(&mut self, mut step: Step) {
        step.set_ordinal(self.steps.len() + 1);
        self.steps.push(step);
    }

    pub fn add_steps(&mut self, steps: impl IntoIterator<Item = Step>) {
        for step in steps {
            self.add_step(step);
        }
    }

    /// Removes every step with this name and renumbers the rest.
    pub fn remove_step(&mut self, name: &str) -> Result<()> {
        let before = self.steps.len();
        self.steps.retain(|s| s.name() != name);
        if self.steps.len() == before {
            return Err(step_not_found(name));
        }
        for (i, step) in self.steps.iter_mut().enumerate() {
            step.set_ordinal(i + 1);
        }
        Ok(())
    }

    pub fn get_step(&self, name: &str) -> Result<&Step> {
        self.steps
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| step_not_found(name))
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn steps_summary(&self) -> StepsSummary {
        StepsSummary(
            self.steps
                .iter()
                .map(|s| (s.ordinal(), s.name().to_string(), s.kind()))
                .collect(),
        )
    }

    /// Runs the steps inside `window` in order and returns the last carried table.
    ///
    /// The first failing step stops the run. The tracking run is ended either way, with status
    /// `Failed` when a step failed.
    pub async fn run(&mut self, window: RunWindow) -> Result<Option<Table>> {
        self.setup()?;

        let result = execute(&mut self.steps, &mut self.context, window).await;

        let teardown = self.teardown(result.is_ok());
        match (result, teardown) {
            (Ok(data), Ok(())) => Ok(data),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(teardown_err)) => {
                tracing::error!("Tracking teardown also failed: {}", teardown_err);
                Err(e)
            }
        }
    }

    fn setup(&mut self) -> Result<()> {
        let run_id = self.tracker.start_run(&self.name)?;
        tracing::info!("Running pipeline {} v{} (run {})", self.name, self.version, run_id);

        self.context.pipeline = self.name.clone();
        self.context.run_id = Some(run_id.clone());
        self.context.metrics.clear();
        self.context.artifacts.clear();
        for step in &mut self.steps {
            step.reset();
        }
        self.run_id = Some(run_id);
        self.started = Some(Utc::now());
        self.stopped = None;
        self.duration = None;
        Ok(())
    }

    /// Logs context metrics and step durations, then ends the tracking run.
    fn teardown(&mut self, succeeded: bool) -> Result<()> {
        let stopped = Utc::now();
        self.stopped = Some(stopped);
        self.duration = self.started.map(|started| elapsed_seconds(started, stopped));

        let status = if succeeded {
            RunStatus::Finished
        } else {
            RunStatus::Failed
        };

        let logged = self.log_run_metrics();
        let ended = self.tracker.end_run(status);

        tracing::info!(
            "Pipeline {} {} in {:.4}s",
            self.name,
            if succeeded { "finished" } else { "failed" },
            self.duration.unwrap_or_default()
        );
        logged.and(ended)
    }

    fn log_run_metrics(&mut self) -> Result<()> {
        for (key, value) in &self.context.metrics {
            self.tracker.log_metric(key, *value)?;
        }
        for step in &self.steps {
            if let Some(duration) = step.duration() {
                self.tracker
                    .log_metric(&format!("duration.{}", step.name()), duration)?;
            }
        }
        if let Some(duration) = self.duration {
            self.tracker.log_metric("duration", duration)?;
        }
        Ok(())
    }
}

fn step_not_found(name: &str) -> Error {
    tracing::error!("Step {} does not exist in the pipeline", name);
    Error::StepNotFound(name.to_string())
}

async fn execute(
    steps: &mut [Step],
    context: &mut PipelineContext,
    window: RunWindow,
) -> Result<Option<Table>> {
    let mut data: Option<Table> = None;

    for step in steps.iter_mut() {
        if !window.contains(step.ordinal()) {
            tracing::debug!("Skipping step {} outside the run window", step.name());
            continue;
        }
        if let Some(output) = step.run(data.as_ref(), context).await? {
            data = Some(output);
        }
    }

    Ok(data)
}
