use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::error::Result;
use crate::models::Table;
use crate::pipeline::context::PipelineContext;

/// A unit of pipeline work.
///
/// `data` is the table carried from earlier steps, if any. Returning `Some` replaces it for the
/// following steps; `None` leaves it unchanged.
#[async_trait]
pub trait Operator: Send + Sync {
    /// Operator type name, e.g. `LoadTable`.
    fn kind(&self) -> &'static str;

    async fn execute(
        &self,
        data: Option<&Table>,
        context: &mut PipelineContext,
    ) -> Result<Option<Table>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepState {
    Created,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Seconds between two instants, rounded to four decimals.
pub fn elapsed_seconds(started: DateTime<Utc>, stopped: DateTime<Utc>) -> f64 {
    let micros = (stopped - started).num_microseconds().unwrap_or(i64::MAX);
    (micros as f64 / 1_000_000.0 * 10_000.0).round() / 10_000.0
}

/// A named operator with its lifecycle timestamps.
pub struct Step {
    name: String,
    ordinal: usize,
    operator: Box<dyn Operator>,
    state: StepState,
    created: DateTime<Utc>,
    started: Option<DateTime<Utc>>,
    stopped: Option<DateTime<Utc>>,
    duration: Option<f64>,
}

impl Step {
    pub fn new(name: impl Into<String>, operator: impl Operator + 'static) -> Self {
        Self::boxed(name, Box::new(operator))
    }

    pub fn boxed(name: impl Into<String>, operator: Box<dyn Operator>) -> Self {
        Self {
            name: name.into(),
            ordinal: 0,
            operator,
            state: StepState::Created,
            created: Utc::now(),
            started: None,
            stopped: None,
            duration: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &'static str {
        self.operator.kind()
    }

    /// 1-based position in the pipeline, 0 until added to one.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub(crate) fn set_ordinal(&mut self, ordinal: usize) {
        self.ordinal = ordinal;
    }

    pub fn state(&self) -> StepState {
        self.state
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

    /// Seconds spent in the last run.
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub async fn run(
        &mut self,
        data: Option<&Table>,
        context: &mut PipelineContext,
    ) -> Result<Option<Table>> {
        self.setup();
        let result = self.operator.execute(data, context).await;
        self.teardown(result.is_ok());

        match &result {
            Ok(_) => tracing::info!(
                "Step {} ({}) completed in {:.4}s",
                self.name,
                self.kind(),
                self.duration.unwrap_or_default()
            ),
            Err(e) => tracing::error!("Step {} ({}) failed: {}", self.name, self.kind(), e),
        }
        result
    }

    /// Back to `Created` with no timings, ahead of a new pipeline run.
    pub(crate) fn reset(&mut self) {
        self.state = StepState::Created;
        self.started = None;
        self.stopped = None;
        self.duration = None;
    }

    fn setup(&mut self) {
        tracing::info!("Starting step {}: {}", self.ordinal, self.name);
        self.state = StepState::Running;
        self.started = Some(Utc::now());
        self.stopped = None;
        self.duration = None;
    }

    fn teardown(&mut self, succeeded: bool) {
        let stopped = Utc::now();
        self.stopped = Some(stopped);
        self.duration = self.started.map(|started| elapsed_seconds(started, stopped));
        self.state = if succeeded {
            StepState::Completed
        } else {
            StepState::Failed
        };
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("ordinal", &self.ordinal)
            .field("operator", &self.kind())
            .field("state", &self.state)
            .field("duration", &self.duration)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::Column;

    struct Constant;

    #[async_trait]
    impl Operator for Constant {
        fn kind(&self) -> &'static str {
            "Constant"
        }

        async fn execute(
            &self,
            _data: Option<&Table>,
            context: &mut PipelineContext,
        ) -> Result<Option<Table>> {
            context.record_metric("constant", 1.0);
            Ok(Some(Table::from_columns(vec![Column::numeric("x", vec![1.0])])?))
        }
    }

    struct Broken;

    #[async_trait]
    impl Operator for Broken {
        fn kind(&self) -> &'static str {
            "Broken"
        }

        async fn execute(&self, _: Option<&Table>, _: &mut PipelineContext) -> Result<Option<Table>> {
            Err(Error::Acquisition("boom".into()))
        }
    }

    #[tokio::test]
    async fn test_step_lifecycle() {
        let mut step = Step::new("constant", Constant);
        let mut context = PipelineContext::default();
        assert_eq!(step.state(), StepState::Created);
        assert!(step.duration().is_none());

        let out = step.run(None, &mut context).await.unwrap();
        assert_eq!(out.unwrap().n_rows(), 1);
        assert_eq!(step.state(), StepState::Completed);
        assert!(step.started().unwrap() <= step.stopped().unwrap());
        assert!(step.duration().unwrap() >= 0.0);
        assert_eq!(context.metrics["constant"], 1.0);
    }

    #[tokio::test]
    async fn test_failed_step_still_timed() {
        let mut step = Step::new("broken", Broken);
        let err = step.run(None, &mut PipelineContext::default()).await.unwrap_err();

        assert!(matches!(err, Error::Acquisition(_)));
        assert_eq!(step.state(), StepState::Failed);
        assert!(step.duration().is_some());
    }

    #[test]
    fn test_elapsed_seconds_rounds_to_four_places() {
        let start = Utc::now();
        let stop = start + chrono::Duration::microseconds(1_234_567);
        assert_eq!(elapsed_seconds(start, stop), 1.2346);
    }
}
