pub mod builder;
pub mod context;
pub mod engine;
pub mod operator;

pub use builder::{PipelineBuilder, PipelineDefinition};
pub use context::PipelineContext;
pub use engine::{Pipeline, RunWindow, StepsSummary};
pub use operator::{Operator, Step, StepState};
