//! Batch prediction pipeline.

mod context;
mod report;
mod runner;

pub use context::PipelineContext;
pub use report::{RunReport, SkippedRecord};
pub use runner::{BatchInferenceRunner, RecordOutcome, RunOptions};
