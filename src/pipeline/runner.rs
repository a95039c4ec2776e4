//! Sequential fetch, classify and persist loop.

use super::context::PipelineContext;
use super::report::RunReport;
use crate::constants::{DEFAULT_COMMIT_INTERVAL, DEFAULT_LOG_INTERVAL};
use crate::error::{Result, SkipReason};
use crate::inference::{ImageClassifier, PredictionResult, decode_image};
use crate::output::{create_record_progress, finish_progress, inc_progress, println_above};
use crate::store::{ImageRecord, PendingSelection, PredictionStore};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Final state of one record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// All four prediction fields were written.
    Updated(PredictionResult),
    /// The record was left untouched.
    Skipped(SkipReason),
}

/// Loop settings.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Which rows to fetch.
    pub selection: PendingSelection,
    /// Updates between commits.
    pub commit_interval: usize,
    /// Records between progress log lines.
    pub log_interval: usize,
    /// Show a progress bar.
    pub show_progress: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            selection: PendingSelection::default(),
            commit_interval: DEFAULT_COMMIT_INTERVAL,
            log_interval: DEFAULT_LOG_INTERVAL,
            show_progress: false,
        }
    }
}

/// Runs the classifier over every pending record.
///
/// Failures confined to one record are logged, counted and skipped.
/// Any other failure, such as a lost connection or a failed commit,
/// aborts the run.
#[derive(Debug, Clone, Default)]
pub struct BatchInferenceRunner {
    options: RunOptions,
}

impl BatchInferenceRunner {
    /// Create a runner.
    pub const fn new(options: RunOptions) -> Self {
        Self { options }
    }

    /// Fetch pending records and process them in id order.
    pub async fn run<C, S>(&self, ctx: &mut PipelineContext<C>, store: &mut S) -> Result<RunReport>
    where
        C: ImageClassifier,
        S: PredictionStore + ?Sized,
    {
        let start = Instant::now();
        let records = store.fetch_pending(self.options.selection).await?;
        let total = records.len();
        info!("Fetched {total} pending records");

        let mut report = RunReport::new(ctx.device.to_string(), total);
        let commit_interval = self.options.commit_interval.max(1);
        let log_interval = self.options.log_interval.max(1);
        let progress = create_record_progress(total, "Predicting", self.options.show_progress);
        let mut seen = HashSet::with_capacity(total);

        for (index, record) in records.iter().enumerate() {
            let (outcome, detail) = if seen.insert(record.id) {
                match Self::process_record(ctx, store, record).await {
                    Ok(prediction) => {
                        debug!(
                            "Record {}: {} {:.1}%, {} {:.1}%",
                            record.id,
                            prediction.weather,
                            prediction.weather_confidence,
                            prediction.snow,
                            prediction.snow_confidence
                        );
                        (RecordOutcome::Updated(prediction), None)
                    }
                    Err(e) if e.is_per_record() => {
                        warn!("Skipping record {} ({}): {e}", record.id, record.file_path);
                        let reason = e.skip_reason().unwrap_or(SkipReason::Other);
                        (RecordOutcome::Skipped(reason), Some(e.to_string()))
                    }
                    Err(e) => {
                        finish_progress(progress, "Prediction aborted");
                        return Err(e);
                    }
                }
            } else {
                let message = format!("record {} returned twice", record.id);
                warn!("Skipping record {} ({}): {message}", record.id, record.file_path);
                (RecordOutcome::Skipped(SkipReason::Other), Some(message))
            };

            report.record(record.id, &record.file_path, &outcome, detail);
            inc_progress(progress.as_ref());

            let done = index + 1;
            if done % commit_interval == 0 {
                store.commit().await?;
                debug!("Committed after {done} records");
            }
            if done % log_interval == 0 {
                println_above(
                    progress.as_ref(),
                    &format!("Processed {done}/{total} records"),
                );
            }
        }

        store.commit().await?;
        finish_progress(progress, "Prediction complete");

        report.elapsed_secs = start.elapsed().as_secs_f64();
        report.log_summary();
        Ok(report)
    }

    /// Resolve, decode, classify and persist one record.
    pub async fn process_record<C, S>(
        ctx: &mut PipelineContext<C>,
        store: &mut S,
        record: &ImageRecord,
    ) -> Result<PredictionResult>
    where
        C: ImageClassifier,
        S: PredictionStore + ?Sized,
    {
        let path = ctx.resolver.resolve(&record.file_path)?;
        let tensor = decode_image(&path, ctx.resize, ctx.crop)?;
        let prediction = ctx.classifier.classify(&tensor)?;
        store.update_prediction(record.id, &prediction).await?;
        Ok(prediction)
    }
}
