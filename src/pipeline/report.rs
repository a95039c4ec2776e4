//! Prediction run report.

use super::runner::RecordOutcome;
use crate::error::SkipReason;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// One skipped record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    /// Row id.
    pub id: i64,
    /// File path as stored.
    pub file_path: String,
    /// Why it was skipped.
    pub reason: SkipReason,
    /// Error message.
    pub message: String,
}

/// Counts and skips for one prediction run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Compute device used.
    pub device: String,
    /// Records returned by the pending query.
    pub fetched: usize,
    /// Records whose predictions were written.
    pub updated: usize,
    /// Records skipped.
    pub skipped: usize,
    /// Skip counts per reason.
    pub skips_by_reason: BTreeMap<SkipReason, usize>,
    /// Every skipped record.
    pub skipped_records: Vec<SkippedRecord>,
    /// Wall-clock duration in seconds.
    pub elapsed_secs: f64,
}

impl RunReport {
    /// Empty report for a run on `device`.
    pub fn new(device: impl Into<String>, fetched: usize) -> Self {
        Self {
            started_at: Utc::now(),
            device: device.into(),
            fetched,
            updated: 0,
            skipped: 0,
            skips_by_reason: BTreeMap::new(),
            skipped_records: Vec::new(),
            elapsed_secs: 0.0,
        }
    }

    /// Records examined so far.
    pub const fn examined(&self) -> usize {
        self.updated + self.skipped
    }

    /// Count the outcome of one record.
    pub fn record(
        &mut self,
        id: i64,
        file_path: &str,
        outcome: &RecordOutcome,
        detail: Option<String>,
    ) {
        match outcome {
            RecordOutcome::Updated(_) => self.updated += 1,
            RecordOutcome::Skipped(reason) => {
                self.skipped += 1;
                *self.skips_by_reason.entry(*reason).or_insert(0) += 1;
                self.skipped_records.push(SkippedRecord {
                    id,
                    file_path: file_path.to_string(),
                    reason: *reason,
                    message: detail.unwrap_or_default(),
                });
            }
        }
    }

    /// Skips recorded for `reason`.
    pub fn skips_for(&self, reason: SkipReason) -> usize {
        self.skips_by_reason.get(&reason).copied().unwrap_or(0)
    }

    /// Log the final summary.
    pub fn log_summary(&self) {
        info!(
            "Processed {} records in {:.1}s: {} updated, {} skipped",
            self.examined(),
            self.elapsed_secs,
            self.updated,
            self.skipped
        );
        for (reason, count) in &self.skips_by_reason {
            info!("  {reason}: {count}");
        }
    }
}
