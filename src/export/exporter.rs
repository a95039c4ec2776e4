//! Confidence-gated copy of predicted images into category folders.

use super::category::{Category, ExportThreshold};
use crate::archive::PathResolver;
use crate::error::{Error, Result};
use crate::output::{create_record_progress, finish_progress, inc_progress};
use crate::store::{PredictedRecord, PredictionStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Per-category export counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryReport {
    /// Category.
    pub category: Category,
    /// Cap on files in the folder.
    pub max_count: usize,
    /// Files already in the folder before this run.
    pub preexisting: usize,
    /// Files copied by this run.
    pub copied: usize,
    /// Selected records whose destination file already existed.
    pub already_present: usize,
}

impl CategoryReport {
    /// Files in the folder after this run.
    pub const fn total(&self) -> usize {
        self.preexisting + self.copied
    }
}

/// Outcome of one export pass.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    /// When the pass started.
    pub started_at: DateTime<Utc>,
    /// Export root.
    pub output_dir: PathBuf,
    /// Predicted records examined.
    pub examined: usize,
    /// Per-category counts, in rule order.
    pub categories: Vec<CategoryReport>,
    /// Records whose labels match no configured category.
    pub unmatched: usize,
    /// Records below their category's confidence minimums.
    pub below_threshold: usize,
    /// Records rejected because their category was full.
    pub over_cap: usize,
    /// Selected records whose source file no longer exists.
    pub missing_source: usize,
    /// Copies that failed.
    pub failures: usize,
    /// Wall-clock duration in seconds.
    pub elapsed_secs: f64,
}

impl ExportReport {
    /// Files copied across all categories.
    pub fn copied(&self) -> usize {
        self.categories.iter().map(|c| c.copied).sum()
    }

    /// Counts for one category.
    pub fn category(&self, category: Category) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.category == category)
    }
}

/// What happened to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    Unmatched,
    BelowThreshold,
    OverCap,
    AlreadyPresent(usize),
    MissingSource,
    Failed,
    Copied(usize),
}

/// Copies high-confidence images into one folder per category.
///
/// The first rule whose label pair matches a record decides it; later
/// rules are never consulted for that record. Files already present in
/// a category folder count toward its cap, so repeated passes top a
/// folder up to `max_count` and never copy the same file name twice.
pub struct ConfidenceExporter {
    rules: Vec<(Category, ExportThreshold)>,
    output_dir: PathBuf,
    resolver: PathResolver,
    show_progress: bool,
}

impl ConfidenceExporter {
    /// Create an exporter writing below `output_dir`.
    pub fn new(
        rules: Vec<(Category, ExportThreshold)>,
        output_dir: impl Into<PathBuf>,
        resolver: PathResolver,
    ) -> Self {
        Self {
            rules,
            output_dir: output_dir.into(),
            resolver,
            show_progress: false,
        }
    }

    /// Show a progress bar while copying.
    #[must_use]
    pub const fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    /// Folder for `category`.
    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.output_dir.join(category.as_str())
    }

    /// Read predicted records from `store` and export them.
    pub async fn run<S>(&self, store: &mut S) -> Result<ExportReport>
    where
        S: PredictionStore + ?Sized,
    {
        let records = store.fetch_predicted().await?;
        info!("Fetched {} predicted records", records.len());
        self.export_records(&records)
    }

    /// Export `records` in order.
    pub fn export_records(&self, records: &[PredictedRecord]) -> Result<ExportReport> {
        let started_at = Utc::now();
        let start = Instant::now();

        let mut categories = Vec::with_capacity(self.rules.len());
        for (category, threshold) in &self.rules {
            let dir = self.category_dir(*category);
            std::fs::create_dir_all(&dir).map_err(|source| Error::OutputDirCreateFailed {
                path: dir.clone(),
                source,
            })?;
            let preexisting = count_files(&dir)?;
            if preexisting > 0 {
                debug!("{category}: {preexisting} files already present");
            }
            categories.push(CategoryReport {
                category: *category,
                max_count: threshold.max_count,
                preexisting,
                copied: 0,
                already_present: 0,
            });
        }

        let mut report = ExportReport {
            started_at,
            output_dir: self.output_dir.clone(),
            examined: records.len(),
            categories,
            unmatched: 0,
            below_threshold: 0,
            over_cap: 0,
            missing_source: 0,
            failures: 0,
            elapsed_secs: 0.0,
        };

        let progress = create_record_progress(records.len(), "Exporting", self.show_progress);

        for record in records {
            match self.select(record, &report.categories) {
                Selection::Unmatched => report.unmatched += 1,
                Selection::BelowThreshold => report.below_threshold += 1,
                Selection::OverCap => report.over_cap += 1,
                Selection::AlreadyPresent(index) => report.categories[index].already_present += 1,
                Selection::MissingSource => report.missing_source += 1,
                Selection::Failed => report.failures += 1,
                Selection::Copied(index) => report.categories[index].copied += 1,
            }
            inc_progress(progress.as_ref());
        }

        finish_progress(progress, "Export complete");
        report.elapsed_secs = start.elapsed().as_secs_f64();

        info!("Export finished. Files per category:");
        for category in &report.categories {
            info!(
                "{}: {} ({} copied this run)",
                category.category,
                category.total(),
                category.copied
            );
        }
        if report.missing_source > 0 || report.failures > 0 {
            warn!(
                "{} missing source files, {} failed copies",
                report.missing_source, report.failures
            );
        }

        Ok(report)
    }

    fn select(&self, record: &PredictedRecord, counts: &[CategoryReport]) -> Selection {
        let Some((index, (category, threshold))) = self
            .rules
            .iter()
            .enumerate()
            .find(|(_, (category, _))| category.matches(&record.prediction))
        else {
            return Selection::Unmatched;
        };

        if !threshold.accepts(&record.prediction) {
            return Selection::BelowThreshold;
        }
        if counts[index].total() >= threshold.max_count {
            return Selection::OverCap;
        }

        let candidate = self.resolver.candidate(&record.file_path);
        let Some(file_name) = candidate.file_name() else {
            return Selection::MissingSource;
        };
        let destination = self.category_dir(*category).join(file_name);
        if destination.exists() {
            debug!("Record {}: {} already exported", record.id, destination.display());
            return Selection::AlreadyPresent(index);
        }

        let source = match self.resolver.resolve(&record.file_path) {
            Ok(source) => source,
            Err(e) => {
                debug!("Record {}: {e}", record.id);
                return Selection::MissingSource;
            }
        };

        match std::fs::copy(&source, &destination) {
            Ok(_) => {
                debug!("Copied {} -> {}", source.display(), destination.display());
                Selection::Copied(index)
            }
            Err(e) => {
                warn!("Failed to copy {}: {e}", source.display());
                Selection::Failed
            }
        }
    }
}

fn count_files(dir: &Path) -> Result<usize> {
    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        if entry?.file_type()?.is_file() {
            count += 1;
        }
    }
    Ok(count)
}
