//! Configuration type definitions.

use crate::constants::{
    DEFAULT_COMMIT_INTERVAL, DEFAULT_LOG_INTERVAL, DEFAULT_MAX_PER_CATEGORY,
    DEFAULT_STALE_PREFIXES, preprocess, table,
};
use crate::export::{Category, ExportThreshold};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prediction store settings.
    pub store: StoreConfig,

    /// Image archive settings.
    pub archive: ArchiveConfig,

    /// Model checkpoint settings.
    pub model: ModelConfig,

    /// Inference run settings.
    pub inference: InferenceConfig,

    /// Export pass settings.
    pub export: ExportConfig,
}

/// Prediction store connection and table layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Connection URL; the scheme selects the backend.
    pub url: String,

    /// Table holding image records.
    pub table: String,

    /// Integer id column.
    pub id_column: String,

    /// File path column.
    pub path_column: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://images.db".to_string(),
            table: table::NAME.to_string(),
            id_column: table::ID_COLUMN.to_string(),
            path_column: table::PATH_COLUMN.to_string(),
        }
    }
}

/// Image archive location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Directory all stored paths are resolved against.
    pub root: Option<PathBuf>,

    /// Prefixes stripped from stored paths before joining onto `root`.
    pub stale_prefixes: Vec<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            root: None,
            stale_prefixes: DEFAULT_STALE_PREFIXES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Model checkpoint and input geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the ONNX checkpoint.
    pub path: Option<PathBuf>,

    /// Square size images are resized to before cropping.
    pub resize: u32,

    /// Square center crop fed to the network.
    pub crop: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: None,
            resize: preprocess::RESIZE,
            crop: preprocess::CROP,
        }
    }
}

/// Inference device configuration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InferenceDevice {
    /// Best accelerator available, CPU fallback allowed.
    #[default]
    Auto,
    /// Accelerator required, fail if none is found.
    Gpu,
    /// Force CPU inference.
    Cpu,
}

impl std::fmt::Display for InferenceDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Gpu => write!(f, "gpu"),
            Self::Cpu => write!(f, "cpu"),
        }
    }
}

/// Inference run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Device to use for inference.
    pub device: InferenceDevice,

    /// Ask before falling back to CPU in auto mode.
    pub confirm_cpu_fallback: bool,

    /// Updates accumulated between commits.
    pub commit_interval: usize,

    /// Records between progress log lines.
    pub log_interval: usize,

    /// Upper bound on records fetched per run.
    pub limit: Option<u64>,

    /// Fetch every record instead of only unpredicted ones.
    pub reprocess: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            device: InferenceDevice::Auto,
            confirm_cpu_fallback: false,
            commit_interval: DEFAULT_COMMIT_INTERVAL,
            log_interval: DEFAULT_LOG_INTERVAL,
            limit: None,
            reprocess: false,
        }
    }
}

/// Export pass settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory receiving one subdirectory per category.
    pub output_dir: Option<PathBuf>,

    /// Category rules in match order.
    pub categories: Vec<CategoryRuleConfig>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        let rule = |category, min: f32| CategoryRuleConfig {
            category,
            weather_min: min,
            snow_min: min,
            max_count: DEFAULT_MAX_PER_CATEGORY,
        };
        Self {
            output_dir: None,
            categories: vec![
                rule(Category::SunnyWithSnow, 82.0),
                rule(Category::SunnyNoSnow, 98.0),
                rule(Category::CloudyWithSnow, 98.0),
                rule(Category::CloudyNoSnow, 0.0),
            ],
        }
    }
}

impl ExportConfig {
    /// Rules as `(category, threshold)` pairs in declaration order.
    pub fn rules(&self) -> Vec<(Category, ExportThreshold)> {
        self.categories
            .iter()
            .map(|c| {
                (
                    c.category,
                    ExportThreshold {
                        weather_min: c.weather_min,
                        snow_min: c.snow_min,
                        max_count: c.max_count,
                    },
                )
            })
            .collect()
    }
}

/// One export category rule as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRuleConfig {
    /// Category name, e.g. `Sunny_With_Snow`.
    pub category: Category,

    /// Minimum weather confidence (percent).
    pub weather_min: f32,

    /// Minimum snow confidence (percent).
    pub snow_min: f32,

    /// Maximum number of files in this category's folder.
    #[serde(default = "default_max_count")]
    pub max_count: usize,
}

const fn default_max_count() -> usize {
    DEFAULT_MAX_PER_CATEGORY
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_device_display() {
        assert_eq!(InferenceDevice::Auto.to_string(), "auto");
        assert_eq!(InferenceDevice::Gpu.to_string(), "gpu");
        assert_eq!(InferenceDevice::Cpu.to_string(), "cpu");
    }

    #[test]
    fn test_default_export_rules_follow_declaration_order() {
        let rules = ExportConfig::default().rules();
        let order: Vec<Category> = rules.iter().map(|(c, _)| *c).collect();
        assert_eq!(
            order,
            vec![
                Category::SunnyWithSnow,
                Category::SunnyNoSnow,
                Category::CloudyWithSnow,
                Category::CloudyNoSnow,
            ]
        );
        assert_eq!(rules[0].1.weather_min, 82.0);
        assert_eq!(rules[3].1.max_count, 500);
    }

    #[test]
    fn test_default_store_layout() {
        let store = StoreConfig::default();
        assert_eq!(store.table, "Images");
        assert_eq!(store.id_column, "Id");
        assert_eq!(store.path_column, "FilePath");
    }
}
