//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "wxlabel";

/// Default number of record updates between commits.
pub const DEFAULT_COMMIT_INTERVAL: usize = 1000;

/// Default number of records between progress log lines.
pub const DEFAULT_LOG_INTERVAL: usize = 10_000;

/// Default per-category cap for the export pass.
pub const DEFAULT_MAX_PER_CATEGORY: usize = 500;

/// Path prefixes left behind by the container that originally ingested the archive.
pub const DEFAULT_STALE_PREFIXES: &[&str] = &["/app"];

/// Default store table layout.
pub mod table {
    /// Table holding one row per archived image.
    pub const NAME: &str = "Images";
    /// Integer primary key column.
    pub const ID_COLUMN: &str = "Id";
    /// Stored file path column.
    pub const PATH_COLUMN: &str = "FilePath";
}

/// Prediction column names added to the image table.
pub mod columns {
    /// Weather label (`Sunny` / `Cloudy`).
    pub const WEATHER: &str = "weatherPrediction";
    /// Weather confidence in percent.
    pub const WEATHER_PERCENT: &str = "weatherPredictionPercent";
    /// Snow label (`Snow` / `No Snow`).
    pub const SNOW: &str = "snowPrediction";
    /// Snow confidence in percent.
    pub const SNOW_PERCENT: &str = "snowPredictionPercent";
}

/// Label strings as persisted in the store.
pub mod labels {
    /// Weather head, index 0.
    pub const SUNNY: &str = "Sunny";
    /// Weather head, index 1.
    pub const CLOUDY: &str = "Cloudy";
    /// Snow head, index 0.
    pub const NO_SNOW: &str = "No Snow";
    /// Snow head, index 1.
    pub const SNOW: &str = "Snow";
}

/// Image preprocessing parameters.
pub mod preprocess {
    /// Side length images are resized to before cropping.
    pub const RESIZE: u32 = 256;
    /// Side length of the center crop fed to the model.
    pub const CROP: u32 = 224;
    /// Per-channel normalization mean (RGB).
    pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
    /// Per-channel normalization standard deviation (RGB).
    pub const STD: [f32; 3] = [0.229, 0.224, 0.225];
}

/// Confidence value bounds (percent).
pub mod confidence {
    /// Minimum valid confidence value.
    pub const MIN: f32 = 0.0;
    /// Maximum valid confidence value.
    pub const MAX: f32 = 100.0;
}

/// Number of classes produced by each classification head.
pub const HEAD_CLASSES: usize = 2;
