//! Export categories and their thresholds.

use crate::inference::{PredictionResult, SnowLabel, WeatherLabel};
use serde::{Deserialize, Serialize};

/// A (weather, snow) label pair with its own export folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Sunny and snow on the ground.
    #[serde(rename = "Sunny_With_Snow")]
    SunnyWithSnow,
    /// Sunny, bare ground.
    #[serde(rename = "Sunny_No_Snow")]
    SunnyNoSnow,
    /// Overcast and snow on the ground.
    #[serde(rename = "Cloudy_With_Snow")]
    CloudyWithSnow,
    /// Overcast, bare ground.
    #[serde(rename = "Cloudy_No_Snow")]
    CloudyNoSnow,
}

impl Category {
    /// All categories in their default match order.
    pub const ALL: [Self; 4] = [
        Self::SunnyWithSnow,
        Self::SunnyNoSnow,
        Self::CloudyWithSnow,
        Self::CloudyNoSnow,
    ];

    /// Folder name under the export directory.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SunnyWithSnow => "Sunny_With_Snow",
            Self::SunnyNoSnow => "Sunny_No_Snow",
            Self::CloudyWithSnow => "Cloudy_With_Snow",
            Self::CloudyNoSnow => "Cloudy_No_Snow",
        }
    }

    /// Label pair this category stands for.
    pub const fn labels(self) -> (WeatherLabel, SnowLabel) {
        match self {
            Self::SunnyWithSnow => (WeatherLabel::Sunny, SnowLabel::Snow),
            Self::SunnyNoSnow => (WeatherLabel::Sunny, SnowLabel::NoSnow),
            Self::CloudyWithSnow => (WeatherLabel::Cloudy, SnowLabel::Snow),
            Self::CloudyNoSnow => (WeatherLabel::Cloudy, SnowLabel::NoSnow),
        }
    }

    /// Whether a prediction carries this category's labels.
    pub fn matches(self, prediction: &PredictionResult) -> bool {
        self.labels() == (prediction.weather, prediction.snow)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum confidences and cap for one category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExportThreshold {
    /// Minimum weather confidence (percent).
    pub weather_min: f32,
    /// Minimum snow confidence (percent).
    pub snow_min: f32,
    /// Maximum number of files in the category folder.
    pub max_count: usize,
}

impl ExportThreshold {
    /// Whether both confidences reach their minimums.
    pub fn accepts(&self, prediction: &PredictionResult) -> bool {
        prediction.weather_confidence >= self.weather_min
            && prediction.snow_confidence >= self.snow_min
    }
}
