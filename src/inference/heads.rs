//! Decoding of the two classification heads.

use crate::constants::{HEAD_CLASSES, labels};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Weather head classes, in output index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherLabel {
    /// Index 0.
    Sunny,
    /// Index 1.
    Cloudy,
}

impl WeatherLabel {
    /// Label for a head output index.
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Sunny),
            1 => Some(Self::Cloudy),
            _ => None,
        }
    }

    /// Parse a label as stored in the prediction table.
    pub fn from_stored(value: &str) -> Option<Self> {
        match value {
            labels::SUNNY => Some(Self::Sunny),
            labels::CLOUDY => Some(Self::Cloudy),
            _ => None,
        }
    }

    /// Label as stored in the prediction table.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sunny => labels::SUNNY,
            Self::Cloudy => labels::CLOUDY,
        }
    }
}

/// Snow head classes, in output index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnowLabel {
    /// Index 0.
    NoSnow,
    /// Index 1.
    Snow,
}

impl SnowLabel {
    /// Label for a head output index.
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::NoSnow),
            1 => Some(Self::Snow),
            _ => None,
        }
    }

    /// Parse a label as stored in the prediction table.
    pub fn from_stored(value: &str) -> Option<Self> {
        match value {
            labels::NO_SNOW => Some(Self::NoSnow),
            labels::SNOW => Some(Self::Snow),
            _ => None,
        }
    }

    /// Label as stored in the prediction table.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoSnow => labels::NO_SNOW,
            Self::Snow => labels::SNOW,
        }
    }
}

impl std::fmt::Display for WeatherLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for SnowLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labels and confidences (percent) for one image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Weather head label.
    pub weather: WeatherLabel,
    /// Weather head confidence in `[0, 100]`.
    pub weather_confidence: f32,
    /// Snow head label.
    pub snow: SnowLabel,
    /// Snow head confidence in `[0, 100]`.
    pub snow_confidence: f32,
}

impl PredictionResult {
    /// Build a result from raw logits of both heads.
    pub fn from_logits(weather_logits: &[f32], snow_logits: &[f32]) -> Result<Self> {
        let (weather_index, weather_confidence) = decode_head("weather", weather_logits)?;
        let (snow_index, snow_confidence) = decode_head("snow", snow_logits)?;

        Ok(Self {
            weather: WeatherLabel::from_index(weather_index).ok_or_else(|| bad_index(weather_index))?,
            weather_confidence,
            snow: SnowLabel::from_index(snow_index).ok_or_else(|| bad_index(snow_index))?,
            snow_confidence,
        })
    }
}

fn bad_index(index: usize) -> Error {
    Error::Inference {
        reason: format!("head index {index} out of range"),
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

/// Softmax a head and return the arg-max index with its probability in percent.
///
/// Ties resolve to the lowest index.
fn decode_head(head: &str, logits: &[f32]) -> Result<(usize, f32)> {
    if logits.len() != HEAD_CLASSES {
        return Err(Error::Inference {
            reason: format!(
                "{head} head produced {} values, expected {HEAD_CLASSES}",
                logits.len()
            ),
        });
    }
    if logits.iter().any(|v| !v.is_finite()) {
        return Err(Error::Inference {
            reason: format!("{head} head produced non-finite logits"),
        });
    }

    let probs = softmax(logits);
    let (index, prob) = probs
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, p)| {
            if p > best.1 { (i, p) } else { best }
        });

    Ok((index, (prob * 100.0).clamp(0.0, 100.0)))
}
