//! Dual-head weather/snow classifier backed by ONNX Runtime.

use super::heads::PredictionResult;
use super::preprocess::ImageTensor;
use crate::constants::HEAD_CLASSES;
use crate::device::Device;
use crate::error::{Error, Result};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use std::path::Path;
use tracing::{debug, info};

/// Anything that turns an image tensor into a prediction.
pub trait ImageClassifier {
    /// Classify one image.
    fn classify(&mut self, input: &ImageTensor) -> Result<PredictionResult>;
}

/// ONNX session for the shared-backbone model with weather and snow heads.
///
/// The graph must take one `[1, 3, crop, crop]` float input and produce
/// two outputs of two logits each: weather first, snow second.
pub struct WeatherSnowClassifier {
    session: Session,
    side: usize,
}

impl WeatherSnowClassifier {
    /// Load a checkpoint onto `device` and verify its layout.
    pub fn load(path: &Path, device: &Device, crop: u32) -> Result<Self> {
        let load_error = |reason: String| Error::ModelLoad {
            path: path.to_path_buf(),
            reason,
        };

        if !path.is_file() {
            return Err(load_error("file not found".to_string()));
        }

        let builder = Session::builder().map_err(|e| load_error(e.to_string()))?;
        let builder = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| load_error(e.to_string()))?;
        let mut builder = builder
            .with_execution_providers(device.execution_providers())
            .map_err(|e| load_error(format!("{device} execution provider: {e}")))?;
        let session = builder
            .commit_from_file(path)
            .map_err(|e| load_error(e.to_string()))?;

        let side = crop as usize;
        let mut classifier = Self { session, side };

        let (weather, snow) = classifier
            .forward(&ImageTensor::zeros(side))
            .map_err(|e| load_error(format!("probe run failed: {e}")))?;
        if weather.len() != HEAD_CLASSES || snow.len() != HEAD_CLASSES {
            return Err(load_error(format!(
                "expected two heads of {HEAD_CLASSES} classes, got {} and {}",
                weather.len(),
                snow.len()
            )));
        }

        info!("Loaded model {} on {device}", path.display());
        Ok(classifier)
    }

    /// Run the graph and return raw logits of both heads.
    fn forward(&mut self, input: &ImageTensor) -> Result<(Vec<f32>, Vec<f32>)> {
        let inference_error = |e: ort::Error| Error::Inference {
            reason: e.to_string(),
        };

        let tensor =
            Tensor::from_array((input.shape(), input.data().to_vec())).map_err(inference_error)?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .map_err(inference_error)?;

        if outputs.len() != 2 {
            return Err(Error::Inference {
                reason: format!("model produced {} outputs, expected 2", outputs.len()),
            });
        }

        let (_, weather) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(inference_error)?;
        let (_, snow) = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(inference_error)?;

        debug!("Logits: weather={weather:?} snow={snow:?}");
        Ok((weather.to_vec(), snow.to_vec()))
    }
}

impl ImageClassifier for WeatherSnowClassifier {
    fn classify(&mut self, input: &ImageTensor) -> Result<PredictionResult> {
        if input.shape()[2] != self.side {
            return Err(Error::Inference {
                reason: format!(
                    "input side {} does not match model side {}",
                    input.shape()[2],
                    self.side
                ),
            });
        }

        let (weather, snow) = self.forward(input)?;
        PredictionResult::from_logits(&weather, &snow)
    }
}
