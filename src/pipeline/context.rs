//! Run-scoped state shared by every record.

use crate::archive::PathResolver;
use crate::config::Config;
use crate::device::Device;
use crate::error::Result;
use crate::inference::{ImageClassifier, WeatherSnowClassifier};

/// Device, model and path resolution for one run.
///
/// Built once before the loop starts and borrowed by every record.
pub struct PipelineContext<C: ImageClassifier> {
    /// Device the classifier runs on.
    pub device: Device,
    /// Loaded classifier.
    pub classifier: C,
    /// Stored path resolution.
    pub resolver: PathResolver,
    /// Resize side before cropping.
    pub resize: u32,
    /// Center crop side.
    pub crop: u32,
}

impl<C: ImageClassifier> PipelineContext<C> {
    /// Assemble a context from parts.
    pub fn new(device: Device, classifier: C, resolver: PathResolver, resize: u32, crop: u32) -> Self {
        Self {
            device,
            classifier,
            resolver,
            resize,
            crop,
        }
    }
}

impl PipelineContext<WeatherSnowClassifier> {
    /// Load the configured model onto `device`.
    pub fn load(config: &Config, device: Device) -> Result<Self> {
        let archive_root = crate::config::require_archive_root(config)?;
        let model_path = crate::config::require_model_path(config)?;

        let classifier = WeatherSnowClassifier::load(model_path, &device, config.model.crop)?;
        let resolver = PathResolver::new(archive_root, &config.archive.stale_prefixes);

        Ok(Self::new(
            device,
            classifier,
            resolver,
            config.model.resize,
            config.model.crop,
        ))
    }
}
