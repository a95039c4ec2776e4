//! Weather and snow classification.

mod classifier;
mod heads;
mod preprocess;

pub use classifier::{ImageClassifier, WeatherSnowClassifier};
pub use heads::{PredictionResult, SnowLabel, WeatherLabel, softmax};
pub use preprocess::{ImageTensor, decode_image};
