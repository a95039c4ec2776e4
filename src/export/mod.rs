//! Export of confident predictions into category folders.

mod category;
mod exporter;

pub use category::{Category, ExportThreshold};
pub use exporter::{CategoryReport, ConfidenceExporter, ExportReport};
