//! Core temperature retrieval modules

pub mod calibrate;
pub mod quality;
pub mod outlier;
pub mod pipeline;

// Re-export main types
pub use calibrate::{CalibrationProcessor, ThermalCalibration};
pub use quality::{QualityClassifier, QualityRule, QUALITY_RULES};
pub use outlier::{FilterParams, FilterReport, OutlierFilter};
pub use pipeline::{SstProcessor, SstProduct};
