//! Wildfire Risk Core Library
//!
//! Assesses wildfire hazard risk from a photograph plus optional location.
//! The pipeline has four stages, each with its own fallback:
//! - Segmentation and fire/smoke detection over a chain of hosted models,
//!   ending in a deterministic heuristic
//! - Feature extraction (fuel load, continuity, canopy, fragmentation,
//!   structure exposure, dryness)
//! - Weather lookup with Canadian-style fire-weather indices and red flag
//!   warnings
//! - Composite risk scoring with an emergency override for visible fire
//!
//! ## Example
//!
//! ```rust,ignore
//! use wildfire_risk_core::{AnalysisContext, PipelineConfig, RiskPipeline};
//!
//! let pipeline = RiskPipeline::from_config(&PipelineConfig::from_env());
//! let report = pipeline.assess(&upload_bytes, AnalysisContext::new()).await?;
//! println!("{} ({})", report.assessment.composite_risk_score, report.assessment.risk_category);
//! ```

/// Version reported in assessment metadata and the health check
pub const PIPELINE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod core_types;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod risk;
pub mod segmentation;
pub mod weather;

pub use config::{InferenceConfig, PipelineConfig, WeatherConfig};
pub use core_types::{AnalysisContext, ImageLimits, ImageSample, Location};
pub use error::{InputError, SegmentationError, StrategyError, WeatherError};
pub use features::{extract, FeatureSet};
pub use pipeline::{HealthReport, PipelineReport, RiskPipeline};
pub use risk::{DataQuality, RiskAssessment, RiskCalculator, RiskCategory};
pub use segmentation::{SegmentationModel, SegmentationResult, Segmenter};
pub use weather::{FireWeatherData, WeatherCache, WeatherService, WeatherSnapshot};
