use super::decoder::{decode_regions, ResponseShape};
use super::hosted::InferenceClient;
use super::{RegionMap, SegmentationModel};
use crate::core_types::{AnalysisContext, ImageSample};
use crate::error::StrategyError;
use async_trait::async_trait;
use std::sync::Arc;

/// Regions and confidence produced by one strategy
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutcome {
    pub regions: RegionMap,
    pub confidence: f32,
}

/// One link in the segmentation fallback chain
///
/// Implementations report failure through [`StrategyError`]; the chain treats
/// every error as "declined" and moves on to the next strategy.
#[async_trait]
pub trait SegmentationStrategy: Send + Sync {
    /// Short name used in logs and `fallback_reason`
    fn name(&self) -> &str;

    /// Tag recorded on the result when this strategy is accepted
    fn model(&self) -> SegmentationModel;

    /// Upstream model identifier, if any
    fn model_id(&self) -> Option<&str> {
        None
    }

    /// Terminal strategies are accepted regardless of confidence
    fn is_terminal(&self) -> bool {
        false
    }

    /// Produce regions for an image
    async fn segment(
        &self,
        image: &ImageSample,
        context: &AnalysisContext,
    ) -> Result<StrategyOutcome, StrategyError>;
}

/// Strategy backed by a hosted segmentation or classification model
pub struct HostedSegmentation {
    name: String,
    model: SegmentationModel,
    model_id: String,
    shape: ResponseShape,
    client: Arc<InferenceClient>,
}

impl HostedSegmentation {
    pub fn new(
        model: SegmentationModel,
        model_id: impl Into<String>,
        shape: ResponseShape,
        client: Arc<InferenceClient>,
    ) -> Self {
        Self {
            name: model.to_string(),
            model,
            model_id: model_id.into(),
            shape,
            client,
        }
    }
}

#[async_trait]
impl SegmentationStrategy for HostedSegmentation {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> SegmentationModel {
        self.model
    }

    fn model_id(&self) -> Option<&str> {
        Some(&self.model_id)
    }

    async fn segment(
        &self,
        image: &ImageSample,
        _context: &AnalysisContext,
    ) -> Result<StrategyOutcome, StrategyError> {
        let body = self.client.infer(&self.model_id, image.encoded()).await?;
        let decoded = decode_regions(&body, self.shape)?;
        Ok(StrategyOutcome {
            regions: decoded.regions,
            confidence: decoded.confidence,
        })
    }
}
