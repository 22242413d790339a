use crate::{
    algorithms::{MorphStep, RetrievalMode},
    config::DetectionConfig,
    error::Result,
    pipeline::Pipeline,
    render::ContourRenderer,
    types::ColorSpace,
};

/// Builder for creating processing pipelines with a fluent API.
///
/// Nothing is validated until [`PipelineBuilder::build`].
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    config: DetectionConfig,
    line_thickness: u32,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::from_config(DetectionConfig::default())
    }

    /// Start from an existing configuration.
    pub fn from_config(config: DetectionConfig) -> Self {
        Self {
            config,
            line_thickness: ContourRenderer::default().thickness,
        }
    }

    pub fn color_space(mut self, space: ColorSpace) -> Self {
        self.config.color_space = space;
        self
    }

    pub fn color_range(mut self, low: [u8; 3], high: [u8; 3]) -> Self {
        self.config.color_low = low;
        self.config.color_high = high;
        self
    }

    /// Append an erosion with a square kernel
    pub fn erode(self, size: u32, iterations: u32) -> Self {
        self.add_step(MorphStep::erode(size, iterations))
    }

    /// Append a dilation with a square kernel
    pub fn dilate(self, size: u32, iterations: u32) -> Self {
        self.add_step(MorphStep::dilate(size, iterations))
    }

    pub fn add_step(mut self, step: MorphStep) -> Self {
        self.config.clean_ops.push(step);
        self
    }

    pub fn edge_thresholds(mut self, low: f32, high: f32) -> Self {
        self.config.edge_low_threshold = low;
        self.config.edge_high_threshold = high;
        self
    }

    /// Keep the low threshold, set `high = low * ratio`
    pub fn edge_ratio(mut self, ratio: f32) -> Self {
        self.config.edge_high_threshold = self.config.edge_low_threshold * ratio;
        self
    }

    pub fn retrieval(mut self, mode: RetrievalMode) -> Self {
        self.config.retrieval = mode;
        self
    }

    /// Add Douglas-Peucker simplification after tracing
    pub fn with_simplification(mut self, tolerance: f64) -> Self {
        self.config.simplify_tolerance = Some(tolerance);
        self
    }

    /// Stroke width used by [`Pipeline::render`]
    pub fn line_thickness(mut self, thickness: u32) -> Self {
        self.line_thickness = thickness;
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        let mut pipeline = Pipeline::from_config(&self.config)?;
        pipeline.renderer = ContourRenderer::new(self.line_thickness);
        Ok(pipeline)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
