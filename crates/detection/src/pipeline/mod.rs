pub mod builder;

use image::RgbImage;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    algorithms::{
        ColorRange, ContourExtractor, DouglasPeuckerSimplifier, MorphStep, clean, convert,
        detect_edges, range_mask,
    },
    config::{DetectionConfig, ObjectClass},
    error::Result,
    render::ContourRenderer,
    report::FrameDetections,
    traits::{ColorAssigner, FrameSource},
    types::{ColorSpace, Frame, Mask},
};

/// Intermediate images of one run, for debug output.
#[derive(Debug, Clone)]
pub struct PipelineStages {
    pub converted: Frame,
    pub mask: Mask,
    pub cleaned: Mask,
    pub edges: Mask,
}

/// Totals of a [`Pipeline::process_source`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceSummary {
    pub processed: usize,
    pub skipped: usize,
}

/// Color conversion, range masking, cleaning and contour extraction with one
/// validated configuration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    color_space: ColorSpace,
    range: ColorRange,
    clean_ops: Vec<MorphStep>,
    extractor: ContourExtractor,
    simplifier: Option<DouglasPeuckerSimplifier>,
    renderer: ContourRenderer,
}

impl Pipeline {
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    pub(crate) fn new(
        color_space: ColorSpace,
        range: ColorRange,
        clean_ops: Vec<MorphStep>,
        extractor: ContourExtractor,
        simplifier: Option<DouglasPeuckerSimplifier>,
        renderer: ContourRenderer,
    ) -> Self {
        Self { color_space, range, clean_ops, extractor, simplifier, renderer }
    }

    /// Validate the whole configuration before any frame is seen.
    pub fn from_config(config: &DetectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            config.color_space,
            config.color_range()?,
            config.clean_ops.clone(),
            ContourExtractor::new(config.edge_thresholds()?, config.retrieval),
            config.simplify_tolerance.map(DouglasPeuckerSimplifier::new),
            ContourRenderer::default(),
        ))
    }

    /// Pipeline using the built-in preset of `class`.
    pub fn for_class(class: ObjectClass) -> Result<Self> {
        Self::from_config(&class.preset())
    }

    /// Configuration this pipeline runs with.
    pub fn config(&self) -> DetectionConfig {
        DetectionConfig {
            color_space: self.color_space,
            color_low: self.range.low(),
            color_high: self.range.high(),
            clean_ops: self.clean_ops.clone(),
            edge_low_threshold: self.extractor.thresholds.low,
            edge_high_threshold: self.extractor.thresholds.high,
            retrieval: self.extractor.retrieval,
            simplify_tolerance: self.simplifier.map(|s| s.tolerance),
        }
    }

    pub fn process(&self, frame: &Frame) -> Result<FrameDetections> {
        self.process_with_stages(frame).map(|(detections, _)| detections)
    }

    /// Run every stage and keep the intermediate images.
    pub fn process_with_stages(&self, frame: &Frame) -> Result<(FrameDetections, PipelineStages)> {
        let converted = convert(frame, self.color_space)?;
        let mask = range_mask(&converted, &self.range);
        let cleaned = clean(&mask, &self.clean_ops)?;
        let edges = detect_edges(&cleaned, &self.extractor.thresholds)?;

        let mut contours = self.extractor.trace(&edges, &cleaned);
        if let Some(simplifier) = &self.simplifier {
            simplifier.simplify(&mut contours);
        }
        debug!(
            space = %self.color_space,
            coverage = cleaned.coverage(),
            contours = contours.len(),
            "frame processed"
        );

        let (width, height) = frame.dimensions();
        let detections = FrameDetections::new(width, height, contours);
        Ok((detections, PipelineStages { converted, mask, cleaned, edges }))
    }

    /// Process independent frames in parallel; results keep the input order.
    pub fn process_batch(&self, frames: &[Frame]) -> Vec<Result<FrameDetections>> {
        frames.par_iter().map(|frame| self.process(frame)).collect()
    }

    /// Pull frames until the source is exhausted, handing each result to
    /// `sink`. Frames that fail to load or process are logged and skipped.
    pub fn process_source<S, F>(&self, source: &mut S, mut sink: F) -> SourceSummary
    where
        S: FrameSource + ?Sized,
        F: FnMut(usize, FrameDetections),
    {
        self.process_source_with_stages(source, |index, detections, _| sink(index, detections))
    }

    /// [`process_source`](Self::process_source) that also hands every
    /// frame's intermediate images to `sink`.
    pub fn process_source_with_stages<S, F>(&self, source: &mut S, mut sink: F) -> SourceSummary
    where
        S: FrameSource + ?Sized,
        F: FnMut(usize, FrameDetections, PipelineStages),
    {
        let mut summary = SourceSummary::default();
        let mut index = 0;
        while let Some(next) = source.next_frame() {
            match next.and_then(|frame| self.process_with_stages(&frame)) {
                Ok((detections, stages)) => {
                    sink(index, detections, stages);
                    summary.processed += 1;
                }
                Err(e) => {
                    warn!(frame = index, error = %e, "skipping frame");
                    summary.skipped += 1;
                }
            }
            index += 1;
        }
        info!(processed = summary.processed, skipped = summary.skipped, "source exhausted");
        summary
    }

    /// Overlay of the detected contours on a black canvas of the frame's size.
    pub fn render(&self, detections: &FrameDetections, colors: &mut dyn ColorAssigner) -> RgbImage {
        self.renderer
            .render((detections.width, detections.height), &detections.contours, colors)
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        let ops: Vec<String> = self.clean_ops.iter().map(ToString::to_string).collect();
        format!(
            "Pipeline: {} range {:?}..={:?}, clean [{}], edges {}/{}, {} retrieval{}",
            self.color_space,
            self.range.low(),
            self.range.high(),
            ops.join(", "),
            self.extractor.thresholds.low,
            self.extractor.thresholds.high,
            self.extractor.retrieval,
            self.simplifier
                .map(|s| format!(", simplify {}", s.tolerance))
                .unwrap_or_default(),
        )
    }
}
