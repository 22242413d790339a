use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    types::{BoundingBox, ContourSet, Point},
};

/// Structured description of one traced contour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectionResult {
    /// Position in the contour set
    pub index: usize,
    pub points: Vec<Point>,
    /// Enclosing contour, if any
    pub parent: Option<usize>,
    pub is_hole: bool,
    /// Number of ancestors in the hierarchy
    pub depth: usize,
    pub bbox: BoundingBox,
    pub centroid: [f64; 2],
    pub area: f64,
}

/// One result per contour, in contour order.
pub fn report(set: &ContourSet) -> Vec<DetectionResult> {
    set.contours
        .iter()
        .enumerate()
        .map(|(index, contour)| DetectionResult {
            index,
            points: contour.points.clone(),
            parent: set.hierarchy.parent(index),
            is_hole: contour.is_hole,
            depth: set.hierarchy.depth(index),
            bbox: contour.bounding_box(),
            centroid: contour.centroid(),
            area: contour.area(),
        })
        .collect()
}

/// Everything detected in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDetections {
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub contours: ContourSet,
    pub detections: Vec<DetectionResult>,
}

impl FrameDetections {
    pub fn new(width: u32, height: u32, contours: ContourSet) -> Self {
        let detections = report(&contours);
        Self { width, height, contours, detections }
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    /// Detections that bound a region rather than a hole.
    pub fn objects(&self) -> impl Iterator<Item = &DetectionResult> {
        self.detections.iter().filter(|d| !d.is_hole)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
