//! # Color-Based Object Detection Library
//!
//! Finds regions of a known color in camera frames using classical image
//! processing: color-space conversion, per-channel range masking,
//! morphological cleanup, hysteresis edge detection and contour tracing
//! with a containment hierarchy.
//!
//! ## Core Features
//!
//! - **Configurable pipeline**: one validated configuration drives every stage
//! - **Per-class presets**: paper, tin, bottle and field settings, loadable from TOML or JSON
//! - **Hole-aware contours**: outer boundaries and holes linked in a hierarchy
//! - **Structured output**: JSON and GeoJSON reports, debug overlays
//! - **Calibration**: text-driven tuning of a configuration on a still frame
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use detection::{Frame, ObjectClass, Pipeline};
//!
//! let pipeline = Pipeline::for_class(ObjectClass::Bottle)?;
//! let frame = Frame::open("frame.png")?;
//! let detections = pipeline.process(&frame)?;
//!
//! for object in detections.objects() {
//!     println!("object at {:?}, area {}", object.centroid, object.area);
//! }
//! detections.save_geojson("frame.geojson")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom Pipeline
//!
//! ```rust,no_run
//! use detection::{ColorSpace, Pipeline, RetrievalMode};
//!
//! let pipeline = Pipeline::builder()
//!     .color_space(ColorSpace::Lab)
//!     .color_range([150, 110, 130], [240, 125, 150])
//!     .erode(5, 1)
//!     .dilate(3, 2)
//!     .edge_thresholds(100.0, 200.0)
//!     .retrieval(RetrievalMode::Tree)
//!     .with_simplification(1.5)
//!     .build()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod types;
pub mod traits;
pub mod algorithms;
pub mod config;
pub mod render;
pub mod report;
pub mod pipeline;
pub mod calibrate;
pub mod io;

pub use error::{DetectionError, Result};
pub use types::{
    BoundingBox, ColorSpace, Contour, ContourHierarchy, ContourSet, Frame, HierarchyNode, Mask,
    Point,
};
pub use traits::*;
pub use algorithms::*;
pub use config::{DetectionConfig, DetectionProfiles, ObjectClass};
pub use render::{ContourRenderer, Palette, RandomColors};
pub use report::{DetectionResult, FrameDetections, report};
pub use pipeline::{Pipeline, PipelineStages, SourceSummary, builder::PipelineBuilder};
pub use calibrate::{Adjustment, Calibration, CalibrationReading};
pub use io::{ImageFileSource, is_image_file};
