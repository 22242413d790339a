pub mod color;
pub mod range;
pub mod morphology;
pub mod edges;
pub mod extraction;
pub mod simplification;

pub use color::convert;
pub use range::{ColorRange, range_mask};
pub use morphology::{MorphOp, MorphStep, clean};
pub use edges::{DEFAULT_EDGE_RATIO, EdgeThresholds, detect_edges};
pub use extraction::{ContourExtractor, RetrievalMode, compress_chain, extract};
pub use simplification::DouglasPeuckerSimplifier;
