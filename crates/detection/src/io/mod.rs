pub mod geojson;
pub mod source;

pub use source::{ImageFileSource, is_image_file};
