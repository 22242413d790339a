use thiserror::Error;

use crate::types::ColorSpace;

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Invalid color range on channel {channel}: low {low} > high {high}")]
    InvalidRange { channel: usize, low: u8, high: u8 },

    #[error("Invalid kernel size {width}x{height}: both dimensions must be positive")]
    InvalidKernel { width: u32, height: u32 },

    #[error("Invalid mask: {width}x{height} has a zero dimension")]
    InvalidMask { width: u32, height: u32 },

    #[error("Invalid edge thresholds: low {low}, high {high}")]
    InvalidThresholds { low: f32, high: f32 },

    #[error("Unsupported color conversion from {from} to {to}")]
    UnsupportedConversion { from: ColorSpace, to: ColorSpace },

    #[error("Unknown object class: {0}")]
    UnknownClass(String),

    #[error("Invalid calibration adjustment: {0}")]
    InvalidAdjustment(String),

    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFormat,

    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
}

pub type Result<T> = std::result::Result<T, DetectionError>;
