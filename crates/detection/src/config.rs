//! Per-class detection settings and their on-disk representation.

use std::{collections::BTreeMap, path::Path};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr, VariantNames};

use crate::{
    algorithms::{ColorRange, EdgeThresholds, MorphStep, RetrievalMode},
    error::{DetectionError, Result},
    types::ColorSpace,
};

/// Kinds of object the rig is asked to find.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ObjectClass {
    Paper,
    Tin,
    Bottle,
    /// Playing field markings
    Field,
}

impl ObjectClass {
    /// Built-in starting configuration for this class.
    pub fn preset(self) -> DetectionConfig {
        match self {
            // bright, nearly colourless
            ObjectClass::Paper => DetectionConfig {
                color_space: ColorSpace::YCrCb,
                color_low: [150, 115, 115],
                color_high: [255, 140, 140],
                clean_ops: vec![MorphStep::erode(3, 1), MorphStep::dilate(3, 2)],
                ..DetectionConfig::default()
            },
            // low saturation, mid brightness
            ObjectClass::Tin => DetectionConfig {
                color_space: ColorSpace::Hsv,
                color_low: [0, 0, 80],
                color_high: [179, 60, 220],
                clean_ops: vec![MorphStep::erode(3, 1), MorphStep::dilate(5, 2)],
                ..DetectionConfig::default()
            },
            ObjectClass::Bottle => DetectionConfig {
                color_space: ColorSpace::YCrCb,
                color_low: [25, 100, 95],
                color_high: [105, 140, 145],
                clean_ops: vec![MorphStep::dilate(6, 2), MorphStep::erode(3, 1)],
                ..DetectionConfig::default()
            },
            ObjectClass::Field => DetectionConfig {
                color_space: ColorSpace::Lab,
                color_low: [150, 110, 130],
                color_high: [240, 125, 150],
                clean_ops: vec![MorphStep::erode(5, 1), MorphStep::dilate(3, 2)],
                ..DetectionConfig::default()
            },
        }
    }
}

/// Everything one detection run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectionConfig {
    /// Space the frame is converted to before masking
    pub color_space: ColorSpace,
    /// Inclusive lower bound per channel
    pub color_low: [u8; 3],
    /// Inclusive upper bound per channel
    pub color_high: [u8; 3],
    /// Morphological steps, applied in order
    #[serde(default)]
    pub clean_ops: Vec<MorphStep>,
    pub edge_low_threshold: f32,
    pub edge_high_threshold: f32,
    #[serde(default)]
    pub retrieval: RetrievalMode,
    /// Douglas-Peucker tolerance in pixels; no simplification when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simplify_tolerance: Option<f64>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let edges = EdgeThresholds::default();
        Self {
            color_space: ColorSpace::Rgb,
            color_low: [0; 3],
            color_high: [255; 3],
            clean_ops: Vec::new(),
            edge_low_threshold: edges.low,
            edge_high_threshold: edges.high,
            retrieval: RetrievalMode::default(),
            simplify_tolerance: None,
        }
    }
}

impl DetectionConfig {
    pub fn color_range(&self) -> Result<ColorRange> {
        ColorRange::new(self.color_low, self.color_high)
    }

    pub fn edge_thresholds(&self) -> Result<EdgeThresholds> {
        EdgeThresholds::new(self.edge_low_threshold, self.edge_high_threshold)
    }

    /// Check the range, every kernel and the thresholds.
    pub fn validate(&self) -> Result<()> {
        self.color_range()?;
        for step in &self.clean_ops {
            step.validate()?;
        }
        self.edge_thresholds()?;
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a single configuration from a `.toml` or `.json` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match file_format(path)? {
            Format::Toml => Self::from_toml_str(&contents),
            Format::Json => Self::from_json_str(&contents),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DetectionConfig)
    }
}

/// Detection settings keyed by object class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct DetectionProfiles {
    pub classes: BTreeMap<ObjectClass, DetectionConfig>,
}

impl Default for DetectionProfiles {
    fn default() -> Self {
        Self::presets()
    }
}

impl DetectionProfiles {
    pub fn empty() -> Self {
        Self { classes: BTreeMap::new() }
    }

    /// Built-in preset for every class.
    pub fn presets() -> Self {
        Self {
            classes: ObjectClass::iter().map(|class| (class, class.preset())).collect(),
        }
    }

    pub fn get(&self, class: ObjectClass) -> Result<&DetectionConfig> {
        self.classes
            .get(&class)
            .ok_or_else(|| DetectionError::UnknownClass(class.to_string()))
    }

    /// Look up by class name, e.g. `"bottle"`.
    pub fn get_by_name(&self, name: &str) -> Result<&DetectionConfig> {
        let class: ObjectClass = name
            .parse()
            .map_err(|_| DetectionError::UnknownClass(name.to_string()))?;
        self.get(class)
    }

    pub fn insert(&mut self, class: ObjectClass, config: DetectionConfig) -> Option<DetectionConfig> {
        self.classes.insert(class, config)
    }

    pub fn validate(&self) -> Result<()> {
        self.classes.values().try_for_each(DetectionConfig::validate)
    }

    /// Load from a `.toml` or `.json` file; every entry is validated.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let profiles: Self = match file_format(path)? {
            Format::Toml => toml::from_str(&contents)?,
            Format::Json => serde_json::from_str(&contents)?,
        };
        profiles.validate()?;
        Ok(profiles)
    }

    /// Write to a `.toml` or `.json` file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let contents = match file_format(path)? {
            Format::Toml => self.to_toml()?,
            Format::Json => self.to_json()?,
        };
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DetectionProfiles)
    }

    pub fn class_names() -> &'static [&'static str] {
        <ObjectClass as VariantNames>::VARIANTS
    }
}

enum Format {
    Toml,
    Json,
}

fn file_format(path: &Path) -> Result<Format> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());
    match extension.as_deref() {
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DetectionError::UnsupportedFormat),
    }
}
