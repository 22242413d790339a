use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::ValueEnum;
use detection::{
    DetectionConfig, DetectionError, DetectionProfiles, FrameDetections, ImageFileSource,
    ObjectClass, PipelineStages,
};
use image::RgbImage;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Detection(#[from] DetectionError),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("No input images found")]
    NoInputs,
    #[error("Either --class or --config is required")]
    MissingConfig,
}

/// Which structured reports to write per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    Json,
    #[default]
    Geojson,
    Both,
    /// Overlay images only
    #[value(name = "none")]
    Off,
}

/// Serialization used when printing or saving profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ConfigFormat {
    #[default]
    Toml,
    Json,
}

/// Pick the configuration for a run.
///
/// An explicit config file wins; otherwise `class` is looked up in the
/// profiles file, or in the built-in presets when no file is given.
pub fn resolve_config(
    class: Option<ObjectClass>,
    profiles: Option<&Path>,
    config: Option<&Path>,
) -> Result<DetectionConfig, CliError> {
    if let Some(path) = config {
        return Ok(DetectionConfig::from_file(path)?);
    }
    let class = class.ok_or(CliError::MissingConfig)?;
    let profiles = load_profiles(profiles)?;
    Ok(profiles.get(class)?.clone())
}

/// Profiles from `path`, or the presets.
pub fn load_profiles(path: Option<&Path>) -> Result<DetectionProfiles, CliError> {
    Ok(match path {
        Some(path) => DetectionProfiles::from_file(path)?,
        None => DetectionProfiles::presets(),
    })
}

pub fn render_profiles(profiles: &DetectionProfiles, format: ConfigFormat) -> Result<String, CliError> {
    Ok(match format {
        ConfigFormat::Toml => profiles.to_toml()?,
        ConfigFormat::Json => profiles.to_json()?,
    })
}

/// Image source over `inputs`: a single directory is expanded to its images.
pub fn open_inputs(inputs: &[PathBuf]) -> Result<ImageFileSource, CliError> {
    let source = match inputs {
        [dir] if dir.is_dir() => ImageFileSource::from_dir(dir)?,
        files => ImageFileSource::new(files.iter().cloned()),
    };
    if source.remaining() == 0 {
        return Err(CliError::NoInputs);
    }
    Ok(source)
}

/// Output file stem for the frame read from `path`.
pub fn frame_stem(index: usize, path: Option<&Path>) -> String {
    path.and_then(|p| p.file_stem())
        .and_then(|s| s.to_str())
        .map_or_else(|| format!("frame_{index:04}"), str::to_string)
}

/// One line of the run summary.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FrameSummary {
    pub frame: String,
    pub objects: usize,
    pub holes: usize,
}

impl FrameSummary {
    pub fn new(frame: impl Into<String>, detections: &FrameDetections) -> Self {
        Self {
            frame: frame.into(),
            objects: detections.objects().count(),
            holes: detections.contours.hole_count(),
        }
    }
}

/// Writes reports and images of processed frames into one directory.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
    format: ReportFormat,
}

impl OutputWriter {
    pub fn new(dir: impl Into<PathBuf>, format: ReportFormat) -> Result<Self, CliError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, format })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_reports(&self, stem: &str, detections: &FrameDetections) -> Result<(), CliError> {
        if matches!(self.format, ReportFormat::Json | ReportFormat::Both) {
            detections.save_json(self.dir.join(format!("{stem}.json")))?;
        }
        if matches!(self.format, ReportFormat::Geojson | ReportFormat::Both) {
            detections.save_geojson(self.dir.join(format!("{stem}.geojson")))?;
        }
        Ok(())
    }

    pub fn write_overlay(&self, stem: &str, overlay: &RgbImage) -> Result<(), CliError> {
        overlay.save(self.dir.join(format!("{stem}_contours.png")))?;
        Ok(())
    }

    /// Dump every intermediate image of a frame.
    pub fn write_stages(&self, stem: &str, stages: &PipelineStages) -> Result<(), CliError> {
        stages.converted.pixels().save(self.dir.join(format!("{stem}_converted.png")))?;
        stages.mask.as_image().save(self.dir.join(format!("{stem}_mask.png")))?;
        stages.cleaned.as_image().save(self.dir.join(format!("{stem}_cleaned.png")))?;
        stages.edges.as_image().save(self.dir.join(format!("{stem}_edges.png")))?;
        Ok(())
    }

    pub fn write_summary(&self, frames: &[FrameSummary]) -> Result<PathBuf, CliError> {
        let path = self.dir.join("summary.json");
        fs::write(&path, serde_json::to_string_pretty(frames)?)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detection::{ColorSpace, Frame, Pipeline};
    use image::Rgb;

    fn detections() -> (FrameDetections, PipelineStages) {
        let mut img = RgbImage::new(40, 40);
        for y in 10..30 {
            for x in 10..30 {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let frame = Frame::new(img, ColorSpace::Rgb).unwrap();
        Pipeline::builder()
            .color_range([200, 200, 200], [255, 255, 255])
            .build()
            .unwrap()
            .process_with_stages(&frame)
            .unwrap()
    }

    #[test]
    fn config_resolution_order() {
        assert!(matches!(resolve_config(None, None, None), Err(CliError::MissingConfig)));
        assert_eq!(
            resolve_config(Some(ObjectClass::Tin), None, None).unwrap(),
            ObjectClass::Tin.preset()
        );

        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("bottle.json");
        std::fs::write(&config_path, ObjectClass::Bottle.preset().to_json().unwrap()).unwrap();
        let config = resolve_config(Some(ObjectClass::Tin), None, Some(&config_path)).unwrap();
        assert_eq!(config, ObjectClass::Bottle.preset());
    }

    #[test]
    fn stems_fall_back_to_index() {
        assert_eq!(frame_stem(3, Some(Path::new("/tmp/shot_01.png"))), "shot_01");
        assert_eq!(frame_stem(3, None), "frame_0003");
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(open_inputs(&[dir.path().to_path_buf()]), Err(CliError::NoInputs)));
    }

    #[test]
    fn writer_respects_format() {
        let dir = tempfile::tempdir().unwrap();
        let (frame, stages) = detections();

        let writer = OutputWriter::new(dir.path().join("out"), ReportFormat::Json).unwrap();
        writer.write_reports("a", &frame).unwrap();
        writer.write_stages("a", &stages).unwrap();
        assert!(writer.dir().join("a.json").exists());
        assert!(!writer.dir().join("a.geojson").exists());
        assert!(writer.dir().join("a_edges.png").exists());

        let summary = writer.write_summary(&[FrameSummary::new("a", &frame)]).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(summary).unwrap()).unwrap();
        assert_eq!(value[0]["objects"], 1);
    }
}
