//! Interactive tuning of a [`DetectionConfig`] against a fixed frame.
//!
//! Adjustments arrive as short text commands, for example
//!
//! ```text
//! low 0 120
//! high 2 160
//! edge 80
//! ratio 2.5
//! space lab
//! ops erode:5x5:1,dilate:3x3:2
//! retrieval tree
//! ```
//!
//! and every adjustment is validated before it replaces the current
//! configuration.

use std::{fmt, str::FromStr};

use serde::Serialize;
use tracing::debug;

use crate::{
    algorithms::{MorphStep, RetrievalMode},
    config::DetectionConfig,
    error::{DetectionError, Result},
    pipeline::Pipeline,
    types::{ColorSpace, Frame},
};

/// One change to the configuration under calibration.
#[derive(Debug, Clone, PartialEq)]
pub enum Adjustment {
    Low { channel: usize, value: u8 },
    High { channel: usize, value: u8 },
    /// New low edge threshold; the high threshold keeps the current ratio
    EdgeLow(f32),
    /// New high/low edge threshold ratio
    EdgeRatio(f32),
    Space(ColorSpace),
    Ops(Vec<MorphStep>),
    Retrieval(RetrievalMode),
}

fn invalid(msg: impl Into<String>) -> DetectionError {
    DetectionError::InvalidAdjustment(msg.into())
}

fn parse_arg<T: FromStr>(arg: Option<&str>, what: &str) -> Result<T> {
    let arg = arg.ok_or_else(|| invalid(format!("missing {what}")))?;
    arg.parse().map_err(|_| invalid(format!("invalid {what} '{arg}'")))
}

fn parse_channel(arg: Option<&str>) -> Result<usize> {
    let channel: usize = parse_arg(arg, "channel")?;
    if channel > 2 {
        return Err(channel_out_of_range(channel));
    }
    Ok(channel)
}

fn channel_out_of_range(channel: usize) -> DetectionError {
    invalid(format!("channel {channel} out of range 0..=2"))
}

fn channel_bound(bounds: &mut [u8; 3], channel: usize) -> Result<&mut u8> {
    bounds.get_mut(channel).ok_or_else(|| channel_out_of_range(channel))
}

impl FromStr for Adjustment {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self> {
        let mut words = s.split_whitespace();
        let command = words.next().ok_or_else(|| invalid("empty command"))?;
        let adjustment = match command.to_ascii_lowercase().as_str() {
            "low" => Adjustment::Low {
                channel: parse_channel(words.next())?,
                value: parse_arg(words.next(), "value")?,
            },
            "high" => Adjustment::High {
                channel: parse_channel(words.next())?,
                value: parse_arg(words.next(), "value")?,
            },
            "edge" => Adjustment::EdgeLow(parse_arg(words.next(), "threshold")?),
            "ratio" => Adjustment::EdgeRatio(parse_arg(words.next(), "ratio")?),
            "space" => Adjustment::Space(parse_arg(words.next(), "color space")?),
            "retrieval" => Adjustment::Retrieval(parse_arg(words.next(), "retrieval mode")?),
            "ops" => {
                let steps = words.next().unwrap_or("");
                let ops = steps
                    .split(',')
                    .filter(|step| !step.is_empty())
                    .map(MorphStep::from_str)
                    .collect::<Result<Vec<_>>>()?;
                Adjustment::Ops(ops)
            }
            other => return Err(invalid(format!("unknown command '{other}'"))),
        };
        if let Some(extra) = words.next() {
            return Err(invalid(format!("unexpected argument '{extra}'")));
        }
        Ok(adjustment)
    }
}

/// What the current configuration makes of the calibration frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationReading {
    /// Foreground fraction of the raw range mask
    pub mask_coverage: f32,
    /// Foreground fraction after cleaning
    pub cleaned_coverage: f32,
    pub contours: usize,
    pub top_level: usize,
    pub holes: usize,
}

impl fmt::Display for CalibrationReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mask {:.1}%, cleaned {:.1}%, {} contours ({} top-level, {} holes)",
            self.mask_coverage * 100.0,
            self.cleaned_coverage * 100.0,
            self.contours,
            self.top_level,
            self.holes,
        )
    }
}

/// A frame and the configuration being tuned on it.
#[derive(Debug, Clone)]
pub struct Calibration {
    frame: Frame,
    config: DetectionConfig,
    pipeline: Pipeline,
}

impl Calibration {
    pub fn new(frame: Frame, config: DetectionConfig) -> Result<Self> {
        let pipeline = Pipeline::from_config(&config)?;
        Ok(Self { frame, config, pipeline })
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Apply `adjustment`; on error the current configuration is kept.
    pub fn apply(&mut self, adjustment: Adjustment) -> Result<()> {
        let mut next = self.config.clone();
        match adjustment {
            Adjustment::Low { channel, value } => *channel_bound(&mut next.color_low, channel)? = value,
            Adjustment::High { channel, value } => {
                *channel_bound(&mut next.color_high, channel)? = value
            }
            Adjustment::EdgeLow(low) => {
                let ratio = self.config.edge_thresholds()?.ratio();
                next.edge_low_threshold = low;
                next.edge_high_threshold = low * ratio;
            }
            Adjustment::EdgeRatio(ratio) => {
                next.edge_high_threshold = next.edge_low_threshold * ratio;
            }
            Adjustment::Space(space) => next.color_space = space,
            Adjustment::Ops(ops) => next.clean_ops = ops,
            Adjustment::Retrieval(mode) => next.retrieval = mode,
        }

        let pipeline = Pipeline::from_config(&next)?;
        debug!(config = %pipeline.info(), "calibration adjusted");
        self.config = next;
        self.pipeline = pipeline;
        Ok(())
    }

    /// Parse and apply a text command.
    pub fn apply_command(&mut self, command: &str) -> Result<()> {
        self.apply(command.parse()?)
    }

    pub fn evaluate(&self) -> Result<CalibrationReading> {
        let (detections, stages) = self.pipeline.process_with_stages(&self.frame)?;
        Ok(CalibrationReading {
            mask_coverage: stages.mask.coverage(),
            cleaned_coverage: stages.cleaned.coverage(),
            contours: detections.contours.len(),
            top_level: detections.contours.top_level_count(),
            holes: detections.contours.hole_count(),
        })
    }

    pub fn into_config(self) -> DetectionConfig {
        self.config
    }
}
