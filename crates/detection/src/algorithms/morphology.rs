//! Binary erosion and dilation with rectangular all-ones kernels.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::debug;

use crate::{
    error::{DetectionError, Result},
    types::{BACKGROUND, Mask},
};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MorphOp {
    /// Keep a pixel only if the whole footprint is foreground
    Erode,
    /// Set a pixel if any footprint pixel is foreground
    Dilate,
}

/// One cleaning step: `op` with a `width x height` kernel, repeated `iterations` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MorphStep {
    pub op: MorphOp,
    /// Kernel width and height in pixels
    pub kernel: [u32; 2],
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

fn default_iterations() -> u32 {
    1
}

impl MorphStep {
    pub fn new(op: MorphOp, width: u32, height: u32, iterations: u32) -> Self {
        Self { op, kernel: [width, height], iterations }
    }

    pub fn erode(size: u32, iterations: u32) -> Self {
        Self::new(MorphOp::Erode, size, size, iterations)
    }

    pub fn dilate(size: u32, iterations: u32) -> Self {
        Self::new(MorphOp::Dilate, size, size, iterations)
    }

    pub fn validate(&self) -> Result<()> {
        let [width, height] = self.kernel;
        if width == 0 || height == 0 {
            return Err(DetectionError::InvalidKernel { width, height });
        }
        Ok(())
    }

    /// Apply this step to `mask`.
    pub fn apply(&self, mask: &Mask) -> Result<Mask> {
        self.validate()?;
        let [width, height] = self.kernel;
        let mut current = mask.clone();
        for _ in 0..self.iterations {
            current = match self.op {
                MorphOp::Erode => morph(&current, width, height, Extremum::Min),
                MorphOp::Dilate => morph(&current, width, height, Extremum::Max),
            };
        }
        Ok(current)
    }
}

impl std::fmt::Display for MorphStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}x{}:{}", self.op, self.kernel[0], self.kernel[1], self.iterations)
    }
}

impl std::str::FromStr for MorphStep {
    type Err = DetectionError;

    /// Parse `op:WxH:iterations`, e.g. `erode:5x5:1`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || DetectionError::InvalidAdjustment(format!("bad morphology step `{s}`"));
        let mut parts = s.trim().split(':');
        let op: MorphOp = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let (w, h) = parts.next().and_then(|p| p.split_once('x')).ok_or_else(invalid)?;
        let width = w.trim().parse().map_err(|_| invalid())?;
        let height = h.trim().parse().map_err(|_| invalid())?;
        let iterations = match parts.next() {
            Some(n) => n.trim().parse().map_err(|_| invalid())?,
            None => 1,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        let step = MorphStep::new(op, width, height, iterations);
        step.validate()?;
        Ok(step)
    }
}

/// Apply `ops` strictly in the given order.
pub fn clean(mask: &Mask, ops: &[MorphStep]) -> Result<Mask> {
    for step in ops {
        step.validate()?;
    }
    let mut current = mask.clone();
    for step in ops {
        current = step.apply(&current)?;
        debug!(%step, foreground = current.foreground_count(), "morphology step");
    }
    Ok(current)
}

#[derive(Clone, Copy)]
enum Extremum {
    Min,
    Max,
}

/// Separable rectangular min/max filter.
///
/// The anchor sits at `(width / 2, height / 2)`. Pixels outside the image do
/// not take part, so regions touching the border are neither eroded nor grown
/// from outside.
fn morph(mask: &Mask, kernel_width: u32, kernel_height: u32, extremum: Extremum) -> Mask {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return mask.clone();
    }
    let source = mask.as_image();

    let window = |center: u32, size: u32, limit: u32| -> (u32, u32) {
        let anchor = (size / 2) as i64;
        let start = (center as i64 - anchor).max(0);
        let end = (center as i64 - anchor + size as i64 - 1).min(limit as i64 - 1);
        (start as u32, end as u32)
    };
    let reduce = |acc: bool, v: bool| match extremum {
        Extremum::Min => acc && v,
        Extremum::Max => acc || v,
    };
    let identity = matches!(extremum, Extremum::Min);

    let mut rows = vec![false; width as usize * height as usize];
    for y in 0..height {
        for x in 0..width {
            let (x0, x1) = window(x, kernel_width, width);
            rows[(y * width + x) as usize] = (x0..=x1)
                .map(|sx| source.get_pixel(sx, y).0[0] != BACKGROUND)
                .fold(identity, reduce);
        }
    }

    Mask::from_fn(width, height, |x, y| {
        let (y0, y1) = window(y, kernel_height, height);
        (y0..=y1)
            .map(|sy| rows[(sy * width + x) as usize])
            .fold(identity, reduce)
    })
}
