//! Dual-threshold (hysteresis) edge detection on binary masks.

use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{DetectionError, Result},
    types::Mask,
};

/// Ratio between the high and low threshold used by the detection scripts.
pub const DEFAULT_EDGE_RATIO: f32 = 2.0;

/// Gradient magnitude thresholds.
///
/// Magnitudes above `high` are strong edges; magnitudes in `[low, high]` are
/// kept only when 8-connected to a strong edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EdgeThresholds {
    pub low: f32,
    pub high: f32,
}

impl Default for EdgeThresholds {
    fn default() -> Self {
        Self { low: 100.0, high: 100.0 * DEFAULT_EDGE_RATIO }
    }
}

impl EdgeThresholds {
    pub fn new(low: f32, high: f32) -> Result<Self> {
        let thresholds = Self { low, high };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// `high = low * ratio`
    pub fn with_ratio(low: f32, ratio: f32) -> Result<Self> {
        Self::new(low, low * ratio)
    }

    pub fn validate(&self) -> Result<()> {
        let Self { low, high } = *self;
        if !low.is_finite() || !high.is_finite() || low < 0.0 || high < low {
            return Err(DetectionError::InvalidThresholds { low, high });
        }
        Ok(())
    }

    pub fn ratio(&self) -> f32 {
        if self.low > 0.0 { self.high / self.low } else { DEFAULT_EDGE_RATIO }
    }
}

/// Thin edge map of `mask`.
///
/// Sobel gradients, L2 magnitude, non-maximum suppression along the
/// gradient direction quantized to four bins, then hysteresis. Pixels
/// outside the frame count as background, so a region cut by the frame
/// edge still gets a closed stroke. Suppression keeps ties, so a step edge
/// between two regions may yield a two pixel wide stroke; strokes stay
/// 8-connected around corners.
pub fn detect_edges(mask: &Mask, thresholds: &EdgeThresholds) -> Result<Mask> {
    thresholds.validate()?;
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return Err(DetectionError::InvalidMask { width, height });
    }

    // work on the framed copy; (x, y) of the mask is (x + 1, y + 1) here
    let framed = mask.framed();
    let (fw, fh) = framed.dimensions();
    let gx = horizontal_sobel(&framed);
    let gy = vertical_sobel(&framed);

    let idx = |x: u32, y: u32| (y * fw + x) as usize;
    let mut magnitude = vec![0f32; fw as usize * fh as usize];
    let mut direction = vec![Direction::Horizontal; magnitude.len()];
    for y in 0..fh {
        for x in 0..fw {
            let dx = gx.get_pixel(x, y).0[0] as f32;
            let dy = gy.get_pixel(x, y).0[0] as f32;
            magnitude[idx(x, y)] = dx.hypot(dy);
            direction[idx(x, y)] = Direction::quantize(dx, dy);
        }
    }

    let at = |x: i64, y: i64| -> f32 {
        if x < 0 || y < 0 || x >= fw as i64 || y >= fh as i64 {
            0.0
        } else {
            magnitude[(y as u32 * fw + x as u32) as usize]
        }
    };

    let mut suppressed = vec![0f32; magnitude.len()];
    for y in 0..fh {
        for x in 0..fw {
            let m = magnitude[idx(x, y)];
            if m == 0.0 {
                continue;
            }
            let (ox, oy) = direction[idx(x, y)].offset();
            let (xi, yi) = (x as i64, y as i64);
            if m >= at(xi - ox, yi - oy) && m >= at(xi + ox, yi + oy) {
                suppressed[idx(x, y)] = m;
            }
        }
    }

    let mut is_edge = vec![false; magnitude.len()];
    let mut stack: Vec<(u32, u32)> = Vec::new();
    for y in 0..fh {
        for x in 0..fw {
            if suppressed[idx(x, y)] > thresholds.high {
                is_edge[idx(x, y)] = true;
                stack.push((x, y));
            }
        }
    }
    let strong = stack.len();

    while let Some((x, y)) = stack.pop() {
        for ny in y.saturating_sub(1)..=(y + 1).min(fh - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(fw - 1) {
                let i = idx(nx, ny);
                if !is_edge[i] && suppressed[i] >= thresholds.low {
                    is_edge[i] = true;
                    stack.push((nx, ny));
                }
            }
        }
    }

    let edges = Mask::from_fn(width, height, |x, y| is_edge[idx(x + 1, y + 1)]);
    debug!(strong, total = edges.foreground_count(), "edge detection");
    Ok(edges)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Horizontal,
    Diagonal,
    Vertical,
    AntiDiagonal,
}

impl Direction {
    /// Bin the gradient angle; y grows downwards.
    fn quantize(dx: f32, dy: f32) -> Self {
        let mut angle = dy.atan2(dx).to_degrees();
        if angle < 0.0 {
            angle += 180.0;
        }
        if !(22.5..157.5).contains(&angle) {
            Direction::Horizontal
        } else if angle < 67.5 {
            Direction::Diagonal
        } else if angle < 112.5 {
            Direction::Vertical
        } else {
            Direction::AntiDiagonal
        }
    }

    /// Step towards one of the two neighbours compared during suppression.
    fn offset(self) -> (i64, i64) {
        match self {
            Direction::Horizontal => (1, 0),
            Direction::Diagonal => (1, 1),
            Direction::Vertical => (0, 1),
            Direction::AntiDiagonal => (1, -1),
        }
    }
}
