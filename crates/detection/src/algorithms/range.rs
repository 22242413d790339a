use tracing::debug;

use crate::{
    error::{DetectionError, Result},
    types::{Frame, Mask},
};

/// Inclusive per-channel color box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorRange {
    low: [u8; 3],
    high: [u8; 3],
}

impl ColorRange {
    pub fn new(low: [u8; 3], high: [u8; 3]) -> Result<Self> {
        for channel in 0..3 {
            if low[channel] > high[channel] {
                return Err(DetectionError::InvalidRange {
                    channel,
                    low: low[channel],
                    high: high[channel],
                });
            }
        }
        Ok(Self { low, high })
    }

    pub fn low(&self) -> [u8; 3] {
        self.low
    }

    pub fn high(&self) -> [u8; 3] {
        self.high
    }

    pub fn contains(&self, pixel: [u8; 3]) -> bool {
        pixel
            .iter()
            .zip(self.low.iter().zip(&self.high))
            .all(|(v, (lo, hi))| lo <= v && v <= hi)
    }
}

/// Foreground wherever every channel lies inside `range`.
pub fn range_mask(frame: &Frame, range: &ColorRange) -> Mask {
    let pixels = frame.pixels();
    let mask = Mask::from_fn(frame.width(), frame.height(), |x, y| {
        range.contains(pixels.get_pixel(x, y).0)
    });
    debug!(coverage = mask.coverage(), "range mask");
    mask
}

/// Validate `low`/`high` and build the mask in one step.
pub fn mask(frame: &Frame, low: [u8; 3], high: [u8; 3]) -> Result<Mask> {
    let range = ColorRange::new(low, high)?;
    Ok(range_mask(frame, &range))
}
