//! Color space conversion of three channel frames.
//!
//! All encodings are 8-bit and follow the conventions common in vision
//! libraries, so ranges calibrated elsewhere can be reused as-is.

use image::Rgb;
use palette::{FromColor, Lab, Srgb};
use tracing::debug;

use crate::{
    error::{DetectionError, Result},
    types::{ColorSpace, Frame},
};

/// Re-express `frame` in `target`.
///
/// Frames in [`ColorSpace::Rgb`] or [`ColorSpace::Bgr`] can be converted to
/// every space; any frame converts to its own space unchanged.
pub fn convert(frame: &Frame, target: ColorSpace) -> Result<Frame> {
    let source = frame.space();
    if source == target {
        return Ok(frame.clone());
    }

    let to_rgb: fn([u8; 3]) -> [u8; 3] = match source {
        ColorSpace::Rgb => |p| p,
        ColorSpace::Bgr => |[b, g, r]| [r, g, b],
        _ => {
            return Err(DetectionError::UnsupportedConversion { from: source, to: target });
        }
    };

    let from_rgb: fn([u8; 3]) -> [u8; 3] = match target {
        ColorSpace::Rgb => |p| p,
        ColorSpace::Bgr => |[r, g, b]| [b, g, r],
        ColorSpace::Lab => rgb_to_lab,
        ColorSpace::YCrCb => rgb_to_ycrcb,
        ColorSpace::Hsv => rgb_to_hsv,
    };

    let mut pixels = frame.pixels().clone();
    for pixel in pixels.pixels_mut() {
        *pixel = Rgb(from_rgb(to_rgb(pixel.0)));
    }

    debug!(%source, %target, width = frame.width(), height = frame.height(), "converted frame");
    Frame::new(pixels, target)
}

fn saturate(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// RGB to 8-bit L*a*b* under D65: `L` scaled to 0..=255, `a` and `b`
/// offset by 128.
pub fn rgb_to_lab([r, g, b]: [u8; 3]) -> [u8; 3] {
    let srgb = Srgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    let lab: Lab = Lab::from_color(srgb);
    [saturate(lab.l * 255.0 / 100.0), saturate(lab.a + 128.0), saturate(lab.b + 128.0)]
}

/// RGB to 8-bit Y, Cr, Cb.
pub fn rgb_to_ycrcb([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cr = (r - y) * 0.713 + 128.0;
    let cb = (b - y) * 0.564 + 128.0;
    [saturate(y), saturate(cr), saturate(cb)]
}

/// RGB to 8-bit HSV with hue in 0..180.
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let saturation = if max > 0.0 { 255.0 * delta / max } else { 0.0 };
    let mut hue = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if hue < 0.0 {
        hue += 360.0;
    }

    [saturate(hue / 2.0).min(179), saturate(saturation), saturate(max)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn close(a: [u8; 3], b: [u8; 3]) -> bool {
        a.iter().zip(b).all(|(&x, y)| x.abs_diff(y) <= 1)
    }

    #[test]
    fn lab_reference_values() {
        assert!(close(rgb_to_lab([255, 255, 255]), [255, 128, 128]));
        assert!(close(rgb_to_lab([0, 0, 0]), [0, 128, 128]));
        // neutral gray keeps a and b at the offset
        let gray = rgb_to_lab([128, 128, 128]);
        assert!(close([gray[1], gray[2], 0], [128, 128, 0]));
        // red pushes a* up, blue pushes b* down
        assert!(rgb_to_lab([255, 0, 0])[1] > 200);
        assert!(rgb_to_lab([0, 0, 255])[2] < 40);
    }

    #[test]
    fn ycrcb_reference_values() {
        assert_eq!(rgb_to_ycrcb([255, 255, 255]), [255, 128, 128]);
        assert_eq!(rgb_to_ycrcb([255, 0, 0]), [76, 255, 85]);
    }

    #[test]
    fn hsv_reference_values() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
    }

    #[test]
    fn bgr_input_matches_rgb_input() {
        let rgb = Frame::new(RgbImage::from_pixel(3, 2, Rgb([200, 40, 10])), ColorSpace::Rgb).unwrap();
        let bgr = Frame::new(RgbImage::from_pixel(3, 2, Rgb([10, 40, 200])), ColorSpace::Bgr).unwrap();

        let a = convert(&rgb, ColorSpace::YCrCb).unwrap();
        let b = convert(&bgr, ColorSpace::YCrCb).unwrap();
        assert_eq!(a.pixels(), b.pixels());
        assert_eq!(a.space(), ColorSpace::YCrCb);
        assert_eq!(convert(&bgr, ColorSpace::Rgb).unwrap().pixel(0, 0), [200, 40, 10]);
    }

    #[test]
    fn conversion_is_deterministic() {
        let pixels = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 77]));
        let frame = Frame::new(pixels, ColorSpace::Rgb).unwrap();
        let first = convert(&frame, ColorSpace::Lab).unwrap();
        let second = convert(&frame, ColorSpace::Lab).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.dimensions(), frame.dimensions());
    }

    #[test]
    fn unsupported_source_space() {
        let frame = Frame::new(RgbImage::new(2, 2), ColorSpace::Lab).unwrap();
        assert!(matches!(
            convert(&frame, ColorSpace::Hsv),
            Err(DetectionError::UnsupportedConversion { .. })
        ));
        assert!(convert(&frame, ColorSpace::Lab).is_ok());
    }
}
