//! Debug overlay of traced contours.

use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{BresenhamLineIter, draw_filled_rect_mut},
    rect::Rect,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    traits::ColorAssigner,
    types::{Contour, ContourSet},
};

/// Cycles through a fixed list of colors.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<Rgb<u8>>,
}

impl Palette {
    /// Fails over to the default palette when `colors` is empty.
    pub fn new(colors: Vec<Rgb<u8>>) -> Self {
        if colors.is_empty() {
            return Self::default();
        }
        Self { colors }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: vec![
                Rgb([230, 25, 75]),
                Rgb([60, 180, 75]),
                Rgb([255, 225, 25]),
                Rgb([0, 130, 200]),
                Rgb([245, 130, 48]),
                Rgb([145, 30, 180]),
                Rgb([70, 240, 240]),
                Rgb([240, 50, 230]),
            ],
        }
    }
}

impl ColorAssigner for Palette {
    fn color_for(&mut self, index: usize, _contour: &Contour) -> Rgb<u8> {
        self.colors[index % self.colors.len()]
    }
}

/// Random color per contour drawn from an injected generator.
#[derive(Debug, Clone)]
pub struct RandomColors<R> {
    rng: R,
}

impl<R: Rng> RandomColors<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomColors<StdRng> {
    /// Reproducible colors for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> ColorAssigner for RandomColors<R> {
    fn color_for(&mut self, _index: usize, _contour: &Contour) -> Rgb<u8> {
        // stay away from black, which is the canvas background
        Rgb([
            self.rng.gen_range(32..=255),
            self.rng.gen_range(32..=255),
            self.rng.gen_range(32..=255),
        ])
    }
}

/// Draws every contour, outer boundaries and holes alike, as a closed polyline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContourRenderer {
    pub thickness: u32,
}

impl Default for ContourRenderer {
    fn default() -> Self {
        Self { thickness: 2 }
    }
}

impl ContourRenderer {
    pub fn new(thickness: u32) -> Self {
        Self { thickness: thickness.max(1) }
    }

    /// Render onto a black canvas of `width x height`.
    pub fn render(
        &self,
        (width, height): (u32, u32),
        set: &ContourSet,
        colors: &mut dyn ColorAssigner,
    ) -> RgbImage {
        let mut canvas = RgbImage::new(width, height);
        self.draw(&mut canvas, set, colors);
        canvas
    }

    /// Draw over an existing image.
    pub fn draw(&self, canvas: &mut RgbImage, set: &ContourSet, colors: &mut dyn ColorAssigner) {
        for (index, contour) in set.contours.iter().enumerate() {
            let color = colors.color_for(index, contour);
            self.draw_contour(canvas, contour, color);
        }
    }

    fn draw_contour(&self, canvas: &mut RgbImage, contour: &Contour, color: Rgb<u8>) {
        let n = contour.points.len();
        if n == 0 {
            return;
        }
        if n == 1 {
            let p = contour.points[0];
            self.stamp(canvas, p.x, p.y, color);
            return;
        }
        for i in 0..n {
            let a = contour.points[i];
            let b = contour.points[(i + 1) % n];
            let line = BresenhamLineIter::new((a.x as f32, a.y as f32), (b.x as f32, b.y as f32));
            for (x, y) in line {
                self.stamp(canvas, x, y, color);
            }
            self.stamp(canvas, b.x, b.y, color);
        }
    }

    /// Square brush of side `thickness`; even sides extend right and down.
    fn stamp(&self, canvas: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
        let side = self.thickness.max(1);
        let offset = ((side - 1) / 2) as i32;
        draw_filled_rect_mut(canvas, Rect::at(x - offset, y - offset).of_size(side, side), color);
    }
}
