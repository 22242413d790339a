use std::path::Path;

use geo_types::{Coord, LineString, Polygon};
use image::{DynamicImage, GrayImage, Luma, RgbImage};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::error::{DetectionError, Result};

/// Mask value for foreground pixels.
pub const FOREGROUND: u8 = 255;
/// Mask value for background pixels.
pub const BACKGROUND: u8 = 0;

/// Encoding of the three channels of a [`Frame`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ColorSpace {
    /// Red, green, blue
    #[default]
    Rgb,
    /// Blue, green, red (camera capture order)
    Bgr,
    /// CIE L*a*b*, L scaled to 0..255, a and b offset by 128
    Lab,
    /// Luma and offset chroma, stored as Y, Cr, Cb
    YCrCb,
    /// Hue halved into 0..180, saturation and value in 0..255
    Hsv,
}

/// A three channel raster frame.
///
/// The pixel buffer is an [`RgbImage`] used as a plain 3 x u8 container; the
/// meaning of each channel is given by [`Frame::space`].
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pixels: RgbImage,
    space: ColorSpace,
}

impl Frame {
    pub fn new(pixels: RgbImage, space: ColorSpace) -> Result<Self> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(DetectionError::InvalidFrame(format!(
                "frame dimensions {}x{} must be non-zero",
                pixels.width(),
                pixels.height()
            )));
        }
        Ok(Self { pixels, space })
    }

    /// Wrap a decoded image. Only three channel images are accepted.
    pub fn from_dynamic(image: DynamicImage, space: ColorSpace) -> Result<Self> {
        let channels = image.color().channel_count();
        if channels != 3 {
            return Err(DetectionError::InvalidFrame(format!(
                "expected 3 channels, got {channels}"
            )));
        }
        Self::new(image.into_rgb8(), space)
    }

    /// Build a frame from an interleaved buffer.
    pub fn from_raw(
        width: u32,
        height: u32,
        channels: u8,
        data: Vec<u8>,
        space: ColorSpace,
    ) -> Result<Self> {
        if channels != 3 {
            return Err(DetectionError::InvalidFrame(format!(
                "expected 3 channels, got {channels}"
            )));
        }
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(DetectionError::InvalidFrame(format!(
                "buffer holds {} bytes, {width}x{height}x3 needs {expected}",
                data.len()
            )));
        }
        let pixels = RgbImage::from_raw(width, height, data)
            .ok_or_else(|| DetectionError::InvalidFrame("buffer size mismatch".to_string()))?;
        Self::new(pixels, space)
    }

    /// Decode an image file as an RGB frame.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let image = image::open(path)?;
        Self::from_dynamic(image, ColorSpace::Rgb)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn space(&self) -> ColorSpace {
        self.space
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.pixels.get_pixel(x, y).0
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn into_pixels(self) -> RgbImage {
        self.pixels
    }
}

/// Binary foreground/background raster stored as 0/255.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    image: GrayImage,
}

impl Mask {
    /// An all-background mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self { image: GrayImage::new(width, height) }
    }

    /// Any non-zero pixel becomes foreground.
    pub fn from_gray(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self::from_fn(width, height, |x, y| image.get_pixel(x, y).0[0] != BACKGROUND)
    }

    /// Any non-black pixel of a rendered canvas becomes foreground.
    pub fn from_canvas(canvas: &RgbImage) -> Self {
        let (width, height) = canvas.dimensions();
        Self::from_fn(width, height, |x, y| canvas.get_pixel(x, y).0 != [0, 0, 0])
    }

    pub fn from_fn<F>(width: u32, height: u32, mut foreground: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let image = GrayImage::from_fn(width, height, |x, y| {
            Luma([if foreground(x, y) { FOREGROUND } else { BACKGROUND }])
        });
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel(x, y).0[0] != BACKGROUND
    }

    pub fn set(&mut self, x: u32, y: u32, foreground: bool) {
        let value = if foreground { FOREGROUND } else { BACKGROUND };
        self.image.put_pixel(x, y, Luma([value]));
    }

    /// Set every pixel of the half-open rectangle `[x0, x1) x [y0, y1)`.
    pub fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, foreground: bool) {
        for y in y0..y1.min(self.height()) {
            for x in x0..x1.min(self.width()) {
                self.set(x, y, foreground);
            }
        }
    }

    /// Copy surrounded by a one pixel background border.
    pub(crate) fn framed(&self) -> GrayImage {
        let (width, height) = self.dimensions();
        let mut framed = GrayImage::new(width + 2, height + 2);
        image::imageops::replace(&mut framed, &self.image, 1, 1);
        framed
    }

    pub fn foreground_count(&self) -> usize {
        self.image.pixels().filter(|p| p.0[0] != BACKGROUND).count()
    }

    /// Fraction of foreground pixels, 0.0 for a zero-sized mask.
    pub fn coverage(&self) -> f32 {
        let total = self.image.width() as usize * self.image.height() as usize;
        if total == 0 {
            return 0.0;
        }
        self.foreground_count() as f32 / total as f32
    }

    /// True when no pixel is foreground.
    pub fn is_empty(&self) -> bool {
        self.image.pixels().all(|p| p.0[0] == BACKGROUND)
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_image(self) -> GrayImage {
        self.image
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned pixel extent, inclusive of both end pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Closed boundary of a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Contour {
    pub points: Vec<Point>,
    /// Whether this boundary encloses a background hole inside a region
    pub is_hole: bool,
}

impl Contour {
    pub fn new(points: Vec<Point>, is_hole: bool) -> Self {
        Self { points, is_hole }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Convert to a geo-types Polygon for geometric operations
    pub fn to_geo_polygon(&self) -> Polygon<f64> {
        let coords: Vec<Coord<f64>> = self
            .points
            .iter()
            .map(|p| Coord { x: p.x as f64, y: p.y as f64 })
            .collect();
        Polygon::new(LineString::new(coords), vec![])
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut min_x = i32::MAX;
        let mut min_y = i32::MAX;
        let mut max_x = i32::MIN;
        let mut max_y = i32::MIN;

        for p in &self.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        if self.points.is_empty() {
            return BoundingBox { x: 0, y: 0, width: 0, height: 0 };
        }

        BoundingBox {
            x: min_x,
            y: min_y,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        }
    }

    /// Enclosed polygon area (shoelace), 0 for fewer than three points.
    pub fn area(&self) -> f64 {
        use geo::Area;
        if self.points.len() < 3 {
            return 0.0;
        }
        self.to_geo_polygon().unsigned_area()
    }

    pub fn centroid(&self) -> [f64; 2] {
        use geo::Centroid;
        if self.points.len() >= 3 {
            if let Some(centroid) = self.to_geo_polygon().centroid() {
                return [centroid.x(), centroid.y()];
            }
        }
        // Fallback to bounding box center
        let bbox = self.bounding_box();
        [
            bbox.x as f64 + (bbox.width as f64 - 1.0).max(0.0) / 2.0,
            bbox.y as f64 + (bbox.height as f64 - 1.0).max(0.0) / 2.0,
        ]
    }

    /// Length of the closed polyline.
    pub fn perimeter(&self) -> f64 {
        let n = self.points.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                ((b.x - a.x) as f64).hypot((b.y - a.y) as f64)
            })
            .sum()
    }
}

/// Links of one contour in the hierarchy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HierarchyNode {
    pub next: Option<usize>,
    pub prev: Option<usize>,
    pub first_child: Option<usize>,
    pub parent: Option<usize>,
}

/// Containment relation among the contours of a [`ContourSet`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ContourHierarchy {
    nodes: Vec<HierarchyNode>,
}

impl ContourHierarchy {
    /// Build sibling and child links from each contour's parent.
    ///
    /// Parents must precede their children.
    pub fn from_parents(parents: &[Option<usize>]) -> Self {
        let mut nodes = vec![HierarchyNode::default(); parents.len()];
        let mut last_child: Vec<Option<usize>> = vec![None; parents.len()];
        let mut last_root: Option<usize> = None;

        for (i, &parent) in parents.iter().enumerate() {
            nodes[i].parent = parent;
            let previous = match parent {
                Some(p) => {
                    let previous = last_child[p];
                    if previous.is_none() {
                        nodes[p].first_child = Some(i);
                    }
                    last_child[p] = Some(i);
                    previous
                }
                None => last_root.replace(i),
            };
            if let Some(prev) = previous {
                nodes[prev].next = Some(i);
                nodes[i].prev = Some(prev);
            }
        }

        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[HierarchyNode] {
        &self.nodes
    }

    pub fn get(&self, index: usize) -> Option<&HierarchyNode> {
        self.nodes.get(index)
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.nodes.get(index).and_then(|n| n.parent)
    }

    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        let first = self.nodes.get(index).and_then(|n| n.first_child);
        std::iter::successors(first, move |&c| self.nodes[c].next)
    }

    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(i, _)| i)
    }

    /// Number of ancestors of a contour.
    pub fn depth(&self, index: usize) -> usize {
        std::iter::successors(self.parent(index), |&p| self.parent(p)).count()
    }
}

/// Contours of one mask together with their hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ContourSet {
    pub contours: Vec<Contour>,
    pub hierarchy: ContourHierarchy,
}

impl ContourSet {
    pub fn len(&self) -> usize {
        self.contours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub fn top_level_count(&self) -> usize {
        self.hierarchy.roots().count()
    }

    pub fn hole_count(&self) -> usize {
        self.contours.iter().filter(|c| c.is_hole).count()
    }

    /// Deepest nesting level, 0 for an empty set.
    pub fn max_depth(&self) -> usize {
        (0..self.len())
            .map(|i| self.hierarchy.depth(i) + 1)
            .max()
            .unwrap_or(0)
    }
}
