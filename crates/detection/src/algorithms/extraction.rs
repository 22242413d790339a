use imageproc::contours::{BorderType, Contour as Border, find_contours};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::debug;

use crate::{
    algorithms::edges::{EdgeThresholds, detect_edges},
    error::{DetectionError, Result},
    types::{Contour, ContourHierarchy, ContourSet, Mask, Point},
};

/// How nested boundaries are organised in the hierarchy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RetrievalMode {
    /// Outer boundaries and their holes; regions nested inside a hole start
    /// new roots, so the forest is at most two levels deep
    #[default]
    TwoLevel,
    /// Every boundary links to the boundary that directly encloses it
    Tree,
    /// Outermost boundaries only
    External,
}

/// Edge detection followed by boundary tracing.
#[derive(Debug, Clone, Default)]
pub struct ContourExtractor {
    pub thresholds: EdgeThresholds,
    pub retrieval: RetrievalMode,
}

impl ContourExtractor {
    pub fn new(thresholds: EdgeThresholds, retrieval: RetrievalMode) -> Self {
        Self { thresholds, retrieval }
    }

    pub fn extract(&self, mask: &Mask) -> Result<ContourSet> {
        let edges = detect_edges(mask, &self.thresholds)?;
        Ok(self.trace(&edges, mask))
    }

    /// Trace an edge map produced by [`detect_edges`] from `mask`.
    ///
    /// Each 8-connected edge stroke contributes its outer border. Nesting
    /// depth decides whether a contour bounds a region (even) or a hole
    /// (odd). When one stroke runs along two boundaries at once, as on a
    /// ring only a few pixels wide, the inner border of that stroke is
    /// kept as well; `mask` tells which side of it is foreground.
    pub fn trace(&self, edges: &Mask, mask: &Mask) -> ContourSet {
        self.trace_strokes(edges, Some(mask))
    }

    /// Trace strokes that are boundaries themselves, such as the outlines
    /// drawn by [`ContourRenderer`](crate::render::ContourRenderer).
    ///
    /// One contour per stroke, nested by containment of strokes.
    pub fn trace_outlines(&self, outlines: &Mask) -> ContourSet {
        self.trace_strokes(outlines, None)
    }

    fn trace_strokes(&self, strokes: &Mask, regions: Option<&Mask>) -> ContourSet {
        // framed so strokes on the first column still start an outer border
        let borders = find_contours::<i32>(&strokes.framed());

        let mut kept = vec![false; borders.len()];
        let mut enclosing: Vec<Option<usize>> = vec![None; borders.len()];
        let mut depth: Vec<usize> = vec![0; borders.len()];
        for (i, border) in borders.iter().enumerate() {
            // parents always precede their children
            let mut parent = border.parent;
            while let Some(p) = parent {
                if kept[p] {
                    break;
                }
                parent = borders[p].parent;
            }
            let keep = match (border.border_type, parent, regions) {
                (BorderType::Outer, _, _) => true,
                (BorderType::Hole, Some(owner), Some(regions)) => {
                    // a region's stroke encloses foreground, a hole's stroke background
                    encloses_foreground(border, regions) == (depth[owner] % 2 == 1)
                }
                (BorderType::Hole, _, _) => false,
            };
            if keep {
                kept[i] = true;
                enclosing[i] = parent;
                depth[i] = parent.map_or(0, |p| depth[p] + 1);
            }
        }

        let mut index_of: Vec<Option<usize>> = vec![None; borders.len()];
        let mut contours = Vec::new();
        let mut parents = Vec::new();
        for (i, border) in borders.iter().enumerate() {
            if !kept[i] {
                continue;
            }
            let d = depth[i];
            let parent = match self.retrieval {
                RetrievalMode::External if d > 0 => continue,
                RetrievalMode::External => None,
                RetrievalMode::TwoLevel if d % 2 == 0 => None,
                RetrievalMode::TwoLevel | RetrievalMode::Tree => {
                    enclosing[i].and_then(|p| index_of[p])
                }
            };
            let points: Vec<Point> = border
                .points
                .iter()
                .map(|p| Point::new(p.x - 1, p.y - 1))
                .collect();

            index_of[i] = Some(contours.len());
            contours.push(Contour::new(compress_chain(&points), d % 2 == 1));
            parents.push(parent);
        }

        let hierarchy = ContourHierarchy::from_parents(&parents);
        debug!(
            borders = borders.len(),
            contours = contours.len(),
            mode = %self.retrieval,
            "traced contours"
        );
        ContourSet { contours, hierarchy }
    }
}

/// Whether the pocket enclosed by a hole border lies on foreground.
///
/// Tracing starts a hole border on the pixel whose right neighbour is inside
/// the pocket; in mask coordinates that neighbour is `(x, y - 1)` of the
/// framed start point.
fn encloses_foreground(border: &Border<i32>, regions: &Mask) -> bool {
    let Some(start) = border.points.first() else {
        return false;
    };
    let (x, y) = (start.x, start.y - 1);
    x >= 0
        && y >= 0
        && (x as u32) < regions.width()
        && (y as u32) < regions.height()
        && regions.is_foreground(x as u32, y as u32)
}

/// Run edge detection and tracing with the given thresholds.
pub fn extract(mask: &Mask, edge_low: f32, edge_high: f32) -> Result<ContourSet> {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return Err(DetectionError::InvalidMask { width, height });
    }
    let thresholds = EdgeThresholds::new(edge_low, edge_high)?;
    ContourExtractor::new(thresholds, RetrievalMode::default()).extract(mask)
}

/// Drop points lying strictly inside straight runs of a closed chain.
///
/// Consecutive chain points are 8-neighbours, so a point is redundant when
/// the step into it equals the step out of it.
pub fn compress_chain(points: &[Point]) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let step = |a: Point, b: Point| ((b.x - a.x).signum(), (b.y - a.y).signum());

    let kept: Vec<Point> = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect();

    if kept.is_empty() {
        // every step identical cannot close a chain; keep the input untouched
        points.to_vec()
    } else {
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_with_hole() -> Mask {
        let mut mask = Mask::new(100, 100);
        mask.fill_rect(20, 20, 80, 80, true);
        mask.fill_rect(40, 40, 60, 60, false);
        mask
    }

    fn ring_with_island() -> Mask {
        let mut mask = square_with_hole();
        mask.fill_rect(47, 47, 53, 53, true);
        mask
    }

    #[test]
    fn empty_mask_gives_empty_set() {
        let set = extract(&Mask::new(40, 30), 100.0, 200.0).unwrap();
        assert!(set.is_empty());
        assert!(set.hierarchy.is_empty());
    }

    #[test]
    fn zero_sized_mask_is_rejected() {
        assert!(matches!(
            extract(&Mask::new(10, 0), 100.0, 200.0),
            Err(DetectionError::InvalidMask { .. })
        ));
    }

    #[test]
    fn filled_square_gives_one_root() {
        let mut mask = Mask::new(100, 100);
        mask.fill_rect(30, 30, 70, 70, true);
        let set = extract(&mask, 100.0, 200.0).unwrap();

        assert_eq!(set.len(), 1);
        assert!(!set.contours[0].is_hole);
        let node = set.hierarchy.get(0).unwrap();
        assert_eq!(node.parent, None);
        assert_eq!(node.first_child, None);
        assert_eq!(set.max_depth(), 1);

        let bbox = set.contours[0].bounding_box();
        assert!((40..=43).contains(&bbox.width), "{bbox:?}");
        assert!((40..=43).contains(&bbox.height), "{bbox:?}");
    }

    #[test]
    fn square_with_hole_links_hole_to_outer() {
        let set = extract(&square_with_hole(), 100.0, 200.0).unwrap();

        assert_eq!(set.len(), 2);
        let outer = set.contours.iter().position(|c| !c.is_hole).unwrap();
        let hole = set.contours.iter().position(|c| c.is_hole).unwrap();
        assert_eq!(set.hierarchy.parent(hole), Some(outer));
        assert_eq!(set.hierarchy.parent(outer), None);
        assert_eq!(set.hierarchy.children(outer).collect::<Vec<_>>(), vec![hole]);

        let outer_box = set.contours[outer].bounding_box();
        let hole_box = set.contours[hole].bounding_box();
        assert!(outer_box.x < hole_box.x && outer_box.y < hole_box.y);
        assert!(hole_box.x + (hole_box.width as i32) < outer_box.x + outer_box.width as i32);
    }

    #[test]
    fn island_in_hole_depends_on_retrieval_mode() {
        let mask = ring_with_island();

        let two_level = ContourExtractor::default().extract(&mask).unwrap();
        assert_eq!(two_level.len(), 3);
        assert_eq!(two_level.top_level_count(), 2);
        assert_eq!(two_level.hole_count(), 1);
        assert_eq!(two_level.max_depth(), 2);

        let tree = ContourExtractor::new(EdgeThresholds::default(), RetrievalMode::Tree)
            .extract(&mask)
            .unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.top_level_count(), 1);
        assert_eq!(tree.max_depth(), 3);
        let island = (0..3).find(|&i| tree.hierarchy.depth(i) == 2).unwrap();
        assert!(!tree.contours[island].is_hole);
        let hole = tree.hierarchy.parent(island).unwrap();
        assert!(tree.contours[hole].is_hole);

        let external = ContourExtractor::new(EdgeThresholds::default(), RetrievalMode::External)
            .extract(&mask)
            .unwrap();
        assert_eq!(external.len(), 1);
        assert_eq!(external.hole_count(), 0);
    }

    #[test]
    fn regions_cut_by_the_frame_are_kept() {
        let flush = [
            ("left", (0, 30, 40, 70)),
            ("top", (30, 0, 70, 40)),
            ("right", (60, 30, 100, 70)),
            ("bottom", (30, 60, 70, 100)),
            ("corner", (0, 0, 40, 40)),
        ];
        for (side, (x0, y0, x1, y1)) in flush {
            let mut mask = Mask::new(100, 100);
            mask.fill_rect(x0, y0, x1, y1, true);
            let set = extract(&mask, 100.0, 200.0).unwrap();
            assert_eq!(set.len(), 1, "{side}");
            assert!(!set.contours[0].is_hole, "{side}");
            let bbox = set.contours[0].bounding_box();
            assert!(bbox.x <= x0 as i32 && bbox.y <= y0 as i32, "{side}: {bbox:?}");

            // a hole in the cut region still hangs off the region
            mask.fill_rect(x0 + 12, y0 + 12, x1 - 12, y1 - 12, false);
            let set = extract(&mask, 100.0, 200.0).unwrap();
            assert_eq!(set.len(), 2, "{side}");
            assert_eq!(set.top_level_count(), 1, "{side}");
            let hole = set.contours.iter().position(|c| c.is_hole).unwrap();
            let outer = set.hierarchy.parent(hole).unwrap();
            assert!(!set.contours[outer].is_hole, "{side}");
        }
    }

    #[test]
    fn full_mask_is_one_frame_sized_region() {
        let set = extract(&Mask::from_fn(30, 20, |_, _| true), 100.0, 200.0).unwrap();
        assert_eq!(set.len(), 1);
        let bbox = set.contours[0].bounding_box();
        assert_eq!((bbox.x, bbox.y, bbox.width, bbox.height), (0, 0, 30, 20));
    }

    #[test]
    fn thin_rings_keep_their_hole() {
        for width in 1..=5 {
            let mut mask = Mask::new(80, 80);
            mask.fill_rect(10, 10, 70, 70, true);
            mask.fill_rect(10 + width, 10 + width, 70 - width, 70 - width, false);
            let set = extract(&mask, 100.0, 200.0).unwrap();

            assert_eq!(set.len(), 2, "ring width {width}");
            assert_eq!(set.hole_count(), 1, "ring width {width}");
            let hole = set.contours.iter().position(|c| c.is_hole).unwrap();
            let outer = set.hierarchy.parent(hole).unwrap();
            assert!(!set.contours[outer].is_hole);
            assert_eq!(set.hierarchy.parent(outer), None);
        }
    }

    #[test]
    fn outlines_nest_by_containment() {
        let mut outlines = Mask::new(60, 60);
        for (lo, hi) in [(5, 54), (20, 39)] {
            for i in lo..=hi {
                outlines.set(i, lo, true);
                outlines.set(i, hi, true);
                outlines.set(lo, i, true);
                outlines.set(hi, i, true);
            }
        }
        let set = ContourExtractor::default().trace_outlines(&outlines);
        assert_eq!(set.len(), 2);
        assert_eq!(set.hole_count(), 1);
        let hole = set.contours.iter().position(|c| c.is_hole).unwrap();
        assert_eq!(set.contours[hole].bounding_box().x, 20);
    }

    #[test]
    fn separate_regions_are_siblings() {
        let mut mask = Mask::new(120, 60);
        mask.fill_rect(10, 10, 40, 40, true);
        mask.fill_rect(70, 15, 100, 45, true);
        let set = extract(&mask, 100.0, 200.0).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.top_level_count(), 2);
        assert_eq!(set.hierarchy.get(0).unwrap().next, Some(1));
        assert_eq!(set.hierarchy.get(1).unwrap().prev, Some(0));
    }

    #[test]
    fn compression_keeps_only_corners() {
        let mut chain = Vec::new();
        for x in 0..5 {
            chain.push(Point::new(x, 0));
        }
        for y in 1..5 {
            chain.push(Point::new(4, y));
        }
        for x in (0..4).rev() {
            chain.push(Point::new(x, 4));
        }
        for y in (1..4).rev() {
            chain.push(Point::new(0, y));
        }
        let compressed = compress_chain(&chain);
        assert_eq!(
            compressed,
            vec![Point::new(0, 0), Point::new(4, 0), Point::new(4, 4), Point::new(0, 4)]
        );
    }

    #[test]
    fn compression_keeps_line_endpoints() {
        // a one pixel wide line is traced out and back
        let chain = vec![
            Point::new(0, 0),
            Point::new(1, 0),
            Point::new(2, 0),
            Point::new(3, 0),
            Point::new(2, 0),
            Point::new(1, 0),
        ];
        assert_eq!(compress_chain(&chain), vec![Point::new(0, 0), Point::new(3, 0)]);
        assert_eq!(compress_chain(&chain[..2]), chain[..2].to_vec());
    }

    #[test]
    fn traced_points_are_compressed() {
        let mut mask = Mask::new(100, 100);
        mask.fill_rect(30, 30, 70, 70, true);
        let set = extract(&mask, 100.0, 200.0).unwrap();
        // a square outline compresses to a handful of vertices, not ~160 chain points
        assert!(set.contours[0].len() <= 16, "{} points", set.contours[0].len());
    }
}
