use geo_types::{Coord, LineString};
use crate::types::{Contour, ContourSet, Point};

/// Douglas-Peucker simplifier using geo crate's implementation.
///
/// Only removes vertices, so every remaining point is one of the traced
/// boundary points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DouglasPeuckerSimplifier {
    pub tolerance: f64,
}

impl DouglasPeuckerSimplifier {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn simplify(&self, set: &mut ContourSet) {
        for contour in &mut set.contours {
            self.simplify_contour(contour);
        }
    }

    pub fn simplify_contour(&self, contour: &mut Contour) {
        use geo::Simplify;

        if contour.points.len() <= 3 || self.tolerance <= 0.0 {
            return;
        }

        // close the ring so the last edge is simplified too
        let mut coords: Vec<Coord<f64>> = contour
            .points
            .iter()
            .map(|p| Coord { x: p.x as f64, y: p.y as f64 })
            .collect();
        coords.push(coords[0]);

        let simplified = LineString::new(coords).simplify(&self.tolerance);
        let mut points: Vec<Point> = simplified
            .coords()
            .map(|c| Point::new(c.x.round() as i32, c.y.round() as i32))
            .collect();
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }

        // a ring needs three vertices; keep the original otherwise
        if points.len() >= 3 {
            contour.points = points;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_small_deviations() {
        let mut contour = Contour::new(
            vec![
                Point::new(0, 0),
                Point::new(5, 1),
                Point::new(10, 0),
                Point::new(10, 10),
                Point::new(0, 10),
            ],
            false,
        );
        DouglasPeuckerSimplifier::new(2.0).simplify_contour(&mut contour);
        assert_eq!(
            contour.points,
            vec![Point::new(0, 0), Point::new(10, 0), Point::new(10, 10), Point::new(0, 10)]
        );
    }

    #[test]
    fn small_tolerance_keeps_shape() {
        let original = vec![
            Point::new(0, 0),
            Point::new(5, 3),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        let mut contour = Contour::new(original.clone(), true);
        DouglasPeuckerSimplifier::new(0.5).simplify_contour(&mut contour);
        assert_eq!(contour.points, original);
        assert!(contour.is_hole);
    }
}
