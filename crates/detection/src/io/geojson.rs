use geojson::{Feature, FeatureCollection, Geometry, Value, feature::Id};
use serde_json::{Map, Number, Value as JsonValue};

use crate::{
    error::Result,
    report::{DetectionResult, FrameDetections},
    types::Point,
};

fn ring(points: &[Point]) -> Vec<Vec<f64>> {
    let mut ring: Vec<Vec<f64>> = points.iter().map(|p| vec![p.x as f64, p.y as f64]).collect();
    if let Some(first) = ring.first().cloned() {
        ring.push(first);
    }
    ring
}

fn number(value: f64) -> JsonValue {
    Number::from_f64(value).map_or(JsonValue::Null, JsonValue::Number)
}

impl FrameDetections {
    /// One polygon feature per region; holes become its interior rings.
    pub fn to_geojson(&self) -> Result<FeatureCollection> {
        let mut features = Vec::new();

        for region in self.objects() {
            let holes: Vec<&DetectionResult> = self
                .detections
                .iter()
                .filter(|d| d.is_hole && d.parent == Some(region.index))
                .collect();

            let mut coordinates = vec![ring(&region.points)];
            coordinates.extend(holes.iter().map(|hole| ring(&hole.points)));
            let holes_area: f64 = holes.iter().map(|hole| hole.area).sum();

            let mut properties = Map::new();
            properties.insert("index".to_string(), JsonValue::from(region.index));
            properties.insert(
                "parent".to_string(),
                region.parent.map_or(JsonValue::Null, JsonValue::from),
            );
            properties.insert("depth".to_string(), JsonValue::from(region.depth));
            properties.insert("hole_count".to_string(), JsonValue::from(holes.len()));
            properties.insert("area".to_string(), number(region.area - holes_area));
            properties.insert(
                "centroid".to_string(),
                JsonValue::Array(region.centroid.iter().map(|&c| number(c)).collect()),
            );
            properties.insert(
                "bbox".to_string(),
                serde_json::to_value(region.bbox)?,
            );

            features.push(Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Polygon(coordinates))),
                id: Some(Id::Number(Number::from(region.index))),
                properties: Some(properties),
                foreign_members: None,
            });
        }

        let mut foreign_members = Map::new();
        foreign_members.insert("image_width".to_string(), JsonValue::from(self.width));
        foreign_members.insert("image_height".to_string(), JsonValue::from(self.height));
        foreign_members.insert("contour_count".to_string(), JsonValue::from(self.detections.len()));

        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(foreign_members),
        })
    }

    pub fn to_geojson_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_geojson()?)?)
    }

    pub fn save_geojson<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_geojson_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        report::FrameDetections,
        types::{Contour, ContourHierarchy, ContourSet, Point},
    };

    fn square(x0: i32, y0: i32, x1: i32, y1: i32, hole: bool) -> Contour {
        Contour::new(
            vec![Point::new(x0, y0), Point::new(x1, y0), Point::new(x1, y1), Point::new(x0, y1)],
            hole,
        )
    }

    #[test]
    fn holes_become_interior_rings() {
        let set = ContourSet {
            contours: vec![
                square(0, 0, 20, 20, false),
                square(5, 5, 15, 15, true),
                square(40, 0, 50, 10, false),
            ],
            hierarchy: ContourHierarchy::from_parents(&[None, Some(0), None]),
        };
        let frame = FrameDetections::new(64, 32, set);
        let collection = frame.to_geojson().unwrap();

        assert_eq!(collection.features.len(), 2);
        let first = &collection.features[0];
        match &first.geometry.as_ref().unwrap().value {
            geojson::Value::Polygon(rings) => {
                assert_eq!(rings.len(), 2);
                // closed rings
                assert_eq!(rings[0].first(), rings[0].last());
                assert_eq!(rings[0].len(), 5);
            }
            other => panic!("unexpected geometry {other:?}"),
        }
        let props = first.properties.as_ref().unwrap();
        assert_eq!(props["hole_count"], 1);
        assert_eq!(props["area"], 300.0);

        let members = collection.foreign_members.as_ref().unwrap();
        assert_eq!(members["image_width"], 64);
        assert_eq!(members["contour_count"], 3);
    }

    #[test]
    fn saves_parseable_geojson() {
        let set = ContourSet {
            contours: vec![square(1, 1, 9, 9, false)],
            hierarchy: ContourHierarchy::from_parents(&[None]),
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.geojson");
        FrameDetections::new(10, 10, set).save_geojson(&path).unwrap();

        let parsed: geojson::GeoJson = std::fs::read_to_string(&path).unwrap().parse().unwrap();
        match parsed {
            geojson::GeoJson::FeatureCollection(fc) => assert_eq!(fc.features.len(), 1),
            other => panic!("expected a feature collection, got {other:?}"),
        }
    }
}
