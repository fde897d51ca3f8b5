use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::geo::LngLat;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RingError {
    #[error("a polygon needs at least 3 distinct vertices, got {0}")]
    TooFewVertices(usize),
    #[error("geometry is not a polygon")]
    NotAPolygon,
}

/// A single closed ring: the last vertex always equals the first.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename = "Polygon")]
pub struct PolygonGeometry {
    coordinates: [Vec<LngLat>; 1],
}

impl PolygonGeometry {
    pub fn from_vertices(vertices: &[LngLat]) -> Result<Self, RingError> {
        let mut ring = vertices.to_vec();
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        if ring.len() < 3 {
            return Err(RingError::TooFewVertices(ring.len()));
        }
        ring.push(ring[0]);
        Ok(Self {
            coordinates: [ring],
        })
    }

    /// Accepts a GeoJSON `Polygon` geometry or a `Feature` wrapping one, as
    /// produced by a drawn layer's `toGeoJSON()`. Only the outer ring is kept.
    pub fn from_geojson(value: &Value) -> Result<Self, RingError> {
        let geometry = match value.get("type").and_then(Value::as_str) {
            Some("Feature") => value.get("geometry").ok_or(RingError::NotAPolygon)?,
            _ => value,
        };
        if geometry.get("type").and_then(Value::as_str) != Some("Polygon") {
            return Err(RingError::NotAPolygon);
        }
        let outer = geometry
            .get("coordinates")
            .and_then(Value::as_array)
            .and_then(|rings| rings.first())
            .and_then(Value::as_array)
            .ok_or(RingError::NotAPolygon)?;
        let vertices: Vec<LngLat> = outer.iter().filter_map(LngLat::from_position).collect();
        Self::from_vertices(&vertices)
    }

    pub fn ring(&self) -> &[LngLat] {
        &self.coordinates[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    fn lat_lng(lat: f64, lng: f64) -> LngLat {
        LngLat::from_lat_lng(lat, lng).unwrap()
    }

    #[test]
    fn closes_an_open_ring() {
        let polygon = PolygonGeometry::from_vertices(&[
            lat_lng(53.0, -9.0),
            lat_lng(53.0, -8.5),
            lat_lng(52.5, -8.5),
        ])
        .unwrap();
        assert_eq!(polygon.ring().len(), 4);
        assert_eq!(polygon.ring().first(), polygon.ring().last());
        assert_json_eq!(
            serde_json::to_value(&polygon).unwrap(),
            json!({
                "type": "Polygon",
                "coordinates": [[[-9.0, 53.0], [-8.5, 53.0], [-8.5, 52.5], [-9.0, 53.0]]]
            })
        );
    }

    #[test]
    fn already_closed_ring_is_not_closed_twice() {
        let polygon = PolygonGeometry::from_vertices(&[
            lat_lng(53.0, -9.0),
            lat_lng(53.0, -8.5),
            lat_lng(52.5, -8.5),
            lat_lng(53.0, -9.0),
        ])
        .unwrap();
        assert_eq!(polygon.ring().len(), 4);
    }

    #[test]
    fn two_vertices_are_rejected() {
        let error =
            PolygonGeometry::from_vertices(&[lat_lng(53.0, -9.0), lat_lng(53.0, -8.5)]).unwrap_err();
        assert_eq!(error, RingError::TooFewVertices(2));
    }

    #[test]
    fn parses_drawn_feature_output() {
        let polygon = PolygonGeometry::from_geojson(&json!({
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[-9.0, 53.0], [-8.5, 53.0], [-8.5, 52.5], [-9.0, 53.0]]]
            }
        }))
        .unwrap();
        assert_eq!(polygon.ring().len(), 4);

        let error = PolygonGeometry::from_geojson(&json!({
            "type": "Point",
            "coordinates": [-9.0, 53.0]
        }))
        .unwrap_err();
        assert_eq!(error, RingError::NotAPolygon);
    }
}
