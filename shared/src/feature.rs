use serde::Serialize;
use serde_json::{Map, Value};

use crate::geo::{coordinate_value, LngLat};

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(LngLat),
    LineString(Vec<LngLat>),
    MultiLineString(Vec<Vec<LngLat>>),
    Polygon(Vec<Vec<LngLat>>),
}

impl Geometry {
    /// Parses a GeoJSON geometry object. Invalid vertices are dropped; a
    /// geometry left without enough vertices to draw yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let kind = value.get("type")?.as_str()?;
        let coordinates = value.get("coordinates")?;
        match kind {
            "Point" => LngLat::from_position(coordinates).map(Geometry::Point),
            "LineString" => line(coordinates).map(Geometry::LineString),
            "MultiLineString" => {
                let lines: Vec<_> = coordinates.as_array()?.iter().filter_map(line).collect();
                (!lines.is_empty()).then_some(Geometry::MultiLineString(lines))
            }
            "Polygon" => {
                let rings: Vec<_> = coordinates
                    .as_array()?
                    .iter()
                    .filter_map(|ring| positions(ring).filter(|ring| ring.len() >= 3))
                    .collect();
                (!rings.is_empty()).then_some(Geometry::Polygon(rings))
            }
            _ => None,
        }
    }

    pub fn anchor(&self) -> Option<LngLat> {
        match self {
            Geometry::Point(point) => Some(*point),
            Geometry::LineString(line) => line.first().copied(),
            Geometry::MultiLineString(lines) => lines.first()?.first().copied(),
            Geometry::Polygon(rings) => rings.first()?.first().copied(),
        }
    }

    pub fn points(&self) -> Vec<LngLat> {
        match self {
            Geometry::Point(point) => vec![*point],
            Geometry::LineString(line) => line.clone(),
            Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
                lines.iter().flatten().copied().collect()
            }
        }
    }
}

fn positions(value: &Value) -> Option<Vec<LngLat>> {
    Some(
        value
            .as_array()?
            .iter()
            .filter_map(LngLat::from_position)
            .collect(),
    )
}

fn line(value: &Value) -> Option<Vec<LngLat>> {
    positions(value).filter(|line| line.len() >= 2)
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct Properties(Map<String, Value>);

impl Properties {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    pub fn text(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| match self.0.get(*key)? {
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        })
    }

    pub fn text_or(&self, keys: &[&str], default: &str) -> String {
        self.text(keys).unwrap_or_else(|| default.to_string())
    }

    pub fn number(&self, keys: &[&str]) -> Option<f64> {
        keys.iter()
            .find_map(|key| self.0.get(*key).and_then(coordinate_value))
    }

    /// Yes/no columns arrive as `"Yes"`, `true` or `1` depending on the endpoint.
    pub fn flag(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(text)) => {
                matches!(text.trim().to_ascii_lowercase().as_str(), "yes" | "true" | "1")
            }
            Some(Value::Number(number)) => number.as_f64() == Some(1.0),
            _ => false,
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Feature {
    pub id: Option<String>,
    pub geometry: Option<Geometry>,
    pub properties: Properties,
}

const LAT_KEYS: [&str; 2] = ["latitude", "lat"];
const LNG_KEYS: [&str; 3] = ["longitude", "lng", "lon"];
const GEOMETRY_KEYS: [&str; 2] = ["geometry", "geom"];

impl Feature {
    pub fn from_geojson(value: &Value) -> Self {
        let properties = value
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Self {
            id: value.get("id").and_then(id_text),
            geometry: value.get("geometry").and_then(Geometry::from_value),
            properties: Properties(properties),
        }
    }

    /// A flat record. Geometry comes from an embedded `geometry`/`geom` object,
    /// otherwise a point is synthesized from latitude/longitude columns.
    pub fn from_record(value: &Value) -> Self {
        if value.get("type").and_then(Value::as_str) == Some("Feature") {
            return Self::from_geojson(value);
        }
        let mut map = value.as_object().cloned().unwrap_or_default();
        let embedded = GEOMETRY_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Geometry::from_value));
        for key in GEOMETRY_KEYS {
            map.remove(key);
        }
        let properties = Properties(map);
        let geometry = embedded.or_else(|| {
            let lat = properties.number(&LAT_KEYS)?;
            let lng = properties.number(&LNG_KEYS)?;
            LngLat::from_lat_lng(lat, lng).map(Geometry::Point)
        });
        Self {
            id: properties.get("id").and_then(id_text),
            geometry,
            properties,
        }
    }

    pub fn anchor(&self) -> Option<LngLat> {
        self.geometry.as_ref()?.anchor()
    }
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
