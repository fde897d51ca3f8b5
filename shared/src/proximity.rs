use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::feature::Feature;
use crate::geo::{coordinate_value, LngLat};

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct RadiusRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

impl RadiusRequest {
    pub fn new(at: LngLat, radius_km: f64) -> Self {
        Self {
            latitude: at.lat(),
            longitude: at.lng(),
            radius_km,
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct PointRequest {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<LngLat> for PointRequest {
    fn from(at: LngLat) -> Self {
        Self {
            latitude: at.lat(),
            longitude: at.lng(),
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TrailPoiRequest {
    pub trail_id: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct PoiRadiusRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poi_type: Option<String>,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SearchPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct WithinRadiusResponse {
    #[serde(default)]
    pub search_point: Option<SearchPoint>,
    #[serde(default)]
    pub radius_km: Option<f64>,
    #[serde(default)]
    pub total_found: Option<u64>,
    #[serde(default)]
    pub nearest_trails: Vec<Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NearbyTrail {
    pub rank: usize,
    pub id: Option<String>,
    pub name: String,
    pub county: String,
    pub difficulty: String,
    pub length_km: Option<f64>,
    pub from_point_km: Option<f64>,
    pub coord: Option<LngLat>,
}

impl WithinRadiusResponse {
    pub fn trails(&self) -> Vec<NearbyTrail> {
        self.nearest_trails
            .iter()
            .enumerate()
            .map(|(index, value)| {
                let feature = Feature::from_record(value);
                let props = &feature.properties;
                NearbyTrail {
                    rank: index + 1,
                    id: feature.id.clone(),
                    name: props.text_or(&["name", "trail_name"], "Unnamed Trail"),
                    county: props.text_or(&["county"], "Unknown"),
                    difficulty: props.text_or(&["difficulty"], "N/A"),
                    length_km: props.number(&["distance_km"]),
                    from_point_km: props.number(&["distance_to_user", "distance_from_point_km"]),
                    coord: feature.anchor().or_else(|| nested_coordinates(value)),
                }
            })
            .collect()
    }
}

fn nested_coordinates(value: &Value) -> Option<LngLat> {
    let coordinates = value.get("coordinates")?;
    LngLat::from_lat_lng(
        coordinate_value(coordinates.get("lat")?)?,
        coordinate_value(coordinates.get("lng")?)?,
    )
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct NearestTown {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub town_type: Option<String>,
    #[serde(default)]
    pub distance_km: Option<f64>,
}

/// `pois` entries come either bare or wrapped as `{"poi": {...}, "distance_km": ...}`.
pub fn poi_records(value: &Value) -> Vec<Value> {
    let items = value
        .get("pois")
        .or_else(|| value.get("results"))
        .and_then(Value::as_array)
        .or_else(|| value.as_array());
    items
        .map(|items| {
            items
                .iter()
                .map(|item| item.get("poi").cloned().unwrap_or_else(|| item.clone()))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ranks_nearby_trails_in_response_order() {
        let response: WithinRadiusResponse = serde_json::from_value(json!({
            "search_point": { "lat": 53.1, "lng": -6.3 },
            "radius_km": 10,
            "total_found": 2,
            "nearest_trails": [
                { "id": 4, "name": "Lough Tay", "county": "Wicklow", "difficulty": "Moderate",
                  "distance_km": 6.5, "distance_from_point_km": 1.25, "latitude": 53.1, "longitude": -6.27 },
                { "id": 5, "trail_name": "Djouce", "coordinates": { "lat": 53.13, "lng": -6.24 } }
            ]
        }))
        .unwrap();
        let trails = response.trails();
        assert_eq!(trails.len(), 2);
        assert_eq!(trails[0].rank, 1);
        assert_eq!(trails[0].from_point_km, Some(1.25));
        assert_eq!(trails[1].name, "Djouce");
        assert_eq!(trails[1].county, "Unknown");
        assert_eq!(trails[1].coord, LngLat::from_lat_lng(53.13, -6.24));
    }

    #[test]
    fn unwraps_poi_envelopes() {
        let records = poi_records(&json!({
            "pois": [
                { "poi": { "name": "Car park", "poi_type": "parking" }, "distance_km": 0.2 },
                { "name": "Tea rooms", "poi_type": "cafe" }
            ]
        }));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"], "Car park");
        assert_eq!(records[1]["poi_type"], "cafe");
        assert!(poi_records(&json!({ "detail": "x" })).is_empty());
    }

    #[test]
    fn radius_request_uses_lat_lng_field_names() {
        let body = serde_json::to_value(RadiusRequest::new(LngLat::new(-6.3, 53.1).unwrap(), 10.0)).unwrap();
        assert_eq!(body, json!({ "latitude": 53.1, "longitude": -6.3, "radius_km": 10.0 }));
    }
}
