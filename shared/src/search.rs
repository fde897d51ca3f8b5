use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::feature::{Feature, Properties};
use crate::geo::LngLat;
use crate::polygon::PolygonGeometry;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct PolygonSearchRequest<'a> {
    pub polygon: &'a PolygonGeometry,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PolygonSearchResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub results: Option<SearchResults>,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SearchResults {
    #[serde(default)]
    pub cities: Option<Vec<Value>>,
    #[serde(default)]
    pub geojson: Option<Value>,
    #[serde(default)]
    pub analysis: Option<Analysis>,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Analysis {
    #[serde(default)]
    pub total_cities: Option<u64>,
    #[serde(default)]
    pub total_population: Option<f64>,
    #[serde(default)]
    pub average_population: Option<f64>,
    #[serde(default)]
    pub polygon_area_km2: Option<f64>,
    #[serde(default)]
    pub population_density: Option<f64>,
    #[serde(default)]
    pub execution_time_ms: Option<f64>,
    #[serde(default)]
    pub debug: Option<DebugCounters>,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DebugCounters {
    #[serde(default)]
    pub bbox_count: Option<u64>,
    #[serde(default)]
    pub within_count: Option<u64>,
    #[serde(default)]
    pub intersects_count: Option<u64>,
    #[serde(default)]
    pub used_method: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaceSource {
    Cities,
    GeoJson,
    Empty,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Place {
    pub id: Option<String>,
    pub name: String,
    pub country: Option<String>,
    pub population: Option<f64>,
    pub coord: Option<LngLat>,
    pub place_type: Option<String>,
    pub gdp_per_capita: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlaceList {
    pub source: PlaceSource,
    pub places: Vec<Place>,
    pub analysis: Option<Analysis>,
}

impl PlaceList {
    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn population_sum(&self) -> f64 {
        self.places.iter().filter_map(|place| place.population).sum()
    }
}

pub fn normalize_places(response: PolygonSearchResponse) -> PlaceList {
    let Some(results) = response.results else {
        return PlaceList {
            source: PlaceSource::Empty,
            places: Vec::new(),
            analysis: None,
        };
    };
    let (source, places) = match results.cities {
        Some(cities) if !cities.is_empty() => (
            PlaceSource::Cities,
            cities.iter().map(place_from_record).collect(),
        ),
        _ => match results
            .geojson
            .as_ref()
            .and_then(|geojson| geojson.get("features"))
            .and_then(Value::as_array)
        {
            Some(features) => (
                PlaceSource::GeoJson,
                features
                    .iter()
                    .map(|value| place_from_feature(&Feature::from_geojson(value)))
                    .collect(),
            ),
            None => (PlaceSource::Empty, Vec::new()),
        },
    };
    PlaceList {
        source,
        places,
        analysis: results.analysis,
    }
}

fn place_from_record(value: &Value) -> Place {
    let feature = Feature::from_record(value);
    place_from_feature(&feature)
}

fn place_from_feature(feature: &Feature) -> Place {
    let props = &feature.properties;
    Place {
        id: feature.id.clone().or_else(|| props.text(&["id"])),
        name: props.text_or(&["name", "ENGLISH"], "Unknown"),
        country: props.text(&["country", "county"]),
        population: props.number(&["population"]),
        coord: feature.anchor(),
        place_type: place_type(props),
        gdp_per_capita: props.number(&["gdp_per_capita"]),
    }
}

fn place_type(props: &Properties) -> Option<String> {
    props.text(&["city_type", "town_type", "type"])
}

/// User-facing text for an empty result set, carrying the server's counters when present.
pub fn no_results_message(analysis: Option<&Analysis>) -> String {
    match analysis.and_then(|analysis| analysis.debug.as_ref()) {
        Some(debug) => format!(
            "No towns found by polygon. bbox_count={}, within_count={}, intersects_count={}, used={}",
            counter(debug.bbox_count),
            counter(debug.within_count),
            counter(debug.intersects_count),
            debug.used_method.as_deref().unwrap_or("?"),
        ),
        None => "No towns found in polygon".to_string(),
    }
}

fn counter(value: Option<u64>) -> String {
    value.map_or_else(|| "?".to_string(), |value| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: Value) -> PolygonSearchResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn prefers_non_empty_city_list() {
        let list = normalize_places(response(json!({
            "success": true,
            "results": {
                "cities": [{
                    "id": 1, "name": "Athlone", "country": "Ireland",
                    "population": 21349, "latitude": 53.42, "longitude": -7.94,
                    "city_type": "town"
                }],
                "geojson": { "type": "FeatureCollection", "features": [] },
                "analysis": { "total_cities": 1, "total_population": 21349 }
            }
        })));
        assert_eq!(list.source, PlaceSource::Cities);
        assert_eq!(list.places.len(), 1);
        let place = &list.places[0];
        assert_eq!(place.name, "Athlone");
        assert_eq!(place.place_type.as_deref(), Some("town"));
        assert_eq!(place.coord, LngLat::from_lat_lng(53.42, -7.94));
        assert_eq!(list.analysis.unwrap().total_cities, Some(1));
    }

    #[test]
    fn falls_back_to_geojson_features() {
        let list = normalize_places(response(json!({
            "results": {
                "cities": [],
                "geojson": { "type": "FeatureCollection", "features": [{
                    "type": "Feature", "id": 9,
                    "geometry": { "type": "Point", "coordinates": [-8.63, 52.66] },
                    "properties": { "ENGLISH": "Limerick", "town_type": "city" }
                }]}
            }
        })));
        assert_eq!(list.source, PlaceSource::GeoJson);
        assert_eq!(list.places[0].name, "Limerick");
        assert_eq!(list.places[0].id.as_deref(), Some("9"));
        assert_eq!(list.places[0].place_type.as_deref(), Some("city"));
    }

    #[test]
    fn empty_message_carries_debug_counters() {
        let list = normalize_places(response(json!({
            "results": {
                "cities": [],
                "analysis": {
                    "total_cities": 0,
                    "debug": { "bbox_count": 12, "within_count": 0, "intersects_count": 3, "used_method": "within" }
                }
            }
        })));
        assert!(list.is_empty());
        assert_eq!(
            no_results_message(list.analysis.as_ref()),
            "No towns found by polygon. bbox_count=12, within_count=0, intersects_count=3, used=within"
        );
        assert_eq!(no_results_message(None), "No towns found in polygon");
    }

    #[test]
    fn missing_results_is_empty() {
        let list = normalize_places(response(json!({ "success": false })));
        assert_eq!(list.source, PlaceSource::Empty);
        assert!(list.is_empty());
    }
}
