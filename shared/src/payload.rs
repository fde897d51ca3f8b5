use serde_json::Value;
use thiserror::Error;

use crate::feature::Feature;

/// The response shapes list endpoints are known to produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionShape {
    /// `{"type": "FeatureCollection", "features": [...]}`
    FeatureCollection,
    /// `{"features": {"type": "FeatureCollection", "features": [...]}}`
    NestedFeatureCollection,
    /// `[{...}, {...}]`
    PlainArray,
    /// `{"results": [...] | FeatureCollection, "next": "..."}`
    Paginated,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PayloadError {
    #[error("unrecognized payload shape (top-level keys: {keys})")]
    Unrecognized { keys: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Collection {
    pub shape: CollectionShape,
    pub features: Vec<Feature>,
    pub next: Option<String>,
}

pub fn decode_collection(value: &Value) -> Result<Collection, PayloadError> {
    if let Some(features) = feature_collection(value) {
        return Ok(Collection {
            shape: CollectionShape::FeatureCollection,
            features,
            next: None,
        });
    }
    if let Some(features) = value.get("features").and_then(feature_collection) {
        return Ok(Collection {
            shape: CollectionShape::NestedFeatureCollection,
            features,
            next: None,
        });
    }
    if let Some(items) = value.as_array() {
        return Ok(Collection {
            shape: CollectionShape::PlainArray,
            features: items.iter().map(Feature::from_record).collect(),
            next: None,
        });
    }
    if let Some(results) = value.get("results") {
        let features = match results {
            Value::Array(items) => Some(items.iter().map(Feature::from_record).collect()),
            other => feature_collection(other),
        };
        if let Some(features) = features {
            let next = value
                .get("next")
                .and_then(Value::as_str)
                .filter(|next| !next.is_empty())
                .map(str::to_string);
            return Ok(Collection {
                shape: CollectionShape::Paginated,
                features,
                next,
            });
        }
    }
    Err(PayloadError::Unrecognized {
        keys: top_level_keys(value),
    })
}

fn feature_collection(value: &Value) -> Option<Vec<Feature>> {
    if value.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        return None;
    }
    let features = value.get("features")?.as_array()?;
    Some(features.iter().map(Feature::from_geojson).collect())
}

fn top_level_keys(value: &Value) -> String {
    match value {
        Value::Object(map) if map.is_empty() => "<empty object>".to_string(),
        Value::Object(map) => map.keys().cloned().collect::<Vec<_>>().join(", "),
        Value::Null => "<null>".to_string(),
        _ => "<scalar>".to_string(),
    }
}
