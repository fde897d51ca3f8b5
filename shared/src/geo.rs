use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("coordinate is not finite: [{lng}, {lat}]")]
pub struct NonFiniteCoordinate {
    pub lng: f64,
    pub lat: f64,
}

/// A `[longitude, latitude]` pair. Both components are always finite.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(into = "[f64; 2]", try_from = "[f64; 2]")]
pub struct LngLat {
    lng: f64,
    lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Option<Self> {
        if !lng.is_finite() || !lat.is_finite() {
            return None;
        }
        Some(Self { lng, lat })
    }

    pub fn from_lat_lng(lat: f64, lng: f64) -> Option<Self> {
        Self::new(lng, lat)
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Reads a GeoJSON position (`[lng, lat, ...]`). Extra ordinates are ignored.
    pub fn from_position(value: &Value) -> Option<Self> {
        let items = value.as_array()?;
        if items.len() < 2 {
            return None;
        }
        Self::new(coordinate_value(&items[0])?, coordinate_value(&items[1])?)
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(point: LngLat) -> Self {
        [point.lng, point.lat]
    }
}

impl TryFrom<[f64; 2]> for LngLat {
    type Error = NonFiniteCoordinate;

    fn try_from([lng, lat]: [f64; 2]) -> Result<Self, Self::Error> {
        LngLat::new(lng, lat).ok_or(NonFiniteCoordinate { lng, lat })
    }
}

/// Numbers and numeric strings both count; decimal columns often arrive quoted.
pub fn coordinate_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

impl Bounds {
    pub fn around(point: LngLat) -> Self {
        Self {
            min_lng: point.lng,
            min_lat: point.lat,
            max_lng: point.lng,
            max_lat: point.lat,
        }
    }

    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = LngLat>,
    {
        let mut points = points.into_iter();
        let mut bounds = Self::around(points.next()?);
        for point in points {
            bounds.extend(point);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, point: LngLat) {
        self.min_lng = self.min_lng.min(point.lng);
        self.min_lat = self.min_lat.min(point.lat);
        self.max_lng = self.max_lng.max(point.lng);
        self.max_lat = self.max_lat.max(point.lat);
    }

    pub fn contains(&self, point: LngLat) -> bool {
        point.lng >= self.min_lng
            && point.lng <= self.max_lng
            && point.lat >= self.min_lat
            && point.lat <= self.max_lat
    }

    /// Grows each side by `ratio` of the current span, like Leaflet's `LatLngBounds.pad`.
    pub fn pad(&self, ratio: f64) -> Self {
        let lng_pad = (self.max_lng - self.min_lng) * ratio;
        let lat_pad = (self.max_lat - self.min_lat) * ratio;
        Self {
            min_lng: self.min_lng - lng_pad,
            min_lat: self.min_lat - lat_pad,
            max_lng: self.max_lng + lng_pad,
            max_lat: self.max_lat + lat_pad,
        }
    }

    pub fn south_west(&self) -> LngLat {
        LngLat {
            lng: self.min_lng,
            lat: self.min_lat,
        }
    }

    pub fn north_east(&self) -> LngLat {
        LngLat {
            lng: self.max_lng,
            lat: self.max_lat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_non_finite_components() {
        assert!(LngLat::new(f64::NAN, 53.0).is_none());
        assert!(LngLat::new(-6.2, f64::INFINITY).is_none());
        assert!(LngLat::new(-6.2, 53.3).is_some());
    }

    #[test]
    fn reads_positions_with_quoted_numbers() {
        let point = LngLat::from_position(&json!(["-8.5", 52.9, 120.0])).unwrap();
        assert_eq!(point.lng(), -8.5);
        assert_eq!(point.lat(), 52.9);
        assert!(LngLat::from_position(&json!([null, 52.9])).is_none());
        assert!(LngLat::from_position(&json!([1.0])).is_none());
    }

    #[test]
    fn serializes_as_lng_lat_array() {
        let point = LngLat::from_lat_lng(53.0, -9.0).unwrap();
        assert_eq!(serde_json::to_value(point).unwrap(), json!([-9.0, 53.0]));
        let back: LngLat = serde_json::from_value(json!([-9.0, 53.0])).unwrap();
        assert_eq!(back, point);
    }

    #[test]
    fn bounds_cover_every_point() {
        let points = [
            LngLat::new(-9.0, 53.0).unwrap(),
            LngLat::new(-8.5, 52.5).unwrap(),
            LngLat::new(-6.2, 54.1).unwrap(),
        ];
        let bounds = Bounds::from_points(points).unwrap();
        assert!(points.iter().all(|point| bounds.contains(*point)));
        assert_eq!(bounds.min_lng, -9.0);
        assert_eq!(bounds.max_lat, 54.1);
        assert!(Bounds::from_points(Vec::new()).is_none());
    }

    #[test]
    fn pad_grows_by_span_ratio() {
        let bounds = Bounds {
            min_lng: 0.0,
            min_lat: 0.0,
            max_lng: 10.0,
            max_lat: 20.0,
        }
        .pad(0.1);
        assert_eq!(bounds.min_lng, -1.0);
        assert_eq!(bounds.max_lng, 11.0);
        assert_eq!(bounds.min_lat, -2.0);
        assert_eq!(bounds.max_lat, 22.0);
    }
}
