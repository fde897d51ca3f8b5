use trailmap_shared::{Bounds, LngLat};

use crate::poi::PoiKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerKind {
    Trails,
    Towns,
    Poi(PoiKind),
    Rivers,
    Results,
    Nearby,
    Crossing,
    NearRiver,
    Drawn,
    Preview,
}

impl LayerKind {
    pub fn all() -> Vec<LayerKind> {
        let mut kinds = vec![LayerKind::Trails, LayerKind::Towns];
        kinds.extend(PoiKind::ALL.into_iter().map(LayerKind::Poi));
        kinds.extend([
            LayerKind::Rivers,
            LayerKind::Results,
            LayerKind::Nearby,
            LayerKind::Crossing,
            LayerKind::NearRiver,
            LayerKind::Drawn,
            LayerKind::Preview,
        ]);
        kinds
    }

    pub fn pois() -> impl Iterator<Item = LayerKind> {
        PoiKind::ALL.into_iter().map(LayerKind::Poi)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathStyle {
    pub color: &'static str,
    pub weight: f64,
    pub opacity: f64,
    pub fill_color: Option<&'static str>,
    pub fill_opacity: Option<f64>,
    pub dash_array: Option<&'static str>,
}

impl PathStyle {
    pub const fn stroke(color: &'static str, weight: f64, opacity: f64) -> Self {
        Self {
            color,
            weight,
            opacity,
            fill_color: None,
            fill_opacity: None,
            dash_array: None,
        }
    }

    pub const fn filled(self, fill_color: &'static str, fill_opacity: f64) -> Self {
        Self {
            fill_color: Some(fill_color),
            fill_opacity: Some(fill_opacity),
            ..self
        }
    }

    pub const fn dashed(self, dash_array: &'static str) -> Self {
        Self {
            dash_array: Some(dash_array),
            ..self
        }
    }
}

pub const DRAWN_POLYGON: PathStyle = PathStyle::stroke("#2E8B57", 4.0, 1.0).filled("#90EE90", 0.15);
pub const DRAW_PREVIEW: PathStyle = PathStyle::stroke("#2E8B57", 4.0, 1.0).dashed("5, 5");
pub const RESULT_FALLBACK: PathStyle = PathStyle::stroke("#ff5722", 1.0, 1.0).filled("#ff8a50", 0.9);
pub const TRAIL_FALLBACK: PathStyle = PathStyle::stroke("#2e7d32", 1.0, 1.0).filled("#66bb6a", 0.9);
pub const RIVER: PathStyle = PathStyle::stroke("#1e90ff", 3.0, 0.8);
pub const CROSSING_TRAIL: PathStyle = PathStyle::stroke("#FF0000", 6.0, 0.9);
pub const NEAR_RIVER_TRAIL: PathStyle = PathStyle::stroke("#FF9F1C", 2.0, 1.0).filled("#FFCC00", 0.9);
pub const SEARCH_RADIUS: PathStyle = PathStyle::stroke("#007bff", 2.0, 0.8).filled("#007bff", 0.1);
pub const SEARCH_POINT: PathStyle = PathStyle::stroke("#d32f2f", 2.0, 1.0).filled("#ef5350", 0.9);

#[derive(Clone, Debug, PartialEq)]
pub enum MarkerIcon {
    Default,
    Image(&'static str),
    Numbered(usize),
    Badge {
        glyph: &'static str,
        color: &'static str,
    },
}

pub const GREEN_PIN: &str =
    "https://raw.githubusercontent.com/pointhi/leaflet-color-markers/master/img/marker-icon-green.png";
pub const BLUE_PIN: &str =
    "https://raw.githubusercontent.com/pointhi/leaflet-color-markers/master/img/marker-icon-blue.png";

#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Marker {
        at: LngLat,
        icon: MarkerIcon,
        title: Option<String>,
        popup: Option<String>,
    },
    CircleMarker {
        at: LngLat,
        radius: f64,
        style: PathStyle,
        popup: Option<String>,
    },
    Circle {
        at: LngLat,
        radius_m: f64,
        style: PathStyle,
    },
    Polyline {
        path: Vec<Vec<LngLat>>,
        style: PathStyle,
        popup: Option<String>,
    },
    Polygon {
        ring: Vec<LngLat>,
        style: PathStyle,
        popup: Option<String>,
    },
}

impl Primitive {
    pub fn points(&self) -> Vec<LngLat> {
        match self {
            Primitive::Marker { at, .. }
            | Primitive::CircleMarker { at, .. }
            | Primitive::Circle { at, .. } => vec![*at],
            Primitive::Polyline { path, .. } => path.iter().flatten().copied().collect(),
            Primitive::Polygon { ring, .. } => ring.clone(),
        }
    }

    pub fn popup(&self) -> Option<&str> {
        match self {
            Primitive::Marker { popup, .. }
            | Primitive::CircleMarker { popup, .. }
            | Primitive::Polyline { popup, .. }
            | Primitive::Polygon { popup, .. } => popup.as_deref(),
            Primitive::Circle { .. } => None,
        }
    }

    /// Markers become plain circle markers; other primitives are unchanged.
    pub fn degraded(&self, style: &PathStyle) -> Primitive {
        match self {
            Primitive::Marker { at, popup, .. } => Primitive::CircleMarker {
                at: *at,
                radius: 6.0,
                style: *style,
                popup: popup.clone(),
            },
            other => other.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FitPadding {
    Pixels(u32),
    Ratio(f64),
}

pub trait MapSurface {
    fn clear(&self, kind: LayerKind);
    /// Returns false when the primitive could not be placed on the map.
    fn add(&self, kind: LayerKind, primitive: &Primitive) -> bool;
    fn count(&self, kind: LayerKind) -> usize;
    fn fit_bounds(&self, bounds: &Bounds, padding: FitPadding);
    fn set_visible(&self, kind: LayerKind, visible: bool);
    fn open_popup(&self, at: LngLat, html: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_layer_kind_is_listed_once() {
        let kinds = LayerKind::all();
        let mut sorted = kinds.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(kinds.len(), sorted.len());
        assert_eq!(LayerKind::pois().count(), 10);
    }

    #[test]
    fn degraded_marker_keeps_position_and_popup() {
        let at = LngLat::new(-8.0, 53.0).unwrap();
        let marker = Primitive::Marker {
            at,
            icon: MarkerIcon::Default,
            title: None,
            popup: Some("<b>x</b>".into()),
        };
        let degraded = marker.degraded(&RESULT_FALLBACK);
        assert_eq!(degraded.points(), vec![at]);
        assert_eq!(degraded.popup(), Some("<b>x</b>"));
        assert!(matches!(degraded, Primitive::CircleMarker { radius, .. } if radius == 6.0));
    }
}
