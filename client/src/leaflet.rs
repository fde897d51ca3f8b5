//! Bindings for the parts of the global Leaflet (`L`) API the map uses.

use js_sys::{Array, Function, Reflect};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use trailmap_shared::{Bounds, LngLat};

#[wasm_bindgen]
extern "C" {
    #[derive(Clone, Debug)]
    pub type Map;

    #[wasm_bindgen(catch, js_namespace = L, js_name = map)]
    pub fn create_map(container_id: &str, options: &JsValue) -> Result<Map, JsValue>;

    #[wasm_bindgen(method, js_name = setView)]
    pub fn set_view(this: &Map, center: &Array, zoom: u8) -> Map;

    #[wasm_bindgen(method, js_name = fitBounds)]
    pub fn fit_bounds(this: &Map, bounds: &Array, options: &JsValue) -> Map;

    #[wasm_bindgen(method)]
    pub fn on(this: &Map, event: &str, handler: &Function) -> Map;

    #[wasm_bindgen(method, js_name = addLayer)]
    pub fn add_layer(this: &Map, layer: &Layer) -> Map;

    #[wasm_bindgen(method, js_name = removeLayer)]
    pub fn remove_layer(this: &Map, layer: &Layer) -> Map;

    #[wasm_bindgen(method, js_name = hasLayer)]
    pub fn has_layer(this: &Map, layer: &Layer) -> bool;

    #[wasm_bindgen(catch, method, js_name = addControl)]
    pub fn add_control(this: &Map, control: &JsValue) -> Result<Map, JsValue>;

    #[wasm_bindgen(method, getter = doubleClickZoom)]
    pub fn double_click_zoom(this: &Map) -> Handler;

    #[derive(Clone, Debug)]
    pub type Handler;

    #[wasm_bindgen(method)]
    pub fn enable(this: &Handler);

    #[wasm_bindgen(method)]
    pub fn disable(this: &Handler);

    #[derive(Clone, Debug)]
    pub type Layer;

    #[wasm_bindgen(method, js_name = addTo)]
    pub fn add_to(this: &Layer, map: &Map) -> Layer;

    #[wasm_bindgen(method, js_name = bindPopup)]
    pub fn bind_popup(this: &Layer, html: &str) -> Layer;

    #[wasm_bindgen(method, js_name = toGeoJSON)]
    pub fn to_geojson(this: &Layer) -> JsValue;

    #[wasm_bindgen(extends = Layer)]
    #[derive(Clone, Debug)]
    pub type FeatureGroup;

    #[wasm_bindgen(js_namespace = L, js_name = featureGroup)]
    pub fn feature_group() -> FeatureGroup;

    #[wasm_bindgen(method, js_name = addLayer)]
    pub fn add_layer(this: &FeatureGroup, layer: &Layer) -> FeatureGroup;

    #[wasm_bindgen(method, js_name = clearLayers)]
    pub fn clear_layers(this: &FeatureGroup) -> FeatureGroup;

    #[wasm_bindgen(method, js_name = getLayers)]
    pub fn get_layers(this: &FeatureGroup) -> Array;

    #[wasm_bindgen(js_namespace = L, js_name = tileLayer)]
    pub fn tile_layer(url: &str, options: &JsValue) -> Layer;

    #[wasm_bindgen(catch, js_namespace = L)]
    pub fn marker(at: &Array, options: &JsValue) -> Result<Layer, JsValue>;

    #[wasm_bindgen(catch, js_namespace = L, js_name = circleMarker)]
    pub fn circle_marker(at: &Array, options: &JsValue) -> Result<Layer, JsValue>;

    #[wasm_bindgen(catch, js_namespace = L)]
    pub fn circle(at: &Array, options: &JsValue) -> Result<Layer, JsValue>;

    #[wasm_bindgen(catch, js_namespace = L)]
    pub fn polyline(path: &Array, options: &JsValue) -> Result<Layer, JsValue>;

    #[wasm_bindgen(catch, js_namespace = L)]
    pub fn polygon(ring: &Array, options: &JsValue) -> Result<Layer, JsValue>;

    #[wasm_bindgen(catch, js_namespace = L)]
    pub fn icon(options: &JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = L, js_name = divIcon)]
    pub fn div_icon(options: &JsValue) -> Result<JsValue, JsValue>;

    #[derive(Clone, Debug)]
    pub type Popup;

    #[wasm_bindgen(js_namespace = L, js_name = popup)]
    pub fn popup() -> Popup;

    #[wasm_bindgen(method, js_name = setLatLng)]
    pub fn set_lat_lng(this: &Popup, at: &Array) -> Popup;

    #[wasm_bindgen(method, js_name = setContent)]
    pub fn set_content(this: &Popup, html: &str) -> Popup;

    #[wasm_bindgen(method, js_name = openOn)]
    pub fn open_on(this: &Popup, map: &Map) -> Popup;
}

pub fn available() -> bool {
    Reflect::has(&js_sys::global(), &JsValue::from_str("L")).unwrap_or(false)
}

pub fn lat_lng(at: LngLat) -> Array {
    Array::of2(&JsValue::from_f64(at.lat()), &JsValue::from_f64(at.lng()))
}

pub fn lat_lngs(points: &[LngLat]) -> Array {
    points.iter().map(|at| JsValue::from(lat_lng(*at))).collect()
}

pub fn lat_lng_bounds(bounds: &Bounds) -> Array {
    Array::of2(
        &lat_lng(bounds.south_west()),
        &lat_lng(bounds.north_east()),
    )
}

pub fn event_lat_lng(event: &JsValue) -> Option<LngLat> {
    let latlng = Reflect::get(event, &JsValue::from_str("latlng")).ok()?;
    let lat = Reflect::get(&latlng, &JsValue::from_str("lat")).ok()?.as_f64()?;
    let lng = Reflect::get(&latlng, &JsValue::from_str("lng")).ok()?.as_f64()?;
    LngLat::new(lng, lat)
}

pub fn event_layer(event: &JsValue) -> Option<Layer> {
    let layer = Reflect::get(event, &JsValue::from_str("layer")).ok()?;
    if layer.is_undefined() || layer.is_null() {
        return None;
    }
    Some(layer.unchecked_into())
}

pub fn event_layers(event: &JsValue) -> Vec<Layer> {
    let Ok(group) = Reflect::get(event, &JsValue::from_str("layers")) else {
        return Vec::new();
    };
    if group.is_undefined() || group.is_null() {
        return Vec::new();
    }
    let group: FeatureGroup = group.unchecked_into();
    group
        .get_layers()
        .iter()
        .map(|layer| layer.unchecked_into())
        .collect()
}

pub fn options<T: Serialize>(value: &T) -> JsValue {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    value.serialize(&serializer).unwrap_or(JsValue::UNDEFINED)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IconDefaults<'a> {
    pub icon_url: &'a str,
    pub icon_retina_url: &'a str,
    pub shadow_url: &'a str,
}

pub fn merge_default_icon(defaults: &IconDefaults<'_>) -> Result<(), JsValue> {
    let leaflet = Reflect::get(&js_sys::global(), &JsValue::from_str("L"))?;
    let icon = Reflect::get(&leaflet, &JsValue::from_str("Icon"))?;
    let default = Reflect::get(&icon, &JsValue::from_str("Default"))?;
    let merge: Function = Reflect::get(&default, &JsValue::from_str("mergeOptions"))?.dyn_into()?;
    merge.call1(&default, &options(defaults))?;
    Ok(())
}

/// `new L.Control.Draw(options)`; fails when the draw plugin is missing.
pub fn draw_control(options: &JsValue) -> Result<JsValue, JsValue> {
    let leaflet = Reflect::get(&js_sys::global(), &JsValue::from_str("L"))?;
    let control = Reflect::get(&leaflet, &JsValue::from_str("Control"))?;
    let draw = Reflect::get(&control, &JsValue::from_str("Draw"))?;
    let constructor: Function = draw
        .dyn_into()
        .map_err(|_| JsValue::from_str("Leaflet.draw is not loaded"))?;
    Reflect::construct(&constructor, &Array::of1(options))
}
