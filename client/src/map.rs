use std::collections::HashMap;
use std::rc::Rc;

use js_sys::Reflect;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use web_sys::Document;

use trailmap_shared::{Bounds, LngLat};

use crate::config::ClientConfig;
use crate::context::{MapContext, TimerPacer};
use crate::dom::DomUi;
use crate::leaflet::{self, FeatureGroup, IconDefaults, Layer, Map};
use crate::net::HttpBackend;
use crate::surface::{
    FitPadding, LayerKind, MapSurface, MarkerIcon, PathStyle, Primitive, DRAWN_POLYGON,
};

const ICON_DEFAULTS: IconDefaults<'static> = IconDefaults {
    icon_url: "/static/leaflet/images/marker-icon.png",
    icon_retina_url: "/static/leaflet/images/marker-icon-2x.png",
    shadow_url: "/static/leaflet/images/marker-shadow.png",
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MapOptions {
    double_click_zoom: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TileOptions<'a> {
    attribution: &'a str,
    max_zoom: u8,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PathOptions {
    color: &'static str,
    weight: f64,
    opacity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    fill_color: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fill_opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dash_array: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    radius: Option<f64>,
}

impl PathOptions {
    fn new(style: &PathStyle, radius: Option<f64>) -> Self {
        Self {
            color: style.color,
            weight: style.weight,
            opacity: style.opacity,
            fill_color: style.fill_color,
            fill_opacity: style.fill_opacity,
            dash_array: style.dash_array,
            radius,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageIconOptions<'a> {
    icon_url: &'a str,
    shadow_url: &'a str,
    icon_size: [u32; 2],
    icon_anchor: [i32; 2],
    popup_anchor: [i32; 2],
    shadow_size: [u32; 2],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DivIconOptions {
    class_name: &'static str,
    html: String,
    icon_size: [u32; 2],
    icon_anchor: [i32; 2],
}

#[derive(Serialize)]
struct PaddingOptions {
    padding: [u32; 2],
}

pub struct LeafletSurface {
    map: Map,
    groups: HashMap<LayerKind, FeatureGroup>,
}

impl LeafletSurface {
    fn new(map: Map) -> Self {
        let groups = LayerKind::all()
            .into_iter()
            .map(|kind| {
                let group = leaflet::feature_group();
                group.add_to(&map);
                (kind, group)
            })
            .collect();
        Self { map, groups }
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    pub fn group(&self, kind: LayerKind) -> Option<&FeatureGroup> {
        self.groups.get(&kind)
    }

    fn build(&self, primitive: &Primitive) -> Result<Layer, JsValue> {
        let layer = match primitive {
            Primitive::Marker {
                at, icon, title, ..
            } => {
                let options = js_sys::Object::new();
                if let Some(icon) = marker_icon(icon)? {
                    Reflect::set(&options, &JsValue::from_str("icon"), &icon)?;
                }
                if let Some(title) = title {
                    Reflect::set(&options, &JsValue::from_str("title"), &JsValue::from_str(title))?;
                }
                leaflet::marker(&leaflet::lat_lng(*at), &options)?
            }
            Primitive::CircleMarker {
                at, radius, style, ..
            } => leaflet::circle_marker(
                &leaflet::lat_lng(*at),
                &leaflet::options(&PathOptions::new(style, Some(*radius))),
            )?,
            Primitive::Circle { at, radius_m, style } => leaflet::circle(
                &leaflet::lat_lng(*at),
                &leaflet::options(&PathOptions::new(style, Some(*radius_m))),
            )?,
            Primitive::Polyline { path, style, .. } => {
                let lines: js_sys::Array = path
                    .iter()
                    .map(|line| JsValue::from(leaflet::lat_lngs(line)))
                    .collect();
                leaflet::polyline(&lines, &leaflet::options(&PathOptions::new(style, None)))?
            }
            Primitive::Polygon { ring, style, .. } => leaflet::polygon(
                &leaflet::lat_lngs(ring),
                &leaflet::options(&PathOptions::new(style, None)),
            )?,
        };
        if let Some(html) = primitive.popup() {
            layer.bind_popup(html);
        }
        Ok(layer)
    }
}

fn marker_icon(icon: &MarkerIcon) -> Result<Option<JsValue>, JsValue> {
    let icon = match icon {
        MarkerIcon::Default => return Ok(None),
        MarkerIcon::Image(url) => leaflet::icon(&leaflet::options(&ImageIconOptions {
            icon_url: url,
            shadow_url: ICON_DEFAULTS.shadow_url,
            icon_size: [25, 41],
            icon_anchor: [12, 41],
            popup_anchor: [1, -34],
            shadow_size: [41, 41],
        }))?,
        MarkerIcon::Numbered(rank) => leaflet::div_icon(&leaflet::options(&DivIconOptions {
            class_name: "numbered-marker",
            html: format!("<div class=\"marker-number\">{rank}</div>"),
            icon_size: [30, 30],
            icon_anchor: [15, 15],
        }))?,
        MarkerIcon::Badge { glyph, color } => leaflet::div_icon(&leaflet::options(&DivIconOptions {
            class_name: "poi-marker",
            html: format!(
                "<div style=\"background:{color};border-radius:50%;width:28px;height:28px;\
                 display:flex;align-items:center;justify-content:center;\
                 border:2px solid #fff;box-shadow:0 1px 3px rgba(0,0,0,.4)\">{glyph}</div>"
            ),
            icon_size: [28, 28],
            icon_anchor: [14, 14],
        }))?,
    };
    Ok(Some(icon))
}

impl MapSurface for LeafletSurface {
    fn clear(&self, kind: LayerKind) {
        if let Some(group) = self.groups.get(&kind) {
            group.clear_layers();
        }
    }

    fn add(&self, kind: LayerKind, primitive: &Primitive) -> bool {
        let Some(group) = self.groups.get(&kind) else {
            return false;
        };
        match self.build(primitive) {
            Ok(layer) => {
                group.add_layer(&layer);
                true
            }
            Err(error) => {
                tracing::warn!(?kind, error = ?error, "failed to create map layer");
                false
            }
        }
    }

    fn count(&self, kind: LayerKind) -> usize {
        self.groups
            .get(&kind)
            .map(|group| group.get_layers().length() as usize)
            .unwrap_or(0)
    }

    fn fit_bounds(&self, bounds: &Bounds, padding: FitPadding) {
        match padding {
            FitPadding::Pixels(pixels) => self.map.fit_bounds(
                &leaflet::lat_lng_bounds(bounds),
                &leaflet::options(&PaddingOptions {
                    padding: [pixels, pixels],
                }),
            ),
            FitPadding::Ratio(ratio) => self
                .map
                .fit_bounds(&leaflet::lat_lng_bounds(&bounds.pad(ratio)), &JsValue::UNDEFINED),
        };
    }

    fn set_visible(&self, kind: LayerKind, visible: bool) {
        let Some(group) = self.groups.get(&kind) else {
            return;
        };
        let shown = self.map.has_layer(group);
        if visible && !shown {
            self.map.add_layer(group);
        } else if !visible && shown {
            self.map.remove_layer(group);
        }
    }

    fn open_popup(&self, at: LngLat, html: &str) {
        leaflet::popup()
            .set_lat_lng(&leaflet::lat_lng(at))
            .set_content(html)
            .open_on(&self.map);
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShapeOptions {
    shape_options: PathOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PolygonToolOptions {
    allow_intersection: bool,
    show_area: bool,
    shape_options: PathOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DrawTools {
    polygon: PolygonToolOptions,
    rectangle: ShapeOptions,
    polyline: bool,
    circle: bool,
    marker: bool,
    circlemarker: bool,
}

fn install_draw_control(surface: &LeafletSurface) -> Result<(), JsValue> {
    let tools = DrawTools {
        polygon: PolygonToolOptions {
            allow_intersection: false,
            show_area: true,
            shape_options: PathOptions::new(&DRAWN_POLYGON, None),
        },
        rectangle: ShapeOptions {
            shape_options: PathOptions::new(&DRAWN_POLYGON, None),
        },
        polyline: false,
        circle: false,
        marker: false,
        circlemarker: false,
    };
    let edit = js_sys::Object::new();
    if let Some(drawn) = surface.group(LayerKind::Drawn) {
        Reflect::set(&edit, &JsValue::from_str("featureGroup"), drawn)?;
    }
    Reflect::set(&edit, &JsValue::from_str("remove"), &JsValue::TRUE)?;
    let options = js_sys::Object::new();
    Reflect::set(&options, &JsValue::from_str("position"), &JsValue::from_str("topright"))?;
    Reflect::set(&options, &JsValue::from_str("draw"), &leaflet::options(&tools))?;
    Reflect::set(&options, &JsValue::from_str("edit"), &edit)?;
    let control = leaflet::draw_control(&options)?;
    surface.map().add_control(&control)?;
    Ok(())
}

pub fn initialize_map(
    document: &Document,
    container_id: &str,
    config: ClientConfig,
) -> Result<(MapContext, Rc<LeafletSurface>), JsValue> {
    if !leaflet::available() {
        return Err(JsValue::from_str("Leaflet is not loaded"));
    }
    let container = document
        .get_element_by_id(container_id)
        .ok_or_else(|| JsValue::from_str(&format!("Missing element: {container_id}")))?;
    let leaflet_id = JsValue::from_str("_leaflet_id");
    if Reflect::has(&container, &leaflet_id)? {
        tracing::warn!(container_id, "map container already initialized; resetting");
        Reflect::set(&container, &leaflet_id, &JsValue::NULL)?;
    }

    let map = leaflet::create_map(
        container_id,
        &leaflet::options(&MapOptions {
            double_click_zoom: true,
        }),
    )?;
    let [lat, lng] = config.center;
    map.set_view(&js_sys::Array::of2(&lat.into(), &lng.into()), config.zoom);
    leaflet::tile_layer(
        &config.tile_url,
        &leaflet::options(&TileOptions {
            attribution: &config.tile_attribution,
            max_zoom: config.max_zoom,
        }),
    )
    .add_to(&map);
    leaflet::merge_default_icon(&ICON_DEFAULTS)?;

    let surface = Rc::new(LeafletSurface::new(map));
    if let Err(error) = install_draw_control(&surface) {
        tracing::warn!(error = ?error, "drawing tools unavailable");
    }
    tracing::info!(container_id, lat, lng, zoom = config.zoom, "map initialized");

    let ui = Rc::new(DomUi::new(document.clone()));
    let context = MapContext::new(
        config,
        surface.clone(),
        Rc::new(HttpBackend::new(document.clone())),
        Rc::new(TimerPacer),
        ui,
    );
    Ok((context, surface))
}
