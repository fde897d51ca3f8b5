use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::Reflect;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, Event, HtmlButtonElement, HtmlInputElement, KeyboardEvent};

use trailmap_shared::PolygonGeometry;

use crate::config::ClientConfig;
use crate::context::MapContext;
use crate::dom::{alert, get_element, set_display};
use crate::draw::{Completion, DrawOutcome, DrawSession};
use crate::leaflet::{self, Layer};
use crate::loader::{filter_poi_kinds, load_pois, load_rivers, load_towns, load_trails, search_trails};
use crate::logging;
use crate::map::{initialize_map, LeafletSurface};
use crate::poi::PoiKind;
use crate::proximity::{
    clear_nearby, pois_near_trail, search_nearby, trails_crossing_river, trails_near_river,
};
use crate::search::{clear_drawing, clear_results, finish_polygon, show_preview};
use crate::surface::LayerKind;
use crate::ui::Tone;

const MAP_ID: &str = "map";
const FINISH_BUTTON_ID: &str = "finishDrawing";
const CLEAR_BUTTON_ID: &str = "clearResults";
const POI_FILTERS_ID: &str = "poi-checkboxes";
const TRAIL_SEARCH_INPUT_ID: &str = "trail-search";
const TRAIL_SEARCH_BUTTON_ID: &str = "trail-search-btn";
const PROXIMITY_TOGGLE_ID: &str = "proximity-toggle";
const RADIUS_INPUT_ID: &str = "radius-input";
const LOAD_FAILED: &str = "Failed to load the map. Please refresh the page.";

fn document_ready_state(document: &Document) -> Option<String> {
    Reflect::get(document.as_ref(), &JsValue::from_str("readyState"))
        .ok()?
        .as_string()
}

fn event_string(event: &JsValue, key: &str) -> Option<String> {
    Reflect::get(event, &JsValue::from_str(key)).ok()?.as_string()
}

fn polygon_of(layer: &Layer) -> Option<PolygonGeometry> {
    let value: serde_json::Value = serde_wasm_bindgen::from_value(layer.to_geojson()).ok()?;
    match PolygonGeometry::from_geojson(&value) {
        Ok(polygon) => Some(polygon),
        Err(error) => {
            tracing::warn!(%error, "drawn layer is not a usable polygon");
            None
        }
    }
}

#[wasm_bindgen(start)]
pub fn run() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;
    logging::init(logging::debug_enabled(&window));
    let started = Rc::new(Cell::new(false));

    if document_ready_state(&document).as_deref() == Some("complete") {
        started.set(true);
        launch();
        return Ok(());
    }

    let onload_started = started.clone();
    let onload = Closure::<dyn FnMut(Event)>::new(move |_| {
        if onload_started.replace(true) {
            return;
        }
        launch();
    });
    window.add_event_listener_with_callback("load", onload.as_ref().unchecked_ref())?;
    onload.forget();

    Ok(())
}

fn launch() {
    if let Err(error) = start_app() {
        tracing::error!(error = ?error, "map bootstrap failed");
        alert(LOAD_FAILED);
    }
}

fn start_app() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;

    let config = ClientConfig::from_document(&document);
    let (context, surface) = initialize_map(&document, MAP_ID, config)?;
    let ctx = Rc::new(context);
    let draw = Rc::new(RefCell::new(DrawSession::default()));

    bind_drawing(&ctx, &surface, &draw, &document)?;
    bind_map_clicks(&ctx, &surface, &draw, &document)?;
    bind_layer_toggles(&ctx, &document)?;
    bind_poi_filters(&ctx, &document)?;
    bind_trail_search(&ctx, &document)?;
    bind_proximity(&ctx, &document)?;
    bind_popup_actions(&ctx, &document)?;

    {
        let ctx = ctx.clone();
        spawn_local(async move { load_trails(&ctx).await });
    }
    {
        let ctx = ctx.clone();
        spawn_local(async move { load_towns(&ctx).await });
    }
    {
        let ctx = ctx.clone();
        spawn_local(async move { load_pois(&ctx).await });
    }
    {
        let ctx = ctx.clone();
        spawn_local(async move { load_rivers(&ctx).await });
    }
    Ok(())
}

fn apply_outcome(ctx: &Rc<MapContext>, outcome: DrawOutcome) {
    match outcome {
        DrawOutcome::Ignored => {}
        DrawOutcome::Preview(vertices) => show_preview(ctx, &vertices),
        DrawOutcome::Rejected(error) => {
            tracing::debug!(%error, "completion rejected");
            ctx.ui
                .banner(Tone::Warning, "Add at least 3 points to finish the polygon.");
        }
        DrawOutcome::Completed(polygon) => {
            let ctx = ctx.clone();
            spawn_local(async move { finish_polygon(&ctx, polygon).await });
        }
    }
}

fn set_finish_visible(document: &Document, visible: bool) {
    if let Some(button) = document.get_element_by_id(FINISH_BUTTON_ID) {
        set_display(&button, visible);
    }
}

fn end_drawing_mode(surface: &LeafletSurface, document: &Document) {
    surface.map().double_click_zoom().enable();
    set_finish_visible(document, false);
}

fn bind_drawing(
    ctx: &Rc<MapContext>,
    surface: &Rc<LeafletSurface>,
    draw: &Rc<RefCell<DrawSession>>,
    document: &Document,
) -> Result<(), JsValue> {
    let map = surface.map().clone();

    {
        let draw = draw.clone();
        let surface = surface.clone();
        let document = document.clone();
        let ondrawstart = Closure::<dyn FnMut(JsValue)>::new(move |event: JsValue| {
            if event_string(&event, "layerType").as_deref() != Some("polygon") {
                draw.borrow_mut().activate_plugin();
                return;
            }
            draw.borrow_mut().activate();
            surface.map().double_click_zoom().disable();
            set_finish_visible(&document, true);
        });
        map.on("draw:drawstart", ondrawstart.as_ref().unchecked_ref());
        ondrawstart.forget();
    }

    {
        let ctx = ctx.clone();
        let draw = draw.clone();
        let surface = surface.clone();
        let document = document.clone();
        let oncreated = Closure::<dyn FnMut(JsValue)>::new(move |event: JsValue| {
            let Some(polygon) = leaflet::event_layer(&event).as_ref().and_then(polygon_of) else {
                return;
            };
            let outcome = draw.borrow_mut().complete(Completion::Plugin(polygon));
            end_drawing_mode(&surface, &document);
            apply_outcome(&ctx, outcome);
        });
        map.on("draw:created", oncreated.as_ref().unchecked_ref());
        oncreated.forget();
    }

    {
        let ctx = ctx.clone();
        let draw = draw.clone();
        let surface = surface.clone();
        let document = document.clone();
        let ondrawstop = Closure::<dyn FnMut(JsValue)>::new(move |_| {
            if draw.borrow_mut().cancel() {
                tracing::debug!("drawing stopped without a polygon");
            }
            ctx.surface.clear(LayerKind::Preview);
            end_drawing_mode(&surface, &document);
        });
        map.on("draw:drawstop", ondrawstop.as_ref().unchecked_ref());
        ondrawstop.forget();
    }

    {
        let ctx = ctx.clone();
        let draw = draw.clone();
        let ondeleted = Closure::<dyn FnMut(JsValue)>::new(move |_| {
            draw.borrow_mut().reset();
            clear_drawing(&ctx);
        });
        map.on("draw:deleted", ondeleted.as_ref().unchecked_ref());
        ondeleted.forget();
    }

    {
        let ctx = ctx.clone();
        let draw = draw.clone();
        let onedited = Closure::<dyn FnMut(JsValue)>::new(move |event: JsValue| {
            let Some(polygon) = leaflet::event_layers(&event).iter().find_map(polygon_of) else {
                return;
            };
            draw.borrow_mut().reset();
            clear_results(&ctx);
            let outcome = draw.borrow_mut().complete(Completion::Plugin(polygon));
            apply_outcome(&ctx, outcome);
        });
        map.on("draw:edited", onedited.as_ref().unchecked_ref());
        onedited.forget();
    }

    if let Ok(button) = get_element::<HtmlButtonElement>(document, FINISH_BUTTON_ID) {
        set_display(&button, false);
        let ctx = ctx.clone();
        let draw = draw.clone();
        let surface = surface.clone();
        let document = document.clone();
        let onclick = Closure::<dyn FnMut(Event)>::new(move |_| {
            let outcome = draw.borrow_mut().complete(Completion::FinishButton);
            if matches!(outcome, DrawOutcome::Completed(_)) {
                end_drawing_mode(&surface, &document);
            }
            apply_outcome(&ctx, outcome);
        });
        button.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }

    if let Ok(button) = get_element::<HtmlButtonElement>(document, CLEAR_BUTTON_ID) {
        let ctx = ctx.clone();
        let draw = draw.clone();
        let onclick = Closure::<dyn FnMut(Event)>::new(move |_| {
            draw.borrow_mut().reset();
            clear_drawing(&ctx);
        });
        button.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }

    Ok(())
}

fn radius_km(ctx: &MapContext, document: &Document) -> f64 {
    get_element::<HtmlInputElement>(document, RADIUS_INPUT_ID)
        .ok()
        .map(|input| input.value_as_number())
        .filter(|value| value.is_finite() && *value > 0.0)
        .unwrap_or(ctx.config.radius_km)
}

/// Clicks feed the drawing session first, then proximity search.
fn bind_map_clicks(
    ctx: &Rc<MapContext>,
    surface: &Rc<LeafletSurface>,
    draw: &Rc<RefCell<DrawSession>>,
    document: &Document,
) -> Result<(), JsValue> {
    let map = surface.map().clone();

    {
        let ctx = ctx.clone();
        let draw = draw.clone();
        let document = document.clone();
        let onclick = Closure::<dyn FnMut(JsValue)>::new(move |event: JsValue| {
            let Some(at) = leaflet::event_lat_lng(&event) else {
                return;
            };
            if draw.borrow().is_drawing() {
                let outcome = draw.borrow_mut().add_vertex(at);
                apply_outcome(&ctx, outcome);
                return;
            }
            if draw.borrow().is_active() {
                return;
            }
            if ctx.state.borrow().proximity_mode {
                let radius = radius_km(&ctx, &document);
                let ctx = ctx.clone();
                spawn_local(async move {
                    search_nearby(&ctx, at, radius).await;
                });
            }
        });
        map.on("click", onclick.as_ref().unchecked_ref());
        onclick.forget();
    }

    {
        let ctx = ctx.clone();
        let draw = draw.clone();
        let surface = surface.clone();
        let document = document.clone();
        let ondblclick = Closure::<dyn FnMut(JsValue)>::new(move |event: JsValue| {
            if !draw.borrow().is_drawing() {
                return;
            }
            if let Some(at) = leaflet::event_lat_lng(&event) {
                draw.borrow_mut().add_vertex(at);
            }
            let outcome = draw.borrow_mut().complete(Completion::DoubleClick);
            if matches!(outcome, DrawOutcome::Completed(_)) {
                end_drawing_mode(&surface, &document);
            }
            apply_outcome(&ctx, outcome);
        });
        map.on("dblclick", ondblclick.as_ref().unchecked_ref());
        ondblclick.forget();
    }

    Ok(())
}

fn bind_toggle(
    ctx: &Rc<MapContext>,
    document: &Document,
    id: &str,
    kind: LayerKind,
) -> Result<(), JsValue> {
    let Ok(input) = get_element::<HtmlInputElement>(document, id) else {
        return Ok(());
    };
    let ctx = ctx.clone();
    let source = input.clone();
    let onchange = Closure::<dyn FnMut(Event)>::new(move |_| {
        let visible = source.checked();
        if ctx.state.borrow_mut().set_visible(kind, visible) {
            ctx.surface.set_visible(kind, visible);
            tracing::debug!(?kind, visible, "layer toggled");
        }
    });
    input.add_event_listener_with_callback("change", onchange.as_ref().unchecked_ref())?;
    onchange.forget();
    Ok(())
}

fn bind_layer_toggles(ctx: &Rc<MapContext>, document: &Document) -> Result<(), JsValue> {
    bind_toggle(ctx, document, "show-trails", LayerKind::Trails)?;
    bind_toggle(ctx, document, "show-towns", LayerKind::Towns)?;
    bind_toggle(ctx, document, "show-rivers", LayerKind::Rivers)?;
    Ok(())
}

fn checked_poi_kinds(container: &Element) -> Vec<PoiKind> {
    PoiKind::ALL
        .into_iter()
        .filter(|kind| {
            container
                .query_selector(&format!("input[data-poi=\"{}\"]", kind.slug()))
                .ok()
                .flatten()
                .and_then(|element| element.dyn_into::<HtmlInputElement>().ok())
                .map(|input| input.checked())
                .unwrap_or(true)
        })
        .collect()
}

fn bind_poi_filters(ctx: &Rc<MapContext>, document: &Document) -> Result<(), JsValue> {
    let Some(container) = document.get_element_by_id(POI_FILTERS_ID) else {
        return Ok(());
    };
    let html: String = PoiKind::ALL
        .into_iter()
        .map(|kind| {
            let style = kind.style();
            let slug = kind.slug();
            format!(
                "<div class=\"form-check\">\
                 <input class=\"form-check-input\" type=\"checkbox\" id=\"poi-{slug}\" data-poi=\"{slug}\" checked>\
                 <label class=\"form-check-label\" for=\"poi-{slug}\">{} {}</label></div>",
                style.icon, style.label
            )
        })
        .collect();
    container.set_inner_html(&html);

    let ctx = ctx.clone();
    let source = container.clone();
    let onchange = Closure::<dyn FnMut(Event)>::new(move |_| {
        filter_poi_kinds(&ctx, &checked_poi_kinds(&source));
    });
    container.add_event_listener_with_callback("change", onchange.as_ref().unchecked_ref())?;
    onchange.forget();
    Ok(())
}

fn bind_trail_search(ctx: &Rc<MapContext>, document: &Document) -> Result<(), JsValue> {
    let Ok(input) = get_element::<HtmlInputElement>(document, TRAIL_SEARCH_INPUT_ID) else {
        return Ok(());
    };
    let submit: Rc<dyn Fn()> = {
        let ctx = ctx.clone();
        let input = input.clone();
        Rc::new(move || {
            let query = input.value();
            let ctx = ctx.clone();
            spawn_local(async move { search_trails(&ctx, &query).await });
        })
    };

    {
        let submit = submit.clone();
        let onkeydown = Closure::<dyn FnMut(KeyboardEvent)>::new(move |event: KeyboardEvent| {
            if event.key() == "Enter" {
                event.prevent_default();
                submit();
            }
        });
        input.add_event_listener_with_callback("keydown", onkeydown.as_ref().unchecked_ref())?;
        onkeydown.forget();
    }

    if let Ok(button) = get_element::<HtmlButtonElement>(document, TRAIL_SEARCH_BUTTON_ID) {
        let onclick = Closure::<dyn FnMut(Event)>::new(move |_| submit());
        button.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }
    Ok(())
}

fn bind_proximity(ctx: &Rc<MapContext>, document: &Document) -> Result<(), JsValue> {
    let Ok(toggle) = get_element::<HtmlInputElement>(document, PROXIMITY_TOGGLE_ID) else {
        return Ok(());
    };
    ctx.state.borrow_mut().proximity_mode = toggle.checked();
    let ctx = ctx.clone();
    let source = toggle.clone();
    let onchange = Closure::<dyn FnMut(Event)>::new(move |_| {
        let enabled = source.checked();
        ctx.state.borrow_mut().proximity_mode = enabled;
        if enabled {
            ctx.ui
                .banner(Tone::Info, "Click the map to find trails nearby.");
        } else {
            clear_nearby(&ctx);
        }
    });
    toggle.add_event_listener_with_callback("change", onchange.as_ref().unchecked_ref())?;
    onchange.forget();
    Ok(())
}

/// Buttons inside popups are created by Leaflet after binding, so clicks are
/// caught at the document and routed by `data-action`.
fn bind_popup_actions(ctx: &Rc<MapContext>, document: &Document) -> Result<(), JsValue> {
    let ctx = ctx.clone();
    let onclick = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        let Some(button) = event
            .target()
            .and_then(|target| target.dyn_into::<Element>().ok())
            .and_then(|element| element.closest("[data-action]").ok().flatten())
        else {
            return;
        };
        let (Some(action), Some(id)) = (button.get_attribute("data-action"), button.get_attribute("data-id"))
        else {
            return;
        };
        tracing::debug!(%action, %id, "popup action");
        let ctx = ctx.clone();
        match action.as_str() {
            "trail-pois" => spawn_local(async move {
                pois_near_trail(&ctx, &id, None).await;
            }),
            "river-crossing" => spawn_local(async move {
                trails_crossing_river(&ctx, &id).await;
            }),
            "river-near" => spawn_local(async move {
                trails_near_river(&ctx, &id).await;
            }),
            other => tracing::warn!(action = other, "unknown popup action"),
        }
    });
    document.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
    onclick.forget();
    Ok(())
}
