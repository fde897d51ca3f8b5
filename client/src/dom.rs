use std::cell::Cell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement};

use trailmap_shared::proximity::NearbyTrail;
use trailmap_shared::{LngLat, PlaceList};

use crate::popup::escape_html;
use crate::state::format_thousands;
use crate::ui::{Slot, Tone, UiSink};

pub const STATUS_ID: &str = "searchStatus";
pub const LOADING_ID: &str = "loadingIndicator";
pub const CITIES_CONTAINER_ID: &str = "citiesContainer";
pub const CITIES_LIST_ID: &str = "citiesList";
pub const ANALYSIS_ID: &str = "analysisSummary";
pub const PROXIMITY_RESULTS_ID: &str = "proximity-results";

pub fn get_element<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    let element = document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("Missing element: {id}")))?;
    element
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("Invalid element type: {id}")))
}

pub fn set_display(element: &Element, shown: bool) {
    if let Some(element) = element.dyn_ref::<HtmlElement>() {
        let _ = element
            .style()
            .set_property("display", if shown { "block" } else { "none" });
    }
}

pub fn set_status(status_el: &Element, tone: Tone, text: &str) {
    status_el.set_class_name(&format!("alert {}", tone.class_name()));
    let _ = status_el.set_attribute("data-state", tone.class_name());
    status_el.set_text_content(Some(text));
    set_display(status_el, true);
}

pub fn alert(message: &str) {
    if let Some(window) = web_sys::window() {
        let _ = window.alert_with_message(message);
    }
}

/// Writes status and results into the page. Elements the page lacks are
/// skipped, so the same sink serves the full map and the dashboard.
pub struct DomUi {
    document: Document,
    banner_generation: Rc<Cell<u64>>,
}

impl DomUi {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            banner_generation: Rc::new(Cell::new(0)),
        }
    }

    fn element(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }
}

impl UiSink for DomUi {
    fn banner(&self, tone: Tone, message: &str) {
        let Some(status) = self.element(STATUS_ID) else {
            tracing::info!(?tone, message, "status");
            return;
        };
        set_status(&status, tone, message);
        let generation = self.banner_generation.get() + 1;
        self.banner_generation.set(generation);
        let current = self.banner_generation.clone();
        gloo_timers::callback::Timeout::new(tone.dismiss_after_ms(), move || {
            // A newer banner owns the element now.
            if current.get() == generation {
                set_display(&status, false);
            }
        })
        .forget();
    }

    fn set_loading(&self, loading: bool) {
        if let Some(indicator) = self.element(LOADING_ID) {
            set_display(&indicator, loading);
        }
    }

    fn set_text(&self, slot: Slot, text: &str) {
        if let Some(element) = self.element(slot.element_id()) {
            element.set_text_content(Some(text));
        }
    }

    fn show_places(&self, places: &PlaceList) {
        if let Some(list) = self.element(CITIES_LIST_ID) {
            let items: String = places
                .places
                .iter()
                .map(|place| {
                    let population = place
                        .population
                        .map(format_thousands)
                        .unwrap_or_else(|| "N/A".to_string());
                    format!(
                        "<li class=\"list-group-item\"><strong>{}</strong> \u{2014} {population}</li>",
                        escape_html(&place.name)
                    )
                })
                .collect();
            list.set_inner_html(&items);
        }
        if let Some(summary) = self.element(ANALYSIS_ID) {
            let text = match places.analysis.as_ref() {
                Some(analysis) => {
                    let mut parts = vec![format!("{} towns", places.places.len())];
                    if let Some(area) = analysis.polygon_area_km2 {
                        parts.push(format!("area {area:.1} km\u{b2}"));
                    }
                    if let Some(density) = analysis.population_density {
                        parts.push(format!("density {density:.1}/km\u{b2}"));
                    }
                    if let Some(ms) = analysis.execution_time_ms {
                        parts.push(format!("{ms:.0} ms"));
                    }
                    parts.join(", ")
                }
                None => format!("{} towns", places.places.len()),
            };
            summary.set_text_content(Some(&text));
        }
        if let Some(container) = self.element(CITIES_CONTAINER_ID) {
            set_display(&container, !places.is_empty());
        }
    }

    fn clear_places(&self) {
        if let Some(list) = self.element(CITIES_LIST_ID) {
            list.set_inner_html("");
        }
        if let Some(summary) = self.element(ANALYSIS_ID) {
            summary.set_text_content(None);
        }
        if let Some(container) = self.element(CITIES_CONTAINER_ID) {
            set_display(&container, false);
        }
    }

    fn show_nearby(&self, search_point: LngLat, trails: &[NearbyTrail]) {
        let Some(panel) = self.element(PROXIMITY_RESULTS_ID) else {
            return;
        };
        let mut html = format!(
            "<h6>Trails near {:.4}, {:.4}</h6>",
            search_point.lat(),
            search_point.lng()
        );
        if trails.is_empty() {
            html.push_str("<p class=\"text-muted\">No trails found.</p>");
        } else {
            html.push_str("<ol class=\"list-group list-group-numbered\">");
            for trail in trails {
                let distance = trail
                    .from_point_km
                    .map(|km| format!("{km:.2} km away"))
                    .unwrap_or_default();
                html.push_str(&format!(
                    "<li class=\"list-group-item\"><strong>{}</strong> <small>{}</small> {distance}</li>",
                    escape_html(&trail.name),
                    escape_html(&trail.county),
                ));
            }
            html.push_str("</ol>");
        }
        panel.set_inner_html(&html);
        set_display(&panel, true);
    }

    fn clear_nearby(&self) {
        if let Some(panel) = self.element(PROXIMITY_RESULTS_ID) {
            panel.set_inner_html("");
            set_display(&panel, false);
        }
    }
}
