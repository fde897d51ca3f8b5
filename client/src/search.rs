use serde_json::Value;
use thiserror::Error;
use trailmap_shared::search::{PolygonSearchRequest, PolygonSearchResponse};
use trailmap_shared::{no_results_message, normalize_places, LngLat, PlaceList, PolygonGeometry};

use crate::config::ClientConfig;
use crate::context::{LoadKey, MapContext};
use crate::net::{Backend, FetchError};
use crate::render::{place_primitive, render, RenderOptions};
use crate::state::format_thousands;
use crate::surface::{
    FitPadding, LayerKind, Primitive, DRAWN_POLYGON, DRAW_PREVIEW, RESULT_FALLBACK,
};
use crate::ui::{Slot, Tone};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SearchError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("search was rejected: {0}")]
    Rejected(String),
    #[error("unexpected search response: {0}")]
    Decode(String),
}

pub async fn submit_polygon_search(
    backend: &dyn Backend,
    config: &ClientConfig,
    polygon: &PolygonGeometry,
) -> Result<PlaceList, SearchError> {
    let body = serde_json::to_value(PolygonSearchRequest { polygon })
        .map_err(|error| SearchError::Decode(error.to_string()))?;
    let url = config.url(&config.endpoints.polygon_search);
    let value = backend.post_json(&url, &body).await?;
    if value.get("success").and_then(Value::as_bool) == Some(false) {
        let reason = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(SearchError::Rejected(reason));
    }
    let response: PolygonSearchResponse =
        serde_json::from_value(value).map_err(|error| SearchError::Decode(error.to_string()))?;
    if let Some(counters) = response
        .results
        .as_ref()
        .and_then(|results| results.analysis.as_ref())
        .and_then(|analysis| analysis.debug.as_ref())
    {
        tracing::debug!(?counters, "spatial search debug counts");
    }
    Ok(normalize_places(response))
}

pub fn show_preview(ctx: &MapContext, vertices: &[LngLat]) {
    ctx.surface.clear(LayerKind::Preview);
    if vertices.len() >= 2 {
        ctx.surface.add(
            LayerKind::Preview,
            &Primitive::Polyline {
                path: vec![vertices.to_vec()],
                style: DRAW_PREVIEW,
                popup: None,
            },
        );
    }
}

pub fn show_drawn(ctx: &MapContext, polygon: &PolygonGeometry) {
    ctx.surface.clear(LayerKind::Preview);
    ctx.surface.clear(LayerKind::Drawn);
    ctx.surface.add(
        LayerKind::Drawn,
        &Primitive::Polygon {
            ring: polygon.ring().to_vec(),
            style: DRAWN_POLYGON,
            popup: None,
        },
    );
}

pub async fn finish_polygon(ctx: &MapContext, polygon: PolygonGeometry) {
    show_drawn(ctx, &polygon);
    run_polygon_search(ctx, &polygon).await;
}

/// Replaces the result layer with the places found inside `polygon`. The
/// drawn polygon is left in place whatever the outcome.
pub async fn run_polygon_search(ctx: &MapContext, polygon: &PolygonGeometry) -> Option<PlaceList> {
    let ticket = ctx.begin(LoadKey::Results);
    ctx.ui.set_loading(true);
    ctx.ui.banner(Tone::Info, "Searching inside the drawn area...");
    let result = submit_polygon_search(ctx.backend.as_ref(), &ctx.config, polygon).await;
    if !ctx.is_current(&ticket) {
        tracing::debug!("polygon search superseded; dropping response");
        return None;
    }
    ctx.ui.set_loading(false);
    match result {
        Ok(list) => {
            show_places(ctx, &list);
            Some(list)
        }
        Err(error) => {
            tracing::error!(%error, "spatial search failed");
            ctx.ui.banner(Tone::Danger, "Spatial search failed");
            None
        }
    }
}

fn show_places(ctx: &MapContext, list: &PlaceList) {
    let report = render(
        ctx.surface.as_ref(),
        LayerKind::Results,
        &list.places,
        place_primitive,
        &RenderOptions {
            fit: Some(FitPadding::Ratio(0.1)),
            fallback: Some(RESULT_FALLBACK),
        },
    );
    let analysis = list.analysis.as_ref();
    let total = analysis
        .and_then(|analysis| analysis.total_cities)
        .unwrap_or(list.places.len() as u64);
    let population = analysis
        .and_then(|analysis| analysis.total_population)
        .unwrap_or_else(|| list.population_sum());
    ctx.ui.set_text(Slot::TotalCities, &total.to_string());
    ctx.ui.set_text(Slot::TotalPopulation, &format_thousands(population));
    ctx.ui.show_places(list);
    if list.is_empty() {
        ctx.ui.banner(Tone::Warning, &no_results_message(analysis));
    } else {
        tracing::info!(found = list.places.len(), rendered = report.rendered, degraded = report.degraded, "polygon search results");
        ctx.ui.banner(
            Tone::Success,
            &format!("Found {} towns in the drawn area", list.places.len()),
        );
    }
}

/// Drops results and any search still in flight.
pub fn clear_results(ctx: &MapContext) {
    ctx.begin(LoadKey::Results);
    ctx.ui.set_loading(false);
    ctx.surface.clear(LayerKind::Results);
    ctx.ui.clear_places();
    ctx.ui.set_text(Slot::TotalCities, "0");
    ctx.ui.set_text(Slot::TotalPopulation, "0");
}

pub fn clear_drawing(ctx: &MapContext) {
    ctx.surface.clear(LayerKind::Drawn);
    ctx.surface.clear(LayerKind::Preview);
    clear_results(ctx);
}
