use serde_json::Value;
use trailmap_shared::proximity::{
    poi_records, NearbyTrail, NearestTown, PointRequest, PoiRadiusRequest, RadiusRequest,
    TrailPoiRequest, WithinRadiusResponse,
};
use trailmap_shared::{Bounds, Feature, LngLat};

use crate::config::append_query_param;
use crate::context::{LoadKey, LoadTicket, MapContext};
use crate::loader::{load_collection, show_pois, DataSource};
use crate::net::FetchError;
use crate::poi::PoiKind;
use crate::popup;
use crate::render::{path_or_point, render, RenderOptions};
use crate::surface::{
    FitPadding, LayerKind, MarkerIcon, Primitive, CROSSING_TRAIL, NEAR_RIVER_TRAIL, SEARCH_POINT,
    SEARCH_RADIUS,
};
use crate::ui::Tone;

fn to_body<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn nearby_primitive(trail: &NearbyTrail) -> Option<Primitive> {
    Some(Primitive::Marker {
        at: trail.coord?,
        icon: MarkerIcon::Numbered(trail.rank),
        title: Some(trail.name.clone()),
        popup: Some(popup::nearby_trail(trail)),
    })
}

pub async fn search_nearby(ctx: &MapContext, at: LngLat, radius_km: f64) -> Option<Vec<NearbyTrail>> {
    let ticket = ctx.begin(LoadKey::Nearby);
    let surface = ctx.surface.as_ref();
    surface.clear(LayerKind::Nearby);
    surface.add(
        LayerKind::Nearby,
        &Primitive::CircleMarker {
            at,
            radius: 8.0,
            style: SEARCH_POINT,
            popup: Some(popup::search_point(at)),
        },
    );
    surface.add(
        LayerKind::Nearby,
        &Primitive::Circle {
            at,
            radius_m: radius_km * 1000.0,
            style: SEARCH_RADIUS,
        },
    );
    ctx.ui.set_loading(true);
    let url = ctx.config.url(&ctx.config.endpoints.within_radius);
    let result = ctx
        .backend
        .post_json(&url, &to_body(&RadiusRequest::new(at, radius_km)))
        .await
        .and_then(|value| {
            serde_json::from_value::<WithinRadiusResponse>(value)
                .map_err(|error| FetchError::Decode(error.to_string()))
        });
    if !ctx.is_current(&ticket) {
        return None;
    }
    ctx.ui.set_loading(false);
    let trails = match result {
        Ok(response) => response.trails(),
        Err(error) => {
            tracing::error!(%error, "radius search failed");
            ctx.ui.banner(Tone::Danger, "Could not search for nearby trails.");
            return None;
        }
    };
    let mut added = 0;
    for trail in &trails {
        if let Some(primitive) = nearby_primitive(trail) {
            if surface.add(LayerKind::Nearby, &primitive) {
                added += 1;
            }
        }
    }
    let points = trails.iter().filter_map(|trail| trail.coord).chain([at]);
    if let Some(bounds) = Bounds::from_points(points) {
        surface.fit_bounds(&bounds, FitPadding::Ratio(0.2));
    }
    ctx.ui.show_nearby(at, &trails);
    if trails.is_empty() {
        ctx.ui.banner(
            Tone::Warning,
            &format!("No trails found within {radius_km} km."),
        );
    } else {
        ctx.ui.banner(
            Tone::Success,
            &format!("Found {} trails within {radius_km} km.", trails.len()),
        );
    }
    tracing::info!(found = trails.len(), added, radius_km, "radius search done");
    show_nearest_town(ctx, &ticket, at).await;
    Some(trails)
}

pub async fn show_nearest_town(ctx: &MapContext, ticket: &LoadTicket, at: LngLat) {
    let url = ctx.config.url(&ctx.config.endpoints.nearest_town);
    let result = ctx
        .backend
        .post_json(&url, &to_body(&PointRequest::from(at)))
        .await
        .and_then(|value| {
            serde_json::from_value::<NearestTown>(value)
                .map_err(|error| FetchError::Decode(error.to_string()))
        });
    if !ctx.is_current(ticket) {
        return;
    }
    match result {
        Ok(town) => ctx.surface.open_popup(at, &popup::nearest_town(&town)),
        Err(error) => tracing::warn!(%error, "nearest town lookup failed"),
    }
}

pub fn clear_nearby(ctx: &MapContext) {
    ctx.begin(LoadKey::Nearby);
    ctx.ui.set_loading(false);
    ctx.surface.clear(LayerKind::Nearby);
    ctx.ui.clear_nearby();
}

async fn replace_pois(ctx: &MapContext, url: &str, body: Value, only: Option<PoiKind>) -> Option<usize> {
    let ticket = ctx.begin(LoadKey::Pois);
    let result = ctx.backend.post_json(url, &body).await;
    if !ctx.is_current(&ticket) {
        return None;
    }
    match result {
        Ok(value) => {
            let features: Vec<Feature> = poi_records(&value)
                .iter()
                .map(Feature::from_record)
                .filter(|feature| only.map_or(true, |kind| PoiKind::of(feature) == kind))
                .collect();
            let total = show_pois(ctx, &ticket, features).await?;
            if total == 0 {
                ctx.ui.banner(Tone::Warning, "No points of interest found.");
            }
            Some(total)
        }
        Err(error) => {
            tracing::error!(%error, url, "POI search failed");
            ctx.ui.banner(Tone::Danger, "Could not load points of interest.");
            None
        }
    }
}

pub async fn pois_near_trail(ctx: &MapContext, trail_id: &str, only: Option<PoiKind>) -> Option<usize> {
    let url = ctx.config.url(&ctx.config.endpoints.pois_near_trail);
    let body = to_body(&TrailPoiRequest {
        trail_id: trail_id.to_string(),
    });
    replace_pois(ctx, &url, body, only).await
}

pub async fn pois_in_radius(
    ctx: &MapContext,
    at: LngLat,
    radius_km: f64,
    only: Option<PoiKind>,
) -> Option<usize> {
    let url = ctx.config.url(&ctx.config.endpoints.pois_radius);
    let body = to_body(&PoiRadiusRequest {
        latitude: at.lat(),
        longitude: at.lng(),
        radius_km,
        poi_type: only.map(|kind| kind.slug().to_string()),
    });
    replace_pois(ctx, &url, body, only).await
}

pub async fn trails_crossing_river(ctx: &MapContext, id: &str) -> Option<usize> {
    let url = ctx.config.boundary_url(id, "trails-crossing/geojson/");
    river_trails(ctx, &url, LayerKind::Crossing, "crossing").await
}

pub async fn trails_near_river(ctx: &MapContext, id: &str) -> Option<usize> {
    let url = append_query_param(
        &ctx.config.boundary_url(id, "trails-near/"),
        "radius_m",
        &ctx.config.river_trails_radius_m.to_string(),
    );
    river_trails(ctx, &url, LayerKind::NearRiver, "near").await
}

async fn river_trails(ctx: &MapContext, url: &str, kind: LayerKind, what: &str) -> Option<usize> {
    let ticket = ctx.begin(LoadKey::RiverTrails);
    let sources = [DataSource {
        label: "boundary",
        url: url.to_string(),
    }];
    let result = load_collection(ctx.backend.as_ref(), &sources).await;
    if !ctx.is_current(&ticket) {
        return None;
    }
    ctx.surface.clear(LayerKind::Crossing);
    ctx.surface.clear(LayerKind::NearRiver);
    let features = match result {
        Ok(loaded) => loaded.features,
        Err(error) => {
            tracing::error!(%error, what, "river trail lookup failed");
            ctx.ui.banner(Tone::Danger, "Could not load trails for this river.");
            return None;
        }
    };
    let style = match kind {
        LayerKind::Crossing => path_or_point(CROSSING_TRAIL, popup::crossing_trail),
        _ => path_or_point(NEAR_RIVER_TRAIL, popup::river_trail),
    };
    let report = render(
        ctx.surface.as_ref(),
        kind,
        &features,
        style,
        &RenderOptions {
            fit: Some(FitPadding::Pixels(30)),
            fallback: None,
        },
    );
    let message = match (kind, report.rendered) {
        (_, 0) => "No trails found for this river.".to_string(),
        (LayerKind::Crossing, count) => format!("{count} trails cross this river."),
        (_, count) => format!("{count} trails near this river."),
    };
    ctx.ui.banner(
        if report.rendered == 0 { Tone::Warning } else { Tone::Success },
        &message,
    );
    Some(report.rendered)
}
