use thiserror::Error;
use trailmap_shared::{decode_collection, CollectionShape, Feature, PayloadError};

use crate::config::append_query_param;
use crate::context::{LoadKey, LoadTicket, MapContext, Pacer};
use crate::net::{Backend, FetchError};
use crate::poi::{group_by_kind, PoiKind};
use crate::render::{
    poi_primitive, render, render_batched, river_primitive, town_primitive, trail_primitive,
    RenderOptions,
};
use crate::state::{format_thousands, trail_count_text};
use crate::surface::{FitPadding, LayerKind, TRAIL_FALLBACK};
use crate::ui::{Slot, Tone};

#[derive(Clone, Debug, PartialEq)]
pub struct DataSource {
    pub label: &'static str,
    pub url: String,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SourceFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error("no features")]
    Empty,
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("every data source failed: {}", describe(.attempts))]
pub struct LoadError {
    pub attempts: Vec<(&'static str, SourceFailure)>,
}

fn describe(attempts: &[(&'static str, SourceFailure)]) -> String {
    attempts
        .iter()
        .map(|(label, failure)| format!("{label}: {failure}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl LoadError {
    /// The failure a user should hear about: the first one that is not "empty".
    pub fn primary(&self) -> Option<&SourceFailure> {
        self.attempts
            .iter()
            .map(|(_, failure)| failure)
            .find(|failure| !matches!(failure, SourceFailure::Empty))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Loaded {
    pub source: &'static str,
    pub shape: Option<CollectionShape>,
    pub features: Vec<Feature>,
}

/// Tries each source in turn. A source that answers with zero features
/// counts as a failure so the next one gets a chance; if every source is
/// merely empty the result is an empty list rather than an error.
pub async fn load_collection(
    backend: &dyn Backend,
    sources: &[DataSource],
) -> Result<Loaded, LoadError> {
    let mut attempts = Vec::new();
    for source in sources {
        let failure = match fetch_collection(backend, &source.url).await {
            Ok((shape, features)) if !features.is_empty() => {
                tracing::debug!(source = source.label, count = features.len(), ?shape, "loaded");
                return Ok(Loaded {
                    source: source.label,
                    shape: Some(shape),
                    features,
                });
            }
            Ok(_) => SourceFailure::Empty,
            Err(failure) => failure,
        };
        tracing::warn!(source = source.label, url = %source.url, %failure, "data source failed");
        attempts.push((source.label, failure));
    }
    if !attempts.is_empty()
        && attempts
            .iter()
            .all(|(_, failure)| matches!(failure, SourceFailure::Empty))
    {
        return Ok(Loaded {
            source: attempts[0].0,
            shape: None,
            features: Vec::new(),
        });
    }
    Err(LoadError { attempts })
}

async fn fetch_collection(
    backend: &dyn Backend,
    url: &str,
) -> Result<(CollectionShape, Vec<Feature>), SourceFailure> {
    let value = backend.get_json(url).await?;
    let collection = decode_collection(&value)?;
    Ok((collection.shape, collection.features))
}

#[derive(Clone, Debug, PartialEq)]
pub struct PageWalk {
    pub features: Vec<Feature>,
    pub pages: usize,
    /// Set when a page request failed; earlier pages are kept.
    pub stopped: Option<SourceFailure>,
    /// More pages were available past the ceiling.
    pub truncated: bool,
}

pub async fn load_paginated(
    backend: &dyn Backend,
    pacer: &dyn Pacer,
    first_url: &str,
    max_pages: usize,
    page_delay_ms: u32,
) -> PageWalk {
    let mut walk = PageWalk {
        features: Vec::new(),
        pages: 0,
        stopped: None,
        truncated: false,
    };
    let mut next = Some(first_url.to_string());
    while let Some(url) = next.take() {
        if walk.pages >= max_pages {
            walk.truncated = true;
            tracing::info!(max_pages, "page ceiling reached; stopping");
            break;
        }
        if walk.pages > 0 {
            pacer.pause(page_delay_ms).await;
        }
        let page = match backend.get_json(&url).await {
            Ok(value) => decode_collection(&value).map_err(SourceFailure::from),
            Err(error) => Err(SourceFailure::from(error)),
        };
        match page {
            Ok(collection) => {
                walk.pages += 1;
                tracing::debug!(page = walk.pages, count = collection.features.len(), "page loaded");
                walk.features.extend(collection.features);
                next = collection.next;
            }
            Err(failure) => {
                tracing::warn!(page = walk.pages + 1, %url, %failure, "page failed; keeping earlier pages");
                walk.stopped = Some(failure);
            }
        }
    }
    walk
}

pub fn failure_message(what: &str, failure: Option<&SourceFailure>) -> String {
    match failure {
        Some(SourceFailure::Fetch(FetchError::Status { status: 404, .. })) => {
            format!("{what} endpoint not found (404).")
        }
        Some(SourceFailure::Fetch(FetchError::Status { status, .. })) if *status >= 500 => {
            format!("Server error while loading {what} ({status}). Please try again later.")
        }
        Some(SourceFailure::Fetch(FetchError::Status { status, .. })) => {
            format!("Could not load {what} (HTTP {status}).")
        }
        Some(SourceFailure::Fetch(FetchError::Transport(_))) => {
            format!("Network error while loading {what}. Check your connection.")
        }
        Some(SourceFailure::Fetch(FetchError::Decode(_)) | SourceFailure::Payload(_)) => {
            format!("The server sent {what} in an unexpected format.")
        }
        Some(SourceFailure::Empty) | None => format!("No {what} available."),
    }
}

pub fn trail_sources(ctx: &MapContext) -> Vec<DataSource> {
    vec![
        DataSource {
            label: "geojson",
            url: ctx.config.url(&ctx.config.endpoints.trails_geojson),
        },
        DataSource {
            label: "list",
            url: ctx.config.url(&ctx.config.endpoints.trails_list),
        },
    ]
}

pub async fn load_trails(ctx: &MapContext) {
    let sources = trail_sources(ctx);
    show_trails(ctx, "trails", &sources).await;
}

pub async fn search_trails(ctx: &MapContext, query: &str) {
    let query = query.trim();
    if query.is_empty() {
        load_trails(ctx).await;
        return;
    }
    let sources = [DataSource {
        label: "search",
        url: append_query_param(&ctx.config.url(&ctx.config.endpoints.trail_search), "q", query),
    }];
    let ticket = ctx.begin(LoadKey::Trails);
    ctx.ui.set_loading(true);
    let result = load_collection(ctx.backend.as_ref(), &sources).await;
    if !ctx.is_current(&ticket) {
        return;
    }
    ctx.ui.set_loading(false);
    let features = match result {
        Ok(loaded) => loaded.features,
        Err(error) => {
            tracing::warn!(%error, query, "trail search failed; filtering loaded trails");
            filter_trails(&ctx.cached_trails(), query)
        }
    };
    let report = render(
        ctx.surface.as_ref(),
        LayerKind::Trails,
        &features,
        trail_primitive,
        &RenderOptions {
            fit: Some(FitPadding::Pixels(30)),
            fallback: Some(TRAIL_FALLBACK),
        },
    );
    ctx.ui.set_text(Slot::TrailCount, &trail_count_text(report.rendered));
    if report.rendered == 0 {
        ctx.ui
            .banner(Tone::Warning, &format!("No trails match \"{query}\"."));
    }
}

pub fn filter_trails(trails: &[Feature], query: &str) -> Vec<Feature> {
    let needle = query.to_lowercase();
    trails
        .iter()
        .filter(|trail| {
            let props = &trail.properties;
            [props.text(&["name", "trail_name"]), props.text(&["county"])]
                .into_iter()
                .flatten()
                .any(|text| text.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

async fn show_trails(ctx: &MapContext, what: &str, sources: &[DataSource]) {
    let ticket = ctx.begin(LoadKey::Trails);
    ctx.ui.set_loading(true);
    let result = load_collection(ctx.backend.as_ref(), sources).await;
    if !ctx.is_current(&ticket) {
        tracing::debug!("trail load superseded; dropping response");
        return;
    }
    ctx.ui.set_loading(false);
    match result {
        Ok(loaded) => {
            let report = render(
                ctx.surface.as_ref(),
                LayerKind::Trails,
                &loaded.features,
                trail_primitive,
                &RenderOptions {
                    fit: Some(FitPadding::Pixels(30)),
                    fallback: Some(TRAIL_FALLBACK),
                },
            );
            ctx.cache_trails(&loaded.features);
            ctx.state.borrow_mut().trails = report.rendered;
            ctx.ui.set_text(Slot::TrailCount, &trail_count_text(report.rendered));
            ctx.ui.set_text(Slot::DashboardTrails, &report.rendered.to_string());
            tracing::info!(source = loaded.source, rendered = report.rendered, skipped = report.skipped, "trails ready");
        }
        Err(error) => {
            tracing::error!(%error, "failed to load {what}");
            ctx.ui.banner(Tone::Danger, &failure_message(what, error.primary()));
        }
    }
}

pub async fn load_towns(ctx: &MapContext) {
    let sources = [DataSource {
        label: "geojson",
        url: ctx.config.url(&ctx.config.endpoints.towns_geojson),
    }];
    let ticket = ctx.begin(LoadKey::Towns);
    let result = load_collection(ctx.backend.as_ref(), &sources).await;
    if !ctx.is_current(&ticket) {
        return;
    }
    match result {
        Ok(loaded) => {
            let report = render(
                ctx.surface.as_ref(),
                LayerKind::Towns,
                &loaded.features,
                town_primitive,
                &RenderOptions::default(),
            );
            let population: f64 = loaded
                .features
                .iter()
                .filter_map(|town| town.properties.number(&["population"]))
                .sum();
            {
                let mut state = ctx.state.borrow_mut();
                state.towns = report.rendered;
                state.town_population = population;
            }
            ctx.ui.set_text(Slot::DashboardTowns, &report.rendered.to_string());
            ctx.ui.set_text(Slot::DashboardPopulation, &format_thousands(population));
        }
        Err(error) => {
            tracing::error!(%error, "failed to load towns");
            ctx.ui.banner(Tone::Danger, &failure_message("towns", error.primary()));
        }
    }
}

pub async fn show_pois(ctx: &MapContext, ticket: &LoadTicket, features: Vec<Feature>) -> Option<usize> {
    let mut total = 0;
    for (kind, bucket) in group_by_kind(features) {
        let report = render_batched(
            ctx,
            ticket,
            LayerKind::Poi(kind),
            &bucket,
            poi_primitive(kind),
            &RenderOptions::default(),
        )
        .await?;
        ctx.state.borrow_mut().pois.insert(kind, report.rendered);
        total += report.rendered;
    }
    ctx.ui.set_text(Slot::PoiCount, &total.to_string());
    Some(total)
}

pub async fn load_pois(ctx: &MapContext) {
    let ticket = ctx.begin(LoadKey::Pois);
    let walk = load_paginated(
        ctx.backend.as_ref(),
        ctx.pacer.as_ref(),
        &ctx.config.pois_url(),
        ctx.config.max_pages,
        ctx.config.page_delay_ms,
    )
    .await;
    if !ctx.is_current(&ticket) {
        return;
    }
    if walk.pages == 0 {
        ctx.ui
            .banner(Tone::Danger, &failure_message("points of interest", walk.stopped.as_ref()));
        return;
    }
    let Some(total) = show_pois(ctx, &ticket, walk.features).await else {
        return;
    };
    tracing::info!(total, pages = walk.pages, "points of interest ready");
}

pub fn filter_poi_kinds(ctx: &MapContext, kinds: &[PoiKind]) {
    for kind in PoiKind::ALL {
        let visible = kinds.contains(&kind);
        ctx.state.borrow_mut().set_visible(LayerKind::Poi(kind), visible);
        ctx.surface.set_visible(LayerKind::Poi(kind), visible);
    }
}

pub async fn load_rivers(ctx: &MapContext) {
    let ticket = ctx.begin(LoadKey::Rivers);
    ctx.ui.set_loading(true);
    let walk = load_paginated(
        ctx.backend.as_ref(),
        ctx.pacer.as_ref(),
        &ctx.config.rivers_url(),
        ctx.config.max_pages,
        ctx.config.page_delay_ms,
    )
    .await;
    if !ctx.is_current(&ticket) {
        return;
    }
    ctx.ui.set_loading(false);
    if walk.pages == 0 {
        ctx.ui
            .banner(Tone::Danger, &failure_message("rivers", walk.stopped.as_ref()));
        return;
    }
    if walk.stopped.is_some() {
        ctx.ui.banner(
            Tone::Warning,
            &format!("Some river pages failed to load; showing {} pages.", walk.pages),
        );
    }
    let Some(report) = render_batched(
        ctx,
        &ticket,
        LayerKind::Rivers,
        &walk.features,
        river_primitive(ctx.config.river_trails_radius_m),
        &RenderOptions::default(),
    )
    .await
    else {
        return;
    };
    ctx.state.borrow_mut().rivers = report.rendered;
    ctx.ui.set_text(Slot::RiverCount, &report.rendered.to_string());
    tracing::info!(rendered = report.rendered, skipped = report.skipped, pages = walk.pages, "rivers ready");
}
