use trailmap_shared::{Bounds, Feature, Geometry, Place};

use crate::context::{LoadTicket, MapContext};
use crate::poi::PoiKind;
use crate::popup;
use crate::surface::{
    FitPadding, LayerKind, MapSurface, MarkerIcon, PathStyle, Primitive, BLUE_PIN, GREEN_PIN,
    RIVER,
};

#[derive(Clone, Copy, Debug, Default)]
pub struct RenderOptions {
    pub fit: Option<FitPadding>,
    /// Style for circle markers used when icon markers fail to appear.
    pub fallback: Option<PathStyle>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderReport {
    pub rendered: usize,
    pub skipped: usize,
    pub degraded: bool,
    pub bounds: Option<Bounds>,
}

pub fn build_primitives<T, F>(items: &[T], style: F) -> (Vec<Primitive>, usize)
where
    F: Fn(&T) -> Option<Primitive>,
{
    let mut primitives = Vec::with_capacity(items.len());
    let mut skipped = 0;
    for (index, item) in items.iter().enumerate() {
        match style(item) {
            Some(primitive) => primitives.push(primitive),
            None => {
                skipped += 1;
                tracing::debug!(index, "skipping item without usable coordinates");
            }
        }
    }
    (primitives, skipped)
}

fn add_all(surface: &dyn MapSurface, kind: LayerKind, primitives: &[Primitive]) -> usize {
    primitives
        .iter()
        .filter(|primitive| surface.add(kind, primitive))
        .count()
}

/// Clears `kind` and repopulates it. Calling it twice with the same input
/// leaves the same primitives, never duplicates.
pub fn render<T, F>(
    surface: &dyn MapSurface,
    kind: LayerKind,
    items: &[T],
    style: F,
    options: &RenderOptions,
) -> RenderReport
where
    F: Fn(&T) -> Option<Primitive>,
{
    let (primitives, skipped) = build_primitives(items, style);
    surface.clear(kind);
    let rendered = add_all(surface, kind, &primitives);
    finish(surface, kind, &primitives, rendered, skipped, options)
}

/// Like [`render`], but adds primitives in batches with a pause in between.
/// Returns `None` once `ticket` is superseded; the newer load owns the group.
pub async fn render_batched<T, F>(
    ctx: &MapContext,
    ticket: &LoadTicket,
    kind: LayerKind,
    items: &[T],
    style: F,
    options: &RenderOptions,
) -> Option<RenderReport>
where
    F: Fn(&T) -> Option<Primitive>,
{
    let (primitives, skipped) = build_primitives(items, style);
    if !ctx.is_current(ticket) {
        return None;
    }
    let surface = ctx.surface.as_ref();
    surface.clear(kind);
    let batch_size = ctx.config.batch_size.max(1);
    let batches = primitives.len().div_ceil(batch_size);
    let mut rendered = 0;
    for (index, batch) in primitives.chunks(batch_size).enumerate() {
        if !ctx.is_current(ticket) {
            tracing::debug!(?kind, index, "render superseded");
            return None;
        }
        rendered += add_all(surface, kind, batch);
        tracing::debug!(?kind, batch = index + 1, batches, rendered, "rendered batch");
        if index + 1 < batches {
            ctx.pacer.pause(ctx.config.batch_delay_ms).await;
        }
    }
    if !ctx.is_current(ticket) {
        return None;
    }
    Some(finish(surface, kind, &primitives, rendered, skipped, options))
}

fn finish(
    surface: &dyn MapSurface,
    kind: LayerKind,
    primitives: &[Primitive],
    mut rendered: usize,
    skipped: usize,
    options: &RenderOptions,
) -> RenderReport {
    let mut degraded = false;
    if !primitives.is_empty() && surface.count(kind) == 0 {
        if let Some(style) = &options.fallback {
            tracing::warn!(
                ?kind,
                expected = primitives.len(),
                "no markers became visible; falling back to circle markers"
            );
            let fallback: Vec<Primitive> = primitives
                .iter()
                .map(|primitive| primitive.degraded(style))
                .collect();
            surface.clear(kind);
            rendered = add_all(surface, kind, &fallback);
            degraded = true;
        }
    }
    let bounds = Bounds::from_points(primitives.iter().flat_map(Primitive::points));
    match (bounds, options.fit) {
        (Some(bounds), Some(padding)) if rendered > 0 => surface.fit_bounds(&bounds, padding),
        (_, Some(_)) => tracing::debug!(?kind, "nothing rendered; keeping viewport"),
        _ => {}
    }
    if skipped > 0 {
        tracing::warn!(?kind, rendered, skipped, "skipped features with invalid coordinates");
    } else {
        tracing::debug!(?kind, rendered, "rendered layer");
    }
    RenderReport {
        rendered,
        skipped,
        degraded,
        bounds,
    }
}

pub fn trail_primitive(feature: &Feature) -> Option<Primitive> {
    Some(Primitive::Marker {
        at: feature.anchor()?,
        icon: MarkerIcon::Image(GREEN_PIN),
        title: Some(popup::trail_name(feature)),
        popup: Some(popup::trail(feature)),
    })
}

pub fn town_primitive(feature: &Feature) -> Option<Primitive> {
    Some(Primitive::Marker {
        at: feature.anchor()?,
        icon: MarkerIcon::Image(BLUE_PIN),
        title: feature.properties.text(&["name"]),
        popup: Some(popup::town(feature)),
    })
}

pub fn poi_primitive(kind: PoiKind) -> impl Fn(&Feature) -> Option<Primitive> {
    move |feature| {
        let style = kind.style();
        Some(Primitive::Marker {
            at: feature.anchor()?,
            icon: MarkerIcon::Badge {
                glyph: style.icon,
                color: style.color,
            },
            title: feature.properties.text(&["name"]),
            popup: Some(popup::poi(feature, kind)),
        })
    }
}

pub fn river_primitive(near_radius_m: u32) -> impl Fn(&Feature) -> Option<Primitive> {
    move |feature| {
        let path = match feature.geometry.as_ref()? {
            Geometry::LineString(line) => vec![line.clone()],
            Geometry::MultiLineString(lines) => lines.clone(),
            _ => return None,
        };
        Some(Primitive::Polyline {
            path,
            style: RIVER,
            popup: Some(popup::river(feature, near_radius_m)),
        })
    }
}

pub fn path_or_point(
    style: PathStyle,
    popup_for: fn(&Feature) -> String,
) -> impl Fn(&Feature) -> Option<Primitive> {
    move |feature| {
        let popup = Some(popup_for(feature));
        match feature.geometry.as_ref()? {
            Geometry::LineString(line) => Some(Primitive::Polyline {
                path: vec![line.clone()],
                style,
                popup,
            }),
            Geometry::MultiLineString(lines) => Some(Primitive::Polyline {
                path: lines.clone(),
                style,
                popup,
            }),
            Geometry::Polygon(rings) => Some(Primitive::Polygon {
                ring: rings.first()?.clone(),
                style,
                popup,
            }),
            Geometry::Point(at) => Some(Primitive::CircleMarker {
                at: *at,
                radius: 6.0,
                style,
                popup,
            }),
        }
    }
}

pub fn place_primitive(place: &Place) -> Option<Primitive> {
    Some(Primitive::Marker {
        at: place.coord?,
        icon: MarkerIcon::Default,
        title: Some(place.name.clone()),
        popup: Some(popup::place(place)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn river_needs_a_line() {
        let line = Feature::from_record(&json!({
            "id": 1, "name": "Suir",
            "geom": { "type": "LineString", "coordinates": [[-7.7, 52.3], [-7.6, 52.35]] }
        }));
        assert!(matches!(river_primitive(5000)(&line), Some(Primitive::Polyline { .. })));

        let point = Feature::from_record(&json!({ "id": 2, "latitude": 52.0, "longitude": -7.0 }));
        assert!(river_primitive(5000)(&point).is_none());
    }

    #[test]
    fn build_counts_skipped_features() {
        let features = vec![
            Feature::from_record(&json!({ "latitude": 53.0, "longitude": -6.0 })),
            Feature::from_record(&json!({ "latitude": "NaN", "longitude": -6.0 })),
            Feature::from_record(&json!({ "name": "no coordinates" })),
        ];
        let (primitives, skipped) = build_primitives(&features, trail_primitive);
        assert_eq!(primitives.len(), 1);
        assert_eq!(skipped, 2);
    }
}
