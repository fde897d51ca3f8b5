//! HTML popup bodies. Every value coming from the backend is escaped.

use trailmap_shared::proximity::{NearbyTrail, NearestTown};
use trailmap_shared::{Feature, LngLat, Place};

use crate::poi::PoiKind;
use crate::state::format_thousands;

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "✅ Yes"
    } else {
        "❌ No"
    }
}

pub fn trail_name(feature: &Feature) -> String {
    feature
        .properties
        .text_or(&["name", "trail_name"], "Unnamed Trail")
}

pub fn trail(feature: &Feature) -> String {
    let props = &feature.properties;
    let mut html = format!(
        "<strong>{}</strong><br>County: {}<br>Parking: {}<br>Dogs Allowed: {}<br>Distance: {} km<br>Difficulty: {}",
        escape_html(&trail_name(feature)),
        escape_html(&props.text_or(&["county"], "Unknown")),
        yes_no(props.flag("parking_available")),
        yes_no(props.flag("dogs_allowed")),
        escape_html(&props.text_or(&["distance_km"], "?")),
        escape_html(&props.text_or(&["difficulty"], "Unknown")),
    );
    if let Some(id) = &feature.id {
        html.push_str(&format!(
            "<br><button type=\"button\" class=\"popup-action\" data-action=\"trail-pois\" data-id=\"{}\">Show POIs near this trail</button>",
            escape_html(id)
        ));
    }
    html
}

pub fn town(feature: &Feature) -> String {
    let props = &feature.properties;
    let population = props
        .number(&["population"])
        .map(format_thousands)
        .unwrap_or_else(|| "N/A".to_string());
    let area = props
        .text(&["area", "area_km2"])
        .map(|area| format!("{} km²", escape_html(&area)))
        .unwrap_or_else(|| "N/A".to_string());
    let mut html = format!(
        "<b>{}</b><br><b>Type:</b> {}<br><b>Population:</b> {}<br><b>Area:</b> {}",
        escape_html(&props.text_or(&["name", "ENGLISH"], "Unknown")),
        escape_html(&props.text_or(&["town_type", "type"], "N/A")),
        population,
        area,
    );
    if let Some(at) = feature.anchor() {
        html.push_str(&format!(
            "<br><b>Latitude:</b> {:.4}<br><b>Longitude:</b> {:.4}",
            at.lat(),
            at.lng()
        ));
    }
    html
}

pub fn poi(feature: &Feature, kind: PoiKind) -> String {
    let props = &feature.properties;
    let style = kind.style();
    let mut html = format!(
        "<strong>{} {}</strong><br><strong>Type:</strong> {}",
        style.icon,
        escape_html(&props.text_or(&["name"], "Unnamed")),
        style.label,
    );
    let optional = [
        ("County", "county"),
        ("Description", "description"),
        ("Phone", "phone"),
        ("Hours", "opening_hours"),
    ];
    for (label, key) in optional {
        if let Some(value) = props.text(&[key]) {
            html.push_str(&format!(
                "<br><strong>{label}:</strong> {}",
                escape_html(&value)
            ));
        }
    }
    if let Some(website) = props
        .text(&["website"])
        .filter(|url| url.starts_with("http://") || url.starts_with("https://"))
    {
        let website = escape_html(&website);
        html.push_str(&format!(
            "<br><a href=\"{website}\" target=\"_blank\" rel=\"noopener\">{website}</a>"
        ));
    }
    html
}

pub fn river(feature: &Feature, near_radius_m: u32) -> String {
    let name = escape_html(&feature.properties.text_or(&["name"], "Unnamed river"));
    match &feature.id {
        Some(id) => {
            let id = escape_html(id);
            let km = f64::from(near_radius_m) / 1000.0;
            format!(
                "<strong>{name}</strong><br>\
                 <button type=\"button\" class=\"popup-action\" data-action=\"river-crossing\" data-id=\"{id}\">Show trails crossing</button><br>\
                 <button type=\"button\" class=\"popup-action\" data-action=\"river-near\" data-id=\"{id}\">Show nearby trails ({km}km)</button>"
            )
        }
        None => format!("<strong>{name}</strong>"),
    }
}

pub fn place(place: &Place) -> String {
    let mut html = format!(
        "<strong>{}</strong><br>Country: {}<br>Population: {}<br>Type: {}",
        escape_html(&place.name),
        escape_html(place.country.as_deref().unwrap_or("N/A")),
        place
            .population
            .map(format_thousands)
            .unwrap_or_else(|| "N/A".to_string()),
        escape_html(place.place_type.as_deref().unwrap_or("N/A")),
    );
    if let Some(gdp) = place.gdp_per_capita {
        html.push_str(&format!("<br>GDP per capita: {}", format_thousands(gdp)));
    }
    html
}

pub fn nearby_trail(trail: &NearbyTrail) -> String {
    format!(
        "<strong>#{} {}</strong><br>County: {}<br>Difficulty: {}<br>Distance: {} km<br>From You: {} km",
        trail.rank,
        escape_html(&trail.name),
        escape_html(&trail.county),
        escape_html(&trail.difficulty),
        trail
            .length_km
            .map(|km| km.to_string())
            .unwrap_or_else(|| "?".to_string()),
        trail
            .from_point_km
            .map(|km| format!("{km:.1}"))
            .unwrap_or_else(|| "?".to_string()),
    )
}

pub fn nearest_town(town: &NearestTown) -> String {
    format!(
        "🏙️ <strong>{}</strong><br>{} km away<br>Type: {}",
        escape_html(town.name.as_deref().unwrap_or("Unknown")),
        town.distance_km
            .map(|km| format!("{km:.1}"))
            .unwrap_or_else(|| "?".to_string()),
        escape_html(town.town_type.as_deref().unwrap_or("N/A")),
    )
}

pub fn search_point(at: LngLat) -> String {
    format!(
        "<strong>Search Point</strong><br>Lat: {:.5}<br>Lng: {:.5}",
        at.lat(),
        at.lng()
    )
}

pub fn crossing_trail(feature: &Feature) -> String {
    format!("<b>{}</b>", escape_html(&trail_name(feature)))
}

pub fn river_trail(feature: &Feature) -> String {
    format!(
        "<b>{}</b><br/>📍 {}",
        escape_html(&trail_name(feature)),
        escape_html(&feature.properties.text_or(&["county"], "Unknown")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html("<b>\"Tom's\" & co</b>"),
            "&lt;b&gt;&quot;Tom&#39;s&quot; &amp; co&lt;/b&gt;"
        );
    }

    #[test]
    fn trail_popup_uses_defaults() {
        let feature = Feature::from_record(&json!({ "latitude": 53.0, "longitude": -6.0 }));
        let html = trail(&feature);
        assert!(html.starts_with("<strong>Unnamed Trail</strong>"));
        assert!(html.contains("County: Unknown"));
        assert!(html.contains("Parking: ❌ No"));
        assert!(html.contains("Distance: ? km"));
        assert!(html.contains("Difficulty: Unknown"));
        assert!(!html.contains("data-action"));
    }

    #[test]
    fn trail_popup_reads_yes_flags_and_offers_pois() {
        let feature = Feature::from_record(&json!({
            "id": 11, "trail_name": "Howth Cliff <Loop>", "county": "Dublin",
            "parking_available": "Yes", "dogs_allowed": "No", "distance_km": 6,
            "latitude": 53.38, "longitude": -6.06
        }));
        let html = trail(&feature);
        assert!(html.contains("Howth Cliff &lt;Loop&gt;"));
        assert!(html.contains("Parking: ✅ Yes"));
        assert!(html.contains("Dogs Allowed: ❌ No"));
        assert!(html.contains("Distance: 6 km"));
        assert!(html.contains("data-action=\"trail-pois\" data-id=\"11\""));
    }

    #[test]
    fn river_popup_offers_both_actions() {
        let feature = Feature::from_record(&json!({ "id": 42, "name": "Barrow" }));
        let html = river(&feature, 5000);
        assert!(html.contains("data-action=\"river-crossing\" data-id=\"42\""));
        assert!(html.contains("data-action=\"river-near\" data-id=\"42\""));
        assert!(html.contains("Show nearby trails (5km)"));
    }

    #[test]
    fn river_popup_labels_the_configured_radius() {
        let feature = Feature::from_record(&json!({ "id": 7, "name": "Nore" }));
        assert!(river(&feature, 2500).contains("Show nearby trails (2.5km)"));
    }

    #[test]
    fn poi_website_links_only_web_urls() {
        let unsafe_link = Feature::from_record(&json!({
            "name": "Hut", "poi_type": "cafe", "website": "javascript:alert(1)"
        }));
        assert!(!poi(&unsafe_link, PoiKind::Cafe).contains("href"));
        let web = Feature::from_record(&json!({
            "name": "Hut", "poi_type": "cafe", "website": "https://hut.ie"
        }));
        assert!(poi(&web, PoiKind::Cafe).contains("href=\"https://hut.ie\""));
    }

    #[test]
    fn place_popup_marks_missing_values() {
        let html = place(&Place {
            id: None,
            name: "Kells".into(),
            country: None,
            population: Some(2780.0),
            coord: None,
            place_type: None,
            gdp_per_capita: None,
        });
        assert!(html.contains("Population: 2,780"));
        assert!(html.contains("Country: N/A"));
        assert!(html.contains("Type: N/A"));
    }
}
