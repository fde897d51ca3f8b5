use serde::Deserialize;
use web_sys::Document;

pub const CONFIG_ELEMENT_ID: &str = "trailmap-config";

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Endpoints {
    pub trails_geojson: String,
    pub trails_list: String,
    pub trail_search: String,
    pub towns_geojson: String,
    pub pois: String,
    pub pois_near_trail: String,
    pub pois_radius: String,
    pub rivers: String,
    pub boundaries: String,
    pub within_radius: String,
    pub nearest_town: String,
    pub polygon_search: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            trails_geojson: "/api/trails/geojson/".into(),
            trails_list: "/api/trails/".into(),
            trail_search: "/api/trails/search/".into(),
            towns_geojson: "/api/trails/towns/geojson/".into(),
            pois: "/api/trails/pois/".into(),
            pois_near_trail: "/api/trails/pois/near-trail/".into(),
            pois_radius: "/api/trails/pois/radius-search/".into(),
            rivers: "/api/trails/boundaries/?boundary_type=river".into(),
            boundaries: "/api/trails/boundaries/".into(),
            within_radius: "/api/trails/within-radius/".into(),
            nearest_town: "/api/trails/nearest-town/".into(),
            polygon_search: "/advanced-js-mapping/api/polygon-search/".into(),
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Prefix for every relative endpoint. Empty means same origin.
    pub api_base: String,
    pub endpoints: Endpoints,
    pub tile_url: String,
    pub tile_attribution: String,
    pub max_zoom: u8,
    pub center: [f64; 2],
    pub zoom: u8,
    pub max_pages: usize,
    pub page_limit: usize,
    pub batch_size: usize,
    pub batch_delay_ms: u32,
    pub page_delay_ms: u32,
    pub radius_km: f64,
    pub river_trails_radius_m: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: option_env!("TRAILMAP_API_BASE").unwrap_or("").to_string(),
            endpoints: Endpoints::default(),
            tile_url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".into(),
            tile_attribution: "&copy; OpenStreetMap contributors".into(),
            max_zoom: 19,
            center: [53.35, -6.26],
            zoom: 7,
            max_pages: 6,
            page_limit: 500,
            batch_size: 200,
            batch_delay_ms: 50,
            page_delay_ms: 100,
            radius_km: 10.0,
            river_trails_radius_m: 5000,
        }
    }
}

impl ClientConfig {
    /// Reads overrides from `<script id="trailmap-config" type="application/json">`.
    /// A missing or malformed block falls back to the defaults.
    pub fn from_document(document: &Document) -> Self {
        let Some(text) = document
            .get_element_by_id(CONFIG_ELEMENT_ID)
            .and_then(|element| element.text_content())
        else {
            return Self::default();
        };
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(config) => config,
            Err(error) => {
                tracing::warn!(%error, "ignoring malformed map config");
                Self::default()
            }
        }
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }

    pub fn rivers_url(&self) -> String {
        append_query_param(
            &self.url(&self.endpoints.rivers),
            "limit",
            &self.page_limit.to_string(),
        )
    }

    pub fn pois_url(&self) -> String {
        append_query_param(
            &self.url(&self.endpoints.pois),
            "limit",
            &self.page_limit.to_string(),
        )
    }

    pub fn boundary_url(&self, id: &str, tail: &str) -> String {
        let base = self.endpoints.boundaries.trim_end_matches('/');
        self.url(&format!("{base}/{}/{tail}", urlencoding::encode(id)))
    }
}

pub fn append_query_param(url: &str, key: &str, value: &str) -> String {
    let sep = if url.contains('?') { "&" } else { "?" };
    format!("{url}{sep}{key}={}", urlencoding::encode(value))
}
