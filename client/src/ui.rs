use trailmap_shared::proximity::NearbyTrail;
use trailmap_shared::{LngLat, PlaceList};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Warning,
    Danger,
}

impl Tone {
    pub fn class_name(self) -> &'static str {
        match self {
            Tone::Info => "alert-info",
            Tone::Success => "alert-success",
            Tone::Warning => "alert-warning",
            Tone::Danger => "alert-danger",
        }
    }

    pub fn dismiss_after_ms(self) -> u32 {
        match self {
            Tone::Success => 4_000,
            Tone::Danger => 6_000,
            Tone::Info | Tone::Warning => 5_000,
        }
    }
}

/// Text fields the page may show. Pages without a slot simply skip it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    TrailCount,
    DashboardTrails,
    DashboardTowns,
    DashboardPopulation,
    PoiCount,
    RiverCount,
    TotalCities,
    TotalPopulation,
}

impl Slot {
    pub fn element_id(self) -> &'static str {
        match self {
            Slot::TrailCount => "trail-count",
            Slot::DashboardTrails => "trails-count",
            Slot::DashboardTowns => "towns-count",
            Slot::DashboardPopulation => "total-population",
            Slot::PoiCount => "poi-count",
            Slot::RiverCount => "river-count",
            Slot::TotalCities => "totalCities",
            Slot::TotalPopulation => "totalPopulation",
        }
    }
}

pub trait UiSink {
    fn banner(&self, tone: Tone, message: &str);
    fn set_loading(&self, loading: bool);
    fn set_text(&self, slot: Slot, text: &str);
    fn show_places(&self, places: &PlaceList);
    fn clear_places(&self);
    fn show_nearby(&self, search_point: LngLat, trails: &[NearbyTrail]);
    fn clear_nearby(&self);
}
