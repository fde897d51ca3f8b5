use std::collections::{BTreeMap, HashSet};

use crate::poi::PoiKind;
use crate::surface::LayerKind;

#[derive(Default, Debug)]
pub struct UiState {
    pub trails: usize,
    pub towns: usize,
    pub town_population: f64,
    pub pois: BTreeMap<PoiKind, usize>,
    pub rivers: usize,
    pub proximity_mode: bool,
    hidden: HashSet<LayerKind>,
}

impl UiState {
    pub fn is_visible(&self, kind: LayerKind) -> bool {
        !self.hidden.contains(&kind)
    }

    pub fn set_visible(&mut self, kind: LayerKind, visible: bool) -> bool {
        if visible {
            self.hidden.remove(&kind)
        } else {
            self.hidden.insert(kind)
        }
    }

    pub fn poi_total(&self) -> usize {
        self.pois.values().sum()
    }
}

pub fn trail_count_text(count: usize) -> String {
    format!("{count} trails loaded")
}

/// Groups the integer part in threes: `1234567.8` -> `1,234,568`.
pub fn format_thousands(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = value.round().abs() as u64;
    let digits = rounded.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value.round() < 0.0 {
        out.push('-');
    }
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_thousands() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.0), "999");
        assert_eq!(format_thousands(1000.0), "1,000");
        assert_eq!(format_thousands(1234567.8), "1,234,568");
        assert_eq!(format_thousands(-4500.0), "-4,500");
        assert_eq!(format_thousands(f64::NAN), "0");
    }

    #[test]
    fn visibility_toggles_report_changes() {
        let mut state = UiState::default();
        assert!(state.is_visible(LayerKind::Trails));
        assert!(state.set_visible(LayerKind::Trails, false));
        assert!(!state.set_visible(LayerKind::Trails, false));
        assert!(!state.is_visible(LayerKind::Trails));
        assert!(state.set_visible(LayerKind::Trails, true));
    }

    #[test]
    fn poi_total_sums_kinds() {
        let mut state = UiState::default();
        state.pois.insert(PoiKind::Cafe, 3);
        state.pois.insert(PoiKind::Parking, 4);
        assert_eq!(state.poi_total(), 7);
        assert_eq!(trail_count_text(7), "7 trails loaded");
    }
}
