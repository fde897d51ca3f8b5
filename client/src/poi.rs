use trailmap_shared::Feature;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PoiKind {
    Parking,
    Cafe,
    Restaurant,
    Attraction,
    Viewpoint,
    Toilet,
    Shelter,
    Picnic,
    Information,
    Accommodation,
}

pub struct PoiStyle {
    pub color: &'static str,
    pub icon: &'static str,
    pub label: &'static str,
}

impl PoiKind {
    pub const ALL: [PoiKind; 10] = [
        PoiKind::Parking,
        PoiKind::Cafe,
        PoiKind::Restaurant,
        PoiKind::Attraction,
        PoiKind::Viewpoint,
        PoiKind::Toilet,
        PoiKind::Shelter,
        PoiKind::Picnic,
        PoiKind::Information,
        PoiKind::Accommodation,
    ];

    /// Unknown or missing types are shown as attractions.
    pub fn parse(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return PoiKind::Attraction;
        };
        Self::ALL
            .into_iter()
            .find(|kind| kind.slug().eq_ignore_ascii_case(value.trim()))
            .unwrap_or(PoiKind::Attraction)
    }

    pub fn of(feature: &Feature) -> Self {
        Self::parse(feature.properties.text(&["poi_type", "type"]).as_deref())
    }

    pub fn slug(self) -> &'static str {
        match self {
            PoiKind::Parking => "parking",
            PoiKind::Cafe => "cafe",
            PoiKind::Restaurant => "restaurant",
            PoiKind::Attraction => "attraction",
            PoiKind::Viewpoint => "viewpoint",
            PoiKind::Toilet => "toilet",
            PoiKind::Shelter => "shelter",
            PoiKind::Picnic => "picnic",
            PoiKind::Information => "information",
            PoiKind::Accommodation => "accommodation",
        }
    }

    pub fn style(self) -> PoiStyle {
        let (color, icon, label) = match self {
            PoiKind::Parking => ("#FF6B6B", "🅿️", "Parking"),
            PoiKind::Cafe => ("#FFD93D", "☕", "Café"),
            PoiKind::Restaurant => ("#FFA500", "🍽️", "Restaurant"),
            PoiKind::Attraction => ("#6BCB77", "⭐", "Attraction"),
            PoiKind::Viewpoint => ("#4D96FF", "👁️", "Viewpoint"),
            PoiKind::Toilet => ("#9D84B7", "🚻", "Toilet"),
            PoiKind::Shelter => ("#A8D8D8", "🏠", "Shelter"),
            PoiKind::Picnic => ("#FFC93C", "🧺", "Picnic Area"),
            PoiKind::Information => ("#95B8D1", "ℹ️", "Information"),
            PoiKind::Accommodation => ("#E8B4B8", "🛏️", "Accommodation"),
        };
        PoiStyle { color, icon, label }
    }
}

pub fn group_by_kind(features: Vec<Feature>) -> Vec<(PoiKind, Vec<Feature>)> {
    let mut groups: Vec<(PoiKind, Vec<Feature>)> =
        PoiKind::ALL.into_iter().map(|kind| (kind, Vec::new())).collect();
    for feature in features {
        let kind = PoiKind::of(&feature);
        if let Some((_, bucket)) = groups.iter_mut().find(|(candidate, _)| *candidate == kind) {
            bucket.push(feature);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_and_unknown_types() {
        assert_eq!(PoiKind::parse(Some("Cafe")), PoiKind::Cafe);
        assert_eq!(PoiKind::parse(Some(" toilet ")), PoiKind::Toilet);
        assert_eq!(PoiKind::parse(Some("castle")), PoiKind::Attraction);
        assert_eq!(PoiKind::parse(None), PoiKind::Attraction);
    }

    #[test]
    fn groups_cover_every_kind_once() {
        let features = vec![
            Feature::from_record(&json!({ "name": "a", "poi_type": "parking" })),
            Feature::from_record(&json!({ "name": "b", "poi_type": "parking" })),
            Feature::from_record(&json!({ "name": "c" })),
        ];
        let groups = group_by_kind(features);
        assert_eq!(groups.len(), PoiKind::ALL.len());
        let count = |kind| {
            groups
                .iter()
                .find(|(candidate, _)| *candidate == kind)
                .map(|(_, bucket)| bucket.len())
                .unwrap()
        };
        assert_eq!(count(PoiKind::Parking), 2);
        assert_eq!(count(PoiKind::Attraction), 1);
        assert_eq!(count(PoiKind::Cafe), 0);
        assert_eq!(PoiKind::Picnic.style().label, "Picnic Area");
    }
}
