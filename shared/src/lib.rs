pub mod feature;
pub mod geo;
pub mod payload;
pub mod polygon;
pub mod proximity;
pub mod search;

pub use feature::{Feature, Geometry, Properties};
pub use geo::{Bounds, LngLat};
pub use payload::{decode_collection, Collection, CollectionShape, PayloadError};
pub use polygon::{PolygonGeometry, RingError};
pub use search::{no_results_message, normalize_places, Analysis, Place, PlaceList};
