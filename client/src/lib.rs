mod app;
pub mod config;
pub mod context;
mod dom;
pub mod draw;
mod leaflet;
pub mod loader;
mod logging;
mod map;
pub mod net;
pub mod poi;
pub mod popup;
pub mod proximity;
pub mod render;
pub mod search;
pub mod state;
pub mod surface;
pub mod ui;

pub use app::run;
