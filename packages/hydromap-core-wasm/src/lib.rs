// Core of the hydrology map: loads the water-body dataset once, gives every
// feature a stable identity, and keeps the map highlight and the list
// selection in sync through one shared selection value.

pub mod config;
pub mod error;
// Geometry payload parsing and normalization
pub mod geometry;
pub mod identity;
pub mod models;
// Dataset fetch latch and record normalization
pub mod dataset;
pub mod selection;
pub mod list_view;
pub mod spatial_view;
pub mod map_style;
// Container wiring the views to the selection
pub mod app;

#[cfg(target_arch = "wasm32")]
pub mod console;
#[cfg(target_arch = "wasm32")]
pub mod bindings;

#[cfg(test)]
mod test_support;

pub use app::{HydroApp, PendingLoad};
pub use config::{DuplicatePolicy, MapConfig};
pub use dataset::{Dataset, DatasetClient, Feature, FetchResponse};
pub use error::{GeometryError, LoadError, SurfaceError};
pub use identity::FeatureIdentity;
pub use list_view::{ListView, ScrollOptions, ScrollTarget};
pub use selection::{Selection, SelectionState};
pub use spatial_view::{MapSurface, SpatialView};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

// Logging and panic messages go to the browser console from the start
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console::init(log::Level::Info);
    log::info!("WASM module initialized successfully");
}
