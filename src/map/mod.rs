//! Map rendering and tile management.
//!
//! This module provides map tile fetching, caching, Web Mercator projection
//! utilities and the interactive balloon/wind map view.

pub mod projection;
pub mod sources;
pub mod style;
pub mod tiles;
pub mod view;

pub use sources::select_tile_source;
pub use tiles::TileManager;
pub use view::{MapData, MapLayers, MapSelection, MapView};

/// Most zoomed-out level the map allows
pub const MIN_ZOOM: f32 = 1.0;

/// Most zoomed-in level the map allows
pub const MAX_ZOOM: f32 = 10.0;
