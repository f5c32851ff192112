// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use log::info;
use walkers::sources::{Attribution, TileSource};
use walkers::TileId;

/// Tile source for Carto CDN dark basemap tiles
/// Uses subdomain load balancing across a-d.basemaps.cartocdn.com
#[derive(Debug, Default)]
pub struct CartoTileSource;

impl TileSource for CartoTileSource {
    fn tile_url(&self, tile_id: TileId) -> String {
        let subdomain = ['a', 'b', 'c', 'd'][((tile_id.x + tile_id.y) % 4) as usize];

        format!(
            "https://{}.basemaps.cartocdn.com/dark_all/{}/{}/{}.png",
            subdomain, tile_id.zoom, tile_id.x, tile_id.y
        )
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "© OpenStreetMap contributors, © CARTO",
            url: "https://carto.com/attributions",
            logo_light: None,
            logo_dark: None,
        }
    }
}

/// Mapbox dark style rendered as raster tiles
pub struct MapboxTileSource {
    access_token: String,
}

impl MapboxTileSource {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }
}

// Keep the token out of logs
impl std::fmt::Debug for MapboxTileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapboxTileSource")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl TileSource for MapboxTileSource {
    fn tile_url(&self, tile_id: TileId) -> String {
        format!(
            "https://api.mapbox.com/styles/v1/mapbox/dark-v11/tiles/256/{}/{}/{}?access_token={}",
            tile_id.zoom, tile_id.x, tile_id.y, self.access_token
        )
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "© Mapbox © OpenStreetMap",
            url: "https://www.mapbox.com/about/maps/",
            logo_light: None,
            logo_dark: None,
        }
    }
}

/// Basemap chosen for this session, with a short name for cache paths and the status pane
pub struct SelectedSource {
    pub name: &'static str,
    pub source: Box<dyn TileSource + Send + Sync>,
}

/// Use Mapbox when a token is available, otherwise the keyless Carto basemap
pub fn select_tile_source(mapbox_token: Option<String>) -> SelectedSource {
    match mapbox_token {
        Some(token) => {
            info!("Using Mapbox dark basemap");
            SelectedSource {
                name: "mapbox",
                source: Box::new(MapboxTileSource::new(token)),
            }
        }
        None => {
            info!("No Mapbox token found, using Carto dark basemap");
            SelectedSource {
                name: "carto",
                source: Box::new(CartoTileSource),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(x: u32, y: u32, zoom: u8) -> TileId {
        TileId { x, y, zoom }
    }

    #[test]
    fn test_carto_subdomain_rotation() {
        let source = CartoTileSource;
        assert_eq!(
            source.tile_url(tile(0, 0, 1)),
            "https://a.basemaps.cartocdn.com/dark_all/1/0/0.png"
        );
        assert!(source.tile_url(tile(1, 2, 3)).starts_with("https://d."));
    }

    #[test]
    fn test_mapbox_url_carries_token() {
        let source = MapboxTileSource::new("pk.test");
        assert_eq!(
            source.tile_url(tile(3, 4, 5)),
            "https://api.mapbox.com/styles/v1/mapbox/dark-v11/tiles/256/5/3/4?access_token=pk.test"
        );
        assert!(!format!("{source:?}").contains("pk.test"));
    }

    #[test]
    fn test_select_source() {
        assert_eq!(select_tile_source(None).name, "carto");
        assert_eq!(select_tile_source(Some("pk.test".to_string())).name, "mapbox");
    }
}
