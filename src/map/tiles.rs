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

//! Basemap tile download, disk cache and texture management.

use egui::{ColorImage, TextureHandle};
use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use walkers::sources::{Attribution, TileSource};
use walkers::TileId;

use super::projection::WebMercator;
use super::sources::SelectedSource;

pub const TILE_SIZE: u32 = 256;
const CACHE_DURATION_DAYS: u64 = 7;
const DOWNLOAD_TIMEOUT_SECS: u64 = 15;

/// Upper bound on tile textures held in memory before far zoom levels are evicted
const MAX_RESIDENT_TILES: usize = 512;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        Self { x, y, zoom }
    }

    fn tile_id(self) -> TileId {
        TileId {
            x: self.x,
            y: self.y,
            zoom: self.zoom,
        }
    }

    /// Cache filename keyed on source and position, so tokens never reach the disk
    fn cache_filename(self, source_name: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}/{}/{}/{}", source_name, self.zoom, self.x, self.y).as_bytes());
        format!("{:x}.png", hasher.finalize())
    }
}

/// A tile placed relative to the view center, sized in screen pixels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedTile {
    pub coord: TileCoord,
    pub offset_x: f32,
    pub offset_y: f32,
    pub size: f32,
}

pub enum TileState {
    Loading,
    Loaded(TextureHandle),
    Failed,
}

pub struct TileManager {
    source: Box<dyn TileSource + Send + Sync>,
    source_name: &'static str,
    cache_dir: PathBuf,
    tiles: Arc<Mutex<HashMap<TileCoord, TileState>>>,
    http: reqwest::blocking::Client,
}

impl TileManager {
    pub fn new(selected: SelectedSource) -> Self {
        let cache_dir = Self::get_cache_dir(selected.name);

        if let Err(e) = fs::create_dir_all(&cache_dir) {
            warn!("Failed to create tile cache directory {:?}: {}", cache_dir, e);
        }

        Self::cleanup_old_tiles(&cache_dir);

        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("windhighway-desktop/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to configure tile HTTP client, using defaults: {}", e);
                reqwest::blocking::Client::new()
            });

        Self {
            source: selected.source,
            source_name: selected.name,
            cache_dir,
            tiles: Arc::new(Mutex::new(HashMap::new())),
            http,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source_name
    }

    pub fn attribution(&self) -> Attribution {
        self.source.attribution()
    }

    fn get_cache_dir(source_name: &str) -> PathBuf {
        let mut path = dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".cache"));
        path.push("windhighway-desktop");
        path.push("tiles");
        path.push(source_name);
        path
    }

    fn cleanup_old_tiles(cache_dir: &Path) {
        let now = SystemTime::now();
        let max_age = Duration::from_secs(CACHE_DURATION_DAYS * 24 * 60 * 60);
        let mut removed = 0;

        if let Ok(entries) = fs::read_dir(cache_dir) {
            for entry in entries.flatten() {
                let expired = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .ok()
                    .and_then(|modified| now.duration_since(modified).ok())
                    .is_some_and(|age| age > max_age);

                if expired && fs::remove_file(entry.path()).is_ok() {
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            info!("Removed {} expired tiles from cache", removed);
        }
    }

    /// Get tile from memory or disk cache, or queue it for download
    pub fn get_tile(&self, coord: TileCoord, ctx: &egui::Context) -> Option<TextureHandle> {
        let mut tiles = self.tiles.lock().unwrap();

        match tiles.get(&coord) {
            Some(TileState::Loaded(texture)) => return Some(texture.clone()),
            Some(TileState::Loading | TileState::Failed) => return None,
            None => {}
        }

        if tiles.len() >= MAX_RESIDENT_TILES {
            Self::evict_far_zooms(&mut tiles, coord.zoom);
        }

        let cache_path = self.cache_dir.join(coord.cache_filename(self.source_name));
        if cache_path.exists() {
            match fs::read(&cache_path)
                .map_err(|e| e.to_string())
                .and_then(|bytes| decode_texture(&bytes, coord, ctx))
            {
                Ok(texture) => {
                    tiles.insert(coord, TileState::Loaded(texture.clone()));
                    return Some(texture);
                }
                Err(e) => warn!("Failed to load cached tile {:?}: {}", cache_path, e),
            }
        }

        tiles.insert(coord, TileState::Loading);
        drop(tiles);
        self.spawn_download(coord, cache_path, ctx.clone());
        None
    }

    /// Drop loaded and failed tiles more than one level away from the current zoom
    fn evict_far_zooms(tiles: &mut HashMap<TileCoord, TileState>, zoom: u8) {
        let before = tiles.len();
        tiles.retain(|coord, state| {
            matches!(state, TileState::Loading) || coord.zoom.abs_diff(zoom) <= 1
        });
        debug!("Evicted {} tiles outside zoom {}", before - tiles.len(), zoom);
    }

    fn spawn_download(&self, coord: TileCoord, cache_path: PathBuf, ctx: egui::Context) {
        let url = self.source.tile_url(coord.tile_id());
        let tiles = self.tiles.clone();
        let http = self.http.clone();

        std::thread::spawn(move || {
            let state = match download_tile(&http, &url, &cache_path)
                .and_then(|bytes| decode_texture(&bytes, coord, &ctx))
            {
                Ok(texture) => TileState::Loaded(texture),
                Err(e) => {
                    warn!("Failed to load tile {}/{}/{}: {}", coord.zoom, coord.x, coord.y, e);
                    TileState::Failed
                }
            };

            tiles.lock().unwrap().insert(coord, state);
            ctx.request_repaint();
        });
    }

    /// Tiles covering a viewport centered on the given position
    ///
    /// `zoom` may be fractional; tiles are fetched at the floor level and
    /// scaled up to fill the gap.
    pub fn get_visible_tiles(
        &self,
        center_lat: f64,
        center_lon: f64,
        zoom: f32,
        viewport_width: f32,
        viewport_height: f32,
    ) -> Vec<PlacedTile> {
        visible_tiles(center_lat, center_lon, zoom, viewport_width, viewport_height)
    }

    pub fn has_loading_tiles(&self) -> bool {
        let tiles = self.tiles.lock().unwrap();
        tiles.values().any(|state| matches!(state, TileState::Loading))
    }

    pub fn get_error_count(&self) -> usize {
        let tiles = self.tiles.lock().unwrap();
        tiles.values().filter(|state| matches!(state, TileState::Failed)).count()
    }

    /// Forget failed tiles so they are requested again
    pub fn retry_failed(&self) {
        let mut tiles = self.tiles.lock().unwrap();
        tiles.retain(|_, state| !matches!(state, TileState::Failed));
    }
}

fn download_tile(
    http: &reqwest::blocking::Client,
    url: &str,
    cache_path: &Path,
) -> Result<Vec<u8>, String> {
    let response = http.get(url).send().map_err(|e| e.without_url().to_string())?;
    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()));
    }

    let bytes = response.bytes().map_err(|e| e.without_url().to_string())?;
    if let Err(e) = fs::write(cache_path, &bytes) {
        warn!("Failed to save tile to cache: {}", e);
    }

    Ok(bytes.to_vec())
}

fn decode_texture(bytes: &[u8], coord: TileCoord, ctx: &egui::Context) -> Result<TextureHandle, String> {
    let img = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
    let rgba = img.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    let color_image = ColorImage::from_rgba_unmultiplied(size, &rgba.into_raw());

    Ok(ctx.load_texture(
        format!("tile_{}_{}/{}", coord.zoom, coord.x, coord.y),
        color_image,
        Default::default(),
    ))
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "tile indices are bounded by the zoom level"
)]
fn visible_tiles(
    center_lat: f64,
    center_lon: f64,
    zoom: f32,
    viewport_width: f32,
    viewport_height: f32,
) -> Vec<PlacedTile> {
    let tile_zoom = zoom.floor().max(0.0) as u8;
    let tile_px = TILE_SIZE as f32 * 2_f32.powf(zoom - f32::from(tile_zoom));

    let center_tile_x = WebMercator::lon_to_x(center_lon, tile_zoom);
    let center_tile_y = WebMercator::lat_to_y(center_lat, tile_zoom);

    let tiles_wide = (viewport_width / tile_px).ceil() as i32 + 2;
    let tiles_high = (viewport_height / tile_px).ceil() as i32 + 2;

    let start_x = center_tile_x.floor() as i32 - tiles_wide / 2;
    let start_y = center_tile_y.floor() as i32 - tiles_high / 2;

    let max_tile = 2_i32.pow(u32::from(tile_zoom));
    let mut tiles = Vec::new();

    for dy in 0..tiles_high {
        for dx in 0..tiles_wide {
            let tile_x = start_x + dx;
            let tile_y = start_y + dy;

            // Latitude doesn't wrap
            if tile_y < 0 || tile_y >= max_tile {
                continue;
            }

            let wrapped_x = tile_x.rem_euclid(max_tile);
            let coord = TileCoord::new(wrapped_x as u32, tile_y as u32, tile_zoom);

            tiles.push(PlacedTile {
                coord,
                offset_x: ((f64::from(tile_x) - center_tile_x) * f64::from(tile_px)) as f32,
                offset_y: ((f64::from(tile_y) - center_tile_y) * f64::from(tile_px)) as f32,
                size: tile_px,
            });
        }
    }

    tiles
}
