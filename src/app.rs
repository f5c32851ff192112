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

use log::{info, warn};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use windborne_client::{RefreshReport, Trail};

use crate::config::AppConfig;
use crate::loader::{LoadState, Loader};
use crate::map::{self, MapData, MapLayers, MapSelection, MapView, TileManager};
use crate::status::{SharedSystemStatus, SystemStatus};
use crate::ui::{self, HeaderStats, StatusPane};

/// Launch settings that can override the stored configuration
#[derive(Debug, Clone, Copy)]
pub struct LaunchOptions {
    pub with_weather: bool,
    pub zoom: Option<f32>,
    pub refresh_interval: Option<Duration>,
}

/// Latest report plus values derived from it once per generation
struct LoadedReport {
    generation: u64,
    report: Arc<RefreshReport>,
    trails: Vec<Trail>,
}

pub struct WindHighwayApp {
    config: AppConfig,
    loader: Loader,
    status: SharedSystemStatus,
    map: MapView,
    status_pane: StatusPane,
    layers: MapLayers,
    hours_ago: u8,
    selection: Option<MapSelection>,
    loaded: Option<LoadedReport>,
}

impl std::fmt::Debug for WindHighwayApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindHighwayApp")
            .field("map", &self.map)
            .field("layers", &self.layers)
            .field("hours_ago", &self.hours_ago)
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl WindHighwayApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig, options: LaunchOptions) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        let tile_source = map::select_tile_source(config.mapbox_token().map(|(token, _)| token));

        let mut status = SystemStatus::new();
        status.tile_source = tile_source.name;
        if options.with_weather {
            if let Some((_, source)) = config.weather_api_key() {
                status.weather_enabled = true;
                status.weather_key_source = Some(source.label());
            }
        }
        let status = Arc::new(Mutex::new(status));

        let client_config = config.client_config(options.with_weather);
        let interval = options.refresh_interval.or_else(|| config.auto_refresh_interval());
        if let Some(period) = interval {
            info!("Automatic refresh every {} minutes", period.as_secs() / 60);
        }

        let loader = Loader::spawn(client_config, interval, status.clone(), cc.egui_ctx.clone());

        let zoom = options
            .zoom
            .map_or_else(|| config.clamped_zoom(), |z| z.clamp(map::MIN_ZOOM, map::MAX_ZOOM));
        let map = MapView::new(
            TileManager::new(tile_source),
            config.center_latitude,
            config.center_longitude,
            zoom,
        );

        let layers = MapLayers {
            trails: config.show_trails,
            wind: config.show_wind,
        };

        Self {
            config,
            loader,
            status,
            map,
            status_pane: StatusPane::new(),
            layers,
            hours_ago: 0,
            selection: None,
            loaded: None,
        }
    }

    /// Pick up a newly published report
    fn poll_loader(&mut self) {
        let Some((generation, report)) = self.loader.latest() else {
            return;
        };

        if self.loaded.as_ref().is_some_and(|l| l.generation == generation) {
            return;
        }

        let trails = report.constellation.trails();
        info!(
            "Showing {} positions, {} trails, {} wind samples",
            report.constellation.len(),
            trails.len(),
            report.wind.samples.len()
        );

        // Wind indices refer to the previous report
        if matches!(self.selection, Some(MapSelection::Wind(_))) {
            self.selection = None;
        }

        self.loaded = Some(LoadedReport {
            generation,
            report,
            trails,
        });
    }

    fn header_stats(&self) -> HeaderStats {
        self.loaded.as_ref().map_or_else(HeaderStats::default, |loaded| {
            let constellation = &loaded.report.constellation;
            HeaderStats {
                total_positions: constellation.len(),
                balloons_in_hour: constellation.count_at(self.hours_ago),
                wind_samples: loaded.report.wind.samples.len(),
            }
        })
    }

    fn draw_loading_indicator(&self, ctx: &egui::Context, state: &LoadState) {
        if *state != LoadState::Loading || self.loaded.is_some() {
            return;
        }

        egui::Area::new(egui::Id::new("loading_indicator"))
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                egui::Frame::window(&ctx.style())
                    .fill(egui::Color32::from_rgba_unmultiplied(25, 30, 35, 230))
                    .corner_radius(6.0)
                    .show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label("Loading balloon constellation...");
                        });
                    });
            });
    }
}

/// Feed errors take the banner; otherwise tile progress is shown
fn banner_message(state: &LoadState, tile_status: Option<String>) -> Option<(String, bool)> {
    if let LoadState::Failed(message) = state {
        return Some((format!("Error: {message}"), true));
    }

    tile_status.map(|tile_status| {
        let is_error = tile_status.starts_with("Failed");
        (tile_status, is_error)
    })
}

/// Message bubble at the top center of the map
fn draw_banner(painter: &egui::Painter, rect: egui::Rect, message: &str, is_error: bool) {
    let (bg_color, text_color) = if is_error {
        (egui::Color32::from_rgb(220, 50, 50), egui::Color32::WHITE)
    } else {
        (egui::Color32::from_rgb(255, 200, 100), egui::Color32::BLACK)
    };

    let pos = rect.center_top() + egui::vec2(0.0, 20.0);
    let galley = painter.layout_no_wrap(message.to_string(), egui::FontId::proportional(12.0), text_color);

    let padding = egui::vec2(12.0, 6.0);
    let bubble_rect = egui::Rect::from_center_size(pos, galley.size() + padding * 2.0);

    painter.rect_filled(bubble_rect, 5.0, bg_color);
    painter.galley(bubble_rect.min + padding, galley, text_color);
}

impl eframe::App for WindHighwayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Keep relative timestamps in the status pane current
        ctx.request_repaint_after(Duration::from_secs(1));

        self.poll_loader();
        let state = self.loader.state();

        let stats = self.header_stats();
        let action = ui::header::render(
            ctx,
            stats,
            &mut self.hours_ago,
            &mut self.layers,
            state == LoadState::Loading,
        );
        if action.refresh {
            info!("Manual refresh requested");
            self.map.retry_failed_tiles();
            self.loader.request_refresh();
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::new())
            .show(ctx, |ui| {
                let data = self.loaded.as_ref().map(|loaded| MapData {
                    constellation: &loaded.report.constellation,
                    trails: &loaded.trails,
                    wind: &loaded.report.wind.samples,
                    hours_ago: self.hours_ago,
                });
                self.map.show(ui, data, self.layers, &mut self.selection);

                if let Some((message, is_error)) = banner_message(&state, self.map.tile_status()) {
                    draw_banner(ui.painter(), ui.max_rect(), &message, is_error);
                }
            });

        self.draw_loading_indicator(ctx, &state);

        ui::legend::render(ctx, self.layers.wind);

        {
            let status = self.status.lock().unwrap();
            self.status_pane.render(ctx, &status);
        }

        if let (Some(selection), Some(loaded)) = (self.selection, self.loaded.as_ref()) {
            let action = ui::details::render(
                ctx,
                selection,
                &loaded.report.constellation,
                &loaded.report.wind.samples,
            );
            if let Some((lat, lon)) = action.center_on {
                self.map.center_lat = lat;
                self.map.center_lon = lon;
            }
            if action.close {
                self.selection = None;
            }
        }
    }
}

impl Drop for WindHighwayApp {
    fn drop(&mut self) {
        self.loader.shutdown();

        // Persist layer toggles
        if self.config.show_trails != self.layers.trails || self.config.show_wind != self.layers.wind {
            self.config.show_trails = self.layers.trails;
            self.config.show_wind = self.layers.wind;
            if let Err(e) = self.config.save() {
                warn!("Failed to save config: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_error_takes_banner() {
        let state = LoadState::Failed("no balloon snapshots could be loaded".to_string());
        let banner = banner_message(&state, Some("Loading map tiles...".to_string()));
        assert_eq!(
            banner,
            Some(("Error: no balloon snapshots could be loaded".to_string(), true))
        );
    }

    #[test]
    fn test_tile_status_banner() {
        assert_eq!(banner_message(&LoadState::Loaded, None), None);

        let banner = banner_message(&LoadState::Loaded, Some("Failed to load 3 map tiles".to_string()));
        assert_eq!(banner.map(|(_, is_error)| is_error), Some(true));

        let banner = banner_message(&LoadState::Loading, Some("Loading map tiles...".to_string()));
        assert_eq!(banner.map(|(_, is_error)| is_error), Some(false));
    }
}
