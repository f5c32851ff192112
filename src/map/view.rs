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

//! Interactive map: basemap tiles, balloon markers, trails and wind arrows.

use egui::emath::Rot2;
use egui::{Color32, Pos2, Rect, Shape, Stroke};
use log::warn;
use windborne_client::{BalloonId, Constellation, Trail, WindSample};

use super::projection::{Projector, MAX_LATITUDE};
use super::style;
use super::tiles::{TileManager, TILE_SIZE};
use super::{MAX_ZOOM, MIN_ZOOM};

/// Extra pixels around a marker that still count as a hit
const CLICK_SLOP: f32 = 4.0;

/// Half-length of a wind arrow shaft in pixels
const WIND_ARROW_HALF: f32 = 10.0;

/// Scroll distance (points) that changes zoom by one level
const SCROLL_PER_ZOOM_LEVEL: f32 = 200.0;

/// Item picked on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapSelection {
    Balloon(BalloonId),
    /// Index into the wind samples of the current report
    Wind(usize),
}

/// Optional overlays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapLayers {
    pub trails: bool,
    pub wind: bool,
}

/// Data drawn on top of the basemap for one frame
#[derive(Debug, Clone, Copy)]
pub struct MapData<'a> {
    pub constellation: &'a Constellation,
    pub trails: &'a [Trail],
    pub wind: &'a [WindSample],
    /// Snapshot hour whose balloons are drawn
    pub hours_ago: u8,
}

/// Pan/zoom state and tile cache for the map panel
pub struct MapView {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: f32,
    tile_manager: TileManager,
}

impl std::fmt::Debug for MapView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapView")
            .field("center_lat", &self.center_lat)
            .field("center_lon", &self.center_lon)
            .field("zoom", &self.zoom)
            .field("tile_source", &self.tile_manager.source_name())
            .finish_non_exhaustive()
    }
}

impl MapView {
    pub fn new(tile_manager: TileManager, center_lat: f64, center_lon: f64, zoom: f32) -> Self {
        Self {
            center_lat: center_lat.clamp(-MAX_LATITUDE, MAX_LATITUDE),
            center_lon: wrap_longitude(center_lon),
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            tile_manager,
        }
    }

    /// Status line for the tile layer, if anything is worth reporting
    pub fn tile_status(&self) -> Option<String> {
        let errors = self.tile_manager.get_error_count();
        if errors > 0 {
            Some(format!("Failed to load {errors} map tiles"))
        } else if self.tile_manager.has_loading_tiles() {
            Some("Loading map tiles...".to_string())
        } else {
            None
        }
    }

    pub fn retry_failed_tiles(&self) {
        self.tile_manager.retry_failed();
    }

    fn world_px(&self) -> f64 {
        f64::from(TILE_SIZE) * 2_f64.powf(f64::from(self.zoom))
    }

    fn projector(&self, rect: Rect) -> Projector {
        Projector::new(rect.center(), self.center_lat, self.center_lon, self.world_px())
    }

    /// Draw the map and handle pan, zoom and marker clicks
    ///
    /// A click on a marker replaces `selection`; a click on empty map clears it.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        data: Option<MapData<'_>>,
        layers: MapLayers,
        selection: &mut Option<MapSelection>,
    ) {
        let (response, painter) = ui.allocate_painter(
            egui::vec2(ui.available_width(), ui.available_height()),
            egui::Sense::click_and_drag(),
        );
        let rect = response.rect;

        painter.rect_filled(rect, 0.0, Color32::from_rgb(14, 17, 23));

        self.handle_zoom(ui, &response);

        if response.dragged() {
            let projector = self.projector(rect);
            let (lat, lon) = projector.to_geo(rect.center() - response.drag_delta());
            self.center_lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
            self.center_lon = wrap_longitude(lon);
        }

        self.draw_tiles(&painter, rect, ui.ctx());

        let projector = self.projector(rect);

        if let Some(data) = data {
            if layers.trails {
                draw_trails(&painter, &projector, rect, data.trails, *selection);
            }

            let radius = style::balloon_radius(self.zoom);
            draw_balloons(&painter, &projector, rect, &data, radius, *selection);

            if layers.wind {
                draw_wind(&painter, &projector, rect, data.wind, *selection);
            }

            if response.clicked() {
                if let Some(click_pos) = response.interact_pointer_pos() {
                    *selection = hit_test(&projector, click_pos, &data, layers, radius);
                }
            }
        }

        self.draw_attribution(ui, &painter, rect);
    }

    fn handle_zoom(&mut self, ui: &egui::Ui, response: &egui::Response) {
        // Pinch and ctrl+scroll
        let zoom_delta = ui.ctx().input(|i| i.zoom_delta());
        let mut zoom_change = if (zoom_delta - 1.0).abs() > 0.001 {
            zoom_delta.log2()
        } else {
            0.0
        };

        // Plain scroll wheel while hovering the map
        if response.hovered() {
            let scroll = ui.ctx().input(|i| i.smooth_scroll_delta.y);
            zoom_change += scroll / SCROLL_PER_ZOOM_LEVEL;
        }

        if zoom_change != 0.0 {
            self.zoom = (self.zoom + zoom_change).clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    fn draw_tiles(&self, painter: &egui::Painter, rect: Rect, ctx: &egui::Context) {
        let center = rect.center();
        let uv = Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));

        for tile in self.tile_manager.get_visible_tiles(
            self.center_lat,
            self.center_lon,
            self.zoom,
            rect.width(),
            rect.height(),
        ) {
            if let Some(texture) = self.tile_manager.get_tile(tile.coord, ctx) {
                let tile_rect = Rect::from_min_size(
                    egui::pos2(center.x + tile.offset_x, center.y + tile.offset_y),
                    egui::vec2(tile.size, tile.size),
                );
                painter.image(texture.id(), tile_rect, uv, Color32::WHITE);
            }
        }
    }

    fn draw_attribution(&self, ui: &egui::Ui, painter: &egui::Painter, rect: Rect) {
        let attribution = self.tile_manager.attribution();
        let galley = painter.layout_no_wrap(
            attribution.text.to_string(),
            egui::FontId::proportional(10.0),
            Color32::from_rgb(180, 180, 180),
        );

        let padding = egui::vec2(4.0, 2.0);
        let box_rect = Rect::from_min_size(
            rect.right_bottom() - galley.size() - padding * 2.0,
            galley.size() + padding * 2.0,
        );
        painter.rect_filled(box_rect, 2.0, Color32::from_rgba_unmultiplied(0, 0, 0, 160));
        painter.galley(box_rect.min + padding, galley, Color32::from_rgb(180, 180, 180));

        let response = ui.interact(box_rect, ui.id().with("map_attribution"), egui::Sense::click());
        if response.on_hover_cursor(egui::CursorIcon::PointingHand).clicked() {
            if let Err(e) = webbrowser::open(attribution.url) {
                warn!("Failed to open {}: {}", attribution.url, e);
            }
        }
    }
}

/// Normalize a longitude to [-180, 180)
pub fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

fn visible(rect: Rect, pos: Pos2, margin: f32) -> bool {
    rect.expand(margin).contains(pos)
}

/// Split a projected polyline wherever it jumps across the map edge
fn split_on_wrap(points: Vec<Pos2>, max_jump: f32) -> Vec<Vec<Pos2>> {
    let mut runs = Vec::new();
    let mut current: Vec<Pos2> = Vec::new();

    for pos in points {
        if let Some(last) = current.last() {
            if (pos.x - last.x).abs() > max_jump {
                runs.push(std::mem::take(&mut current));
            }
        }
        current.push(pos);
    }
    runs.push(current);

    runs.retain(|run| run.len() >= 2);
    runs
}

#[allow(clippy::cast_possible_truncation, reason = "half the world width fits in f32")]
fn draw_trails(
    painter: &egui::Painter,
    projector: &Projector,
    rect: Rect,
    trails: &[Trail],
    selection: Option<MapSelection>,
) {
    let selected_index = match selection {
        Some(MapSelection::Balloon(id)) => Some(id.index),
        _ => None,
    };
    let max_jump = (projector.world_px() / 2.0) as f32;
    let normal = Stroke::new(style::TRAIL_WIDTH, style::TRAIL_COLOR.gamma_multiply(style::TRAIL_OPACITY));
    let highlighted = Stroke::new(style::TRAIL_WIDTH * 2.0, style::SELECTED_COLOR);

    for trail in trails {
        let stroke = if selected_index == Some(trail.index) {
            highlighted
        } else {
            normal
        };

        for segment in trail.segments() {
            let points: Vec<Pos2> = segment
                .iter()
                .map(|p| projector.to_screen(p.lat, p.lon))
                .collect();

            for run in split_on_wrap(points, max_jump) {
                let bounds = Rect::from_points(&run);
                if bounds.intersects(rect) {
                    painter.add(Shape::line(run, stroke));
                }
            }
        }
    }
}

fn draw_balloons(
    painter: &egui::Painter,
    projector: &Projector,
    rect: Rect,
    data: &MapData<'_>,
    radius: f32,
    selection: Option<MapSelection>,
) {
    let outline = Stroke::new(1.0, Color32::WHITE);

    for balloon in data.constellation.at_hour(data.hours_ago) {
        let pos = projector.to_screen(balloon.latitude, balloon.longitude);
        if !visible(rect, pos, radius) {
            continue;
        }

        let color = style::altitude_to_color(balloon.altitude).gamma_multiply(style::BALLOON_OPACITY);
        painter.circle_filled(pos, radius, color);
        painter.circle_stroke(pos, radius, outline);

        if selection == Some(MapSelection::Balloon(balloon.id)) {
            painter.circle_stroke(pos, radius + 4.0, Stroke::new(2.0, style::SELECTED_COLOR));
        }
    }
}

/// Arrow pointing toward `wind_deg`, centered on `pos`
fn wind_arrow(pos: Pos2, wind_deg: f64) -> [[Pos2; 2]; 3] {
    #[allow(clippy::cast_possible_truncation, reason = "angle precision is irrelevant on screen")]
    let rot = Rot2::from_angle(wind_deg.to_radians() as f32);
    let at = |x: f32, y: f32| pos + rot * egui::vec2(x, y);

    let tip = at(0.0, -WIND_ARROW_HALF);
    [
        [tip, at(0.0, WIND_ARROW_HALF)],
        [tip, at(-5.0, -WIND_ARROW_HALF + 5.0)],
        [tip, at(5.0, -WIND_ARROW_HALF + 5.0)],
    ]
}

fn draw_wind(
    painter: &egui::Painter,
    projector: &Projector,
    rect: Rect,
    samples: &[WindSample],
    selection: Option<MapSelection>,
) {
    for (i, sample) in samples.iter().enumerate() {
        let pos = projector.to_screen(sample.latitude, sample.longitude);
        if !visible(rect, pos, WIND_ARROW_HALF) {
            continue;
        }

        let stroke = Stroke::new(2.0, style::wind_color(sample.band()));
        for line in wind_arrow(pos, sample.wind_deg) {
            painter.line_segment(line, stroke);
        }

        if selection == Some(MapSelection::Wind(i)) {
            painter.circle_stroke(pos, WIND_ARROW_HALF + 3.0, Stroke::new(2.0, style::SELECTED_COLOR));
        }
    }
}

/// Nearest marker under the click, if any
fn hit_test(
    projector: &Projector,
    click_pos: Pos2,
    data: &MapData<'_>,
    layers: MapLayers,
    balloon_radius: f32,
) -> Option<MapSelection> {
    let mut best: Option<(f32, MapSelection)> = None;
    let mut consider = |distance: f32, limit: f32, candidate: MapSelection| {
        if distance <= limit && best.is_none_or(|(d, _)| distance < d) {
            best = Some((distance, candidate));
        }
    };

    for balloon in data.constellation.at_hour(data.hours_ago) {
        let pos = projector.to_screen(balloon.latitude, balloon.longitude);
        consider(
            pos.distance(click_pos),
            balloon_radius + CLICK_SLOP,
            MapSelection::Balloon(balloon.id),
        );
    }

    if layers.wind {
        for (i, sample) in data.wind.iter().enumerate() {
            let pos = projector.to_screen(sample.latitude, sample.longitude);
            consider(pos.distance(click_pos), WIND_ARROW_HALF + CLICK_SLOP, MapSelection::Wind(i));
        }
    }

    best.map(|(_, selection)| selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use windborne_client::{FeedFormat, TreasureFormat};

    fn constellation() -> Constellation {
        let now = Utc::now();
        let mut constellation = Constellation::new(now);
        let hour0 = TreasureFormat::new()
            .parse(b"[[0.0, 0.0, 15.0], [10.0, 10.0, 5.0]]", 0, now)
            .unwrap();
        constellation.insert_hour(0, Ok(hour0));
        constellation
    }

    fn sample(lat: f64, lon: f64) -> WindSample {
        WindSample {
            latitude: lat,
            longitude: lon,
            wind_speed: 12.0,
            wind_deg: 90.0,
            wind_gust: 15.0,
            temperature: -50.0,
            pressure: 1013.0,
        }
    }

    #[test]
    fn test_wrap_longitude() {
        assert!((wrap_longitude(190.0) - (-170.0)).abs() < 1e-9);
        assert!((wrap_longitude(-190.0) - 170.0).abs() < 1e-9);
        assert!((wrap_longitude(45.0) - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_split_on_wrap() {
        let points = vec![
            egui::pos2(0.0, 0.0),
            egui::pos2(10.0, 0.0),
            egui::pos2(600.0, 0.0),
            egui::pos2(610.0, 0.0),
            egui::pos2(620.0, 0.0),
        ];
        let runs = split_on_wrap(points, 256.0);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].len(), 2);
        assert_eq!(runs[1].len(), 3);
    }

    #[test]
    fn test_wind_arrow_points_east_at_90_degrees() {
        let [shaft, _, _] = wind_arrow(egui::pos2(100.0, 100.0), 90.0);
        // Tip rotated clockwise from north to east
        assert!((shaft[0].x - 110.0).abs() < 1e-3);
        assert!((shaft[0].y - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_hit_test_picks_nearest() {
        let constellation = constellation();
        let wind = [sample(10.0, 10.0)];
        let data = MapData {
            constellation: &constellation,
            trails: &[],
            wind: &wind,
            hours_ago: 0,
        };
        let layers = MapLayers { trails: true, wind: true };
        let projector = Projector::new(egui::pos2(400.0, 300.0), 0.0, 0.0, 1024.0);

        let origin = projector.to_screen(0.0, 0.0);
        let hit = hit_test(&projector, origin + egui::vec2(2.0, 0.0), &data, layers, 4.0);
        assert_eq!(
            hit,
            Some(MapSelection::Balloon(BalloonId { hours_ago: 0, index: 0 }))
        );

        // Balloon and wind share a position; an exact tie keeps the balloon
        let shared = projector.to_screen(10.0, 10.0);
        let hit = hit_test(&projector, shared, &data, layers, 4.0);
        assert_eq!(
            hit,
            Some(MapSelection::Balloon(BalloonId { hours_ago: 0, index: 1 }))
        );

        let hit = hit_test(&projector, egui::pos2(0.0, 0.0), &data, layers, 4.0);
        assert_eq!(hit, None);
    }

    #[test]
    fn test_hit_test_ignores_hidden_wind_layer() {
        let constellation = Constellation::new(Utc::now());
        let wind = [sample(0.0, 0.0)];
        let data = MapData {
            constellation: &constellation,
            trails: &[],
            wind: &wind,
            hours_ago: 0,
        };
        let projector = Projector::new(egui::pos2(400.0, 300.0), 0.0, 0.0, 1024.0);
        let pos = projector.to_screen(0.0, 0.0);

        let hidden = MapLayers { trails: true, wind: false };
        assert_eq!(hit_test(&projector, pos, &data, hidden, 4.0), None);

        let shown = MapLayers { trails: true, wind: true };
        assert_eq!(hit_test(&projector, pos, &data, shown, 4.0), Some(MapSelection::Wind(0)));
    }
}
