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

use std::f64::consts::PI;

/// Latitude limit of the square Web Mercator world
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// Web Mercator projection utilities
#[derive(Debug)]
pub struct WebMercator;

impl WebMercator {
    /// Convert longitude to a world fraction (0.0 at -180°, 1.0 at 180°)
    pub fn lon_to_unit(lon: f64) -> f64 {
        (lon + 180.0) / 360.0
    }

    /// Convert latitude to a world fraction (0.0 at the north edge)
    pub fn lat_to_unit(lat: f64) -> f64 {
        let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
    }

    /// Convert a world fraction back to latitude
    pub fn unit_to_lat(y: f64) -> f64 {
        (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees()
    }

    /// Convert a world fraction back to longitude
    pub fn unit_to_lon(x: f64) -> f64 {
        x * 360.0 - 180.0
    }

    /// Convert latitude to tile Y coordinate at a zoom level
    pub fn lat_to_y(lat: f64, zoom: u8) -> f64 {
        Self::lat_to_unit(lat) * 2_f64.powi(i32::from(zoom))
    }

    /// Convert longitude to tile X coordinate at a zoom level
    pub fn lon_to_x(lon: f64, zoom: u8) -> f64 {
        Self::lon_to_unit(lon) * 2_f64.powi(i32::from(zoom))
    }
}

/// Maps geographic coordinates onto the screen for one frame
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    screen_center: egui::Pos2,
    center_x: f64,
    center_y: f64,
    /// Width of the whole world in screen pixels
    world_px: f64,
}

impl Projector {
    pub fn new(screen_center: egui::Pos2, center_lat: f64, center_lon: f64, world_px: f64) -> Self {
        Self {
            screen_center,
            center_x: WebMercator::lon_to_unit(center_lon),
            center_y: WebMercator::lat_to_unit(center_lat),
            world_px,
        }
    }

    pub fn world_px(&self) -> f64 {
        self.world_px
    }

    /// Project onto the world copy nearest the view center
    #[allow(clippy::cast_possible_truncation, reason = "screen coordinates fit in f32")]
    pub fn to_screen(&self, lat: f64, lon: f64) -> egui::Pos2 {
        let mut dx = WebMercator::lon_to_unit(lon) - self.center_x;
        dx -= dx.round();
        let dy = WebMercator::lat_to_unit(lat) - self.center_y;

        egui::pos2(
            self.screen_center.x + (dx * self.world_px) as f32,
            self.screen_center.y + (dy * self.world_px) as f32,
        )
    }

    /// Inverse of [`Projector::to_screen`]
    pub fn to_geo(&self, pos: egui::Pos2) -> (f64, f64) {
        let x = self.center_x + f64::from(pos.x - self.screen_center.x) / self.world_px;
        let y = self.center_y + f64::from(pos.y - self.screen_center.y) / self.world_px;
        let lon = WebMercator::unit_to_lon(x.rem_euclid(1.0));
        (WebMercator::unit_to_lat(y.clamp(0.0, 1.0)), lon)
    }
}
