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

use egui::Color32;
use windborne_client::WindBand;

/// Altitude gradient stops (km, color)
const ALTITUDE_STOPS: [(f64, Color32); 4] = [
    (0.0, Color32::from_rgb(59, 130, 246)),
    (10.0, Color32::from_rgb(139, 92, 246)),
    (20.0, Color32::from_rgb(236, 72, 153)),
    (30.0, Color32::from_rgb(244, 63, 94)),
];

/// Balloon marker radius stops (zoom, pixels)
const RADIUS_STOPS: [(f32, f32); 3] = [(1.0, 2.0), (5.0, 6.0), (10.0, 10.0)];

pub const BALLOON_OPACITY: f32 = 0.8;
pub const TRAIL_COLOR: Color32 = Color32::from_rgb(96, 165, 250);
pub const TRAIL_OPACITY: f32 = 0.3;
pub const TRAIL_WIDTH: f32 = 1.5;
pub const SELECTED_COLOR: Color32 = Color32::from_rgb(250, 204, 21);

/// Legend rows for altitude bands, colored at the band's lower bound
pub const ALTITUDE_LEGEND: [(&str, f64); 4] = [
    ("0-10 km", 0.0),
    ("10-20 km", 10.0),
    ("20-30 km", 20.0),
    ("30+ km", 30.0),
];

/// Legend rows for wind bands
pub const WIND_LEGEND: [WindBand; 3] = [WindBand::Calm, WindBand::Breezy, WindBand::Strong];

fn lerp_color(a: Color32, b: Color32, t: f64) -> Color32 {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "interpolated channel stays within 0..=255"
    )]
    let mix = |x: u8, y: u8| (f64::from(x) + (f64::from(y) - f64::from(x)) * t).round() as u8;
    Color32::from_rgb(mix(a.r(), b.r()), mix(a.g(), b.g()), mix(a.b(), b.b()))
}

/// Color for a balloon at the given altitude in km, interpolated between stops
pub fn altitude_to_color(altitude_km: f64) -> Color32 {
    let (first_alt, first_color) = ALTITUDE_STOPS[0];
    if !altitude_km.is_finite() || altitude_km <= first_alt {
        return first_color;
    }

    for pair in ALTITUDE_STOPS.windows(2) {
        let (lo, lo_color) = pair[0];
        let (hi, hi_color) = pair[1];
        if altitude_km <= hi {
            return lerp_color(lo_color, hi_color, (altitude_km - lo) / (hi - lo));
        }
    }

    ALTITUDE_STOPS[ALTITUDE_STOPS.len() - 1].1
}

/// Balloon marker radius for the current zoom level
pub fn balloon_radius(zoom: f32) -> f32 {
    let (first_zoom, first_radius) = RADIUS_STOPS[0];
    if zoom <= first_zoom {
        return first_radius;
    }

    for pair in RADIUS_STOPS.windows(2) {
        let (lo, lo_radius) = pair[0];
        let (hi, hi_radius) = pair[1];
        if zoom <= hi {
            return lo_radius + (hi_radius - lo_radius) * (zoom - lo) / (hi - lo);
        }
    }

    RADIUS_STOPS[RADIUS_STOPS.len() - 1].1
}

pub fn wind_color(band: WindBand) -> Color32 {
    match band {
        WindBand::Calm => Color32::from_rgb(34, 197, 94),
        WindBand::Breezy => Color32::from_rgb(245, 158, 11),
        WindBand::Strong => Color32::from_rgb(239, 68, 68),
    }
}
