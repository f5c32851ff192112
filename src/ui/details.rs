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

//! Popups for the selected balloon or wind sample.

use windborne_client::{BalloonPosition, Constellation, Trail, WindSample};

use crate::map::{style, MapSelection};

/// What the user asked for from a details window
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct DetailsAction {
    pub close: bool,
    pub center_on: Option<(f64, f64)>,
}

/// Compass point for a direction in degrees
pub fn compass_point(degrees: f64) -> &'static str {
    const POINTS: [&str; 16] = [
        "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
        "NNW",
    ];
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "sector index is within 0..16 after rem_euclid"
    )]
    let sector = ((degrees.rem_euclid(360.0) / 22.5).round() as usize) % POINTS.len();
    POINTS[sector]
}

pub fn format_coordinate(lat: f64, lon: f64) -> String {
    let ns = if lat >= 0.0 { 'N' } else { 'S' };
    let ew = if lon >= 0.0 { 'E' } else { 'W' };
    format!("{:.4}°{}, {:.4}°{}", lat.abs(), ns, lon.abs(), ew)
}

fn raw_tuple(position: &BalloonPosition) -> String {
    serde_json::to_string(&position.raw).unwrap_or_else(|_| "?".to_string())
}

fn row(ui: &mut egui::Ui, key: &str, value: impl Into<egui::WidgetText>) {
    ui.label(
        egui::RichText::new(key)
            .color(egui::Color32::from_rgb(130, 130, 130))
            .size(11.0),
    );
    ui.label(value);
    ui.end_row();
}

fn details_window<'a>(ctx: &egui::Context, title: &'a str) -> egui::Window<'a> {
    egui::Window::new(title)
        .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-10.0, 10.0))
        .resizable(false)
        .collapsible(false)
        .frame(
            egui::Frame::window(&ctx.style())
                .fill(egui::Color32::from_rgba_unmultiplied(25, 30, 35, 235))
                .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(60, 80, 100)))
                .corner_radius(6.0),
        )
}

/// Render the popup for the current selection
pub fn render(
    ctx: &egui::Context,
    selection: MapSelection,
    constellation: &Constellation,
    wind: &[WindSample],
) -> DetailsAction {
    match selection {
        MapSelection::Balloon(id) => match constellation.get(id) {
            Some(position) => render_balloon(ctx, position, constellation.trail_for(id.index).as_ref()),
            None => DetailsAction {
                close: true,
                ..Default::default()
            },
        },
        MapSelection::Wind(i) => match wind.get(i) {
            Some(sample) => render_wind(ctx, sample),
            None => DetailsAction {
                close: true,
                ..Default::default()
            },
        },
    }
}

fn render_balloon(ctx: &egui::Context, position: &BalloonPosition, trail: Option<&Trail>) -> DetailsAction {
    let mut action = DetailsAction::default();

    details_window(ctx, "Balloon").show(ctx, |ui| {
        egui::Grid::new("balloon_details")
            .num_columns(2)
            .spacing([12.0, 4.0])
            .show(ui, |ui| {
                row(ui, "ID", egui::RichText::new(position.id.to_string()).monospace().strong());
                row(
                    ui,
                    "Altitude",
                    egui::RichText::new(format!("{:.2} km", position.altitude))
                        .color(style::altitude_to_color(position.altitude)),
                );
                row(ui, "Hours ago", position.hours_ago.to_string());
                row(ui, "Location", format_coordinate(position.latitude, position.longitude));
                row(ui, "Snapshot", position.timestamp.format("%Y-%m-%d %H:%M UTC").to_string());
                row(ui, "Raw", egui::RichText::new(raw_tuple(position)).monospace().size(10.0));
            });

        if let Some(trail) = trail {
            ui.add_space(6.0);
            ui.label(
                egui::RichText::new(format!("ALTITUDE ({} points)", trail.points.len()))
                    .color(egui::Color32::from_rgb(150, 150, 150))
                    .size(10.0)
                    .strong(),
            );
            render_altitude_history(ui, trail, position.hours_ago);
        }

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            if ui.button("Center map").clicked() {
                action.center_on = Some((position.latitude, position.longitude));
            }
            if ui.button("Close").clicked() {
                action.close = true;
            }
        });
    });

    action
}

/// Points of an altitude sparkline in `rect`, oldest on the left
///
/// The x axis spans 23 hours ago to now so gaps keep their position.
#[allow(clippy::cast_possible_truncation, reason = "normalized values are within 0..=1")]
fn altitude_points(trail: &Trail, rect: egui::Rect) -> Vec<egui::Pos2> {
    let (lo, hi) = trail
        .points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.altitude), hi.max(p.altitude))
        });
    let span = (hi - lo).max(0.1);

    trail
        .points
        .iter()
        .map(|p| {
            let t = (23.0 - f64::from(p.hours_ago)) / 23.0;
            let v = (p.altitude - lo) / span;
            egui::pos2(
                rect.min.x + t as f32 * rect.width(),
                rect.max.y - v as f32 * rect.height(),
            )
        })
        .collect()
}

fn render_altitude_history(ui: &mut egui::Ui, trail: &Trail, highlight_hour: u8) {
    let (rect, response) = ui.allocate_exact_size(egui::vec2(220.0, 40.0), egui::Sense::hover());
    let painter = ui.painter();

    painter.rect_filled(rect, 2.0, egui::Color32::from_rgba_unmultiplied(0, 0, 0, 80));

    let points = altitude_points(trail, rect);
    painter.add(egui::Shape::line(
        points.clone(),
        egui::Stroke::new(1.5, style::TRAIL_COLOR),
    ));

    for (point, pos) in trail.points.iter().zip(&points) {
        if point.hours_ago == highlight_hour {
            painter.circle_filled(*pos, 3.0, style::SELECTED_COLOR);
        }
    }

    if let Some(hover) = response.hover_pos() {
        let nearest = trail
            .points
            .iter()
            .zip(&points)
            .min_by(|a, b| (a.1.x - hover.x).abs().total_cmp(&(b.1.x - hover.x).abs()));
        if let Some((point, _)) = nearest {
            response.on_hover_text(format!("{}h ago: {:.2} km", point.hours_ago, point.altitude));
        }
    }
}

fn render_wind(ctx: &egui::Context, sample: &WindSample) -> DetailsAction {
    let mut action = DetailsAction::default();

    details_window(ctx, "Wind").show(ctx, |ui| {
        egui::Grid::new("wind_details")
            .num_columns(2)
            .spacing([12.0, 4.0])
            .show(ui, |ui| {
                row(
                    ui,
                    "Speed",
                    egui::RichText::new(format!("{:.1} m/s", sample.wind_speed))
                        .color(style::wind_color(sample.band()))
                        .strong(),
                );
                row(
                    ui,
                    "Direction",
                    format!("{:.0}° ({})", sample.wind_deg, compass_point(sample.wind_deg)),
                );
                row(ui, "Gust", format!("{:.1} m/s", sample.wind_gust));
                row(ui, "Temperature", format!("{:.1} °C", sample.temperature));
                row(ui, "Pressure", format!("{:.0} hPa", sample.pressure));
                row(ui, "Location", format_coordinate(sample.latitude, sample.longitude));
            });

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            if ui.button("Center map").clicked() {
                action.center_on = Some((sample.latitude, sample.longitude));
            }
            if ui.button("Close").clicked() {
                action.close = true;
            }
        });
    });

    action
}

#[cfg(test)]
mod tests {
    use super::*;
    use windborne_client::TrailPoint;

    #[test]
    fn test_compass_point() {
        assert_eq!(compass_point(0.0), "N");
        assert_eq!(compass_point(90.0), "E");
        assert_eq!(compass_point(225.0), "SW");
        assert_eq!(compass_point(359.0), "N");
        assert_eq!(compass_point(-90.0), "W");
    }

    #[test]
    fn test_format_coordinate() {
        assert_eq!(format_coordinate(12.5, -45.25), "12.5000°N, 45.2500°W");
        assert_eq!(format_coordinate(-0.5, 0.0), "0.5000°S, 0.0000°E");
    }

    #[test]
    fn test_altitude_points_span_rect() {
        let point = |hours_ago, altitude| TrailPoint {
            lat: 0.0,
            lon: 0.0,
            altitude,
            hours_ago,
        };
        let trail = Trail {
            index: 0,
            points: vec![point(23, 10.0), point(0, 20.0)],
        };
        let rect = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(100.0, 50.0));
        let points = altitude_points(&trail, rect);

        assert_eq!(points[0], egui::pos2(0.0, 50.0));
        assert_eq!(points[1], egui::pos2(100.0, 0.0));
    }
}
