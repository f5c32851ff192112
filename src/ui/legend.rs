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

use crate::map::style;

fn swatch(ui: &mut egui::Ui, color: egui::Color32, label: &str) {
    ui.horizontal(|ui| {
        let (rect, _) = ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
        ui.painter().circle_filled(rect.center(), 5.0, color);
        ui.label(
            egui::RichText::new(label)
                .color(egui::Color32::from_rgb(200, 200, 200))
                .size(10.0),
        );
    });
}

/// Altitude and wind band legend in the lower right corner
pub fn render(ctx: &egui::Context, show_wind: bool) {
    egui::Window::new("Legend")
        .title_bar(false)
        .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-10.0, -30.0))
        .resizable(false)
        .frame(
            egui::Frame::window(&ctx.style())
                .fill(egui::Color32::from_rgba_unmultiplied(25, 30, 35, 220))
                .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(60, 80, 100)))
                .corner_radius(6.0),
        )
        .show(ctx, |ui| {
            ui.label(
                egui::RichText::new("ALTITUDE")
                    .color(egui::Color32::from_rgb(150, 150, 150))
                    .size(10.0)
                    .strong(),
            );
            for (label, altitude) in style::ALTITUDE_LEGEND {
                swatch(ui, style::altitude_to_color(altitude), label);
            }

            if show_wind {
                ui.add_space(6.0);
                ui.label(
                    egui::RichText::new("WIND SPEED")
                        .color(egui::Color32::from_rgb(150, 150, 150))
                        .size(10.0)
                        .strong(),
                );
                for band in style::WIND_LEGEND {
                    swatch(ui, style::wind_color(band), band.label());
                }
            }
        });
}
