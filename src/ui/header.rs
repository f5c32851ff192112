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

use crate::map::MapLayers;

/// Oldest snapshot the time slider reaches
pub const MAX_HOURS_AGO: u8 = 23;

/// Counts shown in the header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderStats {
    pub total_positions: usize,
    pub balloons_in_hour: usize,
    pub wind_samples: usize,
}

/// User input collected from the header for this frame
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeaderAction {
    pub refresh: bool,
}

fn stat(ui: &mut egui::Ui, label: &str, value: usize) {
    ui.vertical(|ui| {
        ui.label(
            egui::RichText::new(label)
                .color(egui::Color32::from_rgb(130, 130, 130))
                .size(10.0),
        );
        ui.label(
            egui::RichText::new(value.to_string())
                .color(egui::Color32::from_rgb(96, 165, 250))
                .size(18.0)
                .strong()
                .monospace(),
        );
    });
}

/// Title, statistics, refresh button, layer toggles and the time slider
pub fn render(
    ctx: &egui::Context,
    stats: HeaderStats,
    hours_ago: &mut u8,
    layers: &mut MapLayers,
    loading: bool,
) -> HeaderAction {
    let mut action = HeaderAction::default();

    egui::TopBottomPanel::top("header")
        .frame(
            egui::Frame::new()
                .fill(egui::Color32::from_rgb(17, 24, 39))
                .inner_margin(egui::Margin::symmetric(12, 8)),
        )
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.label(
                        egui::RichText::new("Stratospheric Wind Highway")
                            .color(egui::Color32::WHITE)
                            .size(20.0)
                            .strong(),
                    );
                    ui.label(
                        egui::RichText::new("WindBorne balloon constellation and upper-level winds")
                            .color(egui::Color32::from_rgb(150, 150, 150))
                            .size(11.0),
                    );
                });

                ui.add_space(24.0);
                stat(ui, "Total Positions (24h)", stats.total_positions);
                ui.add_space(12.0);
                stat(ui, "Current Balloons", stats.balloons_in_hour);
                ui.add_space(12.0);
                stat(ui, "Wind Samples", stats.wind_samples);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let label = if loading { "Refreshing..." } else { "⟳ Refresh" };
                    if ui
                        .add_enabled(!loading, egui::Button::new(label))
                        .on_hover_text("Fetch the latest 24 hours of data")
                        .clicked()
                    {
                        action.refresh = true;
                    }

                    ui.checkbox(&mut layers.wind, "Wind");
                    ui.checkbox(&mut layers.trails, "Trails");
                });
            });

            ui.add_space(4.0);

            ui.horizontal(|ui| {
                ui.label(
                    egui::RichText::new(format!("Time: {} hours ago", *hours_ago))
                        .color(egui::Color32::from_rgb(200, 200, 200))
                        .monospace(),
                );
                ui.spacing_mut().slider_width = (ui.available_width() - 20.0).max(100.0);
                ui.add(egui::Slider::new(hours_ago, 0..=MAX_HOURS_AGO).show_value(false));
            });
        });

    action
}
