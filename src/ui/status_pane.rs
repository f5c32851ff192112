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

use crate::status::{DiagnosticLevel, FeedStatus, SystemStatus};

const LABEL_COLOR: egui::Color32 = egui::Color32::from_rgb(130, 130, 130);
const VALUE_COLOR: egui::Color32 = egui::Color32::from_rgb(200, 200, 200);
const SECTION_COLOR: egui::Color32 = egui::Color32::from_rgb(150, 150, 150);

#[derive(Debug)]
pub struct StatusPane {
    pub visible: bool,
    pub collapsed: bool,
}

impl Default for StatusPane {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusPane {
    pub fn new() -> Self {
        Self {
            visible: true,
            collapsed: false,
        }
    }

    /// Render the status pane as a floating window
    pub fn render(&mut self, ctx: &egui::Context, status: &SystemStatus) {
        if !self.visible {
            // Small button to re-open the pane when hidden
            egui::Window::new("show_status")
                .title_bar(false)
                .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(10.0, -10.0))
                .fixed_size(egui::vec2(140.0, 35.0))
                .resizable(false)
                .frame(pane_frame(ctx, 200))
                .show(ctx, |ui| {
                    if ui
                        .button(
                            egui::RichText::new("📊 Show Status")
                                .color(egui::Color32::from_rgb(150, 200, 220))
                                .size(11.0),
                        )
                        .clicked()
                    {
                        self.visible = true;
                    }
                });
            return;
        }

        let screen_height = ctx.screen_rect().height();

        egui::Window::new("System Status")
            .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(10.0, -10.0))
            .fixed_size(egui::vec2(
                280.0,
                if self.collapsed { 40.0 } else { screen_height.min(460.0) },
            ))
            .resizable(false)
            .collapsible(false)
            .frame(pane_frame(ctx, 230))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new("◈ STATUS")
                            .color(egui::Color32::from_rgb(100, 180, 220))
                            .size(12.0)
                            .strong(),
                    );

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui
                            .button(
                                egui::RichText::new("✕")
                                    .size(12.0)
                                    .color(egui::Color32::from_rgb(200, 100, 100)),
                            )
                            .on_hover_text("Hide status pane")
                            .clicked()
                        {
                            self.visible = false;
                        }

                        ui.add_space(4.0);

                        let collapse_icon = if self.collapsed { "▼" } else { "▲" };
                        if ui
                            .button(egui::RichText::new(collapse_icon).size(10.0))
                            .on_hover_text(if self.collapsed { "Expand" } else { "Collapse" })
                            .clicked()
                        {
                            self.collapsed = !self.collapsed;
                        }
                    });
                });

                if self.collapsed {
                    return;
                }

                ui.separator();

                egui::ScrollArea::vertical()
                    .max_height(screen_height.min(410.0))
                    .show(ui, |ui| {
                        render_feed_section(ui, status);
                        ui.add_space(6.0);
                        render_snapshot_section(ui, status);
                        ui.add_space(6.0);
                        render_weather_section(ui, status);
                        ui.add_space(6.0);
                        render_diagnostics_section(ui, status);
                    });
            });
    }
}

fn pane_frame(ctx: &egui::Context, alpha: u8) -> egui::Frame {
    egui::Frame::window(&ctx.style())
        .fill(egui::Color32::from_rgba_unmultiplied(25, 30, 35, alpha))
        .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(60, 80, 100)))
        .corner_radius(6.0)
}

fn section_title(ui: &mut egui::Ui, title: &str) {
    ui.label(egui::RichText::new(title).color(SECTION_COLOR).size(10.0).strong());
    ui.add_space(3.0);
}

fn key_value(ui: &mut egui::Ui, key: &str, value: impl Into<String>, color: egui::Color32) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(key).color(LABEL_COLOR).size(9.0));
        ui.label(egui::RichText::new(value).color(color).size(9.0).monospace());
    });
}

fn render_feed_section(ui: &mut egui::Ui, status: &SystemStatus) {
    section_title(ui, "FEED");

    ui.horizontal(|ui| {
        let (color, text, icon) = match status.feed_status {
            FeedStatus::Ready => (egui::Color32::from_rgb(100, 255, 100), "READY", "●"),
            FeedStatus::Fetching => (egui::Color32::from_rgb(255, 200, 100), "FETCHING", "◐"),
            FeedStatus::Idle => (egui::Color32::from_rgb(150, 150, 150), "IDLE", "○"),
            FeedStatus::Error => (egui::Color32::from_rgb(255, 100, 100), "ERROR", "✕"),
        };

        ui.label(egui::RichText::new(icon).color(color).size(10.0));
        ui.label(egui::RichText::new(text).color(color).size(10.0).monospace().strong());
    });

    if let Some(seconds) = status.seconds_since_refresh() {
        key_value(ui, "Updated:", format!("{} ago", format_duration(seconds.unsigned_abs())), VALUE_COLOR);
    }

    key_value(ui, "Refreshes:", status.refresh_count.to_string(), VALUE_COLOR);

    if status.refresh_count > 0 {
        let color = if status.average_refresh_duration_ms < 5_000.0 {
            egui::Color32::from_rgb(100, 255, 100)
        } else if status.average_refresh_duration_ms < 15_000.0 {
            egui::Color32::from_rgb(255, 200, 100)
        } else {
            egui::Color32::from_rgb(255, 100, 100)
        };
        key_value(
            ui,
            "Cycle:",
            format!(
                "{:.1}s (avg {:.1}s)",
                status.last_refresh_duration_ms / 1000.0,
                status.average_refresh_duration_ms / 1000.0
            ),
            color,
        );
    }

    key_value(ui, "Basemap:", status.tile_source, VALUE_COLOR);
}

fn render_snapshot_section(ui: &mut egui::Ui, status: &SystemStatus) {
    section_title(ui, "SNAPSHOTS");

    let hours_color = if status.hours_failed.is_empty() {
        VALUE_COLOR
    } else {
        egui::Color32::from_rgb(255, 200, 100)
    };
    key_value(
        ui,
        "Hours:",
        format!("{} loaded / {} missing", status.hours_loaded, status.hours_failed.len()),
        hours_color,
    );
    key_value(ui, "Positions:", status.total_positions.to_string(), VALUE_COLOR);

    ui.horizontal(|ui| {
        ui.label(egui::RichText::new("-24h").color(LABEL_COLOR).size(8.0));
        render_sparkline(ui, &status.hour_counts);
        ui.label(egui::RichText::new("now").color(LABEL_COLOR).size(8.0));
    });
}

/// Positions per hour, oldest on the left; missing hours drop to the baseline
#[allow(clippy::cast_precision_loss, reason = "counts are far below f32 precision limits")]
fn render_sparkline(ui: &mut egui::Ui, counts: &[usize]) {
    let width = 180.0;
    let height = 18.0;

    let (rect, _response) = ui.allocate_exact_size(egui::vec2(width, height), egui::Sense::hover());

    if counts.len() < 2 {
        return;
    }

    let max = counts.iter().copied().max().unwrap_or(1).max(1) as f32;
    let last = (counts.len() - 1) as f32;

    let points: Vec<egui::Pos2> = counts
        .iter()
        .enumerate()
        .map(|(i, count)| {
            let x = rect.min.x + (i as f32 / last) * width;
            let y = rect.max.y - (*count as f32 / max) * height;
            egui::pos2(x, y)
        })
        .collect();

    ui.painter().add(egui::Shape::line(
        points,
        egui::Stroke::new(1.5, egui::Color32::from_rgb(100, 220, 220)),
    ));
}

fn render_weather_section(ui: &mut egui::Ui, status: &SystemStatus) {
    section_title(ui, "WEATHER");

    ui.horizontal(|ui| {
        let (icon, color) = if status.weather_enabled {
            ("✓", egui::Color32::from_rgb(100, 255, 100))
        } else {
            ("○", egui::Color32::from_rgb(150, 150, 150))
        };
        ui.label(egui::RichText::new(icon).color(color).size(10.0));
        ui.label(egui::RichText::new("API key:").color(LABEL_COLOR).size(9.0));

        let source = status.weather_key_source.unwrap_or("not configured");
        ui.label(egui::RichText::new(source).color(VALUE_COLOR).size(8.0).monospace());
    });

    if status.weather_enabled {
        let color = if status.wind_received < status.wind_requested {
            egui::Color32::from_rgb(255, 200, 100)
        } else {
            VALUE_COLOR
        };
        key_value(
            ui,
            "Wind:",
            format!("{} of {} locations", status.wind_received, status.wind_requested),
            color,
        );
    }
}

fn render_diagnostics_section(ui: &mut egui::Ui, status: &SystemStatus) {
    section_title(ui, "DIAGNOSTICS");

    if status.diagnostics.is_empty() {
        ui.label(
            egui::RichText::new("No messages")
                .color(egui::Color32::from_rgb(100, 100, 100))
                .size(8.0)
                .italics(),
        );
        return;
    }

    let line_height = 14.0;
    let max_visible_lines = 6.0;

    egui::ScrollArea::vertical()
        .id_salt("diagnostics")
        .max_height(line_height * max_visible_lines)
        .auto_shrink([false, true])
        .show(ui, |ui| {
            // Newest first
            for diagnostic in status.diagnostics.iter().rev() {
                ui.horizontal(|ui| {
                    let (icon, color) = match diagnostic.level {
                        DiagnosticLevel::Info => ("ℹ", egui::Color32::from_rgb(100, 180, 255)),
                        DiagnosticLevel::Warning => ("⚠", egui::Color32::from_rgb(255, 200, 100)),
                        DiagnosticLevel::Error => ("✕", egui::Color32::from_rgb(255, 100, 100)),
                    };

                    ui.label(egui::RichText::new(icon).color(color).size(9.0));

                    let time_str = diagnostic.timestamp.format("%H:%M:%S").to_string();
                    ui.label(
                        egui::RichText::new(time_str)
                            .color(egui::Color32::from_rgb(100, 100, 100))
                            .size(8.0)
                            .monospace(),
                    );

                    ui.label(
                        egui::RichText::new(truncate(&diagnostic.message, 30))
                            .color(egui::Color32::from_rgb(180, 180, 180))
                            .size(8.0),
                    )
                    .on_hover_text(&diagnostic.message);
                });
            }
        });
}

/// Shorten to `max_chars` characters, respecting char boundaries
fn truncate(message: &str, max_chars: usize) -> String {
    match message.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &message[..idx]),
        None => message.to_string(),
    }
}

fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(5), "5s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(3725), "1h 2m 5s");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("short", 30), "short");
        assert_eq!(truncate("ééééé", 3), "ééé...");
    }
}
