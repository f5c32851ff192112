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

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use windborne_client::RefreshReport;

const MAX_DIAGNOSTICS: usize = 50;

/// State of the refresh pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedStatus {
    Idle,
    Fetching,
    Ready,
    Error,
}

/// Diagnostic message with timestamp
#[derive(Debug, Clone)]
pub struct DiagnosticMessage {
    pub timestamp: DateTime<Utc>,
    pub level: DiagnosticLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

/// System status tracking fetch metrics and diagnostics
#[derive(Debug)]
pub struct SystemStatus {
    pub feed_status: FeedStatus,
    pub refresh_count: u64,
    pub last_refresh_started: Option<DateTime<Utc>>,
    pub last_refresh_completed: Option<DateTime<Utc>>,

    // Snapshot statistics from the last successful cycle
    pub hours_loaded: usize,
    pub hours_failed: Vec<u8>,
    pub total_positions: usize,
    /// Positions per snapshot, oldest hour first
    pub hour_counts: Vec<usize>,

    // Weather statistics from the last successful cycle
    pub weather_enabled: bool,
    pub weather_key_source: Option<&'static str>,
    pub wind_requested: usize,
    pub wind_received: usize,

    // Tile source in use
    pub tile_source: &'static str,

    // Diagnostic messages (keep last 50)
    pub diagnostics: VecDeque<DiagnosticMessage>,

    // Performance metrics
    pub last_refresh_duration_ms: f64,
    pub average_refresh_duration_ms: f64,
}

impl Default for SystemStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemStatus {
    pub fn new() -> Self {
        Self {
            feed_status: FeedStatus::Idle,
            refresh_count: 0,
            last_refresh_started: None,
            last_refresh_completed: None,

            hours_loaded: 0,
            hours_failed: Vec::new(),
            total_positions: 0,
            hour_counts: Vec::new(),

            weather_enabled: false,
            weather_key_source: None,
            wind_requested: 0,
            wind_received: 0,

            tile_source: "",

            diagnostics: VecDeque::with_capacity(MAX_DIAGNOSTICS),

            last_refresh_duration_ms: 0.0,
            average_refresh_duration_ms: 0.0,
        }
    }

    /// Mark the start of a refresh cycle
    pub fn refresh_started(&mut self) {
        self.feed_status = FeedStatus::Fetching;
        self.last_refresh_started = Some(Utc::now());
        self.add_diagnostic(DiagnosticLevel::Info, "Fetching balloon constellation...".to_string());
    }

    /// Record the statistics of a completed cycle
    pub fn refresh_succeeded(&mut self, report: &RefreshReport) {
        let constellation = &report.constellation;

        self.feed_status = FeedStatus::Ready;
        self.refresh_count += 1;
        self.last_refresh_completed = Some(Utc::now());
        self.hours_loaded = constellation.loaded_hours();
        self.hours_failed = constellation.failed_hours();
        self.total_positions = constellation.len();
        self.hour_counts = constellation
            .hours()
            .iter()
            .rev()
            .map(|h| constellation.count_at(h.hours_ago))
            .collect();
        self.wind_requested = report.wind.requested;
        self.wind_received = report.wind.samples.len();
        self.update_performance(report.duration.as_secs_f64() * 1000.0);

        self.add_diagnostic(
            DiagnosticLevel::Info,
            format!(
                "Loaded {} positions from {} hours",
                self.total_positions, self.hours_loaded
            ),
        );

        if !self.hours_failed.is_empty() {
            let hours: Vec<String> = self.hours_failed.iter().map(|h| format!("{h:02}")).collect();
            self.add_diagnostic(
                DiagnosticLevel::Warning,
                format!("Snapshots unavailable for hours {}", hours.join(", ")),
            );
        }

        if report.wind.requested > 0 {
            let level = if report.wind.failed() > 0 {
                DiagnosticLevel::Warning
            } else {
                DiagnosticLevel::Info
            };
            self.add_diagnostic(
                level,
                format!(
                    "Wind samples: {} of {} locations",
                    report.wind.samples.len(),
                    report.wind.requested
                ),
            );
        }
    }

    /// Record a cycle that could not load any balloon data
    pub fn refresh_failed(&mut self, error: &str) {
        self.feed_status = FeedStatus::Error;
        self.last_refresh_completed = Some(Utc::now());
        self.add_diagnostic(DiagnosticLevel::Error, format!("Refresh failed: {error}"));
    }

    /// Add a diagnostic message
    pub fn add_diagnostic(&mut self, level: DiagnosticLevel, message: String) {
        let diagnostic = DiagnosticMessage {
            timestamp: Utc::now(),
            level,
            message,
        };

        self.diagnostics.push_back(diagnostic);

        // Keep only the last N messages
        while self.diagnostics.len() > MAX_DIAGNOSTICS {
            self.diagnostics.pop_front();
        }
    }

    /// Update performance metrics
    pub fn update_performance(&mut self, duration_ms: f64) {
        self.last_refresh_duration_ms = duration_ms;

        // Simple moving average
        const ALPHA: f64 = 0.3; // Smoothing factor
        if self.average_refresh_duration_ms == 0.0 {
            self.average_refresh_duration_ms = duration_ms;
        } else {
            self.average_refresh_duration_ms =
                ALPHA * duration_ms + (1.0 - ALPHA) * self.average_refresh_duration_ms;
        }
    }

    /// Seconds since the last completed refresh
    pub fn seconds_since_refresh(&self) -> Option<i64> {
        self.last_refresh_completed
            .map(|t| (Utc::now() - t).num_seconds())
    }
}

/// Thread-safe wrapper for SystemStatus
pub type SharedSystemStatus = Arc<Mutex<SystemStatus>>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use windborne_client::{Constellation, WindBatch};

    fn report() -> RefreshReport {
        let mut constellation = Constellation::new(Utc::now());
        constellation.insert_hour(0, Ok(Vec::new()));
        constellation.insert_hour(1, Err("HTTP 404".to_string()));
        RefreshReport {
            constellation,
            wind: WindBatch {
                samples: Vec::new(),
                requested: 2,
            },
            sampled: 2,
            duration: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_diagnostics_capped() {
        let mut status = SystemStatus::new();
        for i in 0..(MAX_DIAGNOSTICS + 10) {
            status.add_diagnostic(DiagnosticLevel::Info, format!("message {i}"));
        }
        assert_eq!(status.diagnostics.len(), MAX_DIAGNOSTICS);
        assert_eq!(status.diagnostics.front().unwrap().message, "message 10");
    }

    #[test]
    fn test_refresh_succeeded_records_stats() {
        let mut status = SystemStatus::new();
        status.refresh_started();
        status.refresh_succeeded(&report());

        assert_eq!(status.feed_status, FeedStatus::Ready);
        assert_eq!(status.refresh_count, 1);
        assert_eq!(status.hours_loaded, 1);
        assert_eq!(status.hours_failed, vec![1]);
        assert_eq!(status.hour_counts, vec![0, 0]);
        assert_eq!(status.wind_requested, 2);
        assert_eq!(status.wind_received, 0);
        assert!((status.last_refresh_duration_ms - 1500.0).abs() < 1e-6);
        assert!(status
            .diagnostics
            .iter()
            .any(|d| d.level == DiagnosticLevel::Warning && d.message.contains("01")));
    }

    #[test]
    fn test_refresh_failed() {
        let mut status = SystemStatus::new();
        status.refresh_failed("no balloon snapshots could be loaded");
        assert_eq!(status.feed_status, FeedStatus::Error);
        assert_eq!(status.diagnostics.back().unwrap().level, DiagnosticLevel::Error);
    }

    #[test]
    fn test_moving_average() {
        let mut status = SystemStatus::new();
        status.update_performance(1000.0);
        status.update_performance(2000.0);
        assert!((status.average_refresh_duration_ms - 1300.0).abs() < 1e-6);
    }
}
