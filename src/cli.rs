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

use clap::Parser;
use serde_json::json;
use std::time::Duration;
use windborne_client::{Client, ClientConfig, RefreshReport};

use crate::app::LaunchOptions;

#[derive(Debug, Parser)]
#[command(about = "Desktop map of the WindBorne balloon constellation and stratospheric winds.")]
pub struct Cli {
    /// Run one refresh cycle, print a JSON summary and exit
    #[arg(long)]
    pub headless: bool,
    /// Skip wind sampling even when an API key is configured
    #[arg(long)]
    pub no_weather: bool,
    /// Initial map zoom level (1-10)
    #[arg(long)]
    pub zoom: Option<f32>,
    /// Refresh automatically every N minutes (overrides config, 0 disables)
    #[arg(long)]
    pub refresh_minutes: Option<u64>,
}

impl Cli {
    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            with_weather: !self.no_weather,
            zoom: self.zoom,
            refresh_interval: self
                .refresh_minutes
                .filter(|m| *m > 0)
                .map(|m| Duration::from_secs(m.saturating_mul(60))),
        }
    }
}

/// Summary of a refresh cycle for headless output
pub fn summarize(report: &RefreshReport) -> serde_json::Value {
    let constellation = &report.constellation;
    let altitude = constellation
        .altitude_range()
        .map(|(min, max)| json!({ "min_km": min, "max_km": max }));

    json!({
        "fetched_at": constellation.fetched_at().to_rfc3339(),
        "hours_loaded": constellation.loaded_hours(),
        "hours_failed": constellation.failed_hours(),
        "total_positions": constellation.len(),
        "current_balloons": constellation.count_at(0),
        "trails": constellation.trails().len(),
        "altitude": altitude,
        "wind": {
            "sampled": report.sampled,
            "requested": report.wind.requested,
            "received": report.wind.samples.len(),
            "samples": report.wind.samples,
        },
        "duration_ms": u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
    })
}

/// Run one cycle on a fresh runtime and print the summary to stdout
pub fn run_headless(config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let client = Client::new(config)?;
    let report = runtime.block_on(client.refresh())?;

    println!("{}", serde_json::to_string_pretty(&summarize(&report))?);
    Ok(())
}
