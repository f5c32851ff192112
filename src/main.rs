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

mod app;
mod cli;
mod config;
mod loader;
mod map;
mod status;
mod ui;

use clap::Parser;
use log::{error, info, warn};

use crate::app::WindHighwayApp;
use crate::cli::Cli;
use crate::config::AppConfig;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn load_config() -> AppConfig {
    match AppConfig::load() {
        Ok(config) => {
            if let Ok(path) = AppConfig::get_config_path() {
                info!("Loaded config from {}", path.display());
            }
            config
        }
        Err(e) => {
            warn!("Failed to load config, using defaults: {}", e);
            AppConfig::default()
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::parse();
    let config = load_config();

    if args.headless {
        let client_config = config.client_config(!args.no_weather);
        if let Err(e) = cli::run_headless(client_config) {
            error!("Headless refresh failed: {}", e);
            return Err(e);
        }
        return Ok(());
    }

    info!("Starting Wind Highway Desktop...");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 800.0])
            .with_title("Stratospheric Wind Highway"),
        ..Default::default()
    };

    let launch = args.launch_options();
    eframe::run_native(
        "Wind Highway Desktop",
        options,
        Box::new(move |cc| Ok(Box::new(WindHighwayApp::new(cc, config, launch)))),
    )?;

    Ok(())
}
