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

//! Application configuration management.
//!
//! This module handles persistent configuration storage using TOML format.
//! API credentials may also come from the environment, which takes
//! precedence over the stored values.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use windborne_client::{ClientConfig, FeedSource, WeatherSource};

const APP_NAME: &str = "windhighway-desktop";
const CONFIG_NAME: &str = "config";

/// Environment variable holding the OpenWeatherMap API key
pub const OPENWEATHERMAP_ENV: &str = "OPENWEATHERMAP_API_KEY";

/// Environment variable holding the Mapbox access token
pub const MAPBOX_ENV: &str = "MAPBOX_TOKEN";

/// Where a credential was resolved from, for display in the status pane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    ConfigFile,
}

impl CredentialSource {
    pub fn label(self) -> &'static str {
        match self {
            CredentialSource::Environment => "environment variable",
            CredentialSource::ConfigFile => "config file",
        }
    }
}

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    /// Directory URL of the hourly balloon snapshots
    #[serde(default = "default_feed_base_url")]
    pub feed_base_url: String,

    /// Optional prefix prepended to each snapshot URL (e.g. a CORS proxy)
    #[serde(default)]
    pub feed_proxy: Option<String>,

    /// Sample every Nth balloon of the current hour for wind data
    #[serde(default = "default_sample_stride")]
    pub sample_stride: usize,

    /// Maximum number of wind sample locations per refresh
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Automatic refresh interval in minutes (0 = manual only)
    #[serde(default)]
    pub auto_refresh_minutes: u64,

    /// Default map zoom level (1.0 - 10.0)
    #[serde(default = "default_zoom")]
    pub default_zoom: f32,

    /// Initial map center latitude
    #[serde(default = "default_center_lat")]
    pub center_latitude: f64,

    /// Initial map center longitude
    #[serde(default)]
    pub center_longitude: f64,

    /// Draw 24-hour balloon trails
    #[serde(default = "default_true")]
    pub show_trails: bool,

    /// Draw wind markers
    #[serde(default = "default_true")]
    pub show_wind: bool,

    /// OpenWeatherMap API key (optional, env var takes precedence)
    #[serde(default)]
    pub openweathermap_api_key: Option<String>,

    /// Mapbox access token (optional, env var takes precedence)
    #[serde(default)]
    pub mapbox_token: Option<String>,
}

// Default value functions for serde
fn default_feed_base_url() -> String {
    windborne_client::fetch::DEFAULT_FEED_BASE_URL.to_string()
}

fn default_sample_stride() -> usize {
    windborne_client::DEFAULT_SAMPLE_STRIDE
}

fn default_sample_limit() -> usize {
    windborne_client::DEFAULT_SAMPLE_LIMIT
}

fn default_request_timeout_secs() -> u64 {
    20
}

fn default_zoom() -> f32 {
    2.0
}

fn default_center_lat() -> f64 {
    20.0
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feed_base_url: default_feed_base_url(),
            feed_proxy: None,
            sample_stride: default_sample_stride(),
            sample_limit: default_sample_limit(),
            request_timeout_secs: default_request_timeout_secs(),
            auto_refresh_minutes: 0,
            default_zoom: default_zoom(),
            center_latitude: default_center_lat(),
            center_longitude: 0.0,
            show_trails: true,
            show_wind: true,
            openweathermap_api_key: None,
            mapbox_token: None,
        }
    }
}

/// Prefer a non-empty environment value, then a non-empty configured value
fn resolve(env_value: Option<String>, config_value: Option<&str>) -> Option<(String, CredentialSource)> {
    if let Some(key) = env_value.filter(|k| !k.is_empty()) {
        return Some((key, CredentialSource::Environment));
    }

    config_value
        .filter(|s| !s.is_empty())
        .map(|s| (s.to_owned(), CredentialSource::ConfigFile))
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults on first run
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Resolve the OpenWeatherMap API key from environment variable or config
    pub fn weather_api_key(&self) -> Option<(String, CredentialSource)> {
        resolve(
            std::env::var(OPENWEATHERMAP_ENV).ok(),
            self.openweathermap_api_key.as_deref(),
        )
    }

    /// Resolve the Mapbox token from environment variable or config
    pub fn mapbox_token(&self) -> Option<(String, CredentialSource)> {
        resolve(std::env::var(MAPBOX_ENV).ok(), self.mapbox_token.as_deref())
    }

    /// Zoom level clamped to the range the map supports
    pub fn clamped_zoom(&self) -> f32 {
        self.default_zoom.clamp(crate::map::MIN_ZOOM, crate::map::MAX_ZOOM)
    }

    /// Build the fetch client configuration
    ///
    /// `with_weather` lets the caller disable wind sampling even when a key
    /// is available.
    pub fn client_config(&self, with_weather: bool) -> ClientConfig {
        let weather = if with_weather {
            self.weather_api_key().map(|(key, _)| WeatherSource::new(key))
        } else {
            None
        };

        ClientConfig {
            feed: FeedSource {
                base_url: self.feed_base_url.clone(),
                proxy_prefix: self.feed_proxy.clone().filter(|p| !p.is_empty()),
                ..Default::default()
            },
            weather,
            sample_stride: self.sample_stride,
            sample_limit: self.sample_limit,
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
        }
    }

    /// Automatic refresh interval, if enabled
    pub fn auto_refresh_interval(&self) -> Option<Duration> {
        (self.auto_refresh_minutes > 0)
            .then(|| Duration::from_secs(self.auto_refresh_minutes.saturating_mul(60)))
    }
}
