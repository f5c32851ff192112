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

//! Client library for the WindBorne balloon constellation and sampled winds.
//!
//! The library is split into layers that can be used on their own:
//!
//! - **Feed layer**: parsing of hourly snapshots into [`BalloonPosition`]s
//! - **Constellation layer**: hour filtering, trails and statistics
//! - **Sampling layer**: sparse selection and coordinate deduplication ahead
//!   of the rate-limited weather API
//! - **Fetch layer**: concurrent HTTP requests where individual failures are
//!   logged and dropped
//!
//! # Quick Start
//!
//! ```no_run
//! use windborne_client::{Client, ClientConfig, WeatherSource};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let client = Client::new(ClientConfig {
//!         weather: Some(WeatherSource::new("my-api-key".to_string())),
//!         ..Default::default()
//!     })
//!     .expect("HTTP client");
//!
//!     let report = client.refresh().await.expect("balloon feed");
//!     println!(
//!         "{} positions, {} wind samples",
//!         report.constellation.len(),
//!         report.wind.samples.len()
//!     );
//! }
//! ```
//!
//! ## Feed Layer Only
//!
//! ```
//! use windborne_client::feed::{FeedFormat, TreasureFormat};
//!
//! let positions = TreasureFormat::new()
//!     .parse(b"[[12.5, -45.0, 17.2]]", 0, chrono::Utc::now())
//!     .unwrap();
//! assert_eq!(positions[0].id.to_string(), "0-0");
//! ```

pub mod constellation;
pub mod feed;
pub mod fetch;
pub mod sampling;
pub mod weather;

#[cfg(test)]
mod test_server;

use std::time::{Duration, Instant};

use log::info;
use thiserror::Error;

pub use constellation::{Constellation, HourOutcome, HourSnapshot, Trail, TrailPoint};
pub use feed::{BalloonId, BalloonPosition, FeedFormat, ParseError, TreasureFormat};
pub use fetch::{FeedSource, FetchError, WeatherSource, WindBatch};
pub use sampling::{CoordinateKey, DEFAULT_SAMPLE_LIMIT, DEFAULT_SAMPLE_STRIDE};
pub use weather::{WindBand, WindSample};

/// Errors that abort a whole refresh cycle.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no balloon snapshots could be loaded ({attempted} hours attempted)")]
    NoSnapshots { attempted: u8 },
}

/// Configuration for the full-stack client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Balloon snapshot location.
    pub feed: FeedSource,
    /// Weather API; wind sampling is skipped when `None`.
    pub weather: Option<WeatherSource>,
    /// Spacing between sampled positions of the current hour.
    pub sample_stride: usize,
    /// Maximum number of sampled positions.
    pub sample_limit: usize,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            feed: FeedSource::default(),
            weather: None,
            sample_stride: DEFAULT_SAMPLE_STRIDE,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            request_timeout: Duration::from_secs(20),
        }
    }
}

/// Everything gathered by one refresh cycle.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub constellation: Constellation,
    pub wind: WindBatch,
    /// Coordinates that were selected for sampling before the weather fetch.
    pub sampled: usize,
    /// Wall time of the whole cycle.
    pub duration: Duration,
}

/// Full-stack client that runs fetch cycles.
#[derive(Debug)]
pub struct Client {
    http: reqwest::Client,
    config: ClientConfig,
    format: TreasureFormat,
}

impl Client {
    /// Create a client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("windhighway/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            config,
            format: TreasureFormat::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run one cycle: fetch all snapshots, sample the current hour and fetch
    /// wind for the unique sampled coordinates.
    ///
    /// Fails only when no snapshot hour could be loaded at all.
    pub async fn refresh(&self) -> Result<RefreshReport, ClientError> {
        let started = Instant::now();

        info!("Fetching {} hourly snapshots...", self.config.feed.hours);
        let constellation =
            fetch::fetch_constellation(&self.http, &self.config.feed, &self.format).await;

        if constellation.loaded_hours() == 0 {
            return Err(ClientError::NoSnapshots {
                attempted: self.config.feed.hours,
            });
        }

        info!(
            "Extracted {} balloon positions from {} of {} hours",
            constellation.len(),
            constellation.loaded_hours(),
            self.config.feed.hours
        );

        let sampled = sampling::sample_current(
            constellation.positions(),
            self.config.sample_stride,
            self.config.sample_limit,
        );
        let coordinates = sampling::unique_coordinates(sampled.iter().copied());

        let wind = match &self.config.weather {
            Some(source) if !coordinates.is_empty() => {
                info!("Fetching wind data for {} sample locations...", coordinates.len());
                fetch::fetch_wind_batch(&self.http, source, &coordinates).await
            }
            Some(_) => WindBatch::default(),
            None => {
                info!("No weather API key configured; skipping wind samples");
                WindBatch::default()
            }
        };

        Ok(RefreshReport {
            constellation,
            wind,
            sampled: coordinates.len(),
            duration: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{self, Reply};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Two hours of balloons where the first two current entries share a
    /// rounded coordinate; every wind request is counted.
    async fn feed_and_weather() -> (String, Arc<AtomicUsize>) {
        let wind_requests = Arc::new(AtomicUsize::new(0));
        let counter = wind_requests.clone();
        let base = test_server::serve(move |path| {
            if path.starts_with("/onecall") {
                counter.fetch_add(1, Ordering::SeqCst);
                return Reply::ok(r#"{"current":{"wind_speed":12.0,"wind_deg":270.0}}"#);
            }
            match path {
                "/treasure/00.json" => {
                    Reply::ok("[[10.001, 20.0, 5.0], [10.004, 20.0, 6.0], [30.0, 40.0, 7.0]]")
                }
                "/treasure/01.json" => Reply::ok("[[1.0, 2.0, 3.0]]"),
                _ => Reply::status(404),
            }
        })
        .await;
        (base, wind_requests)
    }

    fn config_for(base: &str, weather: Option<WeatherSource>) -> ClientConfig {
        ClientConfig {
            feed: FeedSource {
                base_url: format!("{base}/treasure"),
                proxy_prefix: None,
                hours: 2,
            },
            weather,
            sample_stride: 1,
            request_timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.feed.hours, 24);
        assert_eq!(config.sample_stride, 50);
        assert_eq!(config.sample_limit, 20);
        assert!(config.weather.is_none());
    }

    #[tokio::test]
    async fn test_refresh_fails_when_no_hour_loads() {
        let client = Client::new(ClientConfig {
            feed: FeedSource {
                base_url: "http://127.0.0.1:9/treasure".to_string(),
                proxy_prefix: None,
                hours: 2,
            },
            request_timeout: Duration::from_secs(2),
            ..Default::default()
        })
        .unwrap();

        let result = client.refresh().await;
        assert!(matches!(result, Err(ClientError::NoSnapshots { attempted: 2 })));
    }

    #[tokio::test]
    async fn test_refresh_samples_dedups_and_fetches_wind() {
        let (base, wind_requests) = feed_and_weather().await;
        let weather = WeatherSource {
            base_url: format!("{base}/onecall"),
            api_key: "KEY".to_string(),
        };
        let client = Client::new(config_for(&base, Some(weather))).unwrap();

        let report = client.refresh().await.unwrap();

        assert_eq!(report.constellation.len(), 4);
        assert_eq!(report.constellation.loaded_hours(), 2);
        assert_eq!(report.sampled, 2);
        assert_eq!(report.wind.requested, 2);
        assert_eq!(wind_requests.load(Ordering::SeqCst), 2);

        let lats: Vec<_> = report.wind.samples.iter().map(|s| s.latitude).collect();
        assert_eq!(lats, vec![10.001, 30.0]);
        assert_eq!(report.wind.samples[0].band(), WindBand::Breezy);
    }

    #[tokio::test]
    async fn test_refresh_without_key_skips_wind() {
        let (base, wind_requests) = feed_and_weather().await;
        let client = Client::new(config_for(&base, None)).unwrap();

        let report = client.refresh().await.unwrap();

        assert_eq!(report.constellation.len(), 4);
        assert_eq!(report.sampled, 2);
        assert!(report.wind.samples.is_empty());
        assert_eq!(report.wind.requested, 0);
        assert_eq!(wind_requests.load(Ordering::SeqCst), 0);
    }
}
