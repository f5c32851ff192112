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

//! HTTP fetch layer for the balloon and weather feeds.
//!
//! Every request of a batch is spawned onto the current tokio runtime and the
//! batch is awaited as a whole. A failed request is logged and left out of the
//! result; there is no retry, cancellation or backpressure.

use std::fmt;

use chrono::Utc;
use log::{debug, warn};
use thiserror::Error;
use tokio::task::JoinSet;

use crate::constellation::Constellation;
use crate::feed::FeedFormat;
use crate::weather::{OneCallResponse, WindSample};

/// Public WindBorne treasure endpoint.
pub const DEFAULT_FEED_BASE_URL: &str = "https://a.windbornesystems.com/treasure";

/// OpenWeatherMap One Call 3.0 endpoint.
pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/3.0/onecall";

/// Number of hourly snapshots published by the feed.
pub const SNAPSHOT_HOURS: u8 = 24;

/// Errors from a single HTTP request.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),
}

/// Location of the hourly constellation snapshots.
#[derive(Debug, Clone)]
pub struct FeedSource {
    /// Directory URL holding `00.json` .. `23.json`.
    pub base_url: String,
    /// Prefix prepended verbatim to every snapshot URL (e.g. a CORS proxy).
    pub proxy_prefix: Option<String>,
    /// Number of hours to fetch, starting at the current hour.
    pub hours: u8,
}

impl Default for FeedSource {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FEED_BASE_URL.to_string(),
            proxy_prefix: None,
            hours: SNAPSHOT_HOURS,
        }
    }
}

impl FeedSource {
    /// URL of the snapshot taken `hours_ago` hours before now.
    #[must_use]
    pub fn hour_url(&self, hours_ago: u8) -> String {
        format!(
            "{}{}/{:02}.json",
            self.proxy_prefix.as_deref().unwrap_or_default(),
            self.base_url.trim_end_matches('/'),
            hours_ago
        )
    }
}

/// Weather API endpoint and credentials.
#[derive(Clone)]
pub struct WeatherSource {
    pub base_url: String,
    pub api_key: String,
}

impl fmt::Debug for WeatherSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherSource")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl WeatherSource {
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            base_url: DEFAULT_WEATHER_BASE_URL.to_string(),
            api_key,
        }
    }

    /// Request URL for current conditions at a coordinate, in metric units.
    #[must_use]
    pub fn url(&self, lat: f64, lon: f64) -> String {
        format!(
            "{}?lat={}&lon={}&appid={}&units=metric",
            self.base_url, lat, lon, self.api_key
        )
    }
}

/// Result of a batch weather fetch.
#[derive(Debug, Clone, Default)]
pub struct WindBatch {
    /// Successful samples, in request order.
    pub samples: Vec<WindSample>,
    /// Number of coordinates requested.
    pub requested: usize,
}

impl WindBatch {
    #[must_use]
    pub fn failed(&self) -> usize {
        self.requested - self.samples.len()
    }
}

async fn fetch_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, FetchError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    Ok(response.bytes().await?.to_vec())
}

/// Fetch every hourly snapshot concurrently and collect them into a
/// [`Constellation`].
///
/// Hours that fail to download or parse are recorded as failed and
/// contribute no positions.
pub async fn fetch_constellation<F>(
    client: &reqwest::Client,
    source: &FeedSource,
    format: &F,
) -> Constellation
where
    F: FeedFormat,
    F::Error: fmt::Display,
{
    let fetched_at = Utc::now();
    let mut tasks = JoinSet::new();

    for hours_ago in 0..source.hours {
        let client = client.clone();
        let url = source.hour_url(hours_ago);
        tasks.spawn(async move { (hours_ago, fetch_bytes(&client, &url).await) });
    }

    let mut constellation = Constellation::new(fetched_at);

    while let Some(joined) = tasks.join_next().await {
        let (hours_ago, result) = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Snapshot task aborted: {}", e);
                continue;
            }
        };

        let parsed = match result {
            Ok(bytes) => format
                .parse(&bytes, hours_ago, fetched_at)
                .map_err(|e| format!("parse error: {e}")),
            Err(e) => Err(e.to_string()),
        };

        match &parsed {
            Ok(positions) => debug!("Hour {:02}: {} positions", hours_ago, positions.len()),
            Err(reason) => warn!("Failed to fetch hour {:02}: {}", hours_ago, reason),
        }

        constellation.insert_hour(hours_ago, parsed);
    }

    // An aborted task leaves its hour unrecorded
    for hours_ago in 0..source.hours {
        if !constellation.hours().iter().any(|h| h.hours_ago == hours_ago) {
            constellation.insert_hour(hours_ago, Err("task aborted".to_string()));
        }
    }

    constellation
}

/// Fetch current conditions at one coordinate.
pub async fn fetch_wind(
    client: &reqwest::Client,
    source: &WeatherSource,
    lat: f64,
    lon: f64,
) -> Result<WindSample, FetchError> {
    // The URL carries the API key, so it is stripped from transport errors
    let response = client
        .get(source.url(lat, lon))
        .send()
        .await
        .map_err(reqwest::Error::without_url)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    let body: OneCallResponse = response.json().await.map_err(reqwest::Error::without_url)?;
    Ok(body.into_sample(lat, lon))
}

/// Fetch current conditions for every coordinate concurrently.
///
/// Failed requests are logged and dropped; successful samples keep the order
/// of `coordinates`.
pub async fn fetch_wind_batch(
    client: &reqwest::Client,
    source: &WeatherSource,
    coordinates: &[(f64, f64)],
) -> WindBatch {
    let mut tasks = JoinSet::new();

    for (i, &(lat, lon)) in coordinates.iter().enumerate() {
        let client = client.clone();
        let source = source.clone();
        tasks.spawn(async move { (i, fetch_wind(&client, &source, lat, lon).await) });
    }

    let mut slots: Vec<Option<WindSample>> = vec![None; coordinates.len()];

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((i, Ok(sample))) => slots[i] = Some(sample),
            Ok((i, Err(e))) => {
                let (lat, lon) = coordinates[i];
                warn!("Failed to fetch wind data for {:.2}, {:.2}: {}", lat, lon, e);
            }
            Err(e) => warn!("Wind task aborted: {}", e),
        }
    }

    WindBatch {
        samples: slots.into_iter().flatten().collect(),
        requested: coordinates.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constellation::HourOutcome;
    use crate::feed::TreasureFormat;
    use crate::test_server::{self, Reply};
    use std::time::Duration;

    fn http_client() -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    fn wind_body(speed: f64) -> String {
        format!(r#"{{"current":{{"wind_speed":{speed},"wind_deg":90.0,"temp":-50.0}}}}"#)
    }

    #[test]
    fn test_hour_url_zero_padded() {
        let source = FeedSource::default();
        assert_eq!(
            source.hour_url(0),
            "https://a.windbornesystems.com/treasure/00.json"
        );
        assert_eq!(
            source.hour_url(23),
            "https://a.windbornesystems.com/treasure/23.json"
        );
    }

    #[test]
    fn test_hour_url_with_proxy_and_trailing_slash() {
        let source = FeedSource {
            base_url: "https://example.com/treasure/".to_string(),
            proxy_prefix: Some("https://corsproxy.io/?".to_string()),
            hours: 24,
        };
        assert_eq!(
            source.hour_url(7),
            "https://corsproxy.io/?https://example.com/treasure/07.json"
        );
    }

    #[test]
    fn test_weather_url() {
        let source = WeatherSource::new("KEY".to_string());
        assert_eq!(
            source.url(12.5, -45.25),
            "https://api.openweathermap.org/data/3.0/onecall?lat=12.5&lon=-45.25&appid=KEY&units=metric"
        );
    }

    #[test]
    fn test_weather_source_debug_redacts_key() {
        let source = WeatherSource::new("secret-key".to_string());
        let debug = format!("{source:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_wind_batch_failed_count() {
        let batch = WindBatch {
            samples: Vec::new(),
            requested: 3,
        };
        assert_eq!(batch.failed(), 3);
    }

    #[tokio::test]
    async fn test_unreachable_feed_marks_every_hour_failed() {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let source = FeedSource {
            base_url: "http://127.0.0.1:9/treasure".to_string(),
            proxy_prefix: None,
            hours: 3,
        };

        let constellation = fetch_constellation(&client, &source, &TreasureFormat::new()).await;

        assert!(constellation.is_empty());
        assert_eq!(constellation.hours().len(), 3);
        assert_eq!(constellation.failed_hours(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_unreachable_weather_drops_samples() {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let source = WeatherSource {
            base_url: "http://127.0.0.1:9/onecall".to_string(),
            api_key: "KEY".to_string(),
        };

        let batch = fetch_wind_batch(&client, &source, &[(1.0, 2.0), (3.0, 4.0)]).await;

        assert!(batch.samples.is_empty());
        assert_eq!(batch.requested, 2);
        assert_eq!(batch.failed(), 2);
    }

    #[tokio::test]
    async fn test_mixed_hours_record_each_outcome() {
        let base = test_server::serve(|path| match path {
            "/treasure/00.json" => Reply::ok("[[10.0, 20.0, 15.0], [11.0, 21.0, 16.5]]"),
            "/treasure/01.json" => Reply::ok(r#"{"x": 1}"#),
            "/treasure/02.json" => Reply::status(500),
            _ => Reply::status(404),
        })
        .await;
        let source = FeedSource {
            base_url: format!("{base}/treasure"),
            proxy_prefix: None,
            hours: 4,
        };

        let constellation = fetch_constellation(&http_client(), &source, &TreasureFormat::new()).await;

        assert_eq!(constellation.len(), 2);
        assert_eq!(constellation.loaded_hours(), 1);
        assert_eq!(constellation.failed_hours(), vec![1, 2, 3]);

        let outcomes: Vec<_> = constellation.hours().iter().map(|h| h.outcome.clone()).collect();
        assert_eq!(outcomes[0], HourOutcome::Loaded(2));
        assert!(matches!(&outcomes[1], HourOutcome::Failed(reason) if reason.starts_with("parse error")));
        assert_eq!(outcomes[2], HourOutcome::Failed("HTTP status 500".to_string()));
        assert_eq!(outcomes[3], HourOutcome::Failed("HTTP status 404".to_string()));

        let first = &constellation.positions()[0];
        assert_eq!(first.id.hours_ago, 0);
        assert!((first.latitude - 10.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_wind_batch_keeps_request_order() {
        let base = test_server::serve(|path| {
            if path.contains("lat=1&") {
                Reply::ok(wind_body(1.5)).delayed(Duration::from_millis(300))
            } else if path.contains("lat=3&") {
                Reply::status(500)
            } else {
                Reply::ok(wind_body(25.0))
            }
        })
        .await;
        let source = WeatherSource {
            base_url: format!("{base}/onecall"),
            api_key: "KEY".to_string(),
        };

        let batch = fetch_wind_batch(&http_client(), &source, &[(1.0, 7.5), (3.0, 7.5), (5.0, 7.5)]).await;

        assert_eq!(batch.requested, 3);
        assert_eq!(batch.failed(), 1);
        let order: Vec<_> = batch.samples.iter().map(|s| (s.latitude, s.wind_speed)).collect();
        assert_eq!(order, vec![(1.0, 1.5), (5.0, 25.0)]);
        assert!((batch.samples[0].wind_deg - 90.0).abs() < f64::EPSILON);
        assert!((batch.samples[1].temperature + 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_wind_status_error_omits_key() {
        let base = test_server::serve(|_| Reply::status(401)).await;
        let source = WeatherSource {
            base_url: format!("{base}/onecall"),
            api_key: "secret-key".to_string(),
        };

        let err = fetch_wind(&http_client(), &source, 1.0, 2.0).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(401)));
        assert!(!err.to_string().contains("secret-key"));
    }
}
