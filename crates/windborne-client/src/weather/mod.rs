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

//! Wind observations at sampled balloon locations.
//!
//! Maps the OpenWeatherMap One Call `current` block onto [`WindSample`].

use serde::{Deserialize, Serialize};

/// Wind speed above which a sample counts as breezy (m/s).
pub const BREEZY_THRESHOLD_MS: f64 = 10.0;

/// Wind speed above which a sample counts as strong (m/s).
pub const STRONG_THRESHOLD_MS: f64 = 20.0;

/// Current conditions at one coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Wind speed in m/s.
    pub wind_speed: f64,
    /// Direction the wind blows from, degrees clockwise from north.
    pub wind_deg: f64,
    /// Gust speed in m/s.
    pub wind_gust: f64,
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Sea-level pressure in hPa.
    pub pressure: f64,
}

impl WindSample {
    #[must_use]
    pub fn band(&self) -> WindBand {
        WindBand::classify(self.wind_speed)
    }
}

/// Speed bands used for marker colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindBand {
    /// Up to 10 m/s.
    Calm,
    /// Above 10 and up to 20 m/s.
    Breezy,
    /// Above 20 m/s.
    Strong,
}

impl WindBand {
    #[must_use]
    pub fn classify(speed_ms: f64) -> Self {
        if speed_ms > STRONG_THRESHOLD_MS {
            Self::Strong
        } else if speed_ms > BREEZY_THRESHOLD_MS {
            Self::Breezy
        } else {
            Self::Calm
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Calm => "< 10 m/s",
            Self::Breezy => "10-20 m/s",
            Self::Strong => "> 20 m/s",
        }
    }
}

/// One Call response; only the `current` block is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OneCallResponse {
    #[serde(default)]
    pub current: Option<CurrentConditions>,
}

/// `current` block of a One Call response. Absent fields read as zero.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrentConditions {
    #[serde(default)]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub wind_deg: Option<f64>,
    #[serde(default)]
    pub wind_gust: Option<f64>,
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
}

impl OneCallResponse {
    /// Build a sample for the requested coordinate.
    ///
    /// The requested coordinate is kept rather than the one echoed by the
    /// API, so markers sit exactly on the sampled balloon.
    #[must_use]
    pub fn into_sample(self, latitude: f64, longitude: f64) -> WindSample {
        let current = self.current.unwrap_or_default();
        WindSample {
            latitude,
            longitude,
            wind_speed: current.wind_speed.unwrap_or(0.0),
            wind_deg: current.wind_deg.unwrap_or(0.0),
            wind_gust: current.wind_gust.unwrap_or(0.0),
            temperature: current.temp.unwrap_or(0.0),
            pressure: current.pressure.unwrap_or(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_mapping() {
        let body = r#"{
            "lat": 12.34, "lon": 56.78,
            "current": {
                "temp": -42.5, "pressure": 1012, "wind_speed": 14.2,
                "wind_deg": 270, "wind_gust": 19.1
            }
        }"#;
        let response: OneCallResponse = serde_json::from_str(body).unwrap();
        let sample = response.into_sample(12.341, 56.779);

        assert!((sample.latitude - 12.341).abs() < 1e-9);
        assert!((sample.wind_speed - 14.2).abs() < 1e-9);
        assert!((sample.wind_deg - 270.0).abs() < 1e-9);
        assert!((sample.wind_gust - 19.1).abs() < 1e-9);
        assert!((sample.temperature - (-42.5)).abs() < 1e-9);
        assert!((sample.pressure - 1012.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let response: OneCallResponse =
            serde_json::from_str(r#"{"current": {"wind_speed": 3.0}}"#).unwrap();
        let sample = response.into_sample(0.0, 0.0);
        assert!((sample.wind_speed - 3.0).abs() < 1e-9);
        assert!(sample.wind_gust.abs() < f64::EPSILON);
        assert!(sample.pressure.abs() < f64::EPSILON);

        let empty: OneCallResponse = serde_json::from_str("{}").unwrap();
        let sample = empty.into_sample(1.0, 2.0);
        assert!(sample.wind_speed.abs() < f64::EPSILON);
        assert!((sample.longitude - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_wind_bands() {
        assert_eq!(WindBand::classify(0.0), WindBand::Calm);
        assert_eq!(WindBand::classify(10.0), WindBand::Calm);
        assert_eq!(WindBand::classify(10.1), WindBand::Breezy);
        assert_eq!(WindBand::classify(20.0), WindBand::Breezy);
        assert_eq!(WindBand::classify(25.0), WindBand::Strong);
    }
}
