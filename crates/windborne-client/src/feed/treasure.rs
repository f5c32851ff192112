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

//! WindBorne treasure snapshot parser.
//!
//! Each hourly file is a JSON array of balloon tuples:
//! ```text
//! [[<lat>, <lon>, <altitude_km>], [<lat>, <lon>, <altitude_km>], ...]
//! ```
//! The public files are occasionally corrupted, so individual tuples are
//! validated and skipped rather than failing the whole hour.

use chrono::{DateTime, Utc};
use log::debug;
use serde_json::Value;

use super::{snapshot_time, BalloonId, BalloonPosition, FeedFormat, ParseError};

/// Parser for the WindBorne treasure snapshot format.
#[derive(Debug, Default, Clone, Copy)]
pub struct TreasureFormat;

impl TreasureFormat {
    /// Create a new treasure parser.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FeedFormat for TreasureFormat {
    type Error = ParseError;

    fn parse(
        &self,
        input: &[u8],
        hours_ago: u8,
        fetched_at: DateTime<Utc>,
    ) -> Result<Vec<BalloonPosition>, ParseError> {
        let value: Value = serde_json::from_slice(input)?;
        let entries = value
            .as_array()
            .ok_or_else(|| ParseError::UnexpectedShape(json_kind(&value)))?;

        let timestamp = snapshot_time(fetched_at, hours_ago);
        let mut positions = Vec::with_capacity(entries.len());
        let mut skipped = 0usize;

        for (index, entry) in entries.iter().enumerate() {
            match parse_tuple(entry) {
                Some((latitude, longitude, altitude)) => positions.push(BalloonPosition {
                    id: BalloonId { hours_ago, index },
                    latitude,
                    longitude,
                    altitude,
                    hours_ago,
                    timestamp,
                    raw: entry.as_array().cloned().unwrap_or_default(),
                }),
                None => skipped += 1,
            }
        }

        debug!(
            "Hour {:02}: extracted {} balloons ({} malformed entries skipped)",
            hours_ago,
            positions.len(),
            skipped
        );

        Ok(positions)
    }
}

/// Read a finite number, rejecting nulls, strings and NaN/inf.
fn finite(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite())
}

/// Extract `(lat, lon, altitude)` from one tuple.
fn parse_tuple(entry: &Value) -> Option<(f64, f64, f64)> {
    let tuple = entry.as_array()?;
    if tuple.len() < 2 {
        return None;
    }

    let latitude = finite(&tuple[0]).filter(|lat| (-90.0..=90.0).contains(lat))?;
    let longitude = finite(&tuple[1]).filter(|lon| (-180.0..=180.0).contains(lon))?;
    let altitude = tuple.get(2).and_then(finite).unwrap_or(0.0);

    Some((latitude, longitude, altitude))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
