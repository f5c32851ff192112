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

//! Feed format layer for balloon constellation snapshots.
//!
//! This module provides a trait-based abstraction over the hourly snapshot
//! format. The WindBorne "treasure" format (a JSON array of
//! `[lat, lon, altitude]` tuples) is the only implementation today.

mod treasure;

pub use treasure::TreasureFormat;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while parsing a snapshot.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("unexpected snapshot shape: expected an array, found {0}")]
    UnexpectedShape(&'static str),
}

/// Identifier of a balloon position, derived from the snapshot hour and the
/// entry's index in that hour's array.
///
/// Unique within a single fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BalloonId {
    /// Snapshot offset in hours (0 = current hour).
    pub hours_ago: u8,
    /// Index of the entry within the snapshot array.
    pub index: usize,
}

impl fmt::Display for BalloonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.hours_ago, self.index)
    }
}

/// A single balloon position extracted from an hourly snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalloonPosition {
    pub id: BalloonId,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in kilometres (0 when the feed omits it).
    pub altitude: f64,
    /// Snapshot offset in hours.
    pub hours_ago: u8,
    /// Fetch time minus `hours_ago`.
    pub timestamp: DateTime<Utc>,
    /// Raw tuple as it appeared in the feed.
    pub raw: Vec<serde_json::Value>,
}

/// Derive the timestamp of a snapshot taken `hours_ago` hours before `fetched_at`.
#[must_use]
pub fn snapshot_time(fetched_at: DateTime<Utc>, hours_ago: u8) -> DateTime<Utc> {
    fetched_at - chrono::Duration::hours(i64::from(hours_ago))
}

/// Trait for snapshot formats.
///
/// Implement this trait to support a different constellation feed layout.
pub trait FeedFormat {
    /// The error type for parsing failures.
    type Error;

    /// Parse the raw bytes of one hourly snapshot into positions.
    ///
    /// Malformed entries are skipped; only a snapshot that cannot be read at
    /// all yields an error.
    fn parse(
        &self,
        input: &[u8],
        hours_ago: u8,
        fetched_at: DateTime<Utc>,
    ) -> Result<Vec<BalloonPosition>, Self::Error>;
}
