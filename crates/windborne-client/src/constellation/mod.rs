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

//! Constellation state for one fetch cycle.
//!
//! Holds every position extracted from the hourly snapshots together with the
//! per-hour outcome, and derives the views the map needs: the balloons of a
//! single hour, 24-hour trails and altitude statistics.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::feed::{snapshot_time, BalloonId, BalloonPosition};

/// Longitude jump beyond which two consecutive trail points are treated as
/// crossing the antimeridian.
const ANTIMERIDIAN_JUMP_DEGREES: f64 = 180.0;

/// Outcome of fetching one hourly snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum HourOutcome {
    /// Snapshot parsed; holds the number of positions extracted.
    Loaded(usize),
    /// Snapshot could not be fetched or parsed.
    Failed(String),
}

/// Per-hour bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct HourSnapshot {
    pub hours_ago: u8,
    pub timestamp: DateTime<Utc>,
    pub outcome: HourOutcome,
}

impl HourSnapshot {
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self.outcome, HourOutcome::Loaded(_))
    }
}

/// A single point on a balloon trail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailPoint {
    pub lat: f64,
    pub lon: f64,
    pub altitude: f64,
    pub hours_ago: u8,
}

/// Positions sharing one snapshot index across hours, oldest first.
#[derive(Debug, Clone)]
pub struct Trail {
    /// Snapshot array index shared by every point.
    pub index: usize,
    pub points: Vec<TrailPoint>,
}

impl Trail {
    /// Split the trail into drawable runs, breaking where consecutive points
    /// jump across the antimeridian.
    #[must_use]
    pub fn segments(&self) -> Vec<&[TrailPoint]> {
        let mut segments = Vec::new();
        let mut start = 0;

        for i in 1..self.points.len() {
            let jump = (self.points[i].lon - self.points[i - 1].lon).abs();
            if jump > ANTIMERIDIAN_JUMP_DEGREES {
                segments.push(&self.points[start..i]);
                start = i;
            }
        }
        segments.push(&self.points[start..]);

        segments.retain(|segment| segment.len() >= 2);
        segments
    }
}

/// All balloon positions of one fetch cycle.
#[derive(Debug, Clone)]
pub struct Constellation {
    fetched_at: DateTime<Utc>,
    positions: Vec<BalloonPosition>,
    hours: Vec<HourSnapshot>,
    by_id: HashMap<BalloonId, usize>,
}

impl Constellation {
    /// Create an empty constellation for a cycle started at `fetched_at`.
    #[must_use]
    pub fn new(fetched_at: DateTime<Utc>) -> Self {
        Self {
            fetched_at,
            positions: Vec::new(),
            hours: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    /// Record the outcome of one hourly snapshot.
    ///
    /// Re-inserting an hour replaces its previous positions.
    pub fn insert_hour(&mut self, hours_ago: u8, result: Result<Vec<BalloonPosition>, String>) {
        self.positions.retain(|p| p.hours_ago != hours_ago);
        self.hours.retain(|h| h.hours_ago != hours_ago);

        let outcome = match result {
            Ok(positions) => {
                let count = positions.len();
                self.positions.extend(positions);
                HourOutcome::Loaded(count)
            }
            Err(reason) => HourOutcome::Failed(reason),
        };

        self.hours.push(HourSnapshot {
            hours_ago,
            timestamp: snapshot_time(self.fetched_at, hours_ago),
            outcome,
        });

        self.hours.sort_by_key(|h| h.hours_ago);
        self.positions.sort_by_key(|p| p.id);
        self.by_id = self
            .positions
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id, i))
            .collect();
    }

    /// Time the cycle started; hour timestamps are relative to it.
    #[must_use]
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Every position of the cycle, ordered by hour then index.
    #[must_use]
    pub fn positions(&self) -> &[BalloonPosition] {
        &self.positions
    }

    /// Positions of a single snapshot hour.
    pub fn at_hour(&self, hours_ago: u8) -> impl Iterator<Item = &BalloonPosition> {
        self.positions.iter().filter(move |p| p.hours_ago == hours_ago)
    }

    #[must_use]
    pub fn count_at(&self, hours_ago: u8) -> usize {
        self.at_hour(hours_ago).count()
    }

    #[must_use]
    pub fn get(&self, id: BalloonId) -> Option<&BalloonPosition> {
        self.by_id.get(&id).map(|&i| &self.positions[i])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Per-hour outcomes, ordered by hours ago.
    #[must_use]
    pub fn hours(&self) -> &[HourSnapshot] {
        &self.hours
    }

    #[must_use]
    pub fn loaded_hours(&self) -> usize {
        self.hours.iter().filter(|h| h.is_loaded()).count()
    }

    /// Hours whose snapshot could not be used.
    #[must_use]
    pub fn failed_hours(&self) -> Vec<u8> {
        self.hours
            .iter()
            .filter(|h| !h.is_loaded())
            .map(|h| h.hours_ago)
            .collect()
    }

    /// Group positions by snapshot index into trails ordered oldest first.
    ///
    /// Only groups with at least two points form a trail.
    #[must_use]
    pub fn trails(&self) -> Vec<Trail> {
        let mut groups: BTreeMap<usize, Vec<TrailPoint>> = BTreeMap::new();

        for position in &self.positions {
            groups.entry(position.id.index).or_default().push(TrailPoint {
                lat: position.latitude,
                lon: position.longitude,
                altitude: position.altitude,
                hours_ago: position.hours_ago,
            });
        }

        groups
            .into_iter()
            .filter(|(_, points)| points.len() >= 2)
            .map(|(index, mut points)| {
                points.sort_by(|a, b| b.hours_ago.cmp(&a.hours_ago));
                Trail { index, points }
            })
            .collect()
    }

    /// Trail of a single snapshot index, if it has at least two points.
    #[must_use]
    pub fn trail_for(&self, index: usize) -> Option<Trail> {
        let mut points: Vec<TrailPoint> = self
            .positions
            .iter()
            .filter(|p| p.id.index == index)
            .map(|p| TrailPoint {
                lat: p.latitude,
                lon: p.longitude,
                altitude: p.altitude,
                hours_ago: p.hours_ago,
            })
            .collect();

        if points.len() < 2 {
            return None;
        }

        points.sort_by(|a, b| b.hours_ago.cmp(&a.hours_ago));
        Some(Trail { index, points })
    }

    /// Minimum and maximum altitude across the cycle.
    #[must_use]
    pub fn altitude_range(&self) -> Option<(f64, f64)> {
        self.positions.iter().map(|p| p.altitude).fold(None, |range, alt| {
            Some(match range {
                None => (alt, alt),
                Some((lo, hi)) => (lo.min(alt), hi.max(alt)),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn position(hours_ago: u8, index: usize, lat: f64, lon: f64, altitude: f64) -> BalloonPosition {
        let fetched_at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        BalloonPosition {
            id: BalloonId { hours_ago, index },
            latitude: lat,
            longitude: lon,
            altitude,
            hours_ago,
            timestamp: snapshot_time(fetched_at, hours_ago),
            raw: Vec::new(),
        }
    }

    fn constellation() -> Constellation {
        let mut c = Constellation::new(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap());
        c.insert_hour(
            0,
            Ok(vec![position(0, 0, 10.0, 20.0, 15.0), position(0, 1, -5.0, 100.0, 3.0)]),
        );
        c.insert_hour(1, Ok(vec![position(1, 0, 9.5, 19.0, 14.0)]));
        c.insert_hour(2, Err("HTTP 500".to_string()));
        c.insert_hour(3, Ok(vec![position(3, 0, 9.0, 18.0, 12.0), position(3, 2, 1.0, 1.0, 0.0)]));
        c
    }

    #[test]
    fn test_hour_filter() {
        let c = constellation();
        assert_eq!(c.len(), 5);
        assert_eq!(c.count_at(0), 2);
        assert_eq!(c.count_at(1), 1);
        assert_eq!(c.count_at(2), 0);
        assert!(c.at_hour(3).all(|p| p.hours_ago == 3));
    }

    #[test]
    fn test_failed_hours_tracked() {
        let c = constellation();
        assert_eq!(c.loaded_hours(), 3);
        assert_eq!(c.failed_hours(), vec![2]);
        assert_eq!(c.hours()[2].outcome, HourOutcome::Failed("HTTP 500".to_string()));
    }

    #[test]
    fn test_ids_unique_and_lookup() {
        let c = constellation();
        let mut ids: Vec<_> = c.positions().iter().map(|p| p.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), c.len());

        let found = c.get(BalloonId { hours_ago: 3, index: 2 }).unwrap();
        assert!((found.latitude - 1.0).abs() < 1e-9);
        assert!(c.get(BalloonId { hours_ago: 2, index: 0 }).is_none());
    }

    #[test]
    fn test_trails_grouped_by_index_oldest_first() {
        let c = constellation();
        let trails = c.trails();

        // Index 1 and 2 only appear once, so only index 0 forms a trail
        assert_eq!(trails.len(), 1);
        let trail = &trails[0];
        assert_eq!(trail.index, 0);
        let hours: Vec<u8> = trail.points.iter().map(|p| p.hours_ago).collect();
        assert_eq!(hours, vec![3, 1, 0]);
    }

    #[test]
    fn test_trail_for_single_point_is_none() {
        let c = constellation();
        assert!(c.trail_for(0).is_some());
        assert!(c.trail_for(1).is_none());
    }

    #[test]
    fn test_trail_segments_break_at_antimeridian() {
        let trail = Trail {
            index: 0,
            points: vec![
                TrailPoint { lat: 0.0, lon: 178.0, altitude: 0.0, hours_ago: 3 },
                TrailPoint { lat: 0.0, lon: 179.5, altitude: 0.0, hours_ago: 2 },
                TrailPoint { lat: 0.0, lon: -179.5, altitude: 0.0, hours_ago: 1 },
                TrailPoint { lat: 0.0, lon: -178.0, altitude: 0.0, hours_ago: 0 },
            ],
        };

        let segments = trail.segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].len(), 2);
        assert_eq!(segments[1].len(), 2);
    }

    #[test]
    fn test_reinserting_hour_replaces_positions() {
        let mut c = constellation();
        c.insert_hour(0, Ok(vec![position(0, 5, 0.0, 0.0, 1.0)]));
        assert_eq!(c.count_at(0), 1);
        assert_eq!(c.hours().len(), 4);
    }

    #[test]
    fn test_altitude_range() {
        let c = constellation();
        assert_eq!(c.altitude_range(), Some((0.0, 15.0)));
        assert_eq!(Constellation::new(Utc::now()).altitude_range(), None);
    }
}
