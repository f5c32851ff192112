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

//! Selection of weather sample locations.
//!
//! The weather API is rate limited, so only a sparse subset of the current
//! constellation is sampled and coordinates that round to the same
//! 2-decimal key are requested once.

use std::collections::HashSet;

use crate::feed::BalloonPosition;

/// Default spacing between sampled positions of the current hour.
pub const DEFAULT_SAMPLE_STRIDE: usize = 50;

/// Default maximum number of sampled positions.
pub const DEFAULT_SAMPLE_LIMIT: usize = 20;

/// Latitude/longitude rounded to two decimal places, stored as hundredths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordinateKey {
    lat_hundredths: i64,
    lon_hundredths: i64,
}

impl CoordinateKey {
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat_hundredths: hundredths(lat),
            lon_hundredths: hundredths(lon),
        }
    }
}

/// Hundredths of `value`, rounded from its exact binary value rather than
/// from `value * 100`. "-0.00" parses to 0.
fn hundredths(value: f64) -> i64 {
    let fixed = format!("{value:.2}");
    fixed.replace('.', "").parse().unwrap_or_default()
}

/// Pick sample positions from the current hour.
///
/// Takes every `stride`-th position with `hours_ago == 0` and keeps at most
/// `limit` of them. A stride of 0 is treated as 1.
#[must_use]
pub fn sample_current(positions: &[BalloonPosition], stride: usize, limit: usize) -> Vec<&BalloonPosition> {
    let stride = stride.max(1);
    positions
        .iter()
        .filter(|p| p.hours_ago == 0)
        .step_by(stride)
        .take(limit)
        .collect()
}

/// Collapse positions that share a [`CoordinateKey`].
///
/// The first occurrence of each key wins and its unrounded coordinates are
/// returned, in input order.
#[must_use]
pub fn unique_coordinates<'a, I>(positions: I) -> Vec<(f64, f64)>
where
    I: IntoIterator<Item = &'a BalloonPosition>,
{
    let mut seen = HashSet::new();
    positions
        .into_iter()
        .filter(|p| seen.insert(CoordinateKey::new(p.latitude, p.longitude)))
        .map(|p| (p.latitude, p.longitude))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::BalloonId;
    use chrono::Utc;

    fn position(hours_ago: u8, index: usize, lat: f64, lon: f64) -> BalloonPosition {
        BalloonPosition {
            id: BalloonId { hours_ago, index },
            latitude: lat,
            longitude: lon,
            altitude: 0.0,
            hours_ago,
            timestamp: Utc::now(),
            raw: Vec::new(),
        }
    }

    #[test]
    fn test_dedup_collapses_same_rounded_key() {
        let positions = vec![
            position(0, 0, 12.341, 45.678),
            position(0, 1, 12.344, 45.681),
            position(0, 2, 12.36, 45.68),
        ];

        let unique = unique_coordinates(&positions);
        assert_eq!(unique, vec![(12.341, 45.678), (12.36, 45.68)]);
    }

    #[test]
    fn test_dedup_negative_zero_matches_zero() {
        let positions = vec![position(0, 0, -0.001, 10.0), position(0, 1, 0.001, 10.0)];
        assert_eq!(unique_coordinates(&positions).len(), 1);
    }

    #[test]
    fn test_key_rounds_from_stored_value() {
        // -179.825 is stored as -179.82499999..., so it rounds to -179.82
        assert_eq!(CoordinateKey::new(-179.825, 0.0), CoordinateKey::new(-179.8201, 0.0));
        assert_eq!(CoordinateKey::new(0.0, -179.825), CoordinateKey::new(0.0, -179.8201));
        assert_ne!(CoordinateKey::new(-179.826, 0.0), CoordinateKey::new(-179.8201, 0.0));

        let positions = vec![position(0, 0, -179.825, 10.0), position(0, 1, -179.8201, 10.0)];
        assert_eq!(unique_coordinates(&positions), vec![(-179.825, 10.0)]);
    }

    #[test]
    fn test_dedup_keeps_distinct_keys() {
        let positions = vec![position(0, 0, 1.0, 1.0), position(0, 1, 1.0, -1.0)];
        assert_eq!(unique_coordinates(&positions).len(), 2);
    }

    #[test]
    fn test_sample_current_stride_and_limit() {
        let mut positions: Vec<_> = (0..1200)
            .map(|i| position(0, i, f64::from(u32::try_from(i).unwrap()) / 100.0, 0.0))
            .collect();
        positions.push(position(1, 0, 50.0, 50.0));

        let sampled = sample_current(&positions, DEFAULT_SAMPLE_STRIDE, DEFAULT_SAMPLE_LIMIT);
        assert_eq!(sampled.len(), 20);
        assert_eq!(sampled[0].id.index, 0);
        assert_eq!(sampled[1].id.index, 50);
        assert_eq!(sampled[19].id.index, 950);
    }

    #[test]
    fn test_sample_current_ignores_older_hours() {
        let positions = vec![position(1, 0, 1.0, 1.0), position(2, 0, 2.0, 2.0)];
        assert!(sample_current(&positions, 50, 20).is_empty());
    }

    #[test]
    fn test_sample_current_small_constellation() {
        let positions: Vec<_> = (0..30).map(|i| position(0, i, 0.0, 0.0)).collect();
        let sampled = sample_current(&positions, 50, 20);
        assert_eq!(sampled.len(), 1);
        assert_eq!(sampled[0].id.index, 0);
    }
}
