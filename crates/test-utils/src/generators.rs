//! Generators for synthetic timestamp sets and series.
//!
//! Tests across the workspace build availability patterns (regular cadences,
//! deliberate gaps) from these helpers so the expected contiguous periods are
//! easy to read off the test body.

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Timestamp at `hour:minute` on the fixed reference day (2022-01-01).
pub fn ts(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 1, 1, hour, minute, 0).unwrap()
}

/// `count` timestamps starting at `start`, spaced by `step`.
pub fn regular_timestamps(
    start: DateTime<Utc>,
    step: Duration,
    count: usize,
) -> Vec<DateTime<Utc>> {
    (0..count).map(|i| start + step * i as i32).collect()
}

/// A regular timestamp run with the samples in `missing` removed.
///
/// Positions are indices into the regular run, so a test can say "drop the
/// 3rd and 4th sample" without computing wall-clock values.
pub fn timestamps_with_gap(
    start: DateTime<Utc>,
    step: Duration,
    count: usize,
    missing: &[usize],
) -> Vec<DateTime<Utc>> {
    regular_timestamps(start, step, count)
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !missing.contains(i))
        .map(|(_, t)| t)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_timestamps() {
        let times = regular_timestamps(ts(0, 0), Duration::minutes(30), 3);
        assert_eq!(times, vec![ts(0, 0), ts(0, 30), ts(1, 0)]);
    }

    #[test]
    fn test_timestamps_with_gap() {
        let times = timestamps_with_gap(ts(0, 0), Duration::minutes(30), 5, &[2]);
        assert_eq!(times, vec![ts(0, 0), ts(0, 30), ts(1, 30), ts(2, 0)]);
    }

}
