//! Time handling for aligned training examples.
//!
//! All timestamps are UTC. Periods are closed on both ends: a period covers
//! every native sample from `start` to `end` inclusive.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp used throughout the pipeline.
pub type Timestamp = DateTime<Utc>;

/// A closed time period `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePeriod {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimePeriod {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: &Timestamp) -> bool {
        t >= &self.start && t <= &self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Intersection with another period, `None` when disjoint.
    pub fn intersect(&self, other: &TimePeriod) -> Option<TimePeriod> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start <= end {
            Some(TimePeriod::new(start, end))
        } else {
            None
        }
    }

    /// Shrink to the anchors reachable within this period.
    ///
    /// An anchor needs `history` of data behind it and `forecast` ahead of it,
    /// so only `[start + history, end - forecast]` can serve as t0. Returns
    /// `None` when the period is too short to hold a single anchor.
    pub fn reachable_anchors(&self, history: Duration, forecast: Duration) -> Option<TimePeriod> {
        let start = self.start + history;
        let end = self.end - forecast;
        if start <= end {
            Some(TimePeriod::new(start, end))
        } else {
            None
        }
    }

    /// Number of `step`-spaced samples in the period, endpoints included.
    pub fn num_steps(&self, step: Duration) -> i64 {
        if step <= Duration::zero() {
            return 0;
        }
        self.duration().num_seconds() / step.num_seconds() + 1
    }
}

/// All timestamps from `start` to `end` inclusive, spaced by `step`.
pub fn timestamps_between(start: Timestamp, end: Timestamp, step: Duration) -> Vec<Timestamp> {
    let mut out = Vec::new();
    if step <= Duration::zero() {
        return out;
    }
    let mut t = start;
    while t <= end {
        out.push(t);
        t += step;
    }
    out
}

/// Round `t` up to the next multiple of `step` (counted from the Unix epoch).
pub fn snap_up(t: Timestamp, step: Duration) -> Timestamp {
    let step_secs = step.num_seconds();
    if step_secs <= 0 {
        return t;
    }
    let secs = t.timestamp();
    let rem = secs.rem_euclid(step_secs);
    if rem == 0 {
        t
    } else {
        t + Duration::seconds(step_secs - rem)
    }
}

/// Round `t` down to the previous multiple of `step` (counted from the Unix epoch).
pub fn snap_down(t: Timestamp, step: Duration) -> Timestamp {
    let step_secs = step.num_seconds();
    if step_secs <= 0 {
        return t;
    }
    let secs = t.timestamp();
    let rem = secs.rem_euclid(step_secs);
    t - Duration::seconds(rem)
}
