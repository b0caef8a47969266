//! Anchor (t0) selection from joint windows.

use chrono::Duration;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use pipeline_common::{PipelineError, PipelineResult, TimePeriod, Timestamp};

/// How the anchor timestamp is drawn from the joint windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorMode {
    /// Training: sample a window with probability proportional to its number
    /// of valid steps, then a step uniformly within it. Deterministic for a
    /// fixed seed.
    Random { seed: u64 },
    /// Live inference: the latest valid anchor across all windows.
    MostRecent,
}

/// Select a single anchor from `windows` on the `reference` cadence grid.
///
/// Fails with [`PipelineError::NoValidAnchor`] when `windows` is empty. Use
/// [`AnchorIter`] to walk every valid anchor instead.
pub fn select_anchor(
    windows: &[TimePeriod],
    mode: AnchorMode,
    reference: Duration,
) -> PipelineResult<Timestamp> {
    if windows.is_empty() {
        return Err(PipelineError::NoValidAnchor);
    }
    match mode {
        AnchorMode::MostRecent => windows
            .iter()
            .map(|w| w.end)
            .max()
            .ok_or(PipelineError::NoValidAnchor),
        AnchorMode::Random { seed } => {
            let total: i64 = windows.iter().map(|w| w.num_steps(reference)).sum();
            if total <= 0 {
                return Err(PipelineError::NoValidAnchor);
            }
            // A uniform index over the concatenated steps weights each window
            // by its step count.
            let mut rng = StdRng::seed_from_u64(seed);
            let mut idx = rng.gen_range(0..total);
            for w in windows {
                let steps = w.num_steps(reference);
                if idx < steps {
                    return Ok(w.start + Duration::seconds(reference.num_seconds() * idx));
                }
                idx -= steps;
            }
            unreachable!("index {idx} exceeds total step count {total}")
        }
    }
}

/// Lazy, restartable iterator over every valid anchor, ascending in time.
///
/// Used for exhaustive validation/test splits. Empty windows yield an empty
/// iterator rather than an error.
#[derive(Debug, Clone)]
pub struct AnchorIter {
    windows: Vec<TimePeriod>,
    reference: Duration,
    window_idx: usize,
    next: Option<Timestamp>,
}

impl AnchorIter {
    pub fn new(mut windows: Vec<TimePeriod>, reference: Duration) -> Self {
        windows.sort_unstable_by_key(|w| w.start);
        let next = windows.first().map(|w| w.start);
        Self {
            windows,
            reference,
            window_idx: 0,
            next,
        }
    }

    /// Rewind to the first anchor.
    pub fn restart(&mut self) {
        self.window_idx = 0;
        self.next = self.windows.first().map(|w| w.start);
    }
}

impl Iterator for AnchorIter {
    type Item = Timestamp;

    fn next(&mut self) -> Option<Timestamp> {
        let current = self.next?;
        let window = &self.windows[self.window_idx];
        let following = current + self.reference;
        if following <= window.end {
            self.next = Some(following);
        } else {
            self.window_idx += 1;
            self.next = self.windows.get(self.window_idx).map(|w| w.start);
        }
        Some(current)
    }
}
