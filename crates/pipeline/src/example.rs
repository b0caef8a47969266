//! Examples and batches.

use std::collections::BTreeMap;

use pipeline_common::{PipelineError, PipelineResult, SourceKey, Timestamp};
use sources::TimeArray;

use normalizer::{stack_arrays, BatchArray};

/// One aligned, normalized training or inference example.
#[derive(Debug, Clone)]
pub struct Example {
    /// The anchor (t0) separating history from forecast.
    pub anchor: Timestamp,
    /// One array per active modality.
    pub arrays: BTreeMap<SourceKey, TimeArray>,
}

/// A batch of examples, stacked per modality.
#[derive(Debug, Clone)]
pub struct Batch {
    pub anchors: Vec<Timestamp>,
    pub arrays: BTreeMap<SourceKey, BatchArray>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// Collate examples into one batch.
///
/// Every example must carry the same modalities with the same shapes.
pub fn collate(examples: Vec<Example>) -> PipelineResult<Batch> {
    let first = examples.first().ok_or(PipelineError::NoValidAnchor)?;
    let keys: Vec<SourceKey> = first.arrays.keys().copied().collect();

    let mut arrays = BTreeMap::new();
    for key in keys {
        let per_example: Vec<TimeArray> = examples
            .iter()
            .map(|e| {
                e.arrays.get(&key).cloned().ok_or_else(|| PipelineError::ShapeMismatch {
                    expected: vec![],
                    got: vec![],
                })
            })
            .collect::<PipelineResult<_>>()?;
        arrays.insert(key, stack_arrays(&per_example)?);
    }

    Ok(Batch {
        anchors: examples.iter().map(|e| e.anchor).collect(),
        arrays,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use test_utils::{regular_timestamps, ts};

    fn example(anchor: Timestamp, value: f32) -> Example {
        let arr = TimeArray::new(
            regular_timestamps(anchor - Duration::minutes(60), Duration::minutes(30), 3),
            vec!["total".into()],
            vec![3, 1],
            vec![value; 3],
        )
        .unwrap();
        let mut arrays = BTreeMap::new();
        arrays.insert(SourceKey::Gsp, arr);
        Example { anchor, arrays }
    }

    #[test]
    fn test_collate_keeps_anchor_order() {
        let batch = collate(vec![example(ts(3, 0), 1.0), example(ts(5, 0), 2.0)]).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.anchors, vec![ts(3, 0), ts(5, 0)]);
        let gsp = &batch.arrays[&SourceKey::Gsp];
        assert_eq!(gsp.dims, vec![2, 3, 1]);
        assert_eq!(gsp.example(1), &[2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_collate_empty_fails() {
        assert!(matches!(
            collate(vec![]).unwrap_err(),
            PipelineError::NoValidAnchor
        ));
    }

    #[test]
    fn test_collate_missing_modality_fails() {
        let a = example(ts(3, 0), 1.0);
        let mut b = example(ts(5, 0), 2.0);
        b.arrays.clear();
        assert!(matches!(
            collate(vec![a, b]).unwrap_err(),
            PipelineError::ShapeMismatch { .. }
        ));
    }
}
