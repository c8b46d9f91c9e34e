use std::collections::BTreeMap;

use serde::Serialize;

use crate::dispatch::{PairOutcome, PairStatus};
use crate::types::ShapeKey;

/// Per-shape counts over one dispatch.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ShapeTally {
    pub shape_index: usize,
    pub shape_key: ShapeKey,
    pub validated: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub bytes: usize,
    /// Share of this shape's pairs that failed (`0.0` when it had none).
    pub failure_share: f64,
}

/// Group pair outcomes by shape, ordered by shape index.
pub fn tally_by_shape(outcomes: &[PairOutcome]) -> Vec<ShapeTally> {
    let mut tallies: BTreeMap<usize, ShapeTally> = BTreeMap::new();
    for outcome in outcomes {
        let tally = tallies
            .entry(outcome.shape_index)
            .or_insert_with(|| ShapeTally {
                shape_index: outcome.shape_index,
                shape_key: outcome.shape_key.clone(),
                ..ShapeTally::default()
            });
        match &outcome.status {
            PairStatus::Validated { bytes } => {
                tally.validated += 1;
                tally.bytes += bytes;
            }
            PairStatus::Failed { timed_out, .. } => {
                tally.failed += 1;
                if *timed_out {
                    tally.timed_out += 1;
                }
            }
        }
    }
    tallies
        .into_values()
        .map(|mut tally| {
            let total = tally.validated + tally.failed;
            tally.failure_share = if total == 0 {
                0.0
            } else {
                tally.failed as f64 / total as f64
            };
            tally
        })
        .collect()
}
