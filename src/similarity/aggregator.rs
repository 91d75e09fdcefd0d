//! Per-unit comparison of two submissions

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::differ::LineDiffer;
use crate::canonical::SubmissionUnits;

/// Diff result for one unit name shared by both submissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitComparison {
    pub name: String,
    pub mismatch: usize,
    pub length: usize,
}

impl UnitComparison {
    pub fn matched(&self) -> usize {
        self.length - self.mismatch
    }
}

/// Breakdown of a pairwise comparison
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PairComparison {
    /// Shared units in name order
    pub units: Vec<UnitComparison>,
}

impl PairComparison {
    pub fn total_matched(&self) -> usize {
        self.units.iter().map(UnitComparison::matched).sum()
    }

    pub fn total_length(&self) -> usize {
        self.units.iter().map(|u| u.length).sum()
    }

    /// Length-weighted match fraction; 0.0 when nothing is shared
    pub fn score(&self) -> f64 {
        let length = self.total_length();
        if length == 0 {
            return 0.0;
        }
        self.total_matched() as f64 / length as f64
    }
}

/// Compares the units present in both submissions. Units only one side
/// defines are ignored.
pub fn compare_units(differ: &LineDiffer, a: &SubmissionUnits, b: &SubmissionUnits) -> PairComparison {
    let units = a
        .iter()
        .filter_map(|unit| {
            let other = b.get(&unit.name)?;
            let outcome = differ.diff(&unit.lines, &other.lines);
            debug!(
                "Unit '{}': mismatch {} of {}",
                unit.name, outcome.mismatch, outcome.length
            );
            Some(UnitComparison {
                name: unit.name.clone(),
                mismatch: outcome.mismatch,
                length: outcome.length,
            })
        })
        .collect();

    PairComparison { units }
}

/// Similarity score of two submissions with the default differ
pub fn similarity(a: &SubmissionUnits, b: &SubmissionUnits) -> f64 {
    compare_units(&LineDiffer::default(), a, b).score()
}
