//! Line diff of two canonical sequences

use serde::{Deserialize, Serialize};
use similar::{capture_diff_slices, group_diff_ops, Algorithm, DiffOp, DiffTag};
use std::fmt;

/// Diff algorithm used to build the edit script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAlgorithm {
    #[default]
    Myers,
    Patience,
    Lcs,
}

impl DiffAlgorithm {
    fn to_similar(self) -> Algorithm {
        match self {
            DiffAlgorithm::Myers => Algorithm::Myers,
            DiffAlgorithm::Patience => Algorithm::Patience,
            DiffAlgorithm::Lcs => Algorithm::Lcs,
        }
    }
}

impl fmt::Display for DiffAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffAlgorithm::Myers => write!(f, "myers"),
            DiffAlgorithm::Patience => write!(f, "patience"),
            DiffAlgorithm::Lcs => write!(f, "lcs"),
        }
    }
}

impl std::str::FromStr for DiffAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "myers" => Ok(DiffAlgorithm::Myers),
            "patience" => Ok(DiffAlgorithm::Patience),
            "lcs" => Ok(DiffAlgorithm::Lcs),
            other => Err(format!("unknown diff algorithm '{other}'")),
        }
    }
}

/// Outcome of [`LineDiffer::diff`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiffOutcome {
    /// Lines of the reference sequence that were replaced or deleted
    pub mismatch: usize,
    /// Length of the reference sequence
    pub length: usize,
}

impl DiffOutcome {
    pub fn matched(&self) -> usize {
        self.length - self.mismatch
    }
}

/// Symmetric line differ
#[derive(Debug, Clone, Copy, Default)]
pub struct LineDiffer {
    algorithm: DiffAlgorithm,
}

impl LineDiffer {
    pub fn new(algorithm: DiffAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> DiffAlgorithm {
        self.algorithm
    }

    /// Lines of `old` touched by replace or delete operations when turning
    /// it into `new`. Pure insertions cost nothing in this direction.
    pub fn one_sided_mismatch(&self, old: &[String], new: &[String]) -> usize {
        let ops = capture_diff_slices(self.algorithm.to_similar(), old, new);
        group_diff_ops(ops, 0)
            .iter()
            .flatten()
            .filter(|op| matches!(op.tag(), DiffTag::Replace | DiffTag::Delete))
            .map(|op: &DiffOp| op.old_range().len())
            .sum()
    }

    /// Diffs in both directions and keeps the smaller mismatch, paired with
    /// the length of the sequence it was measured against. On a tie the
    /// longer sequence is the reference, so the result does not depend on
    /// argument order.
    pub fn diff(&self, a: &[String], b: &[String]) -> DiffOutcome {
        let a_to_b = self.one_sided_mismatch(a, b);
        let b_to_a = self.one_sided_mismatch(b, a);

        if a_to_b < b_to_a {
            DiffOutcome {
                mismatch: a_to_b,
                length: a.len(),
            }
        } else if b_to_a < a_to_b {
            DiffOutcome {
                mismatch: b_to_a,
                length: b.len(),
            }
        } else {
            DiffOutcome {
                mismatch: a_to_b,
                length: a.len().max(b.len()),
            }
        }
    }
}

/// Diff with the default algorithm
pub fn diff(a: &[String], b: &[String]) -> DiffOutcome {
    LineDiffer::default().diff(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_identical_sequences() {
        let a = seq(&["x", "y", "z"]);
        assert_eq!(diff(&a, &a), DiffOutcome { mismatch: 0, length: 3 });
    }

    #[test]
    fn test_empty_sequences() {
        assert_eq!(diff(&[], &[]), DiffOutcome { mismatch: 0, length: 0 });
    }

    #[test]
    fn test_single_replaced_line() {
        let outcome = diff(&seq(&["Return(value=Constant(1))"]), &seq(&["Return(value=Constant(2))"]));
        assert_eq!(outcome, DiffOutcome { mismatch: 1, length: 1 });
        assert_eq!(outcome.matched(), 0);
    }

    #[test]
    fn test_insertions_are_free_in_one_direction() {
        let short = seq(&["a", "b"]);
        let long = seq(&["a", "x", "b", "y"]);
        let differ = LineDiffer::default();
        assert_eq!(differ.one_sided_mismatch(&short, &long), 0);
        assert_eq!(differ.one_sided_mismatch(&long, &short), 2);
        assert_eq!(differ.diff(&short, &long), DiffOutcome { mismatch: 0, length: 2 });
        assert_eq!(differ.diff(&long, &short), DiffOutcome { mismatch: 0, length: 2 });
    }

    #[test]
    fn test_diff_is_symmetric() {
        let a = seq(&["p", "q"]);
        let b = seq(&["r", "q", "s"]);
        assert_eq!(diff(&a, &b), diff(&b, &a));

        let c = seq(&["p", "q"]);
        let d = seq(&["r", "s"]);
        assert_eq!(diff(&c, &d), DiffOutcome { mismatch: 2, length: 2 });
        assert_eq!(diff(&d, &c), DiffOutcome { mismatch: 2, length: 2 });
    }

    #[test]
    fn test_algorithms_agree_on_simple_input() {
        let a = seq(&["a", "b", "c", "d"]);
        let b = seq(&["a", "c", "d", "e"]);
        for algorithm in [DiffAlgorithm::Myers, DiffAlgorithm::Patience, DiffAlgorithm::Lcs] {
            let outcome = LineDiffer::new(algorithm).diff(&a, &b);
            assert_eq!(outcome.mismatch, 1, "{algorithm}");
            assert_eq!(outcome.length, 4, "{algorithm}");
        }
    }

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!("Patience".parse::<DiffAlgorithm>(), Ok(DiffAlgorithm::Patience));
        assert!("fast".parse::<DiffAlgorithm>().is_err());
    }
}
