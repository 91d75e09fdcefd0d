/*!
# Similarity scoring

- `differ`: symmetric line diff of two canonical sequences
- `aggregator`: length-weighted score over the units two submissions share
- `matrix`: all-pairs scores for one task
*/

pub mod aggregator;
pub mod differ;
pub mod matrix;

pub use aggregator::{compare_units, similarity, PairComparison, UnitComparison};
pub use differ::{diff, DiffAlgorithm, DiffOutcome, LineDiffer};
pub use matrix::{MatrixBuilder, SimilarityMatrix, Submission};
