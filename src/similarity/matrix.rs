/*!
# Similarity Matrix

Every submission of a task is canonicalised once, then every unordered
pair is compared. The matrix is returned only when it is complete.
*/

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use super::aggregator::compare_units;
use super::differ::LineDiffer;
use crate::canonical::{Canonicalizer, SubmissionUnits};
use crate::config::{CanonicalConfig, SimilarityConfig};
use crate::core::SimilarityError;

/// One student's source for one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub student: String,
    pub task: String,
    pub source: String,
}

impl Submission {
    pub fn new(student: impl Into<String>, task: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            student: student.into(),
            task: task.into(),
            source: source.into(),
        }
    }
}

/// Square, symmetric score table labelled by student. Only built by
/// [`MatrixBuilder`], so `values` always holds `labels.len()²` entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityMatrix {
    labels: Vec<String>,
    /// Row-major, `labels.len()²` entries
    values: Vec<f64>,
}

impl SimilarityMatrix {
    /// Matrix with 1.0 on the diagonal and 0.0 elsewhere
    pub fn identity(labels: Vec<String>) -> Self {
        let n = labels.len();
        let mut values = vec![0.0; n * n];
        for i in 0..n {
            values[i * n + i] = 1.0;
        }
        Self { labels, values }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.len() + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        let n = self.len();
        &self.values[i * n..(i + 1) * n]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks(0) паникует, пустая матрица не имеет строк
        self.values.chunks(self.len().max(1))
    }

    /// Writes both `M[i][j]` and `M[j][i]`
    fn set_pair(&mut self, i: usize, j: usize, value: f64) {
        let n = self.len();
        self.values[i * n + j] = value;
        self.values[j * n + i] = value;
    }

    pub fn is_symmetric(&self) -> bool {
        let n = self.len();
        (0..n).all(|i| (0..n).all(|j| self.get(i, j) == self.get(j, i)))
    }

    /// Off-diagonal pairs `(i, j, score)` with `i < j` and score at or above
    /// `threshold`, highest first
    pub fn pairs_above(&self, threshold: f64) -> Vec<(usize, usize, f64)> {
        let n = self.len();
        let mut pairs: Vec<(usize, usize, f64)> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .map(|(i, j)| (i, j, self.get(i, j)))
            .filter(|(_, _, score)| *score >= threshold)
            .collect();
        pairs.sort_by(|a, b| b.2.total_cmp(&a.2).then(a.0.cmp(&b.0)).then(a.1.cmp(&b.1)));
        pairs
    }
}

/// Builds a [`SimilarityMatrix`] for the submissions of one task
#[derive(Debug, Clone)]
pub struct MatrixBuilder {
    canonicalizer: Canonicalizer,
    differ: LineDiffer,
    parallel: bool,
}

impl Default for MatrixBuilder {
    fn default() -> Self {
        Self::new(CanonicalConfig::default(), &SimilarityConfig::default())
    }
}

impl MatrixBuilder {
    pub fn new(canonical: CanonicalConfig, similarity: &SimilarityConfig) -> Self {
        Self {
            canonicalizer: Canonicalizer::new(canonical),
            differ: LineDiffer::new(similarity.algorithm),
            parallel: similarity.parallel,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn canonicalizer(&self) -> &Canonicalizer {
        &self.canonicalizer
    }

    pub fn differ(&self) -> &LineDiffer {
        &self.differ
    }

    /// Canonicalisation result of every submission, in input order
    fn canonicalize_each(&self, submissions: &[Submission]) -> Vec<Result<SubmissionUnits, SimilarityError>> {
        let canonicalize = |submission: &Submission| {
            self.canonicalizer
                .canonicalize(&submission.source)
                .map_err(|e| SimilarityError::submission(&submission.student, e))
        };

        if self.parallel {
            submissions.par_iter().map(canonicalize).collect()
        } else {
            submissions.iter().map(canonicalize).collect()
        }
    }

    /// Canonicalises every submission. Fails on the first submission, in
    /// input order, that does not parse.
    pub fn canonicalize_all(&self, submissions: &[Submission]) -> Result<Vec<SubmissionUnits>, SimilarityError> {
        self.canonicalize_each(submissions).into_iter().collect()
    }

    /// Canonicalises, then fills the matrix
    pub fn build(&self, submissions: &[Submission]) -> Result<SimilarityMatrix, SimilarityError> {
        let units = self.canonicalize_all(submissions)?;
        let labels = submissions.iter().map(|s| s.student.clone()).collect();
        Ok(self.build_from_units(labels, &units))
    }

    /// Like [`build`](Self::build), but submissions that do not parse are
    /// left out of the matrix. Each source is parsed once; the parse errors
    /// of the dropped submissions are returned alongside.
    pub fn build_skipping_unparsable(&self, submissions: &[Submission]) -> (SimilarityMatrix, Vec<SimilarityError>) {
        let mut labels = Vec::with_capacity(submissions.len());
        let mut units = Vec::with_capacity(submissions.len());
        let mut skipped = Vec::new();

        for (submission, result) in submissions.iter().zip(self.canonicalize_each(submissions)) {
            match result {
                Ok(u) => {
                    labels.push(submission.student.clone());
                    units.push(u);
                }
                Err(e) => skipped.push(e),
            }
        }

        (self.build_from_units(labels, &units), skipped)
    }

    /// Fills the upper triangle from already canonical submissions and
    /// mirrors it
    pub fn build_from_units(&self, labels: Vec<String>, units: &[SubmissionUnits]) -> SimilarityMatrix {
        let n = units.len();
        debug_assert_eq!(labels.len(), n);

        let row = |i: usize| -> Vec<(usize, f64)> {
            ((i + 1)..n)
                .map(|j| (j, compare_units(&self.differ, &units[i], &units[j]).score()))
                .collect()
        };

        let rows: Vec<Vec<(usize, f64)>> = if self.parallel {
            (0..n).into_par_iter().map(row).collect()
        } else {
            (0..n).map(row).collect()
        };

        let mut matrix = SimilarityMatrix::identity(labels);
        for (i, row) in rows.into_iter().enumerate() {
            for (j, score) in row {
                debug!("{} / {}: {:.3}", matrix.labels[i], matrix.labels[j], score);
                matrix.set_pair(i, j, score);
            }
        }

        info!("Built {}x{} similarity matrix", n, n);
        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submissions() -> Vec<Submission> {
        vec![
            Submission::new("alice", "task1", "def f(x):\n    return x + 1\n"),
            Submission::new("bob", "task1", "def f(y):\n    return y + 1\n"),
            Submission::new("carol", "task1", "def f(z):\n    return z * 2\n\ndef g():\n    pass\n"),
            Submission::new("dave", "task1", "def h():\n    return 0\n"),
        ]
    }

    #[test]
    fn test_matrix_invariants() {
        let matrix = MatrixBuilder::default().build(&submissions()).unwrap();
        assert_eq!(matrix.len(), 4);
        assert!(matrix.is_symmetric());
        for i in 0..4 {
            assert_eq!(matrix.get(i, i), 1.0);
            for j in 0..4 {
                assert!((0.0..=1.0).contains(&matrix.get(i, j)));
            }
        }
        assert_eq!(matrix.get(0, 1), 1.0);
        assert_eq!(matrix.get(0, 3), 0.0);
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let parallel = MatrixBuilder::default().with_parallel(true).build(&submissions()).unwrap();
        let sequential = MatrixBuilder::default().with_parallel(false).build(&submissions()).unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_parse_failure_names_the_student() {
        let mut subs = submissions();
        subs.push(Submission::new("eve", "task1", "def broken(:\n"));
        let err = MatrixBuilder::default().build(&subs).unwrap_err();
        assert!(matches!(&err, SimilarityError::Submission { student, .. } if student == "eve"));
    }

    #[test]
    fn test_unparsable_submissions_can_be_skipped() {
        let mut subs = submissions();
        subs.insert(1, Submission::new("eve", "task1", "def broken(:\n"));

        let (matrix, skipped) = MatrixBuilder::default().build_skipping_unparsable(&subs);
        assert_eq!(matrix.labels(), ["alice", "bob", "carol", "dave"]);
        assert_eq!(matrix, MatrixBuilder::default().build(&submissions()).unwrap());
        assert_eq!(skipped.len(), 1);
        assert!(matches!(&skipped[0], SimilarityError::Submission { student, .. } if student == "eve"));
    }

    #[test]
    fn test_empty_and_single_submission() {
        let empty = MatrixBuilder::default().build(&[]).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.rows().count(), 0);

        let single = MatrixBuilder::default()
            .build(&submissions()[..1])
            .unwrap();
        assert_eq!(single.row(0), &[1.0]);
    }

    #[test]
    fn test_serialized_matrix_is_square() {
        let matrix = MatrixBuilder::default().build(&submissions()).unwrap();
        let json = serde_json::to_value(&matrix).unwrap();
        assert_eq!(json["labels"].as_array().unwrap().len(), 4);
        assert_eq!(json["values"].as_array().unwrap().len(), 16);
    }

    #[test]
    fn test_pairs_above_threshold() {
        let matrix = MatrixBuilder::default().build(&submissions()).unwrap();
        let pairs = matrix.pairs_above(0.9);
        assert_eq!(pairs, vec![(0, 1, 1.0)]);
    }
}
