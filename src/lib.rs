/*!
# PySim Analyzer

Structural similarity analyzer for Python student submissions. Two
solutions that differ only by identifier names, string contents, imports,
docstrings, call style or the orientation of comparisons are reported as
identical; everything else lowers the score in proportion to the number
of differing canonical lines.

## Architecture

```text
PySim Analyzer
├── python_parser - tree-sitter grammar → typed AST
├── canonical     - units of canonical lines per submission
├── similarity    - line differ, pair score, similarity matrix
├── staging       - latest-attempt extraction, task grouping
├── engine        - batch run over all tasks
├── reports       - CSV, JSON, Text output
├── config        - TOML/YAML configuration
└── cli_common    - logging and console helpers
```

## Usage

### CLI
```bash
# Latest attempts into the processed layout
pysim-analyzer stage --raw ./export --processed ./processed

# One matrix per task
pysim-analyzer analyze --processed ./processed --output ./matrices --format csv

# Inspect a pair or one file
pysim-analyzer compare a.py b.py
pysim-analyzer canonical a.py --unit solve
```

### Library
```rust
use pysim_analyzer::{MatrixBuilder, Submission};

let submissions = vec![
    Submission::new("alice", "task1.py", "def f(x):\n    return x + 1\n"),
    Submission::new("bob", "task1.py", "def f(y):\n    return y + 1\n"),
];
let matrix = MatrixBuilder::default().build(&submissions).unwrap();
assert_eq!(matrix.get(0, 1), 1.0);
```
*/

pub mod canonical;
pub mod cli_common;
pub mod config;
pub mod core;
pub mod engine;
pub mod python_parser;
pub mod reports;
pub mod similarity;
pub mod staging;

pub use canonical::{canonicalize, Canonicalizer, SubmissionUnits, Unit, TOP_LEVEL_UNIT};
pub use config::{AnalyzerConfig, CanonicalConfig, OutputConfig, SimilarityConfig, StagingConfig};
pub use self::core::{ParseError, SimilarityError};
pub use engine::{BatchEngine, BatchSummary};
pub use python_parser::PythonParser;
pub use reports::{ReportFormat, ReportManager, ReportMetadata};
pub use similarity::{
    compare_units, diff, similarity, DiffAlgorithm, DiffOutcome, LineDiffer, MatrixBuilder,
    PairComparison, SimilarityMatrix, Submission, UnitComparison,
};
pub use staging::{Stager, StagingSummary, TaskSet};

/// Similarity matrix of one task's sources with default settings.
/// `sources` pairs a student identifier with the submission text.
pub fn similarity_matrix<S, T>(sources: &[(S, T)]) -> Result<SimilarityMatrix, SimilarityError>
where
    S: AsRef<str>,
    T: AsRef<str>,
{
    let submissions: Vec<Submission> = sources
        .iter()
        .map(|(student, source)| Submission::new(student.as_ref(), "", source.as_ref()))
        .collect();
    MatrixBuilder::default().build(&submissions)
}

/// Версия анализатора
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
