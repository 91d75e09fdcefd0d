//! JSON отчет с метаданными задачи

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ReportFormat, ReportGenerator, ReportMetadata};
use crate::similarity::SimilarityMatrix;

/// Структура JSON отчета
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonReport {
    pub assignment: String,
    pub task: String,
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
    pub labels: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl JsonReport {
    pub fn from_matrix(matrix: &SimilarityMatrix, meta: &ReportMetadata) -> Self {
        Self {
            assignment: meta.assignment.clone(),
            task: meta.task.clone(),
            generated_at: Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            labels: matrix.labels().to_vec(),
            rows: matrix.rows().map(<[f64]>::to_vec).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReporter;

impl JsonReporter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportGenerator for JsonReporter {
    fn generate_report(&self, matrix: &SimilarityMatrix, meta: &ReportMetadata) -> Result<String> {
        let report = JsonReport::from_matrix(matrix, meta);
        serde_json::to_string_pretty(&report).context("Failed to serialize JSON report")
    }

    fn supported_format() -> ReportFormat {
        ReportFormat::Json
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::{MatrixBuilder, Submission};

    #[test]
    fn test_json_report_roundtrip() {
        let matrix = MatrixBuilder::default()
            .build(&[
                Submission::new("a", "t.py", "x = 1\n"),
                Submission::new("b", "t.py", "x = 1\n"),
            ])
            .unwrap();

        let json = JsonReporter::new()
            .generate_report(&matrix, &ReportMetadata::new("K2", "t.py"))
            .unwrap();
        let report: JsonReport = serde_json::from_str(&json).unwrap();

        assert_eq!(report.assignment, "K2");
        assert_eq!(report.labels, vec!["a", "b"]);
        assert_eq!(report.rows, vec![vec![1.0, 1.0], vec![1.0, 1.0]]);
    }
}
