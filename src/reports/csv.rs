//! CSV отчет: `idx,<студенты>` и по строке на студента

use anyhow::{Context, Result};

use super::{ReportFormat, ReportGenerator, ReportMetadata};
use crate::similarity::SimilarityMatrix;

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvReporter;

impl CsvReporter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportGenerator for CsvReporter {
    fn generate_report(&self, matrix: &SimilarityMatrix, _meta: &ReportMetadata) -> Result<String> {
        let mut wtr = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        let header = std::iter::once("idx").chain(matrix.labels().iter().map(String::as_str));
        wtr.write_record(header)
            .context("Failed to write CSV header")?;

        for (label, row) in matrix.labels().iter().zip(matrix.rows()) {
            // кратчайшая запись, которая читается обратно без потерь
            let record = std::iter::once(label.clone()).chain(row.iter().map(|v| format!("{:?}", v)));
            wtr.write_record(record)
                .with_context(|| format!("Failed to write CSV row for {}", label))?;
        }

        let bytes = wtr
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV report: {}", e))?;
        String::from_utf8(bytes).context("CSV report is not valid UTF-8")
    }

    fn supported_format() -> ReportFormat {
        ReportFormat::Csv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::{MatrixBuilder, Submission};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_csv_layout() {
        let matrix = MatrixBuilder::default()
            .build(&[
                Submission::new("alice", "t.py", "def f():\n    return 1\n"),
                Submission::new("bob", "t.py", "def f():\n    return 2\n"),
                Submission::new("o'neil, jr", "t.py", "def f():\n    return 1\n"),
            ])
            .unwrap();

        let csv = CsvReporter::new()
            .generate_report(&matrix, &ReportMetadata::new("K1", "t.py"))
            .unwrap();

        assert_eq!(
            csv,
            "idx,alice,bob,\"o'neil, jr\"\n\
             alice,1.0,0.0,1.0\n\
             bob,0.0,1.0,0.0\n\
             \"o'neil, jr\",1.0,0.0,1.0\n"
        );
    }

    #[test]
    fn test_csv_reads_back() {
        let matrix = MatrixBuilder::default()
            .build(&[
                Submission::new("say \"hi\"", "t.py", "x = 1\n"),
                Submission::new("bob", "t.py", "y = 2\n"),
            ])
            .unwrap();
        let text = CsvReporter::new()
            .generate_report(&matrix, &ReportMetadata::new("K1", "t.py"))
            .unwrap();

        let mut rdr = csv::Reader::from_reader(text.as_bytes());
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), vec!["idx", "say \"hi\"", "bob"]);

        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "say \"hi\"");
        assert_eq!(rows[1][2].parse::<f64>().unwrap(), 1.0);
    }
}
