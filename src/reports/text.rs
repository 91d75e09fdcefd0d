/*!
# Text Reporter

Консольная таблица матрицы похожести.

## Возможности:
- Выравнивание колонок по самой длинной метке
- Подсветка пар с похожестью не ниже порога (`colored`)
- Список подозрительных пар под таблицей
*/

use anyhow::Result;
use colored::Colorize;

use super::{ReportFormat, ReportGenerator, ReportMetadata};
use crate::similarity::SimilarityMatrix;

/// Текстовый репортер для консольного вывода
#[derive(Debug, Clone)]
pub struct TextReporter {
    /// Использовать цветной вывод
    use_colors: bool,
    /// Порог подсветки
    threshold: f64,
}

impl TextReporter {
    pub fn new(use_colors: bool, threshold: f64) -> Self {
        Self {
            use_colors,
            threshold,
        }
    }

    /// Без цветов, для файлов и CI
    pub fn plain(threshold: f64) -> Self {
        Self::new(false, threshold)
    }

    fn header(&self, meta: &ReportMetadata) -> String {
        let title = format!("Similarity: {} / {}", meta.assignment, meta.task);
        if self.use_colors {
            format!("{}\n{}\n", title.bold().cyan(), "=".repeat(title.len()).dimmed())
        } else {
            format!("{}\n{}\n", title, "=".repeat(title.len()))
        }
    }

    fn cell(&self, value: f64, diagonal: bool, width: usize) -> String {
        let text = format!("{:>width$.3}", value, width = width);
        if !self.use_colors {
            return text;
        }
        if diagonal {
            text.dimmed().to_string()
        } else if value >= self.threshold {
            text.red().bold().to_string()
        } else {
            text
        }
    }
}

impl ReportGenerator for TextReporter {
    fn generate_report(&self, matrix: &SimilarityMatrix, meta: &ReportMetadata) -> Result<String> {
        let mut output = self.header(meta);

        let label_width = matrix
            .labels()
            .iter()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0)
            .max(3);
        let cell_width = label_width.max(5);

        output.push_str(&format!("{:label_width$}", "", label_width = label_width));
        for label in matrix.labels() {
            output.push_str(&format!(" {:>cell_width$}", label, cell_width = cell_width));
        }
        output.push('\n');

        for (i, row) in matrix.rows().enumerate() {
            output.push_str(&format!(
                "{:label_width$}",
                matrix.labels()[i],
                label_width = label_width
            ));
            for (j, value) in row.iter().enumerate() {
                output.push(' ');
                output.push_str(&self.cell(*value, i == j, cell_width));
            }
            output.push('\n');
        }

        let pairs = matrix.pairs_above(self.threshold);
        output.push('\n');
        if pairs.is_empty() {
            output.push_str(&format!("No pairs at or above {:.2}\n", self.threshold));
        } else {
            output.push_str(&format!("Pairs at or above {:.2}:\n", self.threshold));
            for (i, j, score) in pairs {
                let line = format!(
                    "  {} - {}: {:.3}",
                    matrix.labels()[i],
                    matrix.labels()[j],
                    score
                );
                if self.use_colors {
                    output.push_str(&line.yellow().to_string());
                } else {
                    output.push_str(&line);
                }
                output.push('\n');
            }
        }

        Ok(output)
    }

    fn supported_format() -> ReportFormat {
        ReportFormat::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::{MatrixBuilder, Submission};

    #[test]
    fn test_plain_table() {
        let matrix = MatrixBuilder::default()
            .build(&[
                Submission::new("ann", "t.py", "def f(a):\n    return a\n"),
                Submission::new("ben", "t.py", "def f(b):\n    return b\n"),
                Submission::new("cy", "t.py", "x = 1\n"),
            ])
            .unwrap();

        let text = TextReporter::plain(0.8)
            .generate_report(&matrix, &ReportMetadata::new("K1", "t.py"))
            .unwrap();

        assert!(text.starts_with("Similarity: K1 / t.py\n"));
        assert!(text.contains("ann 1.000 1.000 0.000\n"));
        assert!(text.contains("Pairs at or above 0.80:\n  ann - ben: 1.000\n"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn test_no_flagged_pairs() {
        let matrix = MatrixBuilder::default()
            .build(&[Submission::new("solo", "t.py", "x = 1\n")])
            .unwrap();
        let text = TextReporter::plain(0.5)
            .generate_report(&matrix, &ReportMetadata::new("K1", "t.py"))
            .unwrap();
        assert!(text.contains("No pairs at or above 0.50"));
    }
}
