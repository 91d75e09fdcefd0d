/*!
# Reports Module

Модуль для сохранения матриц похожести в различных форматах.

## Поддерживаемые форматы:
- **CSV** - размеченная таблица `idx,<студенты...>` для дальнейшей обработки
- **JSON** - метки, строки матрицы и метаданные задачи
- **Text** - выровненная таблица для консоли с подсветкой подозрительных пар

## Использование:

```rust,ignore
use pysim_analyzer::reports::{ReportFormat, ReportManager, ReportMetadata};

let manager = ReportManager::new(ReportFormat::Csv);
let meta = ReportMetadata::new("K1", "task1.py");
manager.save_report(&matrix, &meta, "matrices/K1_task1.csv")?;
```
*/

pub mod csv;
pub mod json;
pub mod text;

pub use self::csv::CsvReporter;
pub use self::json::{JsonReport, JsonReporter};
pub use self::text::TextReporter;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::similarity::SimilarityMatrix;

/// Формат отчета
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// CSV таблица
    #[default]
    Csv,
    /// JSON для API интеграции
    Json,
    /// Текстовый отчет для консоли
    Text,
}

impl ReportFormat {
    /// Расширение файла отчета
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
            ReportFormat::Text => "txt",
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "json" => Ok(ReportFormat::Json),
            "text" | "txt" => Ok(ReportFormat::Text),
            _ => Err(anyhow::anyhow!("Unknown report format: {}", s)),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Csv => write!(f, "CSV"),
            ReportFormat::Json => write!(f, "JSON"),
            ReportFormat::Text => write!(f, "Text"),
        }
    }
}

/// Задача, к которой относится матрица
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub assignment: String,
    pub task: String,
}

impl ReportMetadata {
    pub fn new(assignment: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            assignment: assignment.into(),
            task: task.into(),
        }
    }
}

/// Трейт для генерации отчетов
pub trait ReportGenerator {
    /// Генерирует отчет по матрице одной задачи
    fn generate_report(&self, matrix: &SimilarityMatrix, meta: &ReportMetadata) -> Result<String>;

    /// Возвращает поддерживаемый формат отчета
    fn supported_format() -> ReportFormat
    where
        Self: Sized;
}

/// Менеджер отчетов для генерации в различных форматах
#[derive(Debug, Clone)]
pub struct ReportManager {
    format: ReportFormat,
    /// Цвета в текстовом отчете
    use_colors: bool,
    /// Порог подсветки в текстовом отчете
    threshold: f64,
}

impl ReportManager {
    /// Создает новый менеджер отчетов
    pub fn new(format: ReportFormat) -> Self {
        Self {
            format,
            use_colors: false,
            threshold: 0.8,
        }
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }

    /// Генерирует отчет в выбранном формате
    pub fn generate_report(&self, matrix: &SimilarityMatrix, meta: &ReportMetadata) -> Result<String> {
        match self.format {
            ReportFormat::Csv => CsvReporter::new().generate_report(matrix, meta),
            ReportFormat::Json => JsonReporter::new().generate_report(matrix, meta),
            ReportFormat::Text => {
                TextReporter::new(self.use_colors, self.threshold).generate_report(matrix, meta)
            }
        }
    }

    /// Сохраняет отчет в файл
    pub fn save_report<P: AsRef<Path>>(
        &self,
        matrix: &SimilarityMatrix,
        meta: &ReportMetadata,
        output_path: P,
    ) -> Result<()> {
        let output_path = output_path.as_ref();
        let content = self.generate_report(matrix, meta)?;
        std::fs::write(output_path, content)
            .with_context(|| format!("Failed to write report {}", output_path.display()))?;
        tracing::debug!("Saved {} report: {}", self.format, output_path.display());
        Ok(())
    }
}

impl Default for ReportManager {
    fn default() -> Self {
        Self::new(ReportFormat::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::{MatrixBuilder, Submission};
    use tempfile::TempDir;

    #[test]
    fn test_report_format_parsing() {
        assert_eq!("csv".parse::<ReportFormat>().unwrap(), ReportFormat::Csv);
        assert_eq!("JSON".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert_eq!("text".parse::<ReportFormat>().unwrap(), ReportFormat::Text);
        assert!("sarif".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn test_save_report_writes_file() {
        let matrix = MatrixBuilder::default()
            .build(&[
                Submission::new("a", "t.py", "x = 1\n"),
                Submission::new("b", "t.py", "y = 2\n"),
            ])
            .unwrap();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("K1_t.csv");

        ReportManager::new(ReportFormat::Csv)
            .save_report(&matrix, &ReportMetadata::new("K1", "t.py"), &path)
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("idx,a,b\n"));
    }
}
