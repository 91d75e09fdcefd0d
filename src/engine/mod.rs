/*!
# Batch Engine

Runs the whole processed tree: for every task set, load submissions,
build the matrix and save it through the report layer. One failing task
is logged and counted; the remaining tasks still run.
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::AnalyzerConfig;
use crate::reports::{ReportManager, ReportMetadata};
use crate::similarity::{MatrixBuilder, SimilarityMatrix};
use crate::staging::{discover_tasks, load_submissions, TaskSet};

/// Counters of one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub tasks: usize,
    pub written: usize,
    pub failed: usize,
    /// Submissions dropped by `skip_unparsable`
    pub skipped_submissions: usize,
    pub reports: Vec<PathBuf>,
}

/// Processed tree to one report per task
pub struct BatchEngine {
    config: AnalyzerConfig,
    builder: MatrixBuilder,
    reports: ReportManager,
}

impl BatchEngine {
    pub fn new(config: AnalyzerConfig) -> Self {
        let builder = MatrixBuilder::new(config.canonical.clone(), &config.similarity);
        let reports = ReportManager::new(config.output.format)
            .with_colors(false)
            .with_threshold(config.similarity.threshold);
        Self {
            config,
            builder,
            reports,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Task sets found under `processed`
    pub fn discover(&self, processed: &Path) -> Result<Vec<TaskSet>> {
        discover_tasks(processed)
            .with_context(|| format!("Failed to scan processed directory {}", processed.display()))
    }

    /// Runs every task on a dedicated pool sized by `similarity.workers`
    pub fn run(&self, processed: &Path, output: &Path) -> Result<BatchSummary> {
        let tasks = self.discover(processed)?;
        self.run_tasks(processed, output, &tasks, |_, _| {})
    }

    /// Same as [`run`](Self::run) over a known list of tasks; `on_task` is
    /// called after each task with its outcome
    pub fn run_tasks<F>(
        &self,
        processed: &Path,
        output: &Path,
        tasks: &[TaskSet],
        mut on_task: F,
    ) -> Result<BatchSummary>
    where
        F: FnMut(&TaskSet, bool),
    {
        std::fs::create_dir_all(output)
            .with_context(|| format!("Failed to create output directory {}", output.display()))?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.similarity.effective_workers())
            .build()
            .context("Failed to build worker pool")?;

        let mut summary = BatchSummary {
            tasks: tasks.len(),
            ..BatchSummary::default()
        };

        for task in tasks {
            let outcome = pool.install(|| self.run_task(processed, task));
            match outcome {
                Ok((matrix, skipped)) => {
                    summary.skipped_submissions += skipped;
                    let path = output.join(task.output_name(self.reports.format().extension()));
                    let meta = ReportMetadata::new(&task.assignment, &task.task);
                    match self.reports.save_report(&matrix, &meta, &path) {
                        Ok(()) => {
                            info!("{} {} done!", task.assignment, task.task);
                            summary.written += 1;
                            summary.reports.push(path);
                            on_task(task, true);
                        }
                        Err(e) => {
                            error!("{} {}: {:#}", task.assignment, task.task, e);
                            summary.failed += 1;
                            on_task(task, false);
                        }
                    }
                }
                Err(e) => {
                    error!("{} {} failed: {:#}", task.assignment, task.task, e);
                    summary.failed += 1;
                    on_task(task, false);
                }
            }
        }

        Ok(summary)
    }

    /// Matrix of one task and the number of dropped submissions
    pub fn run_task(&self, processed: &Path, task: &TaskSet) -> Result<(SimilarityMatrix, usize)> {
        let submissions = load_submissions(processed, task)?;

        if !self.config.similarity.skip_unparsable {
            let matrix = self.builder.build(&submissions)?;
            return Ok((matrix, 0));
        }

        let (matrix, skipped) = self.builder.build_skipping_unparsable(&submissions);
        for e in &skipped {
            warn!("Skipping submission ({} {}): {}", task.assignment, task.task, e);
        }
        Ok((matrix, skipped.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::ReportFormat;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "K1/alice/t1.py", "def f(x):\n    return x + 1\n");
        write(dir.path(), "K1/bob/t1.py", "def f(y):\n    return y + 1\n");
        write(dir.path(), "K1/alice/t2.py", "x = 1\n");
        write(dir.path(), "K1/bob/t2.py", "def broken(:\n");
        dir
    }

    #[test]
    fn test_failing_task_does_not_stop_batch() {
        let processed = fixture();
        let output = TempDir::new().unwrap();

        let summary = BatchEngine::new(AnalyzerConfig::default())
            .run(processed.path(), output.path())
            .unwrap();

        assert_eq!(summary.tasks, 2);
        assert_eq!(summary.written, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.reports, vec![output.path().join("K1_t1.csv")]);
        let csv = fs::read_to_string(output.path().join("K1_t1.csv")).unwrap();
        assert_eq!(csv, "idx,alice,bob\nalice,1.0,1.0\nbob,1.0,1.0\n");
    }

    #[test]
    fn test_skip_unparsable_keeps_task() {
        let processed = fixture();
        let output = TempDir::new().unwrap();

        let mut config = AnalyzerConfig::default();
        config.similarity.skip_unparsable = true;
        config.output.format = ReportFormat::Json;

        let summary = BatchEngine::new(config)
            .run(processed.path(), output.path())
            .unwrap();

        assert_eq!(summary.written, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.skipped_submissions, 1);
        assert!(output.path().join("K1_t2.json").exists());
    }
}
