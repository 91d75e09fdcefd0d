//! Grouping of staged submissions by task
//!
//! Processed layout: `<processed>/<assignment>/<student>/<task file>`.
//! Students who skipped a task are simply absent from its set.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::extract::list_entries;
use crate::core::read_submission_file;
use crate::python_parser::SUPPORTED_EXTENSIONS;
use crate::similarity::Submission;

/// Students who submitted one task file of one assignment
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskSet {
    pub assignment: String,
    /// Task file name, e.g. `task1.py`
    pub task: String,
    /// Sorted
    pub students: Vec<String>,
}

impl TaskSet {
    /// File name up to the first dot
    pub fn stem(&self) -> &str {
        self.task.split('.').next().unwrap_or(&self.task)
    }

    /// Report file name: `<assignment>_<stem>.<extension>`
    pub fn output_name(&self, extension: &str) -> String {
        format!("{}_{}.{}", self.assignment, self.stem(), extension)
    }

    pub fn submission_path(&self, processed: &Path, student: &str) -> PathBuf {
        processed.join(&self.assignment).join(student).join(&self.task)
    }
}

fn is_supported(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e))
}

/// Task sets of every assignment in the processed tree, sorted by
/// assignment then task
pub fn discover_tasks(processed: &Path) -> Result<Vec<TaskSet>> {
    let mut tasks = Vec::new();

    for assignment in list_entries(processed, true)? {
        let mut by_task: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let assignment_dir = processed.join(&assignment);

        for student in list_entries(&assignment_dir, true)? {
            for file in list_entries(&assignment_dir.join(&student), false)? {
                if !is_supported(&file) {
                    debug!("Skipping {}/{}/{}", assignment, student, file);
                    continue;
                }
                by_task.entry(file).or_default().insert(student.clone());
            }
        }

        tasks.extend(by_task.into_iter().map(|(task, students)| TaskSet {
            assignment: assignment.clone(),
            task,
            students: students.into_iter().collect(),
        }));
    }

    Ok(tasks)
}

/// Reads every submission of a task set, in student order
pub fn load_submissions(processed: &Path, task: &TaskSet) -> Result<Vec<Submission>> {
    task.students
        .iter()
        .map(|student| {
            let path = task.submission_path(processed, student);
            let source = read_submission_file(&path)
                .with_context(|| format!("Failed to read submission {}", path.display()))?;
            Ok(Submission::new(student.as_str(), task.task.as_str(), source))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_discover_groups_students_by_task() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "K1/bob/task1.py", "x = 1\n");
        write(dir.path(), "K1/alice/task1.py", "y = 2\n");
        write(dir.path(), "K1/alice/task2.py", "z = 3\n");
        write(dir.path(), "K1/alice/notes.txt", "ignored");
        write(dir.path(), "K2/carol/task1.py", "pass\n");

        let tasks = discover_tasks(dir.path()).unwrap();
        assert_eq!(
            tasks,
            vec![
                TaskSet {
                    assignment: "K1".into(),
                    task: "task1.py".into(),
                    students: vec!["alice".into(), "bob".into()],
                },
                TaskSet {
                    assignment: "K1".into(),
                    task: "task2.py".into(),
                    students: vec!["alice".into()],
                },
                TaskSet {
                    assignment: "K2".into(),
                    task: "task1.py".into(),
                    students: vec!["carol".into()],
                },
            ]
        );
        assert_eq!(tasks[0].output_name("csv"), "K1_task1.csv");
    }

    #[test]
    fn test_load_submissions_in_student_order() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "K1/alice/t.py", "x = 1\n");
        write(dir.path(), "K1/bob/t.py", "def broken(:\n");

        let task = TaskSet {
            assignment: "K1".into(),
            task: "t.py".into(),
            students: vec!["alice".into(), "bob".into()],
        };
        let submissions = load_submissions(dir.path(), &task).unwrap();
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[0].source, "x = 1\n");
        assert_eq!(submissions[1].student, "bob");
        assert_eq!(submissions[1].task, "t.py");
    }

    #[test]
    fn test_stem_stops_at_first_dot() {
        let task = TaskSet {
            assignment: "K3".into(),
            task: "task.v2.py".into(),
            students: Vec::new(),
        };
        assert_eq!(task.stem(), "task");
    }
}
