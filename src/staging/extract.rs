/*!
# Latest-attempt extraction

Raw layout, as exported by the course system:

```text
<raw>/<assignment>/<student>/<attempt>/<task files>
```

For every assignment directory matching the configured pattern, the
latest attempt of each student (attempt names sort descending) is
copied to `<processed>/<assignment>/<student>/`.
*/

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::StagingConfig;

/// Counters of one staging run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingSummary {
    pub assignments: usize,
    pub students_staged: usize,
    pub files_copied: usize,
    /// Students skipped for too few (or only ignored) attempts
    pub missing: usize,
}

/// Names of the direct children of `dir`, directories or files, sorted
pub(crate) fn list_entries(dir: &Path, directories: bool) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        let file_type = entry.file_type();
        let wanted = if directories {
            file_type.is_dir()
        } else {
            file_type.is_file()
        };
        if wanted {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

/// Copies the latest attempt of every student into the processed tree
#[derive(Debug, Clone)]
pub struct Stager {
    config: StagingConfig,
    assignment_re: Regex,
}

impl Stager {
    pub fn new(config: StagingConfig) -> Result<Self> {
        let assignment_re = config.assignment_regex()?;
        Ok(Self {
            config,
            assignment_re,
        })
    }

    /// Latest attempt among `attempts`, ignoring names with the ignored suffix
    pub fn latest_attempt<'a>(&self, attempts: &'a [String]) -> Option<&'a String> {
        attempts
            .iter()
            .filter(|name| !name.ends_with(&self.config.ignored_suffix))
            .max()
    }

    pub fn stage(&self, raw: &Path, processed: &Path) -> Result<StagingSummary> {
        let mut summary = StagingSummary::default();

        let assignments: Vec<String> = list_entries(raw, true)?
            .into_iter()
            .filter(|name| self.assignment_re.is_match(name))
            .collect();

        for assignment in &assignments {
            summary.assignments += 1;
            let assignment_dir = raw.join(assignment);

            for student in list_entries(&assignment_dir, true)? {
                let target = processed.join(assignment).join(&student);
                match self.stage_student(&assignment_dir.join(&student), &target)? {
                    Some(copied) => {
                        summary.students_staged += 1;
                        summary.files_copied += copied;
                    }
                    None => summary.missing += 1,
                }
            }
            info!("Staged assignment {}", assignment);
        }

        info!(
            "Staging finished: {} students, {} files, {} missing submission(s)",
            summary.students_staged, summary.files_copied, summary.missing
        );
        Ok(summary)
    }

    /// Number of copied files, or `None` when the student is missing
    fn stage_student(&self, student_dir: &Path, target: &Path) -> Result<Option<usize>> {
        let attempts = list_entries(student_dir, true)?;
        if attempts.len() < self.config.min_attempt_entries {
            debug!(
                "{}: {} attempt entries, counted as missing",
                student_dir.display(),
                attempts.len()
            );
            return Ok(None);
        }

        let Some(latest) = self.latest_attempt(&attempts) else {
            warn!("{}: only ignored attempts", student_dir.display());
            return Ok(None);
        };

        let source_dir = student_dir.join(latest);
        fs::create_dir_all(target)
            .with_context(|| format!("Failed to create {}", target.display()))?;

        let mut copied = 0;
        for task in list_entries(&source_dir, false)? {
            let from = source_dir.join(&task);
            let to = target.join(&task);
            fs::copy(&from, &to).with_context(|| {
                format!("Failed to copy {} to {}", from.display(), to.display())
            })?;
            copied += 1;
        }

        debug!("{}: attempt {} ({} files)", student_dir.display(), latest, copied);
        Ok(Some(copied))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_latest_attempt_skips_ignored_suffix() {
        let stager = Stager::new(StagingConfig::default()).unwrap();
        let attempts = vec![
            "2023-01-01".to_string(),
            "2023-02-01".to_string(),
            "2023-03-01.ceg".to_string(),
        ];
        assert_eq!(stager.latest_attempt(&attempts).map(String::as_str), Some("2023-02-01"));
        assert_eq!(stager.latest_attempt(&["a.ceg".to_string()]), None);
    }

    #[test]
    fn test_stage_copies_latest_attempt() {
        let raw = TempDir::new().unwrap();
        let processed = TempDir::new().unwrap();
        let k1 = raw.path().join("K1");

        write(&k1.join("alice/001/task1.py"), "old");
        write(&k1.join("alice/002/task1.py"), "new");
        write(&k1.join("alice/002/task2.py"), "x = 1");
        write(&k1.join("alice/003.ceg/task1.py"), "ignored");
        write(&k1.join("bob/001/task1.py"), "single attempt");
        write(&raw.path().join("Notes/carol/001/task1.py"), "not an assignment");

        let summary = Stager::new(StagingConfig::default())
            .unwrap()
            .stage(raw.path(), processed.path())
            .unwrap();

        assert_eq!(
            summary,
            StagingSummary {
                assignments: 1,
                students_staged: 1,
                files_copied: 2,
                missing: 1,
            }
        );
        let staged = processed.path().join("K1/alice/task1.py");
        assert_eq!(fs::read_to_string(staged).unwrap(), "new");
        assert!(!processed.path().join("K1/bob").exists());
        assert!(!processed.path().join("Notes").exists());
    }
}
