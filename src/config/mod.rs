/*!
# Analyzer Configuration

Settings for canonicalisation, similarity scoring, staging of raw
submissions and report output. Loaded from TOML or YAML (chosen by file
extension); every field has a default, so a partial file is enough.

```toml
[canonical]
entry_point = "main"

[similarity]
algorithm = "patience"
threshold = 0.9

[staging]
assignment_pattern = "^K"
```
*/

use anyhow::{bail, ensure, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::reports::ReportFormat;
use crate::similarity::DiffAlgorithm;

/// Canonicalizer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalConfig {
    /// Name of the function whose body replaces its call statements
    pub entry_point: String,
    /// Disables entry point inlining when false
    pub inline_entry_point: bool,
}

impl Default for CanonicalConfig {
    fn default() -> Self {
        Self {
            entry_point: "main".to_string(),
            inline_entry_point: true,
        }
    }
}

/// Pairwise comparison settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    pub algorithm: DiffAlgorithm,
    /// Compute matrix rows on the rayon pool
    pub parallel: bool,
    /// Worker threads; `None` uses one per CPU
    pub workers: Option<usize>,
    /// Drop submissions that do not parse instead of failing the task
    pub skip_unparsable: bool,
    /// Scores at or above this value are highlighted in text reports
    pub threshold: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            algorithm: DiffAlgorithm::default(),
            parallel: true,
            workers: None,
            skip_unparsable: false,
            threshold: 0.8,
        }
    }
}

impl SimilarityConfig {
    pub fn effective_workers(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// Raw submission layout settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    /// Regex selecting assignment directories
    pub assignment_pattern: String,
    /// Attempt directories ending with this suffix are ignored
    pub ignored_suffix: String,
    /// Students with fewer attempt entries are reported missing
    pub min_attempt_entries: usize,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            assignment_pattern: "^K".to_string(),
            ignored_suffix: ".ceg".to_string(),
            min_attempt_entries: 2,
        }
    }
}

impl StagingConfig {
    pub fn assignment_regex(&self) -> Result<Regex> {
        Regex::new(&self.assignment_pattern)
            .with_context(|| format!("Invalid assignment pattern '{}'", self.assignment_pattern))
    }
}

/// Report settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: ReportFormat,
    /// Use colors in text output
    pub use_colors: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::Csv,
            use_colors: true,
        }
    }
}

/// Full analyzer configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub canonical: CanonicalConfig,
    pub similarity: SimilarityConfig,
    pub staging: StagingConfig,
    pub output: OutputConfig,
}

impl AnalyzerConfig {
    /// Load configuration, TOML or YAML by extension
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let config: Self = match extension.as_deref() {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config from {}", path.display()))?,
            Some("toml") | None => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config from {}", path.display()))?,
            Some(other) => bail!("Unsupported config format '.{}': {}", other, path.display()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        std::fs::write(&path, content).with_context(|| {
            format!("Failed to write config to {}", path.as_ref().display())
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.canonical.entry_point.trim().is_empty(),
            "canonical.entry_point must not be empty"
        );
        ensure!(
            (0.0..=1.0).contains(&self.similarity.threshold),
            "similarity.threshold must be within [0, 1], got {}",
            self.similarity.threshold
        );
        ensure!(
            self.similarity.workers != Some(0),
            "similarity.workers must be positive"
        );
        self.staging.assignment_regex()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.canonical.entry_point, "main");
        assert_eq!(config.similarity.algorithm, DiffAlgorithm::Myers);
        assert!(config.similarity.parallel);
        assert_eq!(config.staging.min_attempt_entries, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pysim.toml");

        let mut config = AnalyzerConfig::default();
        config.similarity.algorithm = DiffAlgorithm::Patience;
        config.similarity.workers = Some(3);
        config.save_to_file(&path).unwrap();

        let loaded = AnalyzerConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_yaml_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pysim.yaml");
        std::fs::write(&path, "canonical:\n  entry_point: run\noutput:\n  format: json\n").unwrap();

        let config = AnalyzerConfig::load_from_file(&path).unwrap();
        assert_eq!(config.canonical.entry_point, "run");
        assert!(config.canonical.inline_entry_point);
        assert_eq!(config.output.format, ReportFormat::Json);
        assert_eq!(config.staging, StagingConfig::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = AnalyzerConfig::default();
        config.similarity.threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = AnalyzerConfig::default();
        config.staging.assignment_pattern = "(".to_string();
        assert!(config.validate().is_err());

        let mut config = AnalyzerConfig::default();
        config.canonical.entry_point = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pysim.ini");
        std::fs::write(&path, "").unwrap();
        assert!(AnalyzerConfig::load_from_file(&path).is_err());
    }
}
