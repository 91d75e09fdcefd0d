//! Общие аргументы командной строки

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::config::AnalyzerConfig;

/// Общие аргументы для всех CLI команд
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Configuration file (TOML or YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl CommonArgs {
    /// Определяет уровень логирования на основе флагов
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Проверяет, нужно ли выводить информацию
    pub fn should_print(&self) -> bool {
        !self.quiet
    }

    /// Конфигурация из `--config` или значения по умолчанию
    pub fn load_config(&self) -> Result<AnalyzerConfig> {
        match &self.config {
            Some(path) => AnalyzerConfig::load_from_file(path),
            None => Ok(AnalyzerConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level() {
        let mut args = CommonArgs::default();
        assert_eq!(args.log_level(), tracing::Level::INFO);
        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);
        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
        assert!(!args.should_print());
    }

    #[test]
    fn test_default_config_without_path() {
        let config = CommonArgs::default().load_config().unwrap();
        assert_eq!(config, AnalyzerConfig::default());
    }
}
