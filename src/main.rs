/*!
# PySim Analyzer CLI

Command-line interface for the structural similarity analyzer of Python
student submissions.
*/

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use pysim_analyzer::canonical::{Canonicalizer, TOP_LEVEL_UNIT};
use pysim_analyzer::cli_common::{
    self, format_duration, format_score, print_error, print_header, print_info, print_success,
    print_warning, validate_path, CommonArgs,
};
use pysim_analyzer::core::read_submission_file;
use pysim_analyzer::similarity::{compare_units, DiffAlgorithm, LineDiffer};
use pysim_analyzer::{AnalyzerConfig, BatchEngine, ReportFormat, Stager};

#[derive(Parser)]
#[command(
    name = "pysim-analyzer",
    version = env!("CARGO_PKG_VERSION"),
    author = "PySim Analyzer Team",
    about = "Structural similarity analyzer for Python student submissions"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy the latest attempt of every student into the processed layout
    Stage {
        /// Raw export: <raw>/<assignment>/<student>/<attempt>/<files>
        #[arg(long)]
        raw: PathBuf,

        /// Destination: <processed>/<assignment>/<student>/<files>
        #[arg(long)]
        processed: PathBuf,
    },

    /// Build a similarity matrix for every task of every assignment
    Analyze {
        /// Processed directory
        #[arg(long)]
        processed: PathBuf,

        /// Directory for the matrices
        #[arg(short, long, default_value = "matrices")]
        output: PathBuf,

        /// Report format (csv, json, text)
        #[arg(short, long)]
        format: Option<String>,

        /// Number of parallel workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Diff algorithm (myers, patience, lcs)
        #[arg(long)]
        algorithm: Option<String>,

        /// Drop submissions that do not parse instead of failing the task
        #[arg(long)]
        skip_unparsable: bool,
    },

    /// Compare two files and show the per-unit breakdown
    Compare {
        first: PathBuf,
        second: PathBuf,
    },

    /// Print the canonical form of a file
    Canonical {
        file: PathBuf,

        /// Only this unit (function name, or <module>)
        #[arg(long)]
        unit: Option<String>,
    },

    /// Write the default configuration
    InitConfig {
        #[arg(short, long, default_value = "pysim.toml")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli_common::init_logging(cli.common.log_level()) {
        eprintln!("{}", e);
    }

    if let Err(e) = run(cli) {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.common.load_config()?;
    let quiet = !cli.common.should_print();

    if !quiet && matches!(cli.command, Commands::Stage { .. } | Commands::Analyze { .. }) {
        print_header("PySim Analyzer", pysim_analyzer::VERSION);
    }

    match cli.command {
        Commands::Stage { raw, processed } => stage_command(config, raw, processed, quiet),
        Commands::Analyze {
            processed,
            output,
            format,
            workers,
            algorithm,
            skip_unparsable,
        } => {
            let mut config = config;
            if let Some(format) = format {
                config.output.format = format.parse::<ReportFormat>()?;
            }
            if let Some(algorithm) = algorithm {
                config.similarity.algorithm = algorithm
                    .parse::<DiffAlgorithm>()
                    .map_err(|e| anyhow::anyhow!(e))?;
            }
            if workers.is_some() {
                config.similarity.workers = workers;
            }
            if skip_unparsable {
                config.similarity.skip_unparsable = true;
            }
            config.validate()?;
            analyze_command(config, processed, output, quiet)
        }
        Commands::Compare { first, second } => compare_command(config, first, second),
        Commands::Canonical { file, unit } => canonical_command(config, file, unit),
        Commands::InitConfig { output } => {
            AnalyzerConfig::default().save_to_file(&output)?;
            print_success(&format!("Default configuration written to {}", output.display()));
            Ok(())
        }
    }
}

fn stage_command(config: AnalyzerConfig, raw: PathBuf, processed: PathBuf, quiet: bool) -> Result<()> {
    validate_path(&raw, "Raw directory")?;
    let start_time = Instant::now();

    let summary = Stager::new(config.staging)?
        .stage(&raw, &processed)
        .with_context(|| format!("Failed to stage {}", raw.display()))?;

    if !quiet {
        print_success(&format!(
            "Staged {} student(s), {} file(s) from {} assignment(s) in {}",
            summary.students_staged,
            summary.files_copied,
            summary.assignments,
            format_duration(start_time.elapsed())
        ));
        if summary.missing > 0 {
            print_warning(&format!(
                "There was {} missing submission(s)",
                summary.missing
            ));
        }
    }
    Ok(())
}

fn analyze_command(config: AnalyzerConfig, processed: PathBuf, output: PathBuf, quiet: bool) -> Result<()> {
    validate_path(&processed, "Processed directory")?;
    let start_time = Instant::now();

    let engine = BatchEngine::new(config);
    let tasks = engine.discover(&processed)?;
    info!("Found {} task(s) in {}", tasks.len(), processed.display());

    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(tasks.len() as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Failed to set progress style")?
            .progress_chars("#>-"),
    );

    let summary = engine.run_tasks(&processed, &output, &tasks, |task, _ok| {
        pb.set_message(format!("{} {}", task.assignment, task.task));
        pb.inc(1);
    })?;
    pb.finish_and_clear();

    if !quiet {
        print_success(&format!(
            "{} of {} matrices written to {} in {}",
            summary.written,
            summary.tasks,
            output.display(),
            format_duration(start_time.elapsed())
        ));
        if summary.skipped_submissions > 0 {
            print_warning(&format!(
                "{} unparsable submission(s) skipped",
                summary.skipped_submissions
            ));
        }
    }
    if summary.failed > 0 {
        print_warning(&format!("{} task(s) failed, see log", summary.failed));
    }
    Ok(())
}

fn compare_command(config: AnalyzerConfig, first: PathBuf, second: PathBuf) -> Result<()> {
    let canonicalizer = Canonicalizer::new(config.canonical);
    let differ = LineDiffer::new(config.similarity.algorithm);

    let load = |path: &PathBuf| -> Result<_> {
        let source = read_submission_file(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        canonicalizer
            .canonicalize(&source)
            .with_context(|| format!("Failed to parse {}", path.display()))
    };
    let a = load(&first)?;
    let b = load(&second)?;

    let comparison = compare_units(&differ, &a, &b);

    println!(
        "{} {} {}",
        first.display().to_string().bold(),
        "vs".dimmed(),
        second.display().to_string().bold()
    );
    if comparison.units.is_empty() {
        print_info("No shared units");
    }
    for unit in &comparison.units {
        println!(
            "  {:<24} {:>4}/{:<4} matched",
            unit.name,
            unit.matched(),
            unit.length
        );
    }
    for name in a.names().filter(|n| !b.contains(n)) {
        println!("  {:<24} {}", name, "only in first".dimmed());
    }
    for name in b.names().filter(|n| !a.contains(n)) {
        println!("  {:<24} {}", name, "only in second".dimmed());
    }

    println!(
        "Similarity: {}",
        format_score(comparison.score(), config.similarity.threshold)
    );
    Ok(())
}

fn canonical_command(config: AnalyzerConfig, file: PathBuf, unit: Option<String>) -> Result<()> {
    let source = read_submission_file(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let units = Canonicalizer::new(config.canonical)
        .canonicalize(&source)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    if let Some(name) = unit {
        let unit = units
            .get(&name)
            .with_context(|| format!("No unit '{}' in {}", name, file.display()))?;
        for line in &unit.lines {
            println!("{}", line);
        }
        return Ok(());
    }

    print_info(&format!(
        "{} unit(s), {} canonical line(s)",
        units.len(),
        units.total_lines()
    ));
    for unit in units.iter() {
        let title = if unit.name == TOP_LEVEL_UNIT {
            unit.name.cyan().to_string()
        } else {
            unit.name.bold().to_string()
        };
        println!("{} ({} lines)", title, unit.len());
        for line in &unit.lines {
            println!("  {}", line);
        }
    }
    Ok(())
}
