use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{LevelFilter, info, warn};
use roomalloc::{CompatibilityPolicy, Config, solve_directory, solve_instance};

/// Allocate students to classrooms, maximising the total value placed.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Instance file, or a directory of `.txt` instances to solve in batch
    path: PathBuf,
    #[arg(short, long, value_name = "FILE")]
    config_file: Option<PathBuf>,
    #[arg(short, long)]
    solver: Option<String>,
    #[arg(short, long, value_enum)]
    policy: Option<CompatibilityPolicy>,
    #[arg(short, long, value_name = "SECONDS")]
    time_limit: Option<f64>,
    #[arg(short, long, value_name = "FOLDER")]
    results_dir: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,
    #[arg(
        short,
        long,
        value_name = "[off, error, warn, info, debug, trace]",
        default_value = "info"
    )]
    log_level: LevelFilter,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Yaml,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_default_env()
        .filter_level(cli.log_level)
        .init();

    let mut config = match &cli.config_file {
        Some(path) => Config::from_yaml_file(path)?,
        None => Config::default(),
    };
    if let Some(solver) = cli.solver {
        config.solver = solver;
    }
    if let Some(policy) = cli.policy {
        config.policy = policy;
    }
    if let Some(seconds) = cli.time_limit {
        config.time_limit = Some(seconds);
    }
    if let Some(dir) = cli.results_dir {
        config.results_dir = dir;
    }

    if cli.path.is_dir() {
        let summary = solve_directory(&cli.path, &config)?;
        info!(
            "{} report(s) written to {}, {} instance(s) failed",
            summary.written.len(),
            config.results_dir.display(),
            summary.failed.len()
        );
        for failure in &summary.failed {
            warn!("{}: {}", failure.instance.display(), failure.reason);
        }
        if let Format::Yaml = cli.format {
            println!("{}", serde_yaml::to_string(&summary)?);
        }
    } else {
        let report = solve_instance(&cli.path, &config.solver, &config)
            .with_context(|| format!("failed to solve {}", cli.path.display()))?;
        match cli.format {
            Format::Text => print!("{report}"),
            Format::Yaml => println!("{}", serde_yaml::to_string(&report)?),
        }
    }
    Ok(())
}
