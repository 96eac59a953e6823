use crate::config::Config;
use crate::error::AllocError;
use crate::solve_instance;
use log::{error, info};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const REPORT_SUFFIX: &str = "_saida.txt";

#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    /// Report files written, one per solved instance.
    pub written: Vec<PathBuf>,
    pub failed: Vec<Failure>,
}

#[derive(Debug, Serialize)]
pub struct Failure {
    pub instance: PathBuf,
    pub reason: String,
}

/// Solve every `.txt` instance in `dir`, writing one report per instance
/// into `config.results_dir`. A failing instance is logged and skipped.
pub fn solve_directory(dir: impl AsRef<Path>, config: &Config) -> Result<BatchSummary, AllocError> {
    let dir = dir.as_ref();
    fs::create_dir_all(&config.results_dir).map_err(|source| AllocError::Io {
        path: config.results_dir.clone(),
        source,
    })?;

    let mut summary = BatchSummary::default();
    for path in instance_files(dir)? {
        info!("solving instance {}", path.display());
        let written = solve_instance(&path, &config.solver, config)
            .and_then(|report| report.write_to(&config.results_dir));
        match written {
            Ok(report_path) => {
                info!("report saved to {}", report_path.display());
                summary.written.push(report_path);
            }
            Err(err) => {
                error!("skipping {}: {err}", path.display());
                summary.failed.push(Failure {
                    instance: path,
                    reason: err.to_string(),
                });
            }
        }
    }
    Ok(summary)
}

/// Instance files of `dir` in file-name order, leaving out earlier reports.
fn instance_files(dir: &Path) -> Result<Vec<PathBuf>, AllocError> {
    let entries = fs::read_dir(dir).map_err(|source| AllocError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path.extension().map(|ext| ext == "txt").unwrap_or(false)
                && !path
                    .file_name()
                    .map(|name| name.to_string_lossy().ends_with(REPORT_SUFFIX))
                    .unwrap_or(false)
        })
        .collect();
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}
