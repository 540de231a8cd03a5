//! Operational helpers: logging setup and report export.

use std::{
    fs,
    path::{Path, PathBuf},
};

use pagespeed_types::{config::OpsConfig, run::BatchRun, BatchError, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` takes precedence over `ops.log_level`.
///
/// Output goes to stderr so stdout stays reserved for the report.
pub fn init_tracing(config: &OpsConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| ops_error(format!("failed to create log filter: {err}")))?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| ops_error(format!("tracing init error: {err}")))?;
    Ok(())
}

pub fn ensure_export_dir(path: &str) -> Result<PathBuf> {
    let dir = PathBuf::from(path);
    fs::create_dir_all(&dir)
        .map_err(|err| ops_error(format!("failed to create export dir {}: {err}", dir.display())))?;
    info!("Export directory ready at {:?}", dir);
    Ok(dir)
}

/// Files written for one exported run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedRun {
    pub json_path: PathBuf,
    pub text_path: PathBuf,
}

/// Writes `<run_id>.json` and `<run_id>.txt` into `dir`.
pub fn export_run(dir: &Path, run: &BatchRun, report: &str) -> Result<ExportedRun> {
    let stem = run.run_id.to_string();
    let json_path = dir.join(format!("{stem}.json"));
    let text_path = dir.join(format!("{stem}.txt"));

    let json = serde_json::to_string_pretty(run)
        .map_err(|err| ops_error(format!("failed to serialize run {stem}: {err}")))?;
    write_file(&json_path, &json)?;
    write_file(&text_path, report)?;

    info!(run_id = %run.run_id, json = %json_path.display(), text = %text_path.display(), "Run exported");
    Ok(ExportedRun {
        json_path,
        text_path,
    })
}

pub fn write_report(path: &Path, report: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            ops_error(format!("failed to create {}: {err}", parent.display()))
        })?;
    }
    write_file(path, report)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)
        .map_err(|err| ops_error(format!("failed to write {}: {err}", path.display())))
}

pub fn ops_error(message: impl Into<String>) -> BatchError {
    BatchError::Ops(message.into())
}
