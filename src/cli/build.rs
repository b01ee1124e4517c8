//! One-shot build command implementations

use super::{EXIT_ERROR, EXIT_SUCCESS};
use crate::config;
use crate::pipeline::{PipelineContext, PipelineKind};
use crate::tasks;
use std::path::PathBuf;
use std::process::ExitCode;

/// Locate the project and load its configuration.
pub(crate) fn load_project() -> Result<(config::Config, PathBuf), String> {
    let cwd = std::env::current_dir().map_err(|e| format!("cannot determine working directory: {}", e))?;
    config::load_or_default(&cwd).map_err(|e| e.to_string())
}

/// Run the requested pipelines once and report through the exit code.
///
/// Individual pipeline failures are already logged; the exit code is the
/// only place a one-shot build surfaces them.
pub fn run_tasks(requested: &[PipelineKind]) -> ExitCode {
    let (config, root) = match load_project() {
        Ok(project) => project,
        Err(message) => {
            eprintln!("error: {}", message);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let ctx = PipelineContext::new(&root, &config);
    let results = tasks::run(&ctx, requested);

    if results.iter().any(|(_, outcome)| outcome.is_failure()) {
        ExitCode::from(EXIT_ERROR)
    } else {
        ExitCode::from(EXIT_SUCCESS)
    }
}
