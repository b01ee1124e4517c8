//! File-processing pipelines
//!
//! Each pipeline is one job from source glob groups to a written output.
//! Pipelines never abort the process: an error terminates the current run
//! and is reported as a non-fatal [`PipelineOutcome`].

pub mod images;
pub mod lint;
pub mod scripts;
pub mod sprite;
pub mod styles;
pub mod templates;

use crate::config::Config;
use crate::report;
use crate::serve::ReloadHub;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Error during a pipeline run
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid glob pattern
    #[error("glob pattern error: {0}")]
    Pattern(#[from] glob::PatternError),
    /// SCSS compilation failed
    #[error("SCSS compile error: {0}")]
    Scss(String),
    /// CSS parsing, prefixing or minification failed
    #[error("CSS transform error: {0}")]
    Css(String),
    /// JavaScript minification failed
    #[error("JS minify error: {0}")]
    Minify(String),
    /// Image decoding or encoding failed
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Non-fatal result of one pipeline run.
///
/// The orchestrator never lets a failure block dependents; it only decides
/// how to report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Run completed and wrote its outputs
    Completed,
    /// Run completed but emitted advisory diagnostics
    Diagnostics(usize),
    /// Run aborted; outputs from this run were not written
    Failed(String),
}

impl PipelineOutcome {
    /// Whether the run aborted
    pub fn is_failure(&self) -> bool {
        matches!(self, PipelineOutcome::Failed(_))
    }
}

/// Identifies one of the fixed pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PipelineKind {
    /// Pack sprite sources into a sheet + stylesheet fragment
    Sprite,
    /// Compile, prefix and minify the stylesheet bundle
    Styles,
    /// Advisory script lint
    Lint,
    /// Concatenate and minify the script bundle
    Scripts,
    /// Compile template registrations
    Templates,
    /// Optimize image assets in place
    Images,
}

impl PipelineKind {
    /// Task name as exposed on the CLI
    pub fn name(&self) -> &'static str {
        match self {
            PipelineKind::Sprite => "sprite",
            PipelineKind::Styles => "styles",
            PipelineKind::Lint => "lint",
            PipelineKind::Scripts => "scripts",
            PipelineKind::Templates => "templates",
            PipelineKind::Images => "images",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything a pipeline run needs, borrowed for the duration of the run.
///
/// Constructed once per invocation from the loaded configuration; pipelines
/// never read process-wide mutable state.
#[derive(Clone, Copy)]
pub struct PipelineContext<'a> {
    /// Project root all configured paths resolve against
    pub root: &'a Path,
    /// Immutable project configuration
    pub config: &'a Config,
    /// Reload channel, present only when the dev server is running
    pub reload: Option<&'a ReloadHub>,
}

impl<'a> PipelineContext<'a> {
    /// Context without a reload channel (one-shot builds).
    pub fn new(root: &'a Path, config: &'a Config) -> Self {
        Self { root, config, reload: None }
    }

    /// Context wired to a running dev server.
    pub fn with_reload(root: &'a Path, config: &'a Config, reload: &'a ReloadHub) -> Self {
        Self { root, config, reload: Some(reload) }
    }

    /// Resolve a configured relative path against the project root.
    pub fn path(&self, rel: &Path) -> PathBuf {
        self.config.resolve(self.root, rel)
    }

    /// Request a client refresh if a dev server is attached.
    pub fn request_reload(&self) {
        if let Some(hub) = self.reload {
            hub.notify();
        }
    }
}

/// Run one pipeline, converting errors into a non-fatal outcome.
pub fn run(kind: PipelineKind, ctx: &PipelineContext<'_>) -> PipelineOutcome {
    let started = Instant::now();
    report::info(&format!("{} started", kind));

    let result = match kind {
        PipelineKind::Sprite => sprite::run(ctx),
        PipelineKind::Styles => styles::run(ctx),
        PipelineKind::Lint => lint::run(ctx),
        PipelineKind::Scripts => scripts::run(ctx),
        PipelineKind::Templates => templates::run(ctx),
        PipelineKind::Images => images::run(ctx),
    };

    match result {
        Ok(outcome) => {
            let elapsed = report::format_duration(started.elapsed());
            match &outcome {
                PipelineOutcome::Diagnostics(count) => {
                    report::info(&format!("{} finished in {} ({} diagnostics)", kind, elapsed, count));
                }
                _ => report::info(&format!("{} finished in {}", kind, elapsed)),
            }
            outcome
        }
        Err(err) => {
            report::warn(&format!("{} failed: {}", kind, err));
            PipelineOutcome::Failed(err.to_string())
        }
    }
}
