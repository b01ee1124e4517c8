//! Script build pipeline: ordered concatenation and minification
//!
//! Runs after the lint pipeline (the task graph carries that edge); lint
//! findings never block this build. The group list is the recursive
//! superset of the lint list so nested plugin/library files are bundled.

use crate::globlist;
use crate::pipeline::{PipelineContext, PipelineError, PipelineOutcome};
use crate::report;
use minify_js::{minify, Session, TopLevelMode};
use std::fs;

/// Ordered script-source groups, relative to the script source root.
pub const SCRIPT_ORDER: &[&str] = &[
    "Config.js",
    "Plugins/**/*.js",
    "Base/**/*.js",
    "Layout/**/*.js",
    "Modules/**/*.js",
    "Themes/**/*.js",
    "Utilities/**/*.js",
    "Library/**/*.js",
    "Main.js",
];

/// Run the script build pipeline.
pub fn run(ctx: &PipelineContext<'_>) -> Result<PipelineOutcome, PipelineError> {
    let src_root = ctx.path(&ctx.config.paths.scripts_src);
    let out_dir = ctx.path(&ctx.config.paths.scripts_root);

    let sources = globlist::resolve(&src_root, SCRIPT_ORDER)?;
    let combined = globlist::concat(&sources)?;

    let session = Session::new();
    let mut minified = Vec::new();
    minify(&session, TopLevelMode::Global, combined.as_bytes(), &mut minified)
        .map_err(|e| PipelineError::Minify(format!("{:?}", e)))?;

    let bundle = ctx.path(&ctx.config.paths.script_bundle());
    fs::create_dir_all(&out_dir)?;
    fs::write(&bundle, &minified)?;

    report::info(&format!(
        "wrote {} ({} sources, {} bytes)",
        bundle.display(),
        sources.len(),
        minified.len()
    ));
    ctx.request_reload();
    Ok(PipelineOutcome::Completed)
}
