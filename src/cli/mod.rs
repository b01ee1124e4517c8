//! Command-line interface
//!
//! The default invocation (no subcommand) runs the composite build:
//! templates, styles and scripts, with sprite packing and lint pulled in
//! as prerequisites.

mod build;
mod watch;

use crate::pipeline::PipelineKind;
use crate::tasks;
use clap::{Parser, Subcommand};
use std::process::ExitCode;

pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;

/// Conveyor - asset pipeline runner with a live-reloading dev server
#[derive(Parser)]
#[command(name = "conveyor")]
#[command(about = "Conveyor - build web assets and serve them with live reload")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build templates, styles and scripts once (the default)
    Build,
    /// Build, then serve the project with live reload and rebuild on change
    Watch {
        /// Dev server port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Serve the project with live reload, without watching sources
    Serve {
        /// Dev server port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Compile, prefix and minify the stylesheet bundle
    Styles,
    /// Lint, then concatenate and minify the script bundle
    Scripts,
    /// Run the advisory script lint on its own
    Lint,
    /// Pack sprite sources into the sheet and stylesheet fragment
    Sprite,
    /// Compile templates into the registration bundle
    Templates,
    /// Optimize image assets in place (maintenance task, never watched)
    Images,
}

/// Parse arguments and dispatch.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Build) {
        Commands::Build => build::run_tasks(tasks::DEFAULT_TASKS),
        Commands::Watch { port } => watch::run_watch(port),
        Commands::Serve { port } => watch::run_serve(port),
        Commands::Styles => build::run_tasks(&[PipelineKind::Styles]),
        Commands::Scripts => build::run_tasks(&[PipelineKind::Scripts]),
        Commands::Lint => build::run_tasks(&[PipelineKind::Lint]),
        Commands::Sprite => build::run_tasks(&[PipelineKind::Sprite]),
        Commands::Templates => build::run_tasks(&[PipelineKind::Templates]),
        Commands::Images => build::run_tasks(&[PipelineKind::Images]),
    }
}
