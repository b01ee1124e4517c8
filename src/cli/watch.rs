//! Watch and serve command implementations

use super::build::load_project;
use super::EXIT_ERROR;
use crate::config::{self, CliOverrides};
use crate::pipeline::PipelineContext;
use crate::report;
use crate::serve::ReloadHub;
use crate::{serve, tasks, watch};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

/// Build once, start the dev server, then watch indefinitely.
pub fn run_watch(port: Option<u16>) -> ExitCode {
    let (mut config, root) = match load_project() {
        Ok(project) => project,
        Err(message) => {
            eprintln!("error: {}", message);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    config::merge_cli_overrides(&mut config, &CliOverrides { port });

    let hub = ReloadHub::new(Duration::from_millis(config.serve.reload_delay_ms));
    let ctx = PipelineContext::with_reload(&root, &config, &hub);

    // Initial build before clients connect
    tasks::run(&ctx, tasks::DEFAULT_TASKS);

    let server_root = root.clone();
    let server_hub = hub.clone();
    let server_port = config.serve.port;
    thread::spawn(move || {
        if let Err(err) = serve::serve(server_root, server_port, server_hub) {
            report::warn(&format!("dev server stopped: {}", err));
        }
    });

    // Blocks for the life of the process
    match watch::run(&ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Serve the project with live reload, without watching sources.
pub fn run_serve(port: Option<u16>) -> ExitCode {
    let (mut config, root) = match load_project() {
        Ok(project) => project,
        Err(message) => {
            eprintln!("error: {}", message);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    config::merge_cli_overrides(&mut config, &CliOverrides { port });

    let hub = ReloadHub::new(Duration::from_millis(config.serve.reload_delay_ms));
    match serve::serve(root, config.serve.port, hub) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
