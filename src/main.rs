//! Conveyor - command-line entry point

use std::process::ExitCode;

use conveyor::cli;

fn main() -> ExitCode {
    cli::run()
}
