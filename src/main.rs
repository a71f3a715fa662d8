//! Packsmith - command-line resource pack builder

use std::process::ExitCode;

use packsmith::cli;

fn main() -> ExitCode {
    cli::run()
}
