// src/bin/bdebstrap.rs

use anyhow::Result;
use bdebstrap::{
    cli::{CommandLineArgs, handlers, parse_args},
    core::duration::duration_str,
};
use std::time::Instant;

/// The main entry point of the `bdebstrap` application.
/// It sets up logging, parses arguments, runs the build and performs
/// centralized error handling.
fn main() {
    // clap prints usage errors itself and exits with code 2 (0 for --help/--version).
    let args = match parse_args(std::env::args_os()) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    env_logger::Builder::new()
        .filter_level(args.log_level.to_level_filter())
        .format_timestamp(None)
        .format_target(false)
        .parse_default_env()
        .init();

    if let Err(e) = run(args) {
        // --- Centralized Error Handling ---
        std::process::exit(handlers::build::report_failure(&e));
    }
}

fn run(args: CommandLineArgs) -> Result<()> {
    log::debug!("Command line arguments: {:?}", args);
    let start = Instant::now();
    handlers::build::handle(args)?;
    log::info!("Execution time: {}", duration_str(start.elapsed()));
    Ok(())
}
